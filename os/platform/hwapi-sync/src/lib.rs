//! # One-time initialisation for hardware API caches
//!
//! Firmware structures such as the RSDP or the RSDT/XSDT are expensive to
//! discover (they may require scanning physical memory) but never change
//! during the lifetime of a process. [`SyncOnceCell`] holds such a value:
//! it is written at most once, by exactly one initialiser, and read freely
//! afterwards.
//!
//! Unlike [`core::cell::OnceCell`], initialisation may fail. A failed
//! initialiser leaves the cell empty, so no partially built value is ever
//! observed and a later caller may retry.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod sync_once_cell;

pub use sync_once_cell::SyncOnceCell;
