//! # ACPI table access for platform security tooling
//!
//! This crate locates the ACPI table hierarchy of the running machine and
//! hands out raw table bytes by signature. It is meant for userspace tools
//! that inspect firmware state, so everything is read either from the
//! kernel's sysfs export or straight out of physical memory.
//!
//! ## Architecture
//!
//! ```text
//! get_table("FACP")
//!     ↓
//! /sys/firmware/acpi/tables/FACP      (fast path, if present)
//!     ↓ otherwise
//! RSDP   ← EFI systab, BIOS ROM scan, EBDA scan, reserved-memory scan
//!     ↓
//! RSDT (32-bit entries) + XSDT (64-bit entries)
//!     ↓
//! table headers, deduplicated by physical address
//!     ↓
//! first table whose signature matches
//! ```
//!
//! ## Key Components
//!
//! * [`PhysRead`] and [`Firmware`]: the two seams through which all I/O flows.
//!   [`DevMem`] and [`SysfsFirmware`] implement them for a Linux host.
//! * [`rsdp`]: RSDP decoding and checksum validation.
//! * [`locate`]: the ordered RSDP discovery strategies.
//! * [`root`]: RSDT/XSDT decoding.
//! * [`AcpiTables`]: the context object that caches the RSDP and root tables
//!   and resolves tables by name.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hwapi_acpi::{AcpiConfig, AcpiTables};
//!
//! let tables = AcpiTables::host(AcpiConfig::default());
//! let facp = tables.get_table("FACP")?;
//! println!("FADT is {} bytes", facp.len());
//! # Ok::<(), hwapi_acpi::AcpiError>(())
//! ```

use std::io;

pub mod config;
mod error;
#[cfg(unix)]
pub mod host;
pub mod locate;
pub mod reader;
pub mod root;
pub mod rsdp;
pub mod sdt;
mod tables;

pub use config::AcpiConfig;
pub use error::AcpiError;
#[cfg(unix)]
pub use host::{DevMem, SysfsFirmware};
pub use hwapi_memmap::MemmapError;
pub use locate::{RsdpStrategy, Sources};
pub use root::{RootKind, RootTable};
pub use rsdp::{RawRsdp, Rsdp};
pub use sdt::SdtHeader;
pub use tables::{AcpiTables, TableEntry};

/// Read raw bytes from physical memory.
pub trait PhysRead {
    /// Fill `buf` with the bytes starting at physical address `address`.
    ///
    /// # Errors
    /// Any I/O error from the backing device, e.g. permission denied or an
    /// address outside of what the device exposes.
    fn read_phys(&self, address: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Read `len` bytes starting at `address` into a fresh buffer.
    ///
    /// # Errors
    /// See [`PhysRead::read_phys`].
    fn read_phys_vec(&self, address: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_phys(address, &mut buf)?;
        Ok(buf)
    }
}

impl<T: PhysRead + ?Sized> PhysRead for &T {
    fn read_phys(&self, address: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_phys(address, buf)
    }
}

/// Firmware information the operating system exposes as files.
pub trait Firmware {
    /// Contents of the EFI system table export (`KEY=VALUE` lines).
    ///
    /// # Errors
    /// I/O errors, e.g. on a legacy BIOS machine where the file is absent.
    fn systab(&self) -> io::Result<String>;

    /// A table as already decoded by the kernel, keyed by its sysfs name.
    ///
    /// # Errors
    /// I/O errors, including "not found" for tables the kernel does not export.
    fn sysfs_table(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Calls `visit(start, end)` for every firmware memory range whose type
    /// contains `label`, until `visit` returns `true`. Returns whether the
    /// walk was stopped by the visitor.
    ///
    /// # Errors
    /// [`MemmapError`] if the memory map cannot be enumerated.
    fn for_each_reserved_range(
        &self,
        label: &str,
        visit: &mut dyn FnMut(u64, u64) -> bool,
    ) -> Result<bool, MemmapError>;
}

impl<T: Firmware + ?Sized> Firmware for &T {
    fn systab(&self) -> io::Result<String> {
        (**self).systab()
    }

    fn sysfs_table(&self, name: &str) -> io::Result<Vec<u8>> {
        (**self).sysfs_table(name)
    }

    fn for_each_reserved_range(
        &self,
        label: &str,
        visit: &mut dyn FnMut(u64, u64) -> bool,
    ) -> Result<bool, MemmapError> {
        (**self).for_each_reserved_range(label, visit)
    }
}

/// ACPI checksum: all bytes of a structure sum to zero (mod 256).
#[must_use]
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}
