use std::io;

use hwapi_memmap::MemmapError;

use crate::root::RootKind;

/// Errors surfaced by ACPI discovery and table resolution.
#[derive(Debug, thiserror::Error)]
pub enum AcpiError {
    #[error("RSDP not found")]
    NotFound,
    #[error("{structure} at {address:#x} has invalid signature {found:?}")]
    InvalidSignature {
        structure: &'static str,
        address: u64,
        found: String,
    },
    #[error("{structure} has an invalid checksum")]
    InvalidChecksum { structure: &'static str },
    #[error("{structure} has an invalid length {length:#x}")]
    InvalidLength { structure: &'static str, length: u64 },
    #[error("truncated structure: {needed} bytes needed at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("RSDP does not reference an {0}")]
    MissingRoot(RootKind),
    #[error("invalid ACPI table name {0:?}")]
    InvalidName(String),
    #[error("ACPI table {0} not found")]
    TableNotFound(String),
    #[error("RSDT and XSDT are invalid (RSDT: {rsdt}; XSDT: {xsdt})")]
    BothRootsInvalid {
        rsdt: Box<AcpiError>,
        xsdt: Box<AcpiError>,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Memmap(#[from] MemmapError),
}
