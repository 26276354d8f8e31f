//! RSDT / XSDT decoding.
//!
//! The Root System Description Table (RSDT, 32-bit entries) and its 64-bit
//! counterpart (XSDT) are an SDT header followed by physical pointers to all
//! other ACPI tables.

use core::fmt;

use log::debug;

use crate::reader::LeReader;
use crate::sdt::SdtHeader;
use crate::{AcpiError, PhysRead};

/// Which of the two root tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    Rsdt,
    Xsdt,
}

impl RootKind {
    #[must_use]
    pub const fn signature(self) -> &'static [u8; 4] {
        match self {
            Self::Rsdt => b"RSDT",
            Self::Xsdt => b"XSDT",
        }
    }

    /// Size in bytes of a single table-pointer entry.
    #[must_use]
    pub const fn entry_size(self) -> usize {
        match self {
            Self::Rsdt => 4,
            Self::Xsdt => 8,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Rsdt => "RSDT",
            Self::Xsdt => "XSDT",
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded RSDT or XSDT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootTable {
    pub kind: RootKind,
    /// Physical address of the table.
    pub address: u64,
    pub header: SdtHeader,
    /// Physical addresses of the referenced tables, in table order.
    pub entries: Vec<u64>,
    /// The whole table, header included.
    pub raw: Vec<u8>,
}

/// Read the root table of `kind` at `address`.
///
/// The header is read first; its signature and length are checked before
/// anything else is touched. The entry array is then read and decoded, and
/// finally the whole table is read again as the raw buffer.
///
/// # Errors
/// [`AcpiError::InvalidSignature`], [`AcpiError::InvalidLength`] for a
/// length of zero, `0xFFFF_FFFF`, below the header size or not a multiple of
/// the entry size past the header, or I/O errors from `phys`.
pub fn resolve_root(
    phys: &dyn PhysRead,
    kind: RootKind,
    address: u64,
) -> Result<RootTable, AcpiError> {
    let header = SdtHeader::read(phys, address)?;

    if &header.signature != kind.signature() {
        return Err(AcpiError::InvalidSignature {
            structure: kind.name(),
            address,
            found: header.signature_str(),
        });
    }

    let entries_len = entries_len(&header, kind).ok_or(AcpiError::InvalidLength {
        structure: kind.name(),
        length: u64::from(header.length),
    })?;

    let entries_addr = address
        .checked_add(SdtHeader::SIZE as u64)
        .ok_or(AcpiError::InvalidLength {
            structure: kind.name(),
            length: u64::from(header.length),
        })?;
    let entries_raw = phys.read_phys_vec(entries_addr, entries_len)?;
    let entries = decode_entries(&entries_raw, kind)?;

    let raw = phys.read_phys_vec(address, header.length as usize)?;

    debug!(
        "{kind} at {address:#x}: {} entries, {} bytes",
        entries.len(),
        raw.len()
    );

    Ok(RootTable {
        kind,
        address,
        header,
        entries,
        raw,
    })
}

/// Byte length of the entry array, `None` if the declared length is invalid.
fn entries_len(header: &SdtHeader, kind: RootKind) -> Option<usize> {
    if header.length == 0 || header.length == SdtHeader::UNMAPPED_LENGTH {
        return None;
    }
    (header.length as usize)
        .checked_sub(SdtHeader::SIZE)
        .filter(|len| len % kind.entry_size() == 0)
}

fn decode_entries(raw: &[u8], kind: RootKind) -> Result<Vec<u64>, AcpiError> {
    let count = raw.len() / kind.entry_size();
    let mut r = LeReader::new(raw);
    (0..count)
        .map(|_| match kind {
            RootKind::Rsdt => r.u32().map(u64::from),
            RootKind::Xsdt => r.u64(),
        })
        .collect()
}
