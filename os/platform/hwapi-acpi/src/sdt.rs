//! System Description Table (SDT) header.

use crate::reader::LeReader;
use crate::{AcpiError, PhysRead};

/// Standard ACPI System Description Table header.
///
/// This 36-byte header is present at the start of every ACPI table
/// (RSDT, XSDT, FACP, DSDT, SSDT, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdtHeader {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Total length of the table, including the header, in bytes.
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

impl SdtHeader {
    /// The size of an SDT header in bytes.
    pub const SIZE: usize = 36;

    /// Length value firmware leaves in unmapped or erased memory.
    pub const UNMAPPED_LENGTH: u32 = 0xFFFF_FFFF;

    /// # Errors
    /// [`AcpiError::Truncated`] if `bytes` is shorter than [`SdtHeader::SIZE`].
    pub fn decode(bytes: &[u8]) -> Result<Self, AcpiError> {
        let mut r = LeReader::new(bytes);
        Ok(Self {
            signature: r.array()?,
            length: r.u32()?,
            revision: r.u8()?,
            checksum: r.u8()?,
            oem_id: r.array()?,
            oem_table_id: r.array()?,
            oem_revision: r.u32()?,
            creator_id: r.u32()?,
            creator_revision: r.u32()?,
        })
    }

    /// Read and decode the header at physical address `address`.
    ///
    /// # Errors
    /// I/O errors from `phys`.
    pub fn read(phys: &dyn PhysRead, address: u64) -> Result<Self, AcpiError> {
        let mut buf = [0; Self::SIZE];
        phys.read_phys(address, &mut buf)?;
        Self::decode(&buf)
    }

    #[must_use]
    pub fn signature_str(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }

    /// `true` if the declared length can bound a read of the table.
    #[must_use]
    pub const fn has_plausible_length(&self) -> bool {
        self.length != Self::UNMAPPED_LENGTH && self.length as usize >= Self::SIZE
    }
}
