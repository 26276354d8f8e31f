//! # RSDP/XSDP (Root/Extended System Description Pointer)
//!
//! ```text
//! offset  size  field
//!      0     8  signature "RSD PTR "
//!      8     1  checksum           (bytes 0..20 sum to zero)
//!      9     6  OEM id
//!     15     1  revision           (0 = ACPI 1.0, 2 = ACPI 2.0+)
//!     16     4  RSDT address
//!     -- revision 2 and later --
//!     20     4  length             (36)
//!     24     8  XSDT address
//!     32     1  extended checksum  (bytes 0..36 sum to zero)
//!     33     3  reserved
//! ```

use log::warn;

use crate::reader::LeReader;
use crate::{AcpiError, PhysRead, sum};

pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";
/// Size of the ACPI 1.0 structure, covered by the first checksum.
pub const RSDP_V1_SIZE: usize = 20;
/// Size of the ACPI 2.0+ structure.
pub const RSDP_V2_SIZE: usize = 36;

/// Decoded Root System Description Pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rsdp {
    pub signature: [u8; 8],
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub revision: u8,
    pub rsdt_address: u32,
    /// Present for revision 2 and later.
    pub extended: Option<XsdpFields>,
}

/// Fields the ACPI 2.0 layout appends to the RSDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XsdpFields {
    pub length: u32,
    pub xsdt_address: u64,
    pub extended_checksum: u8,
}

impl Rsdp {
    /// Decode an RSDP from `bytes`.
    ///
    /// The extended fields are decoded for revision 2 and later, which then
    /// requires the full 36 bytes.
    ///
    /// # Errors
    /// [`AcpiError::Truncated`] if `bytes` is too short for the revision.
    pub fn decode(bytes: &[u8]) -> Result<Self, AcpiError> {
        let mut r = LeReader::new(bytes);
        let signature = r.array()?;
        let checksum = r.u8()?;
        let oem_id = r.array()?;
        let revision = r.u8()?;
        let rsdt_address = r.u32()?;

        let extended = if revision >= 2 {
            let length = r.u32()?;
            let xsdt_address = r.u64()?;
            let extended_checksum = r.u8()?;
            r.skip(3)?;
            Some(XsdpFields {
                length,
                xsdt_address,
                extended_checksum,
            })
        } else {
            None
        };

        Ok(Self {
            signature,
            checksum,
            oem_id,
            revision,
            rsdt_address,
            extended,
        })
    }

    #[must_use]
    pub fn has_signature(&self) -> bool {
        &self.signature == RSDP_SIGNATURE
    }

    /// Number of bytes this revision of the structure occupies.
    #[must_use]
    pub const fn structure_size(&self) -> usize {
        if self.revision >= 2 {
            RSDP_V2_SIZE
        } else {
            RSDP_V1_SIZE
        }
    }

    #[must_use]
    pub fn oem_id(&self) -> String {
        String::from_utf8_lossy(&self.oem_id).trim_end().to_owned()
    }

    /// Physical address of the RSDT, `None` if the pointer is null.
    #[must_use]
    pub fn rsdt_address(&self) -> Option<u64> {
        Some(u64::from(self.rsdt_address)).filter(|&a| a != 0)
    }

    /// Physical address of the XSDT, `None` before ACPI 2.0 or if null.
    #[must_use]
    pub fn xsdt_address(&self) -> Option<u64> {
        self.extended
            .map(|x| x.xsdt_address)
            .filter(|&a| a != 0)
    }
}

/// An RSDP together with the raw bytes it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRsdp {
    /// Physical address the structure was found at.
    pub address: u64,
    /// 20 bytes before ACPI 2.0, 36 bytes otherwise.
    pub bytes: Vec<u8>,
    pub rsdp: Rsdp,
}

/// Read an RSDP candidate at `address`.
///
/// Returns `Ok(None)` if the signature is absent. A present signature says
/// nothing about the checksums; see [`verify_rsdp`].
///
/// # Errors
/// I/O errors from `phys`.
pub fn read_candidate(phys: &dyn PhysRead, address: u64) -> Result<Option<RawRsdp>, AcpiError> {
    let mut buf = phys.read_phys_vec(address, RSDP_V2_SIZE)?;
    if &buf[..RSDP_SIGNATURE.len()] != RSDP_SIGNATURE {
        return Ok(None);
    }

    let rsdp = Rsdp::decode(&buf)?;
    buf.truncate(rsdp.structure_size());
    Ok(Some(RawRsdp {
        address,
        bytes: buf,
        rsdp,
    }))
}

/// Validate checksums and length of an RSDP.
///
/// The first checksum always covers the ACPI 1.0 part. Revision 0 must be
/// exactly 20 bytes long. Revision 2 must declare a length of 36 and its
/// extended checksum covers every byte. Any other revision is accepted once
/// the first checksum holds.
///
/// # Errors
/// [`AcpiError::InvalidChecksum`], [`AcpiError::InvalidLength`], or
/// [`AcpiError::Truncated`] for a buffer shorter than 20 bytes.
pub fn verify_rsdp(raw: &[u8], rsdp: &Rsdp) -> Result<(), AcpiError> {
    let v1 = raw.get(..RSDP_V1_SIZE).ok_or(AcpiError::Truncated {
        offset: 0,
        needed: RSDP_V1_SIZE,
        available: raw.len(),
    })?;
    if sum(v1) != 0 {
        return Err(AcpiError::InvalidChecksum { structure: "RSDP" });
    }

    match rsdp.revision {
        0 => {
            if raw.len() != RSDP_V1_SIZE {
                return Err(AcpiError::InvalidLength {
                    structure: "RSDP",
                    length: raw.len() as u64,
                });
            }
        }
        2 => {
            let length = rsdp.extended.map_or(0, |x| x.length);
            if length as usize != RSDP_V2_SIZE {
                return Err(AcpiError::InvalidLength {
                    structure: "XSDP",
                    length: u64::from(length),
                });
            }
            if sum(raw) != 0 {
                return Err(AcpiError::InvalidChecksum { structure: "XSDP" });
            }
        }
        other => {
            warn!("accepting RSDP with unknown revision {other} on its ACPI 1.0 checksum");
        }
    }

    Ok(())
}
