//! # RSDP discovery
//!
//! The RSDP is not at a fixed address. Depending on how the machine booted
//! it is announced by the EFI system table, sits in the BIOS ROM area or the
//! EBDA, or hides somewhere in a memory range the firmware reserved for ACPI.
//! Each place is searched by one [`RsdpStrategy`]; [`locate_rsdp`] runs them
//! in order and keeps the first result that passes validation.

use log::{debug, trace, warn};

use crate::rsdp::{RSDP_V2_SIZE, RawRsdp, read_candidate, verify_rsdp};
use crate::{AcpiError, Firmware, PhysRead};

/// The RSDP is always 16-byte aligned.
pub const RSDP_ALIGNMENT: u64 = 16;

pub const BIOS_ROM_BASE: u64 = 0xE_0000;
pub const BIOS_ROM_SIZE: u64 = 0x2_0000;
pub const EBDA_TOP: u64 = 0xA_0000;

/// I/O a strategy may use.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub phys: &'a dyn PhysRead,
    pub firmware: &'a dyn Firmware,
}

/// One place to look for the RSDP.
pub trait RsdpStrategy: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Return the first RSDP candidate this strategy can find.
    ///
    /// The candidate only needs a matching signature; checksums are verified
    /// by the caller.
    ///
    /// # Errors
    /// [`AcpiError::NotFound`] on a miss, or whatever I/O failure ended the
    /// search.
    fn try_locate(&self, src: &Sources<'_>) -> Result<RawRsdp, AcpiError>;
}

/// The EFI system table export lists the RSDP as `ACPI20=` or `ACPI=`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystabScan;

impl RsdpStrategy for SystabScan {
    fn name(&self) -> &'static str {
        "systab"
    }

    fn try_locate(&self, src: &Sources<'_>) -> Result<RawRsdp, AcpiError> {
        let systab = src.firmware.systab()?;

        for line in systab.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if !matches!(key.trim(), "ACPI20" | "ACPI") {
                continue;
            }
            let Some(address) = hwapi_memmap::parse_integer(value).filter(|&a| a != 0) else {
                continue;
            };

            trace!("systab {key} points at {address:#x}");
            match read_candidate(src.phys, address) {
                Ok(Some(found)) => return Ok(found),
                Ok(None) => debug!("no RSDP signature at {address:#x}"),
                Err(e) => debug!("cannot read {address:#x}: {e}"),
            }
        }

        Err(AcpiError::NotFound)
    }
}

/// Linear scan of a fixed physical window in 16-byte steps.
#[derive(Debug, Clone, Copy)]
pub struct RegionScan {
    name: &'static str,
    start: u64,
    end: u64,
}

impl RegionScan {
    /// Scan `[start, end)`.
    #[must_use]
    pub const fn new(name: &'static str, start: u64, end: u64) -> Self {
        Self { name, start, end }
    }

    /// The BIOS read-only area below 1 MiB.
    #[must_use]
    pub const fn bios_rom() -> Self {
        Self::new("bios-rom", BIOS_ROM_BASE, BIOS_ROM_BASE + BIOS_ROM_SIZE)
    }

    /// The window below the EBDA top.
    #[must_use]
    pub const fn ebda() -> Self {
        Self::new("ebda", EBDA_TOP - BIOS_ROM_SIZE, EBDA_TOP)
    }
}

impl RsdpStrategy for RegionScan {
    fn name(&self) -> &'static str {
        self.name
    }

    fn try_locate(&self, src: &Sources<'_>) -> Result<RawRsdp, AcpiError> {
        scan_range(src.phys, self.start, self.end)?.ok_or(AcpiError::NotFound)
    }
}

/// Scan every memory map range of a given type.
#[derive(Debug, Clone)]
pub struct ReservedMemoryScan {
    label: String,
}

impl ReservedMemoryScan {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl RsdpStrategy for ReservedMemoryScan {
    fn name(&self) -> &'static str {
        "reserved-memory"
    }

    fn try_locate(&self, src: &Sources<'_>) -> Result<RawRsdp, AcpiError> {
        let mut found = None;

        src.firmware
            .for_each_reserved_range(&self.label, &mut |start: u64, end: u64| {
                // memmap ranges are inclusive
                match scan_range(src.phys, start, end.saturating_add(1)) {
                    Ok(Some(rsdp)) => {
                        found = Some(rsdp);
                        true
                    }
                    Ok(None) => false,
                    Err(e) => {
                        warn!("giving up on range {start:#x}..={end:#x}: {e}");
                        false
                    }
                }
            })?;

        found.ok_or(AcpiError::NotFound)
    }
}

/// The strategies in the order they are tried.
#[must_use]
pub fn default_strategies(reserved_label: &str) -> Vec<Box<dyn RsdpStrategy>> {
    vec![
        Box::new(SystabScan),
        Box::new(RegionScan::bios_rom()),
        Box::new(RegionScan::ebda()),
        Box::new(ReservedMemoryScan::new(reserved_label)),
    ]
}

/// Run `strategies` in order and return the first RSDP that validates.
///
/// A strategy that misses, fails, or yields a structure with bad checksums
/// just hands over to the next one.
///
/// # Errors
/// [`AcpiError::NotFound`] once every strategy is exhausted.
pub fn locate_rsdp(
    strategies: &[Box<dyn RsdpStrategy>],
    src: &Sources<'_>,
) -> Result<RawRsdp, AcpiError> {
    for strategy in strategies {
        let found = strategy.try_locate(src).and_then(|found| {
            verify_rsdp(&found.bytes, &found.rsdp)?;
            Ok(found)
        });

        match found {
            Ok(found) => {
                debug!("{}: RSDP at {:#x}", strategy.name(), found.address);
                return Ok(found);
            }
            Err(e) => debug!("{}: {e}", strategy.name()),
        }
    }

    Err(AcpiError::NotFound)
}

/// Look for the RSDP signature at every aligned address in `[start, end)`
/// where a full structure fits.
///
/// A read error aborts the scan.
fn scan_range(phys: &dyn PhysRead, start: u64, end: u64) -> Result<Option<RawRsdp>, AcpiError> {
    let Some(mut address) = start.checked_next_multiple_of(RSDP_ALIGNMENT) else {
        return Ok(None);
    };

    while address
        .checked_add(RSDP_V2_SIZE as u64)
        .is_some_and(|candidate_end| candidate_end <= end)
    {
        if let Some(found) = read_candidate(phys, address)? {
            return Ok(Some(found));
        }
        address += RSDP_ALIGNMENT;
    }

    Ok(None)
}
