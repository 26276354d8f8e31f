use std::collections::HashSet;

use hwapi_sync::SyncOnceCell;
use log::{debug, info, trace};

use crate::config::AcpiConfig;
use crate::locate::{self, RsdpStrategy, Sources};
use crate::root::{RootKind, RootTable, resolve_root};
use crate::rsdp::RawRsdp;
use crate::sdt::SdtHeader;
use crate::{AcpiError, Firmware, PhysRead};

/// Longest name accepted by the resolvers.
const MAX_NAME_LEN: usize = 6;

/// A table referenced from the RSDT or XSDT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    pub address: u64,
    pub signature: [u8; 4],
    /// The root table that referenced `address` first.
    pub root: RootKind,
}

impl TableEntry {
    #[must_use]
    pub fn signature_str(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }
}

/// Entry point for ACPI table access.
///
/// Holds the I/O backends and caches the RSDP and both root tables once they
/// have been read successfully. The firmware tables do not move while the
/// process runs, so the caches are never invalidated. A failed lookup is not
/// cached and is retried on the next call.
///
/// The context is `Sync` when its backends are; concurrent first calls are
/// serialised per cache, so physical memory is only scanned once.
pub struct AcpiTables<P, F> {
    phys: P,
    firmware: F,
    config: AcpiConfig,
    strategies: Vec<Box<dyn RsdpStrategy>>,
    rsdp: SyncOnceCell<RawRsdp>,
    rsdt: SyncOnceCell<RootTable>,
    xsdt: SyncOnceCell<RootTable>,
}

impl<P: PhysRead, F: Firmware> AcpiTables<P, F> {
    /// Build a context that uses the default discovery strategies.
    #[must_use]
    pub fn new(phys: P, firmware: F, config: AcpiConfig) -> Self {
        let strategies = locate::default_strategies(&config.reserved_label);
        Self {
            phys,
            firmware,
            config,
            strategies,
            rsdp: SyncOnceCell::new(),
            rsdt: SyncOnceCell::new(),
            xsdt: SyncOnceCell::new(),
        }
    }

    /// Replace the RSDP discovery strategies; they are tried in order.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn RsdpStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &AcpiConfig {
        &self.config
    }

    fn sources(&self) -> Sources<'_> {
        Sources {
            phys: &self.phys,
            firmware: &self.firmware,
        }
    }

    /// The validated RSDP, located on first use.
    ///
    /// # Errors
    /// [`AcpiError::NotFound`] if no strategy produced a valid RSDP.
    pub fn rsdp(&self) -> Result<&RawRsdp, AcpiError> {
        self.rsdp.get_or_try_init(|| {
            let found = locate::locate_rsdp(&self.strategies, &self.sources())?;
            info!(
                "ACPI RSDP at {:#x}, revision {}, OEM {:?}",
                found.address,
                found.rsdp.revision,
                found.rsdp.oem_id()
            );
            Ok(found)
        })
    }

    /// The RSDT referenced by the RSDP.
    ///
    /// # Errors
    /// RSDP discovery errors, [`AcpiError::MissingRoot`] for a null pointer,
    /// or any error of [`resolve_root`].
    pub fn rsdt(&self) -> Result<&RootTable, AcpiError> {
        self.rsdt.get_or_try_init(|| {
            let address = self
                .rsdp()?
                .rsdp
                .rsdt_address()
                .ok_or(AcpiError::MissingRoot(RootKind::Rsdt))?;
            resolve_root(&self.phys, RootKind::Rsdt, address)
        })
    }

    /// The XSDT referenced by an ACPI 2.0+ RSDP.
    ///
    /// # Errors
    /// RSDP discovery errors, [`AcpiError::MissingRoot`] before ACPI 2.0 or
    /// for a null pointer, or any error of [`resolve_root`].
    pub fn xsdt(&self) -> Result<&RootTable, AcpiError> {
        self.xsdt.get_or_try_init(|| {
            let address = self
                .rsdp()?
                .rsdp
                .xsdt_address()
                .ok_or(AcpiError::MissingRoot(RootKind::Xsdt))?;
            resolve_root(&self.phys, RootKind::Xsdt, address)
        })
    }

    /// Raw bytes of the table called `name`.
    ///
    /// Tries the kernel's sysfs export first (unless disabled in the
    /// configuration) and falls back to [`AcpiTables::get_table_devmem`].
    ///
    /// # Errors
    /// [`AcpiError::InvalidName`] before any I/O for an empty or over-long
    /// name, otherwise see [`AcpiTables::get_table_devmem`].
    pub fn get_table(&self, name: &str) -> Result<Vec<u8>, AcpiError> {
        check_name(name)?;

        if self.config.sysfs_fast_path {
            match self.firmware.sysfs_table(name) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => debug!("sysfs has no {name}: {e}"),
            }
        }

        self.get_table_devmem(name)
    }

    /// Raw bytes of the table called `name` as exported by the kernel.
    ///
    /// # Errors
    /// [`AcpiError::InvalidName`], or the I/O error of the sysfs read.
    pub fn get_table_sysfs(&self, name: &str) -> Result<Vec<u8>, AcpiError> {
        check_name(name)?;
        Ok(self.firmware.sysfs_table(name)?)
    }

    /// Raw bytes of the table called `name`, read from physical memory.
    ///
    /// `RSDP`, `RSDT` and `XSDT` return the structures themselves. Any other
    /// name is matched against the signatures of the tables the root tables
    /// reference. If several share a signature (`SSDT`), the first one in
    /// RSDT order, then XSDT order, wins.
    ///
    /// # Errors
    /// [`AcpiError::InvalidName`], RSDP discovery errors,
    /// [`AcpiError::BothRootsInvalid`], [`AcpiError::TableNotFound`],
    /// [`AcpiError::InvalidLength`] for a table with an implausible length,
    /// or I/O errors.
    pub fn get_table_devmem(&self, name: &str) -> Result<Vec<u8>, AcpiError> {
        check_name(name)?;

        let rsdp = self.rsdp()?;
        if name == "RSDP" {
            return Ok(rsdp.bytes.clone());
        }

        let rsdt = self.rsdt();
        if name == "RSDT"
            && let Ok(rsdt) = &rsdt
        {
            return Ok(rsdt.raw.clone());
        }

        let xsdt = self.xsdt();
        if name == "XSDT"
            && let Ok(xsdt) = &xsdt
        {
            return Ok(xsdt.raw.clone());
        }

        let roots = usable_roots(rsdt, xsdt)?;
        let entry = self
            .collect_entries(&roots)?
            .into_iter()
            .find(|e| e.signature.as_slice() == name.as_bytes())
            .ok_or_else(|| AcpiError::TableNotFound(name.to_owned()))?;

        self.read_table(entry.address)
    }

    /// Every table called `name`, in the order [`AcpiTables::table_entries`]
    /// lists them.
    ///
    /// # Errors
    /// As [`AcpiTables::get_table_devmem`]; [`AcpiError::TableNotFound`] if
    /// there is no match at all.
    pub fn get_tables_devmem(&self, name: &str) -> Result<Vec<Vec<u8>>, AcpiError> {
        check_name(name)?;
        if matches!(name, "RSDP" | "RSDT" | "XSDT") {
            return self.get_table_devmem(name).map(|t| vec![t]);
        }

        let tables = self
            .table_entries()?
            .into_iter()
            .filter(|e| e.signature.as_slice() == name.as_bytes())
            .map(|e| self.read_table(e.address))
            .collect::<Result<Vec<_>, _>>()?;

        if tables.is_empty() {
            return Err(AcpiError::TableNotFound(name.to_owned()));
        }
        Ok(tables)
    }

    /// The tables referenced by the RSDT and XSDT, deduplicated by address.
    ///
    /// RSDT entries come first, then XSDT entries not already listed.
    ///
    /// # Errors
    /// RSDP discovery errors, [`AcpiError::BothRootsInvalid`], or I/O errors
    /// reading a table header.
    pub fn table_entries(&self) -> Result<Vec<TableEntry>, AcpiError> {
        self.rsdp()?;
        let roots = usable_roots(self.rsdt(), self.xsdt())?;
        self.collect_entries(&roots)
    }

    /// Read only the header of every referenced table to learn its signature.
    fn collect_entries(&self, roots: &[&RootTable]) -> Result<Vec<TableEntry>, AcpiError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for root in roots {
            for &address in &root.entries {
                if !seen.insert(address) {
                    continue;
                }
                let header = SdtHeader::read(&self.phys, address)?;
                trace!("{}: {} at {address:#x}", root.kind, header.signature_str());
                entries.push(TableEntry {
                    address,
                    signature: header.signature,
                    root: root.kind,
                });
            }
        }

        Ok(entries)
    }

    /// Read a table by the length its own header declares.
    fn read_table(&self, address: u64) -> Result<Vec<u8>, AcpiError> {
        let header = SdtHeader::read(&self.phys, address)?;
        if !header.has_plausible_length() {
            return Err(AcpiError::InvalidLength {
                structure: "table",
                length: u64::from(header.length),
            });
        }
        Ok(self.phys.read_phys_vec(address, header.length as usize)?)
    }
}

fn check_name(name: &str) -> Result<(), AcpiError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.contains('/') {
        return Err(AcpiError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// The root tables that resolved, RSDT first. Fails only if neither did.
fn usable_roots<'a>(
    rsdt: Result<&'a RootTable, AcpiError>,
    xsdt: Result<&'a RootTable, AcpiError>,
) -> Result<Vec<&'a RootTable>, AcpiError> {
    match (rsdt, xsdt) {
        (Err(rsdt), Err(xsdt)) => Err(AcpiError::BothRootsInvalid {
            rsdt: Box::new(rsdt),
            xsdt: Box::new(xsdt),
        }),
        (rsdt, xsdt) => Ok(rsdt.into_iter().chain(xsdt).collect()),
    }
}
