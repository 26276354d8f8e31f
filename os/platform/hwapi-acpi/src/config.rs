//! Where the host exposes firmware data.

use std::path::PathBuf;

pub const SYSFS_TABLES_PATH: &str = "/sys/firmware/acpi/tables";
pub const SYSFS_SYSTAB_PATH: &str = "/sys/firmware/efi/systab";
pub const DEV_MEM_PATH: &str = "/dev/mem";
/// Memory map type of ranges the firmware reserved for ACPI tables.
pub const ACPI_TABLES_LABEL: &str = "ACPI Tables";

/// Paths and switches for [`AcpiTables`](crate::AcpiTables).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcpiConfig {
    pub sysfs_tables_dir: PathBuf,
    pub systab_path: PathBuf,
    pub memmap_dir: PathBuf,
    pub dev_mem_path: PathBuf,
    /// Memory map type scanned by the reserved-memory strategy.
    pub reserved_label: String,
    /// Try the kernel's sysfs export before walking physical memory.
    pub sysfs_fast_path: bool,
}

impl Default for AcpiConfig {
    fn default() -> Self {
        Self {
            sysfs_tables_dir: PathBuf::from(SYSFS_TABLES_PATH),
            systab_path: PathBuf::from(SYSFS_SYSTAB_PATH),
            memmap_dir: PathBuf::from(hwapi_memmap::SYSFS_MEMMAP_PATH),
            dev_mem_path: PathBuf::from(DEV_MEM_PATH),
            reserved_label: String::from(ACPI_TABLES_LABEL),
            sysfs_fast_path: true,
        }
    }
}

impl AcpiConfig {
    #[must_use]
    pub fn with_sysfs_tables_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sysfs_tables_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_systab_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.systab_path = path.into();
        self
    }

    #[must_use]
    pub fn with_memmap_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.memmap_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_dev_mem_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dev_mem_path = path.into();
        self
    }

    #[must_use]
    pub fn with_reserved_label(mut self, label: impl Into<String>) -> Self {
        self.reserved_label = label.into();
        self
    }

    #[must_use]
    pub fn with_sysfs_fast_path(mut self, enabled: bool) -> Self {
        self.sysfs_fast_path = enabled;
        self
    }
}
