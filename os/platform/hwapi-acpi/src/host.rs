//! Linux backends: `/dev/mem` for physical memory and sysfs for firmware data.

use std::fs::{self, File};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

use hwapi_memmap::{MemmapError, MemoryMap};
use hwapi_sync::SyncOnceCell;

use crate::{AcpiConfig, AcpiTables, Firmware, PhysRead};

/// Physical memory through a `/dev/mem`-like device.
///
/// The device is opened on the first read, so a context that is served
/// entirely from sysfs never needs the privileges `/dev/mem` requires.
#[derive(Debug)]
pub struct DevMem {
    path: PathBuf,
    file: SyncOnceCell<File>,
}

impl DevMem {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: SyncOnceCell::new(),
        }
    }
}

impl PhysRead for DevMem {
    fn read_phys(&self, address: u64, buf: &mut [u8]) -> io::Result<()> {
        let file = self.file.get_or_try_init(|| File::open(&self.path))?;
        file.read_exact_at(buf, address).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!(
                    "reading {} bytes at {address:#x} from {}: {e}",
                    buf.len(),
                    self.path.display()
                ),
            )
        })
    }
}

/// Firmware files under `/sys/firmware`.
#[derive(Debug, Clone)]
pub struct SysfsFirmware {
    tables_dir: PathBuf,
    systab_path: PathBuf,
    memmap: MemoryMap,
}

impl SysfsFirmware {
    #[must_use]
    pub fn from_config(config: &AcpiConfig) -> Self {
        Self {
            tables_dir: config.sysfs_tables_dir.clone(),
            systab_path: config.systab_path.clone(),
            memmap: MemoryMap::new(&config.memmap_dir),
        }
    }
}

impl Firmware for SysfsFirmware {
    fn systab(&self) -> io::Result<String> {
        fs::read_to_string(&self.systab_path)
    }

    fn sysfs_table(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.tables_dir.join(name))
    }

    fn for_each_reserved_range(
        &self,
        label: &str,
        visit: &mut dyn FnMut(u64, u64) -> bool,
    ) -> Result<bool, MemmapError> {
        self.memmap.for_each_range(label, visit)
    }
}

impl AcpiTables<DevMem, SysfsFirmware> {
    /// A context reading the running machine as `config` describes it.
    #[must_use]
    pub fn host(config: AcpiConfig) -> Self {
        let phys = DevMem::new(&config.dev_mem_path);
        let firmware = SysfsFirmware::from_config(&config);
        Self::new(phys, firmware, config)
    }
}
