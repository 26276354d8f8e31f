//! # Firmware memory map
//!
//! Linux exports the firmware-provided (e820 or EFI) memory map under
//! `/sys/firmware/memmap`. Every entry is a numbered directory:
//!
//! ```text
//! /sys/firmware/memmap/
//!     0/  start  end  type      -> 0x0  0x9fbff  "System RAM"
//!     1/  start  end  type      -> 0x9fc00  0x9ffff  "Reserved"
//!     ...
//! ```
//!
//! `start` and `end` are inclusive physical addresses written in hex. This
//! crate walks those entries by type, which the ACPI locator uses to scan
//! "ACPI Tables" ranges for the RSDP.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::trace;

/// Default location of the firmware memory map in sysfs.
pub const SYSFS_MEMMAP_PATH: &str = "/sys/firmware/memmap";

#[derive(Debug, thiserror::Error)]
pub enum MemmapError {
    #[error("cannot access memory map at {path}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid range {start:#x}..={end:#x}")]
    InvalidRange { start: u64, end: u64 },
}

/// Handle on a memory map directory tree.
#[derive(Debug, Clone)]
pub struct MemoryMap {
    root: PathBuf,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new(SYSFS_MEMMAP_PATH)
    }
}

impl MemoryMap {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Invoke `visit(start, end)` for every entry whose type contains `label`
    /// (case-insensitive). Entries are visited in ascending index order.
    ///
    /// Entries with missing or malformed `type`/`start`/`end` files are
    /// skipped. `visit` returns `true` to stop the walk early; the return
    /// value tells whether that happened.
    ///
    /// # Errors
    /// [`MemmapError::Unavailable`] if the map directory cannot be listed.
    pub fn for_each_range(
        &self,
        label: &str,
        mut visit: impl FnMut(u64, u64) -> bool,
    ) -> Result<bool, MemmapError> {
        let unavailable = |source| MemmapError::Unavailable {
            path: self.root.clone(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(unavailable)? {
            let entry = entry.map_err(unavailable)?;
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                entries.push(entry.path());
            }
        }
        entries.sort_by_key(|p| entry_index(p));

        let label = label.to_lowercase();
        for dir in entries {
            let Ok(kind) = fs::read_to_string(dir.join("type")) else {
                continue;
            };
            if !kind.to_lowercase().contains(&label) {
                continue;
            }

            let (Ok(start), Ok(end)) = (
                read_integer_file(dir.join("start")),
                read_integer_file(dir.join("end")),
            ) else {
                trace!("skipping memmap entry {} with unreadable bounds", dir.display());
                continue;
            };

            trace!("memmap {}: {start:#x}..={end:#x} {}", dir.display(), kind.trim());
            if visit(start, end) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Checks whether `[start, end]` lies completely inside one range
    /// marked as reserved.
    ///
    /// # Errors
    /// [`MemmapError::InvalidRange`] when `start > end`, or
    /// [`MemmapError::Unavailable`] if the map cannot be read.
    pub fn is_reserved(&self, start: u64, end: u64) -> Result<bool, MemmapError> {
        if start > end {
            return Err(MemmapError::InvalidRange { start, end });
        }

        self.for_each_range("reserved", |rstart, rend| rstart <= start && rend >= end)
    }
}

/// Numeric index of a memmap entry directory; non-numeric names sort last.
fn entry_index(path: &Path) -> (u64, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (name.parse().unwrap_or(u64::MAX), name)
}

/// Parse an unsigned integer the way firmware pseudo-files write them.
///
/// Accepts `0x`/`0o`/`0b` prefixes (either case) and plain decimal, with
/// surrounding whitespace ignored.
#[must_use]
pub fn parse_integer(text: &str) -> Option<u64> {
    let text = text.trim();
    let (digits, radix) = match text.get(..2) {
        Some("0x" | "0X") => (&text[2..], 16),
        Some("0o" | "0O") => (&text[2..], 8),
        Some("0b" | "0B") => (&text[2..], 2),
        _ => (text, 10),
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Read a file holding a single integer, see [`parse_integer`].
///
/// # Errors
/// I/O errors from reading the file, or [`io::ErrorKind::InvalidData`] if
/// its contents are not an integer.
pub fn read_integer_file(path: impl AsRef<Path>) -> io::Result<u64> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_integer(&text).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} does not hold an integer", path.as_ref().display()),
        )
    })
}
