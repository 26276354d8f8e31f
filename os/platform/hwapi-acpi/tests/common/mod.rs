#![allow(dead_code)]

use hwapi_acpi::{Firmware, MemmapError, PhysRead, sum};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Sparse physical memory. A read must fall entirely inside one region.
#[derive(Default)]
pub struct FakeMemory {
    regions: BTreeMap<u64, Vec<u8>>,
    reads: AtomicUsize,
}

impl FakeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `len` zero bytes at `start`.
    pub fn zeroed(&mut self, start: u64, len: usize) -> &mut Self {
        self.regions.insert(start, vec![0; len]);
        self
    }

    /// Write `bytes` at `address`, into an existing region if one covers it.
    pub fn poke(&mut self, address: u64, bytes: &[u8]) -> &mut Self {
        if let Some((&start, region)) = self.regions.range_mut(..=address).next_back() {
            let offset = (address - start) as usize;
            if offset + bytes.len() <= region.len() {
                region[offset..offset + bytes.len()].copy_from_slice(bytes);
                return self;
            }
        }
        self.regions.insert(address, bytes.to_vec());
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl PhysRead for FakeMemory {
    fn read_phys(&self, address: u64, buf: &mut [u8]) -> io::Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let len = buf.len();
        let unmapped = || {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{address:#x}+{len} is not mapped"),
            )
        };
        let (&start, region) = self
            .regions
            .range(..=address)
            .next_back()
            .ok_or_else(unmapped)?;
        let offset = (address - start) as usize;
        let src = region
            .get(offset..offset + len)
            .ok_or_else(unmapped)?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFirmware {
    pub systab: Option<String>,
    pub sysfs: HashMap<String, Vec<u8>>,
    /// `(type, start, end)`, `end` inclusive.
    pub ranges: Vec<(String, u64, u64)>,
}

impl FakeFirmware {
    pub fn with_systab(text: &str) -> Self {
        Self {
            systab: Some(text.to_owned()),
            ..Self::default()
        }
    }
}

impl Firmware for FakeFirmware {
    fn systab(&self) -> io::Result<String> {
        self.systab
            .clone()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn sysfs_table(&self, name: &str) -> io::Result<Vec<u8>> {
        self.sysfs
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn for_each_reserved_range(
        &self,
        label: &str,
        visit: &mut dyn FnMut(u64, u64) -> bool,
    ) -> Result<bool, MemmapError> {
        let label = label.to_lowercase();
        for (kind, start, end) in &self.ranges {
            if kind.to_lowercase().contains(&label) && visit(*start, *end) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn fix_checksum(bytes: &mut [u8], at: usize) {
    bytes[at] = 0;
    bytes[at] = 0u8.wrapping_sub(sum(bytes));
}

/// ACPI 1.0 RSDP, 20 bytes.
pub fn rsdp_v1(rsdt: u32) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(b"RSD PTR ");
    b.push(0);
    b.extend_from_slice(b"TESTOE");
    b.push(0);
    b.extend_from_slice(&rsdt.to_le_bytes());
    fix_checksum(&mut b, 8);
    b
}

/// ACPI 2.0 RSDP, 36 bytes.
pub fn rsdp_v2(rsdt: u32, xsdt: u64) -> Vec<u8> {
    let mut b = rsdp_v1(rsdt);
    b[15] = 2;
    fix_checksum(&mut b, 8);
    b.extend_from_slice(&36u32.to_le_bytes());
    b.extend_from_slice(&xsdt.to_le_bytes());
    b.extend_from_slice(&[0; 4]);
    fix_checksum(&mut b, 32);
    b
}

/// A table with a valid header around `payload`.
pub fn table(signature: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let length = u32::try_from(36 + payload.len()).unwrap();
    let mut b = Vec::new();
    b.extend_from_slice(signature);
    b.extend_from_slice(&length.to_le_bytes());
    b.push(1);
    b.push(0);
    b.extend_from_slice(b"TESTOE");
    b.extend_from_slice(b"TESTTBL ");
    b.extend_from_slice(&1u32.to_le_bytes());
    b.extend_from_slice(b"TEST");
    b.extend_from_slice(&1u32.to_le_bytes());
    b.extend_from_slice(payload);
    fix_checksum(&mut b, 9);
    b
}

pub fn rsdt(entries: &[u32]) -> Vec<u8> {
    let payload: Vec<u8> = entries.iter().flat_map(|e| e.to_le_bytes()).collect();
    table(b"RSDT", &payload)
}

pub fn xsdt(entries: &[u64]) -> Vec<u8> {
    let payload: Vec<u8> = entries.iter().flat_map(|e| e.to_le_bytes()).collect();
    table(b"XSDT", &payload)
}
