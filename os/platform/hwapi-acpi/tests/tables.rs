mod common;

use common::{FakeFirmware, FakeMemory, rsdp_v1, rsdp_v2, rsdt, table, xsdt};
use hwapi_acpi::{AcpiConfig, AcpiError, AcpiTables, RootKind, SdtHeader};
use std::thread;

const RSDP_AT: u64 = 0x10_0000;
const RSDT_AT: u64 = 0x20_0000;
const XSDT_AT: u64 = 0x21_0000;
const FACP_AT: u64 = 0x30_0000;
const SSDT1_AT: u64 = 0x31_0000;
const SSDT2_AT: u64 = 0x32_0000;
const APIC_AT: u64 = 0x33_0000;

fn systab() -> FakeFirmware {
    FakeFirmware::with_systab("ACPI20=0x100000\n")
}

fn place(mem: &mut FakeMemory, address: u64, bytes: &[u8]) {
    // leave room for a full 36-byte RSDP read behind short structures
    mem.zeroed(address, bytes.len().max(0x40)).poke(address, bytes);
}

/// ACPI 2.0 machine: RSDT -> FACP, SSDT1; XSDT -> FACP, SSDT2, APIC.
fn acpi2_machine() -> FakeMemory {
    let mut mem = FakeMemory::new();
    place(&mut mem, RSDP_AT, &rsdp_v2(RSDT_AT as u32, XSDT_AT));
    place(&mut mem, RSDT_AT, &rsdt(&[FACP_AT as u32, SSDT1_AT as u32]));
    place(&mut mem, XSDT_AT, &xsdt(&[FACP_AT, SSDT2_AT, APIC_AT]));
    place(&mut mem, FACP_AT, &table(b"FACP", &[0xFA; 80]));
    place(&mut mem, SSDT1_AT, &table(b"SSDT", &[0x01; 10]));
    place(&mut mem, SSDT2_AT, &table(b"SSDT", &[0x02; 20]));
    place(&mut mem, APIC_AT, &table(b"APIC", &[0xAC; 44]));
    mem
}

fn devmem_only() -> AcpiConfig {
    AcpiConfig::default().with_sysfs_fast_path(false)
}

#[test]
fn rsdt_scenario_returns_whole_table() {
    let mut mem = FakeMemory::new();
    place(&mut mem, RSDP_AT, &rsdp_v1(RSDT_AT as u32));
    place(&mut mem, RSDT_AT, &rsdt(&[FACP_AT as u32]));
    let tables = AcpiTables::new(
        &mem,
        FakeFirmware::with_systab("ACPI=0x100000\n"),
        AcpiConfig::default(),
    );

    let rsdp = tables.rsdp().unwrap();
    assert_eq!(rsdp.address, RSDP_AT);
    assert_eq!(rsdp.rsdp.rsdt_address(), Some(RSDT_AT));

    let raw = tables.get_table("RSDT").unwrap();
    assert_eq!(raw.len(), 44);
    assert_eq!(raw, rsdt(&[FACP_AT as u32]));
}

#[test]
fn rsdp_by_name_returns_raw_structure() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    assert_eq!(tables.get_table("RSDP").unwrap(), rsdp_v2(RSDT_AT as u32, XSDT_AT));
}

#[test]
fn xsdt_by_name() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    assert_eq!(
        tables.get_table("XSDT").unwrap(),
        xsdt(&[FACP_AT, SSDT2_AT, APIC_AT])
    );
}

#[test]
fn resolves_table_by_signature() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    assert_eq!(tables.get_table("FACP").unwrap(), table(b"FACP", &[0xFA; 80]));
    // only referenced from the XSDT
    assert_eq!(tables.get_table("APIC").unwrap(), table(b"APIC", &[0xAC; 44]));
}

#[test]
fn missing_table_is_not_found() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    match tables.get_table("DSDT") {
        Err(AcpiError::TableNotFound(name)) => assert_eq!(name, "DSDT"),
        other => panic!("expected TableNotFound, got {other:?}"),
    }
}

#[test]
fn invalid_name_performs_no_io() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), AcpiConfig::default());

    assert!(matches!(tables.get_table(""), Err(AcpiError::InvalidName(_))));
    assert!(matches!(
        tables.get_table("FACPFACP"),
        Err(AcpiError::InvalidName(_))
    ));
    assert_eq!(mem.reads(), 0);
}

#[test]
fn entries_are_deduplicated_rsdt_first() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    let entries = tables.table_entries().unwrap();
    let listed: Vec<_> = entries
        .iter()
        .map(|e| (e.address, e.signature_str(), e.root))
        .collect();
    assert_eq!(
        listed,
        [
            (FACP_AT, "FACP".to_owned(), RootKind::Rsdt),
            (SSDT1_AT, "SSDT".to_owned(), RootKind::Rsdt),
            (SSDT2_AT, "SSDT".to_owned(), RootKind::Xsdt),
            (APIC_AT, "APIC".to_owned(), RootKind::Xsdt),
        ]
    );
}

#[test]
fn duplicate_signatures_resolve_to_first_discovered() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    assert_eq!(tables.get_table("SSDT").unwrap(), table(b"SSDT", &[0x01; 10]));
    assert_eq!(
        tables.get_tables_devmem("SSDT").unwrap(),
        [table(b"SSDT", &[0x01; 10]), table(b"SSDT", &[0x02; 20])]
    );
}

#[test]
fn broken_rsdt_does_not_hide_xsdt_tables() {
    let mut mem = acpi2_machine();
    mem.poke(RSDT_AT, b"XXXX");
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    assert!(matches!(
        tables.rsdt(),
        Err(AcpiError::InvalidSignature { structure: "RSDT", .. })
    ));
    assert_eq!(tables.get_table("SSDT").unwrap(), table(b"SSDT", &[0x02; 20]));
    // the RSDT itself is not available, and no table carries its signature
    assert!(matches!(
        tables.get_table("RSDT"),
        Err(AcpiError::TableNotFound(_))
    ));
}

#[test]
fn acpi1_machine_has_no_xsdt() {
    let mut mem = FakeMemory::new();
    place(&mut mem, RSDP_AT, &rsdp_v1(RSDT_AT as u32));
    place(&mut mem, RSDT_AT, &rsdt(&[FACP_AT as u32]));
    place(&mut mem, FACP_AT, &table(b"FACP", &[0; 8]));
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    assert!(matches!(
        tables.xsdt(),
        Err(AcpiError::MissingRoot(RootKind::Xsdt))
    ));
    assert_eq!(tables.get_table("FACP").unwrap(), table(b"FACP", &[0; 8]));
}

#[test]
fn both_roots_invalid() {
    let mut mem = acpi2_machine();
    mem.poke(RSDT_AT, b"XXXX").poke(XSDT_AT, b"YYYY");
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    match tables.get_table("FACP") {
        Err(AcpiError::BothRootsInvalid { rsdt, xsdt }) => {
            assert!(matches!(*rsdt, AcpiError::InvalidSignature { .. }));
            assert!(matches!(*xsdt, AcpiError::InvalidSignature { .. }));
        }
        other => panic!("expected BothRootsInvalid, got {other:?}"),
    }
}

#[test]
fn unmapped_length_fails_without_further_reads() {
    let mut mem = acpi2_machine();
    mem.poke(RSDT_AT + 4, &u32::MAX.to_le_bytes());
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    tables.rsdp().unwrap();
    let before = mem.reads();
    match tables.rsdt() {
        Err(AcpiError::InvalidLength { structure, length }) => {
            assert_eq!(structure, "RSDT");
            assert_eq!(length, 0xFFFF_FFFF);
        }
        other => panic!("expected InvalidLength, got {other:?}"),
    }
    // only the header was read
    assert_eq!(mem.reads(), before + 1);
}

#[test]
fn misaligned_length_is_invalid() {
    let mut mem = acpi2_machine();
    mem.poke(XSDT_AT + 4, &(36u32 + 12).to_le_bytes());
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    assert!(matches!(
        tables.xsdt(),
        Err(AcpiError::InvalidLength { length: 48, .. })
    ));
}

#[test]
fn empty_root_table_is_valid() {
    let mut mem = FakeMemory::new();
    place(&mut mem, RSDP_AT, &rsdp_v1(RSDT_AT as u32));
    place(&mut mem, RSDT_AT, &rsdt(&[]));
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    let root = tables.rsdt().unwrap();
    assert_eq!(root.header.length as usize, SdtHeader::SIZE);
    assert!(root.entries.is_empty());
    assert!(matches!(
        tables.get_table("FACP"),
        Err(AcpiError::TableNotFound(_))
    ));
}

#[test]
fn entry_count_follows_declared_length() {
    for n in 0..12_u32 {
        let rsdt_entries: Vec<u32> = (0..n).map(|i| 0x40_0000 + i * 0x1000).collect();
        let xsdt_entries: Vec<u64> = (0..u64::from(n))
            .map(|i| 0x1_0000_0000 + i * 0x1000)
            .collect();

        let mut mem = FakeMemory::new();
        place(&mut mem, RSDP_AT, &rsdp_v2(RSDT_AT as u32, XSDT_AT));
        place(&mut mem, RSDT_AT, &rsdt(&rsdt_entries));
        place(&mut mem, XSDT_AT, &xsdt(&xsdt_entries));
        let tables = AcpiTables::new(&mem, systab(), devmem_only());

        let r = tables.rsdt().unwrap();
        assert_eq!(r.entries.len(), (r.header.length as usize - 36) / 4);
        assert_eq!(
            r.entries,
            rsdt_entries.iter().map(|&e| u64::from(e)).collect::<Vec<_>>()
        );

        let x = tables.xsdt().unwrap();
        assert_eq!(x.entries.len(), (x.header.length as usize - 36) / 8);
        assert_eq!(x.entries, xsdt_entries);
    }
}

#[test]
fn root_tables_are_cached() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    let first = tables.xsdt().unwrap().clone();
    let reads = mem.reads();
    assert_eq!(tables.xsdt().unwrap(), &first);
    tables.rsdp().unwrap();
    assert_eq!(mem.reads(), reads);
}

#[test]
fn implausible_table_length_is_rejected() {
    let mut mem = acpi2_machine();
    mem.poke(APIC_AT + 4, &8u32.to_le_bytes());
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    assert!(matches!(
        tables.get_table("APIC"),
        Err(AcpiError::InvalidLength { length: 8, .. })
    ));
}

#[test]
fn sysfs_fast_path_skips_physical_memory() {
    let mem = acpi2_machine();
    let mut fw = systab();
    fw.sysfs.insert("DSDT".into(), vec![1, 2, 3]);
    let tables = AcpiTables::new(&mem, fw, AcpiConfig::default());

    assert_eq!(tables.get_table("DSDT").unwrap(), [1, 2, 3]);
    assert_eq!(tables.get_table_sysfs("DSDT").unwrap(), [1, 2, 3]);
    assert_eq!(mem.reads(), 0);

    // not exported: falls back to physical memory
    assert_eq!(tables.get_table("FACP").unwrap(), table(b"FACP", &[0xFA; 80]));
    assert!(mem.reads() > 0);
}

#[test]
fn sysfs_fast_path_can_be_disabled() {
    let mem = acpi2_machine();
    let mut fw = systab();
    fw.sysfs.insert("FACP".into(), vec![0xEE]);
    let tables = AcpiTables::new(&mem, fw, devmem_only());

    assert_eq!(tables.get_table("FACP").unwrap(), table(b"FACP", &[0xFA; 80]));
}

#[test]
fn missing_sysfs_table_surfaces_io_error() {
    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), AcpiConfig::default());

    assert!(matches!(
        tables.get_table_sysfs("FACP"),
        Err(AcpiError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound
    ));
}

#[test]
fn concurrent_callers_share_one_discovery() {
    let baseline = {
        let mem = acpi2_machine();
        let tables = AcpiTables::new(&mem, systab(), devmem_only());
        tables.rsdt().unwrap();
        tables.xsdt().unwrap();
        mem.reads()
    };

    let mem = acpi2_machine();
    let tables = AcpiTables::new(&mem, systab(), devmem_only());

    thread::scope(|s| {
        let mut handles = Vec::new();
        for _ in 0..8 {
            handles.push(s.spawn(|| {
                tables.rsdt().unwrap();
                tables.xsdt().unwrap().address
            }));
        }

        for h in handles {
            assert_eq!(h.join().unwrap(), XSDT_AT);
        }
    });
    assert_eq!(mem.reads(), baseline);
}
