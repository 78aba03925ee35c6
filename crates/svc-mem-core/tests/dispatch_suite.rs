//! Request dispatch suite: validation order, routing, and end-to-end scenarios.

#![allow(clippy::pedantic, clippy::nursery, clippy::too_many_lines)]

use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use svc_mem_core::{
    dispatch, Address, Command, Device, DriverConfig, DriverError, IoBuffer, IoInfo, IoRequest,
    Region, RegionBase, RomBank, SimulatedPlatform, SvcMemDriver, Unit, Width, CONFIG_RAM_SIZE,
    CONTROLLER_A_SIZE, CONTROLLER_A_START, CONTROLLER_B_SIZE, CONTROLLER_B_START,
    CONTROLLER_C_SIZE, CONTROLLER_C_START, DEFAULT_REGION_TABLE, RAM_SIZE, RAM_START, ROM1_SIZE,
    ROM2_SIZE, SCRATCH_START, VIDEO_RAM_SIZE, VIDEO_RAM_START,
};
use thiserror as _;
use tracing as _;

fn driver() -> SvcMemDriver<SimulatedPlatform> {
    let mut sim = SimulatedPlatform::stock();
    sim.install_rom(RomBank::Bank1, &[0x11; 4096]);
    sim.install_rom(RomBank::Bank2, &[0x22; 4096]);
    SvcMemDriver::new(sim)
}

fn read(unit: Unit, width: Width, offset: i32, dst: Address, len: i32) -> IoInfo {
    IoInfo::new(Command::Read, unit)
        .with_width(width)
        .with_offset(offset)
        .with_recv(IoBuffer::new(dst, len))
}

fn write(unit: Unit, width: Width, offset: i32, src: Address, len: i32) -> IoInfo {
    IoInfo::new(Command::Write, unit)
        .with_width(width)
        .with_offset(offset)
        .with_send(IoBuffer::new(src, len))
}

#[test]
fn ram_scenario_sixteen_bytes_round_trip() {
    let mut driver = driver();
    let pattern: Vec<u8> = (0x00..0x10).collect();
    driver.platform_mut().load(SCRATCH_START, &pattern);

    let written = driver.do_io(write(Unit::Ram, Width::Byte, 0, SCRATCH_START, 16));
    assert_eq!(written.error_code(), 0);
    assert_eq!(written.actual, 16);

    let dst = SCRATCH_START.wrapping_add(0x1000);
    let readback = driver.do_io(read(Unit::Ram, Width::Byte, 0, dst, 16));
    assert_eq!(readback.error_code(), 0);
    assert_eq!(readback.actual, 16);
    assert_eq!(driver.platform().peek_bytes(dst, 16), pattern);
}

#[test]
fn rom2_scenario_read_past_the_end_is_bad_pointer() {
    let mut driver = driver();
    let len = i32::try_from(ROM2_SIZE).unwrap() + 1;
    let info = read(Unit::RomBank2, Width::Byte, 0, SCRATCH_START, len);
    let request = driver.do_io(info);
    assert_eq!(request.error, Some(DriverError::BadPointer));
    assert_eq!(driver.platform().abort_count(), 0);
}

#[test]
fn register_scenario_misaligned_word_write_is_bad_pointer() {
    let mut driver = driver();
    let info = write(
        Unit::ControllerB,
        Width::Word,
        0,
        SCRATCH_START.wrapping_add(1),
        1,
    );
    let request = driver.do_io(info);
    assert_eq!(request.error, Some(DriverError::BadPointer));
    assert_eq!(driver.platform().peek32(CONTROLLER_B_START), 0);
}

#[rstest]
#[case::ram(Unit::Ram, Width::Byte, RAM_SIZE)]
#[case::ram_words(Unit::Ram, Width::Word, RAM_SIZE)]
#[case::video_ram(Unit::VideoRam, Width::Byte, VIDEO_RAM_SIZE)]
#[case::rom1(Unit::RomBank1, Width::Byte, ROM1_SIZE)]
#[case::rom2(Unit::RomBank2, Width::Word, ROM2_SIZE)]
#[case::config_ram(Unit::ConfigRam, Width::Byte, CONFIG_RAM_SIZE)]
#[case::controller_a(Unit::ControllerA, Width::Word, CONTROLLER_A_SIZE)]
#[case::controller_b(Unit::ControllerB, Width::Word, CONTROLLER_B_SIZE)]
#[case::controller_c(Unit::ControllerC, Width::Word, CONTROLLER_C_SIZE)]
fn read_ending_one_element_past_the_region_is_rejected(
    #[case] unit: Unit,
    #[case] width: Width,
    #[case] size_bytes: u32,
) {
    let elements = i32::try_from(size_bytes / width.bytes()).unwrap();
    let mut driver = driver();

    let at_end = driver.do_io(read(unit, width, elements - 1, SCRATCH_START, 1));
    assert_eq!(at_end.error, None, "last element is readable");

    let aborts_before = driver.platform().abort_count();
    let past_end = driver.do_io(read(unit, width, elements, SCRATCH_START, 1));
    assert_eq!(past_end.error, Some(DriverError::BadPointer));
    assert_eq!(past_end.actual, 1);
    assert_eq!(driver.platform().abort_count(), aborts_before);
}

#[rstest]
#[case::ram(Unit::Ram, Width::Byte, RAM_START, RAM_SIZE)]
#[case::ram_words(Unit::Ram, Width::Word, RAM_START, RAM_SIZE)]
#[case::video_ram(Unit::VideoRam, Width::Byte, VIDEO_RAM_START, VIDEO_RAM_SIZE)]
#[case::controller_a(Unit::ControllerA, Width::Word, CONTROLLER_A_START, CONTROLLER_A_SIZE)]
#[case::controller_b(Unit::ControllerB, Width::Word, CONTROLLER_B_START, CONTROLLER_B_SIZE)]
#[case::controller_c(Unit::ControllerC, Width::Word, CONTROLLER_C_START, CONTROLLER_C_SIZE)]
fn write_running_past_the_region_leaves_it_untouched(
    #[case] unit: Unit,
    #[case] width: Width,
    #[case] base: Address,
    #[case] size_bytes: u32,
) {
    let elements = i32::try_from(size_bytes / width.bytes()).unwrap();
    let mut driver = driver();
    driver.platform_mut().load(SCRATCH_START, &[0x5A; 16]);
    let tail = base.wrapping_add(size_bytes - 8);
    let before = driver.platform().peek_bytes(tail, 8);

    let request = driver.do_io(write(unit, width, elements - 2, SCRATCH_START, 4));
    assert_eq!(request.error, Some(DriverError::BadPointer));
    assert_eq!(request.actual, 4);
    assert_eq!(driver.platform().peek_bytes(tail, 8), before);
    assert_eq!(driver.platform().abort_count(), 0);
}

#[test]
fn config_ram_span_is_checked_in_word_slots() {
    let high = Address(0xFFFF_0000);
    let nvram = Region {
        base: RegionBase::Fixed(high),
        size_bytes: 0x8000,
        ..*DEFAULT_REGION_TABLE.lookup(Unit::ConfigRam).unwrap()
    };
    let config = DriverConfig {
        regions: DEFAULT_REGION_TABLE.with_region(nvram),
        ..DriverConfig::default()
    };
    let mut sim = SimulatedPlatform::stock();
    sim.load(SCRATCH_START, &[0xEE; 4]);
    let mut driver = SvcMemDriver::with_config(sim, config);

    let request = driver.do_io(read(Unit::ConfigRam, Width::Byte, 0x4000, SCRATCH_START, 4));
    assert_eq!(request.error, Some(DriverError::BadPointer));
    assert_eq!(request.actual, 4);
    assert_eq!(driver.platform().abort_count(), 0);
    assert!(driver.platform().caught_aborts().is_empty());
    assert_eq!(driver.platform().peek_bytes(SCRATCH_START, 4), vec![0xEE; 4]);
}

#[rstest]
#[case::controller_a(Unit::ControllerA)]
#[case::controller_b(Unit::ControllerB)]
#[case::controller_c(Unit::ControllerC)]
fn register_blocks_reject_byte_width(#[case] unit: Unit) {
    let mut driver = driver();
    let request = driver.do_io(read(unit, Width::Byte, 0, SCRATCH_START, 4));
    assert_eq!(request.error, Some(DriverError::BadSize));

    let request = driver.do_io(write(unit, Width::Byte, 0, SCRATCH_START, 4));
    assert_eq!(request.error, Some(DriverError::BadSize));
}

#[rstest]
#[case::controller_a(Unit::ControllerA, 1)]
#[case::controller_b(Unit::ControllerB, 2)]
#[case::controller_c(Unit::ControllerC, 3)]
fn register_blocks_reject_misaligned_word_pointers(#[case] unit: Unit, #[case] skew: u32) {
    let mut driver = driver();
    let dst = SCRATCH_START.wrapping_add(skew);
    let request = driver.do_io(read(unit, Width::Word, 0, dst, 1));
    assert_eq!(request.error, Some(DriverError::BadPointer));
}

#[rstest]
#[case::rom1(Unit::RomBank1, Width::Byte)]
#[case::rom2(Unit::RomBank2, Width::Word)]
#[case::config_ram(Unit::ConfigRam, Width::Byte)]
fn writes_to_read_only_units_are_unsupported_regardless_of_parameters(
    #[case] unit: Unit,
    #[case] width: Width,
) {
    let mut driver = driver();
    for (offset, len, src) in [
        (0, 1, Some(SCRATCH_START)),
        (-5, -1, None),
        (i32::MAX, i32::MAX, Some(Address(0x0000_0003))),
    ] {
        let info = IoInfo::new(Command::Write, unit)
            .with_width(width)
            .with_offset(offset)
            .with_send(IoBuffer { addr: src, len });
        let request = driver.do_io(info);
        assert_eq!(request.error, Some(DriverError::Unsupported));
        assert_eq!(request.actual, len);
    }
    assert!(driver.platform().bank_selects().is_empty());
}

#[test]
fn config_ram_rejects_word_width() {
    let mut driver = driver();
    let request = driver.do_io(read(Unit::ConfigRam, Width::Word, 0, SCRATCH_START, 1));
    assert_eq!(request.error, Some(DriverError::BadSize));
}

#[test]
fn config_ram_read_unpacks_the_low_lane() {
    let mut driver = driver();
    driver
        .platform_mut()
        .load_config_ram(&[0xC0, 0xFF, 0xEE, 0x42]);

    let request = driver.do_io(read(Unit::ConfigRam, Width::Byte, 1, SCRATCH_START, 3));
    assert_eq!(request.result(), Ok(3));
    assert_eq!(
        driver.platform().peek_bytes(SCRATCH_START, 3),
        vec![0xFF, 0xEE, 0x42]
    );
}

#[test]
fn rom_reads_switch_banks_per_request() {
    let mut driver = driver();

    let rom2 = driver.do_io(read(Unit::RomBank2, Width::Byte, 0, SCRATCH_START, 2));
    assert_eq!(rom2.result(), Ok(2));
    assert_eq!(driver.platform().peek_bytes(SCRATCH_START, 2), vec![0x22; 2]);

    let rom1 = driver.do_io(read(Unit::RomBank1, Width::Byte, 0, SCRATCH_START, 2));
    assert_eq!(rom1.result(), Ok(2));
    assert_eq!(driver.platform().peek_bytes(SCRATCH_START, 2), vec![0x11; 2]);

    assert_eq!(
        driver.platform().bank_selects(),
        &[RomBank::Bank2, RomBank::Bank1]
    );
}

#[test]
fn bank_select_failure_aborts_the_request_before_any_access() {
    let mut driver = driver();
    driver.platform_mut().fail_bank_select(true);
    driver.platform_mut().load(SCRATCH_START, &[0xAB; 4]);

    let request = driver.do_io(read(Unit::RomBank1, Width::Byte, 0, SCRATCH_START, 4));
    assert_eq!(request.error, Some(DriverError::BankSelectFailed));
    assert_eq!(request.actual, 4);
    assert_eq!(driver.platform().peek_bytes(SCRATCH_START, 4), vec![0xAB; 4]);
}

#[test]
fn unknown_unit_from_a_trimmed_table() {
    let mut sim = SimulatedPlatform::stock();
    let table = DEFAULT_REGION_TABLE.without(Unit::ControllerC);
    let mut request = IoRequest::new(read(Unit::ControllerC, Width::Word, 0, SCRATCH_START, 1));
    dispatch(&mut sim, &table, &mut request);
    assert_eq!(request.error, Some(DriverError::UnknownUnit));
}

#[rstest]
#[case::negative_offset(-1, 4)]
#[case::negative_length(0, -4)]
fn negative_fields_are_bad_pointer(#[case] offset: i32, #[case] len: i32) {
    let mut driver = driver();
    let request = driver.do_io(read(Unit::VideoRam, Width::Byte, offset, SCRATCH_START, len));
    assert_eq!(request.error, Some(DriverError::BadPointer));
}

#[test]
fn missing_destination_is_bad_pointer() {
    let mut driver = driver();
    let info = IoInfo::new(Command::Read, Unit::Ram).with_recv(IoBuffer { addr: None, len: 4 });
    let request = driver.do_io(info);
    assert_eq!(request.error, Some(DriverError::BadPointer));
    assert_eq!(request.actual, 4);
}

#[test]
fn zero_length_request_succeeds_without_bus_traffic() {
    let mut driver = driver();
    let request = driver.do_io(read(Unit::Ram, Width::Word, 0, SCRATCH_START, 0));
    assert_eq!(request.result(), Ok(0));
    assert_eq!(driver.platform().abort_count(), 0);
}

#[test]
fn status_on_any_unit_succeeds() {
    let mut driver = driver();
    for unit in Unit::REGION_UNITS {
        let request = driver.do_io(IoInfo::new(Command::Status, unit));
        assert_eq!(request.result(), Ok(0));
    }
}

#[test]
fn word_write_then_read_on_controller_c() {
    let mut driver = driver();
    driver.platform_mut().poke32(SCRATCH_START, 0x1234_5678);
    driver
        .platform_mut()
        .poke32(SCRATCH_START.wrapping_add(4), 0x9ABC_DEF0);

    let written = driver.do_io(write(Unit::ControllerC, Width::Word, 10, SCRATCH_START, 2));
    assert_eq!(written.result(), Ok(2));

    let dst = SCRATCH_START.wrapping_add(0x100);
    let readback = driver.do_io(read(Unit::ControllerC, Width::Word, 10, dst, 2));
    assert_eq!(readback.result(), Ok(2));
    assert_eq!(driver.platform().peek32(dst), 0x1234_5678);
    assert_eq!(driver.platform().peek32(dst.wrapping_add(4)), 0x9ABC_DEF0);
}
