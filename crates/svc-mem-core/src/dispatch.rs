//! Command handlers and request routing.
//!
//! Each handler owns one request for the duration of the call, records the
//! requested length in `actual` before touching the bus, and completes the
//! request with the first error hit.

use tracing::{debug, warn};

use crate::accessor::{copy, copy_resilient, Transfer};
use crate::bank::resolve_base;
use crate::bus::{BusFault, Platform};
use crate::memory::{
    resolve_region, validate_caller_access, validate_region_access, validate_writable,
};
use crate::request::{Command, IoInfo, IoRequest};
use crate::{Access, Direction, DriverError, RegionTable, Unit};

/// Signature shared by every command handler.
pub type CommandHandler<P> = fn(&mut P, &RegionTable, &mut IoRequest);

/// Number of registered command handlers.
pub const COMMAND_TABLE_LEN: usize = 3;

/// Returns the handler table indexed by raw command value.
#[must_use]
pub fn command_table<P: Platform + ?Sized>() -> [CommandHandler<P>; COMMAND_TABLE_LEN] {
    [cmd_write::<P>, cmd_read::<P>, cmd_status::<P>]
}

/// Routes `request` to the handler for its raw command.
///
/// Unknown commands complete with [`DriverError::BadCommand`] and
/// `actual == 0`.
pub fn dispatch<P: Platform + ?Sized>(
    platform: &mut P,
    table: &RegionTable,
    request: &mut IoRequest,
) {
    match Command::from_raw(request.info.command) {
        Some(Command::Write) => cmd_write(platform, table, request),
        Some(Command::Read) => cmd_read(platform, table, request),
        Some(Command::Status) => cmd_status(platform, table, request),
        None => {
            debug!(command = request.info.command, "unknown command");
            request.actual = 0;
            request.complete(Err(DriverError::BadCommand));
        }
    }
}

/// Copies the send buffer into the request's unit.
///
/// The destination is the region base plus `offset` elements, or the receive
/// buffer address for [`Unit::NoUnit`].
pub fn cmd_write<P: Platform + ?Sized>(
    platform: &mut P,
    table: &RegionTable,
    request: &mut IoRequest,
) {
    let info = request.info;
    request.actual = info.send.len;
    log_request("write", &info);

    let outcome = match Unit::from_raw(info.unit) {
        Some(unit) => write_unit(platform, table, unit, &info),
        None => {
            request.actual = 0;
            Err(DriverError::BadUnit)
        }
    };
    finish(request, outcome);
}

/// Copies from the request's unit into the receive buffer.
///
/// The source is the region base plus `offset` elements, or the send buffer
/// address for [`Unit::NoUnit`]. Fault-prone regions are read element by
/// element with abort recovery.
pub fn cmd_read<P: Platform + ?Sized>(
    platform: &mut P,
    table: &RegionTable,
    request: &mut IoRequest,
) {
    let info = request.info;
    request.actual = info.recv.len;
    log_request("read", &info);

    let outcome = match Unit::from_raw(info.unit) {
        Some(unit) => read_unit(platform, table, unit, &info),
        None => {
            request.actual = 0;
            Err(DriverError::BadUnit)
        }
    };
    finish(request, outcome);
}

/// Status query: always succeeds with nothing transferred.
pub fn cmd_status<P: Platform + ?Sized>(
    _platform: &mut P,
    _table: &RegionTable,
    request: &mut IoRequest,
) {
    debug!(unit = request.info.unit, "status");
    request.actual = 0;
    request.complete(Ok(()));
}

fn write_unit<P: Platform + ?Sized>(
    platform: &mut P,
    table: &RegionTable,
    unit: Unit,
    info: &IoInfo,
) -> Result<(), DriverError> {
    let mut access = Access {
        direction: Direction::Write,
        width: info.width(),
        offset: info.offset,
        len: info.send.len,
        src: info.send.addr,
        dst: info.recv.addr,
    };
    if unit == Unit::NoUnit {
        let transfer = validate_caller_access(&access)?;
        return raw_copy(platform, &transfer);
    }

    let region = resolve_region(table, unit)?;
    validate_writable(region, Direction::Write)?;
    access.dst = Some(resolve_base(platform, region)?);
    let transfer = validate_region_access(region, &access)?;
    raw_copy(platform, &transfer)
}

fn read_unit<P: Platform + ?Sized>(
    platform: &mut P,
    table: &RegionTable,
    unit: Unit,
    info: &IoInfo,
) -> Result<(), DriverError> {
    let mut access = Access {
        direction: Direction::Read,
        width: info.width(),
        offset: info.offset,
        len: info.recv.len,
        src: info.send.addr,
        dst: info.recv.addr,
    };
    if unit == Unit::NoUnit {
        let transfer = validate_caller_access(&access)?;
        return raw_copy(platform, &transfer);
    }

    let region = resolve_region(table, unit)?;
    access.src = Some(resolve_base(platform, region)?);
    let transfer = validate_region_access(region, &access)?;
    if !region.fault_prone {
        return raw_copy(platform, &transfer);
    }

    let outcome = copy_resilient(platform, &transfer, region.lanes).map_err(unrecovered)?;
    if outcome.aborts > 0 {
        debug!(
            unit = unit.name(),
            aborts = outcome.aborts,
            "read completed with skipped elements"
        );
    }
    Ok(())
}

fn raw_copy<P: Platform + ?Sized>(
    platform: &mut P,
    transfer: &Transfer,
) -> Result<(), DriverError> {
    copy(platform, transfer)
        .map(|_count| ())
        .map_err(unrecovered)
}

fn unrecovered(fault: BusFault) -> DriverError {
    warn!(addr = %fault.address(), %fault, "bus fault escaped the transfer");
    DriverError::Aborted
}

fn log_request(command: &str, info: &IoInfo) {
    debug!(
        command,
        unit = info.unit,
        offset = info.offset,
        send_len = info.send.len,
        recv_len = info.recv.len,
        width = ?info.width(),
        "request"
    );
}

fn finish(request: &mut IoRequest, outcome: Result<(), DriverError>) {
    if let Err(error) = outcome {
        debug!(%error, code = error.code(), "request rejected");
    }
    request.complete(outcome);
}

#[cfg(test)]
mod tests {
    use super::{cmd_read, cmd_status, cmd_write, command_table, dispatch, COMMAND_TABLE_LEN};
    use crate::bus::RomBank;
    use crate::request::{Command, IoBuffer, IoInfo, IoRequest, CMD_STATUS};
    use crate::sim::{SimulatedPlatform, SCRATCH_START};
    use crate::{
        Address, DriverError, Unit, Width, DEFAULT_REGION_TABLE, RAM_START, ROM1_START,
        VIDEO_RAM_START,
    };

    fn run(sim: &mut SimulatedPlatform, info: IoInfo) -> IoRequest {
        let mut request = IoRequest::new(info);
        dispatch(sim, &DEFAULT_REGION_TABLE, &mut request);
        request
    }

    #[test]
    fn table_order_matches_raw_command_values() {
        let table = command_table::<SimulatedPlatform>();
        assert_eq!(table.len(), COMMAND_TABLE_LEN);

        let mut sim = SimulatedPlatform::stock();
        let mut request = IoRequest::new(IoInfo::new(Command::Read, Unit::Ram));
        request.actual = 99;
        table[usize::from(CMD_STATUS)](&mut sim, &DEFAULT_REGION_TABLE, &mut request);
        assert_eq!(request.actual, 0);
        assert_eq!(request.error, None);
    }

    #[test]
    fn status_is_a_successful_no_op() {
        let mut sim = SimulatedPlatform::stock();
        let mut request = IoRequest::new(IoInfo::new(Command::Status, Unit::RomBank2));
        cmd_status(&mut sim, &DEFAULT_REGION_TABLE, &mut request);
        assert_eq!(request.result(), Ok(0));
        assert!(sim.bank_selects().is_empty());
    }

    #[test]
    fn unknown_command_is_rejected() {
        let mut sim = SimulatedPlatform::stock();
        let info = IoInfo {
            command: 9,
            ..IoInfo::new(Command::Read, Unit::Ram)
        };
        let request = run(&mut sim, info);
        assert_eq!(request.error, Some(DriverError::BadCommand));
        assert_eq!(request.actual, 0);
    }

    #[test]
    fn raw_unit_out_of_range_is_bad_unit_with_zero_actual() {
        let mut sim = SimulatedPlatform::stock();
        let info = IoInfo {
            unit: 9,
            ..IoInfo::new(Command::Write, Unit::Ram).with_send(IoBuffer::new(SCRATCH_START, 4))
        };
        let mut request = IoRequest::new(info);
        cmd_write(&mut sim, &DEFAULT_REGION_TABLE, &mut request);
        assert_eq!(request.error, Some(DriverError::BadUnit));
        assert_eq!(request.actual, 0);
    }

    #[test]
    fn ram_write_lands_at_offset() {
        let mut sim = SimulatedPlatform::stock();
        sim.load(SCRATCH_START, &[1, 2, 3, 4]);
        let info = IoInfo::new(Command::Write, Unit::Ram)
            .with_offset(8)
            .with_send(IoBuffer::new(SCRATCH_START, 4));

        let request = run(&mut sim, info);
        assert_eq!(request.result(), Ok(4));
        assert_eq!(sim.peek_bytes(RAM_START.wrapping_add(8), 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn rom_read_goes_through_recovery_and_selects_bank() {
        let mut sim = SimulatedPlatform::stock();
        sim.install_rom(RomBank::Bank1, &[0x5A; 8]);
        sim.inject_abort(ROM1_START.wrapping_add(1));
        sim.load(SCRATCH_START, &[0xFF; 4]);

        let info = IoInfo::new(Command::Read, Unit::RomBank1)
            .with_recv(IoBuffer::new(SCRATCH_START, 4));
        let mut request = IoRequest::new(info);
        cmd_read(&mut sim, &DEFAULT_REGION_TABLE, &mut request);

        assert_eq!(request.result(), Ok(4));
        assert_eq!(sim.peek_bytes(SCRATCH_START, 4), vec![0x5A, 0xFF, 0x5A, 0x5A]);
        assert_eq!(sim.bank_selects(), &[RomBank::Bank1]);
        assert!(sim.unhandled_aborts().is_empty());
    }

    #[test]
    fn unhandled_fault_on_raw_path_surfaces_as_aborted() {
        let mut sim = SimulatedPlatform::stock();
        sim.inject_abort(VIDEO_RAM_START.wrapping_add(4));
        let info = IoInfo::new(Command::Read, Unit::VideoRam)
            .with_width(Width::Word)
            .with_recv(IoBuffer::new(SCRATCH_START, 4));

        let request = run(&mut sim, info);
        assert_eq!(request.error, Some(DriverError::Aborted));
        assert_eq!(request.actual, 4);
    }

    #[test]
    fn caller_supplied_read_copies_between_buffers() {
        let mut sim = SimulatedPlatform::stock();
        sim.load(RAM_START.wrapping_add(0x40), &[9, 8, 7, 6, 5, 4, 3, 2]);
        let info = IoInfo::new(Command::Read, Unit::NoUnit)
            .with_width(Width::Word)
            .with_offset(1)
            .with_send(IoBuffer::new(RAM_START.wrapping_add(0x40), 0))
            .with_recv(IoBuffer::new(SCRATCH_START, 1));

        let request = run(&mut sim, info);
        assert_eq!(request.result(), Ok(1));
        assert_eq!(sim.peek_bytes(SCRATCH_START, 4), vec![5, 4, 3, 2]);
    }

    #[test]
    fn caller_supplied_access_needs_both_buffers() {
        let mut sim = SimulatedPlatform::stock();
        let info = IoInfo::new(Command::Write, Unit::NoUnit)
            .with_send(IoBuffer::new(SCRATCH_START, 4));
        let request = run(&mut sim, info);
        assert_eq!(request.error, Some(DriverError::BadPointer));
        assert_eq!(sim.abort_count(), 0);
    }

    #[test]
    fn bank_failure_precedes_bounds_checks() {
        let mut sim = SimulatedPlatform::stock();
        sim.fail_rom2_query(true);
        let info = IoInfo::new(Command::Read, Unit::RomBank2)
            .with_offset(-1)
            .with_recv(IoBuffer::new(Address(0x0000_0003), 4));
        let request = run(&mut sim, info);
        assert_eq!(request.error, Some(DriverError::BankSelectFailed));
        assert_eq!(sim.abort_count(), 0);
    }
}
