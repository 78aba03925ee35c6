//! Request validation policy for region and caller-supplied accesses.
//!
//! Every check is pure and runs before any bus traffic, so a rejected request
//! never performs a partial copy. Checks run in one canonical order for every
//! unit:
//!
//! 1. the unit has a region entry ([`DriverError::UnknownUnit`]),
//! 2. writes target a writable region ([`DriverError::Unsupported`]),
//! 3. bank selection and base resolution ([`DriverError::BankSelectFailed`],
//!    performed by the dispatcher between steps 2 and 4),
//! 4. the element width is accepted ([`DriverError::BadSize`]),
//! 5. buffers are present and offset/length are non-negative,
//! 6. word transfers use word-aligned source and destination,
//! 7. the transfer fits inside the region and, spread over the region's
//!    byte lanes, inside the bus
//!    ([`DriverError::BadPointer`] for 5 through 7).

use crate::accessor::Transfer;
use crate::{Address, ByteLanes, DriverError, Region, RegionTable, Unit, Width, WidthPolicy};

/// Bus address space size in bytes.
const BUS_BYTES: u64 = 1 << 32;

/// Transfer direction relative to the target region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Region (or caller source) into the caller's destination buffer.
    Read,
    /// Caller's source buffer into the region (or caller destination).
    Write,
}

/// One access as described by a request, before validation.
///
/// `offset` indexes the source for reads and the destination for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Access {
    /// Transfer direction.
    pub direction: Direction,
    /// Element width.
    pub width: Width,
    /// Element offset into the region side of the transfer.
    pub offset: i32,
    /// Number of elements.
    pub len: i32,
    /// Source base address.
    pub src: Option<Address>,
    /// Destination base address.
    pub dst: Option<Address>,
}

/// Looks up the region entry for `unit`.
///
/// # Errors
///
/// Returns [`DriverError::UnknownUnit`] when `table` has no entry for `unit`.
pub const fn resolve_region(table: &RegionTable, unit: Unit) -> Result<&Region, DriverError> {
    match table.lookup(unit) {
        Some(region) => Ok(region),
        None => Err(DriverError::UnknownUnit),
    }
}

/// Rejects writes to regions without a write path.
///
/// # Errors
///
/// Returns [`DriverError::Unsupported`] for any write to a non-writable region.
pub const fn validate_writable(region: &Region, direction: Direction) -> Result<(), DriverError> {
    match direction {
        Direction::Write if !region.writable => Err(DriverError::Unsupported),
        Direction::Read | Direction::Write => Ok(()),
    }
}

/// Validates that `width` is accepted by `policy`.
///
/// # Errors
///
/// Returns [`DriverError::BadSize`] when the region does not accept `width`.
pub const fn validate_width(policy: WidthPolicy, width: Width) -> Result<(), DriverError> {
    if policy.permits(width) {
        Ok(())
    } else {
        Err(DriverError::BadSize)
    }
}

/// Validates source/destination alignment for word transfers.
///
/// # Errors
///
/// Returns [`DriverError::BadPointer`] when a word transfer has either
/// address off a 4-byte boundary.
pub const fn validate_alignment(width: Width, src: Address, dst: Address) -> Result<(), DriverError> {
    match width {
        Width::Word if !Address(src.0 | dst.0).is_word_aligned() => Err(DriverError::BadPointer),
        Width::Byte | Width::Word => Ok(()),
    }
}

/// Validates that `offset + len` elements of `width` fit in `size_bytes`.
///
/// # Errors
///
/// Returns [`DriverError::BadPointer`] for negative offsets or lengths and for
/// transfers that run past the end of the region.
pub fn validate_bounds(
    size_bytes: u32,
    width: Width,
    offset: i32,
    len: i32,
) -> Result<(), DriverError> {
    let (Ok(offset), Ok(len)) = (u64::try_from(offset), u64::try_from(len)) else {
        return Err(DriverError::BadPointer);
    };
    let elem = u64::from(width.bytes());
    if (offset + len) * elem > u64::from(size_bytes) {
        Err(DriverError::BadPointer)
    } else {
        Ok(())
    }
}

/// Validates an access against a region whose base has been resolved.
///
/// The region side of `access` (`src` for reads, `dst` for writes) must
/// already hold the resolved base address.
///
/// # Errors
///
/// Returns the first failing check in canonical order: `Unsupported`,
/// `BadSize`, then `BadPointer`.
pub fn validate_region_access(region: &Region, access: &Access) -> Result<Transfer, DriverError> {
    validate_writable(region, access.direction)?;
    validate_width(region.width, access.width)?;
    let transfer = checked_transfer(access)?;
    validate_alignment(access.width, transfer.src, transfer.dst)?;
    validate_bounds(region.size_bytes, access.width, access.offset, access.len)?;
    validate_lane_span(region.lanes, &transfer)?;
    Ok(transfer)
}

/// Validates that the region side of `transfer` stays on the bus once each
/// element is spread over its lane stride.
///
/// # Errors
///
/// Returns [`DriverError::BadPointer`] when the strided span runs past the top
/// of the bus.
pub fn validate_lane_span(lanes: ByteLanes, transfer: &Transfer) -> Result<(), DriverError> {
    let base = match transfer.direction {
        Direction::Read => transfer.src,
        Direction::Write => transfer.dst,
    };
    let elements = u64::from(transfer.offset) + u64::from(transfer.count);
    if span_fits(base, elements, lanes.bus_stride(transfer.width)) {
        Ok(())
    } else {
        Err(DriverError::BadPointer)
    }
}

/// Validates a caller-supplied access (no region entry, no size limit).
///
/// # Errors
///
/// Returns [`DriverError::BadPointer`] for missing buffers, negative
/// offset/length, misaligned word transfers, or ranges that wrap the bus.
pub fn validate_caller_access(access: &Access) -> Result<Transfer, DriverError> {
    let transfer = checked_transfer(access)?;
    validate_alignment(access.width, transfer.src, transfer.dst)?;
    Ok(transfer)
}

/// Converts raw request fields into an in-range transfer.
fn checked_transfer(access: &Access) -> Result<Transfer, DriverError> {
    let (Some(src), Some(dst)) = (access.src, access.dst) else {
        return Err(DriverError::BadPointer);
    };
    let offset = u32::try_from(access.offset).map_err(|_| DriverError::BadPointer)?;
    let count = u32::try_from(access.len).map_err(|_| DriverError::BadPointer)?;

    let (src_span, dst_span) = match access.direction {
        Direction::Read => (u64::from(offset) + u64::from(count), u64::from(count)),
        Direction::Write => (u64::from(count), u64::from(offset) + u64::from(count)),
    };
    let stride = access.width.bytes();
    if !span_fits(src, src_span, stride) || !span_fits(dst, dst_span, stride) {
        return Err(DriverError::BadPointer);
    }

    Ok(Transfer {
        direction: access.direction,
        src,
        dst,
        offset,
        count,
        width: access.width,
    })
}

fn span_fits(base: Address, elements: u64, stride: u32) -> bool {
    u64::from(base.get()) + elements * u64::from(stride) <= BUS_BYTES
}
