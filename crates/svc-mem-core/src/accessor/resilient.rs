//! Read loop that survives data aborts on individual elements.
//!
//! ROM banks and configuration RAM may be absent or only partly populated,
//! so any element can abort. The loop runs inside an [`AbortGuard`]: a caught
//! abort leaves that destination element untouched, re-arms the guard's own
//! recovery point, and carries on with the next index. There is no retry and
//! no limit on the number of aborts.

use tracing::trace;

use super::raw::move_element;
use super::Transfer;
use crate::bus::{AbortControl, BusFault, PhysicalBus, QuietAborts};
use crate::recovery::AbortGuard;
use crate::{ByteLanes, WORD_BYTES};

/// Outcome of a fault-tolerant copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResilientCopy {
    /// Elements visited; always the full transfer count.
    pub elements: u32,
    /// Elements whose access aborted and were left as the caller had them.
    pub aborts: u32,
}

/// Copies `transfer` with per-element abort recovery.
///
/// With [`ByteLanes::OnePerWord`] each element is probed as the 32-bit slot
/// at `src + 4 * (offset + index)` and its low byte is stored at
/// `dst + index`, whatever the transfer width says.
///
/// The recovery point covers both sides of each element, so an abort on the
/// destination store is counted and skipped the same way as one on the
/// source probe.
///
/// The abort handler installed before the call is restored on every exit.
///
/// # Errors
///
/// Propagates [`BusFault::Unhandled`], which means the platform did not route
/// the abort to this loop's recovery point.
pub fn copy_resilient<P>(
    platform: &mut P,
    transfer: &Transfer,
    lanes: ByteLanes,
) -> Result<ResilientCopy, BusFault>
where
    P: PhysicalBus + AbortControl + ?Sized,
{
    let mut guard = AbortGuard::install(platform, QuietAborts::ROM_FAULT);
    let mut outcome = ResilientCopy {
        elements: transfer.count,
        aborts: 0,
    };

    for index in 0..transfer.count {
        match copy_element(&mut *guard, transfer, lanes, index) {
            Ok(()) => {}
            Err(BusFault::DataAbort(addr)) => {
                trace!(%addr, index, "data abort, element skipped");
                outcome.aborts += 1;
                guard.rearm();
            }
            Err(fault @ BusFault::Unhandled(_)) => return Err(fault),
        }
    }

    Ok(outcome)
}

fn copy_element<P: PhysicalBus + ?Sized>(
    bus: &mut P,
    transfer: &Transfer,
    lanes: ByteLanes,
    index: u32,
) -> Result<(), BusFault> {
    match lanes {
        ByteLanes::Packed => {
            let (src, dst) = transfer.element(index);
            move_element(bus, transfer.width, src, dst)
        }
        ByteLanes::OnePerWord => {
            let slot = transfer.offset.wrapping_add(index).wrapping_mul(WORD_BYTES);
            let [.., low] = bus.read32(transfer.src.wrapping_add(slot))?.to_be_bytes();
            bus.write8(transfer.dst.wrapping_add(index), low)
        }
    }
}
