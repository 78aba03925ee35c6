//! Element copy loops between caller buffers and physical regions.

/// Plain copy loop for regions that never abort.
pub mod raw;
/// Abort-tolerant read loop for probe-style regions.
pub mod resilient;

pub use raw::copy;
pub use resilient::{copy_resilient, ResilientCopy};

use crate::{Address, Direction, Width};

/// A validated element transfer.
///
/// For reads, `offset` elements are skipped at the source; for writes, at the
/// destination. The other side always starts at element zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transfer {
    /// Transfer direction.
    pub direction: Direction,
    /// Source base address.
    pub src: Address,
    /// Destination base address.
    pub dst: Address,
    /// Element offset applied to the region side.
    pub offset: u32,
    /// Number of elements to move.
    pub count: u32,
    /// Element width.
    pub width: Width,
}

impl Transfer {
    /// Source and destination addresses of element `index`.
    ///
    /// Validation guarantees the addresses fit on the bus, so the arithmetic
    /// wraps instead of checking.
    #[must_use]
    pub const fn element(&self, index: u32) -> (Address, Address) {
        let elem = self.width.bytes();
        let (src_index, dst_index) = match self.direction {
            Direction::Read => (self.offset.wrapping_add(index), index),
            Direction::Write => (index, self.offset.wrapping_add(index)),
        };
        (
            self.src.wrapping_add(src_index.wrapping_mul(elem)),
            self.dst.wrapping_add(dst_index.wrapping_mul(elem)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Transfer;
    use crate::{Address, Direction, Width};

    #[test]
    fn read_offset_applies_to_source() {
        let transfer = Transfer {
            direction: Direction::Read,
            src: Address(0x1000),
            dst: Address(0x2000),
            offset: 4,
            count: 8,
            width: Width::Word,
        };
        assert_eq!(transfer.element(0), (Address(0x1010), Address(0x2000)));
        assert_eq!(transfer.element(2), (Address(0x1018), Address(0x2008)));
    }

    #[test]
    fn write_offset_applies_to_destination() {
        let transfer = Transfer {
            direction: Direction::Write,
            src: Address(0x1000),
            dst: Address(0x2000),
            offset: 3,
            count: 2,
            width: Width::Byte,
        };
        assert_eq!(transfer.element(0), (Address(0x1000), Address(0x2003)));
        assert_eq!(transfer.element(1), (Address(0x1001), Address(0x2004)));
    }
}
