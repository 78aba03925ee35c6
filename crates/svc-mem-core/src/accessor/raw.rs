use super::Transfer;
use crate::bus::{BusFault, PhysicalBus};
use crate::{Address, Width};

/// Copies every element of `transfer` through `bus`.
///
/// No bounds checking happens here; the transfer must come from the
/// validator. Always moves the full count and returns it.
///
/// # Errors
///
/// Propagates the first [`BusFault`]; elements before it have been copied.
pub fn copy<B: PhysicalBus + ?Sized>(bus: &mut B, transfer: &Transfer) -> Result<u32, BusFault> {
    for index in 0..transfer.count {
        let (src, dst) = transfer.element(index);
        move_element(bus, transfer.width, src, dst)?;
    }
    Ok(transfer.count)
}

/// Moves one element of `width` from `src` to `dst`.
pub(crate) fn move_element<B: PhysicalBus + ?Sized>(
    bus: &mut B,
    width: Width,
    src: Address,
    dst: Address,
) -> Result<(), BusFault> {
    match width {
        Width::Byte => {
            let value = bus.read8(src)?;
            bus.write8(dst, value)
        }
        Width::Word => {
            let value = bus.read32(src)?;
            bus.write32(dst, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::copy;
    use crate::accessor::Transfer;
    use crate::bus::BusFault;
    use crate::sim::{SimulatedPlatform, SCRATCH_START};
    use crate::{Address, Direction, Width, RAM_START, VIDEO_RAM_START};

    #[test]
    fn byte_read_skips_offset_at_source() {
        let mut sim = SimulatedPlatform::stock();
        sim.load(RAM_START, &[0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);

        let transfer = Transfer {
            direction: Direction::Read,
            src: RAM_START,
            dst: SCRATCH_START,
            offset: 2,
            count: 3,
            width: Width::Byte,
        };
        assert_eq!(copy(&mut sim, &transfer), Ok(3));
        assert_eq!(sim.peek_bytes(SCRATCH_START, 4), vec![0xA2, 0xA3, 0xA4, 0x00]);
    }

    #[test]
    fn word_write_skips_offset_at_destination() {
        let mut sim = SimulatedPlatform::stock();
        sim.poke32(SCRATCH_START, 0x1122_3344);
        sim.poke32(SCRATCH_START.wrapping_add(4), 0x5566_7788);

        let transfer = Transfer {
            direction: Direction::Write,
            src: SCRATCH_START,
            dst: VIDEO_RAM_START,
            offset: 1,
            count: 2,
            width: Width::Word,
        };
        assert_eq!(copy(&mut sim, &transfer), Ok(2));
        assert_eq!(sim.peek32(VIDEO_RAM_START), 0);
        assert_eq!(sim.peek32(VIDEO_RAM_START.wrapping_add(4)), 0x1122_3344);
        assert_eq!(sim.peek32(VIDEO_RAM_START.wrapping_add(8)), 0x5566_7788);
    }

    #[test]
    fn zero_count_touches_nothing() {
        let mut sim = SimulatedPlatform::stock();
        let transfer = Transfer {
            direction: Direction::Read,
            src: Address(0xFFFF_0000),
            dst: SCRATCH_START,
            offset: 0,
            count: 0,
            width: Width::Word,
        };
        assert_eq!(copy(&mut sim, &transfer), Ok(0));
        assert!(sim.unhandled_aborts().is_empty());
    }

    #[test]
    fn unmapped_source_propagates_unhandled_abort() {
        let mut sim = SimulatedPlatform::stock();
        let transfer = Transfer {
            direction: Direction::Read,
            src: Address(0x0600_0000),
            dst: SCRATCH_START,
            offset: 0,
            count: 4,
            width: Width::Byte,
        };
        assert_eq!(
            copy(&mut sim, &transfer),
            Err(BusFault::Unhandled(Address(0x0600_0000)))
        );
        assert_eq!(sim.unhandled_aborts(), &[Address(0x0600_0000)]);
    }
}
