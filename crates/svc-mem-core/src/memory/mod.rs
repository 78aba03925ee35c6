//! Memory model primitives: bus addresses, element widths, and the region map.

/// Validation policy helpers for region and caller-supplied accesses.
pub mod access;
/// Fixed region table and unit identifiers.
pub mod map;

use core::fmt;

pub use access::{
    resolve_region, validate_alignment, validate_bounds, validate_caller_access,
    validate_lane_span, validate_region_access, validate_width, validate_writable, Access,
    Direction,
};
pub use map::{
    ByteLanes, Region, RegionBase, RegionTable, Unit, WidthPolicy, CONFIG_RAM_SIZE,
    CONFIG_RAM_START, CONTROLLER_A_SIZE, CONTROLLER_A_START, CONTROLLER_B_SIZE,
    CONTROLLER_B_START, CONTROLLER_C_SIZE, CONTROLLER_C_START, DEFAULT_REGION_TABLE, RAM_SIZE,
    RAM_START, ROM1_SIZE, ROM1_START, ROM2_DEFAULT_START, ROM2_SIZE, UNIT_COUNT, VIDEO_RAM_SIZE,
    VIDEO_RAM_START,
};

/// Size in bytes of one word element.
pub const WORD_BYTES: u32 = 4;

/// Physical bus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Address(pub u32);

impl Address {
    /// Returns the raw bus address.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns `true` when the address sits on a 4-byte boundary.
    #[must_use]
    pub const fn is_word_aligned(self) -> bool {
        self.0 & (WORD_BYTES - 1) == 0
    }

    /// Advances by `elements` elements of `width`, or `None` on overflow.
    #[must_use]
    pub const fn checked_offset(self, elements: u32, width: Width) -> Option<Self> {
        match elements.checked_mul(width.bytes()) {
            Some(bytes) => match self.0.checked_add(bytes) {
                Some(addr) => Some(Self(addr)),
                None => None,
            },
            None => None,
        }
    }

    /// Advances by `bytes` bytes, wrapping at the top of the bus.
    #[must_use]
    pub const fn wrapping_add(self, bytes: u32) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Element width of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Width {
    /// One byte per element.
    #[default]
    Byte,
    /// One 32-bit word per element.
    Word,
}

impl Width {
    /// Size in bytes of one element.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => WORD_BYTES,
        }
    }
}
