//! Fixed physical region map and unit identifiers.

use super::{Address, Width, WORD_BYTES};

const ONE_MEG: u32 = 1024 * 1024;

/// Base address of general DRAM.
pub const RAM_START: Address = Address(0x0000_0000);
/// Size in bytes of general DRAM.
pub const RAM_SIZE: u32 = 2 * ONE_MEG;
/// Base address of video RAM.
pub const VIDEO_RAM_START: Address = Address(0x0020_0000);
/// Size in bytes of video RAM.
pub const VIDEO_RAM_SIZE: u32 = ONE_MEG;
/// Base address of the ROM bank window when bank 1 is selected.
pub const ROM1_START: Address = Address(0x0300_0000);
/// Size in bytes of ROM bank 1.
pub const ROM1_SIZE: u32 = ONE_MEG;
/// Conventional base of ROM bank 2; the live value is queried from the platform.
pub const ROM2_DEFAULT_START: Address = Address(0x0300_0000);
/// Size in bytes of ROM bank 2.
pub const ROM2_SIZE: u32 = ONE_MEG;
/// Base address of battery-backed configuration RAM.
pub const CONFIG_RAM_START: Address = Address(0x0314_0000);
/// Size in bytes of configuration RAM (one byte per 32-bit bus slot).
pub const CONFIG_RAM_SIZE: u32 = 32 * 1024;
/// Base address of controller register block A.
pub const CONTROLLER_A_START: Address = Address(0x0330_0000);
/// Size in bytes of controller register block A.
pub const CONTROLLER_A_SIZE: u32 = 2 * 1024;
/// Base address of controller register block B.
pub const CONTROLLER_B_START: Address = Address(0x0340_0000);
/// Size in bytes of controller register block B.
pub const CONTROLLER_B_SIZE: u32 = 1024;
/// Base address of controller register block C.
pub const CONTROLLER_C_START: Address = Address(0x0320_0000);
/// Size in bytes of controller register block C.
pub const CONTROLLER_C_SIZE: u32 = ONE_MEG;

/// Number of units that own a region table entry.
pub const UNIT_COUNT: usize = 8;

/// Logical name of one addressable region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Unit {
    /// Caller supplies both source and destination addresses.
    NoUnit = 0,
    /// General DRAM.
    Ram = 1,
    /// Video RAM.
    VideoRam = 2,
    /// First ROM bank.
    RomBank1 = 3,
    /// Optional second ROM bank.
    RomBank2 = 4,
    /// Battery-backed configuration RAM.
    ConfigRam = 5,
    /// Controller register block A.
    ControllerA = 6,
    /// Controller register block B.
    ControllerB = 7,
    /// Controller register block C.
    ControllerC = 8,
}

impl Unit {
    /// Every unit that maps to a region table entry, in raw order.
    pub const REGION_UNITS: [Self; UNIT_COUNT] = [
        Self::Ram,
        Self::VideoRam,
        Self::RomBank1,
        Self::RomBank2,
        Self::ConfigRam,
        Self::ControllerA,
        Self::ControllerB,
        Self::ControllerC,
    ];

    /// Returns the stable wire value for this unit.
    #[must_use]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Decodes a wire unit value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::NoUnit),
            1 => Some(Self::Ram),
            2 => Some(Self::VideoRam),
            3 => Some(Self::RomBank1),
            4 => Some(Self::RomBank2),
            5 => Some(Self::ConfigRam),
            6 => Some(Self::ControllerA),
            7 => Some(Self::ControllerB),
            8 => Some(Self::ControllerC),
            _ => None,
        }
    }

    /// Short lowercase name used in logs and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoUnit => "none",
            Self::Ram => "ram",
            Self::VideoRam => "vram",
            Self::RomBank1 => "rom1",
            Self::RomBank2 => "rom2",
            Self::ConfigRam => "nvram",
            Self::ControllerA => "ctrl-a",
            Self::ControllerB => "ctrl-b",
            Self::ControllerC => "ctrl-c",
        }
    }

    /// Parses a name produced by [`Unit::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::NoUnit]
            .into_iter()
            .chain(Self::REGION_UNITS)
            .find(|unit| unit.name() == name)
    }

    const fn table_index(self) -> Option<usize> {
        match self {
            Self::NoUnit => None,
            other => Some(other as usize - 1),
        }
    }
}

/// Where a region's base address comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegionBase {
    /// Compiled-in physical address.
    Fixed(Address),
    /// Queried from the platform before each access (ROM bank 2).
    QueriedRomBank2,
}

/// Element widths a region accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum WidthPolicy {
    /// Byte and word transfers.
    Any,
    /// Word transfers only (register blocks).
    WordOnly,
    /// Byte transfers only (configuration RAM).
    ByteOnly,
}

impl WidthPolicy {
    /// Returns `true` when `width` is accepted.
    #[must_use]
    pub const fn permits(self, width: Width) -> bool {
        matches!(
            (self, width),
            (Self::Any, _) | (Self::WordOnly, Width::Word) | (Self::ByteOnly, Width::Byte)
        )
    }
}

/// How data bytes are laid out on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ByteLanes {
    /// Elements are contiguous.
    Packed,
    /// Each byte lives in the low lane of its own 32-bit slot and is only
    /// reachable through word transactions.
    OnePerWord,
}

impl ByteLanes {
    /// Bus bytes occupied by one element of `width`.
    #[must_use]
    pub const fn bus_stride(self, width: Width) -> u32 {
        match self {
            Self::Packed => width.bytes(),
            Self::OnePerWord => WORD_BYTES,
        }
    }
}

/// Static description of one addressable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Region {
    /// Unit this entry describes.
    pub unit: Unit,
    /// Base address source.
    pub base: RegionBase,
    /// Addressable size in bytes.
    pub size_bytes: u32,
    /// Accepted element widths.
    pub width: WidthPolicy,
    /// Probing may raise a data abort; reads go through the fault-tolerant accessor.
    pub fault_prone: bool,
    /// Writes are implemented; `false` rejects every write as unsupported.
    pub writable: bool,
    /// Bus byte layout.
    pub lanes: ByteLanes,
}

impl Region {
    const fn plain(unit: Unit, base: Address, size_bytes: u32) -> Self {
        Self {
            unit,
            base: RegionBase::Fixed(base),
            size_bytes,
            width: WidthPolicy::Any,
            fault_prone: false,
            writable: true,
            lanes: ByteLanes::Packed,
        }
    }

    const fn rom(unit: Unit, base: RegionBase, size_bytes: u32) -> Self {
        Self {
            unit,
            base,
            size_bytes,
            width: WidthPolicy::Any,
            fault_prone: true,
            writable: false,
            lanes: ByteLanes::Packed,
        }
    }

    const fn registers(unit: Unit, base: Address, size_bytes: u32) -> Self {
        Self {
            unit,
            base: RegionBase::Fixed(base),
            size_bytes,
            width: WidthPolicy::WordOnly,
            fault_prone: false,
            writable: true,
            lanes: ByteLanes::Packed,
        }
    }

    /// Returns the compiled-in base, or `None` when it must be queried.
    #[must_use]
    pub const fn fixed_base(&self) -> Option<Address> {
        match self.base {
            RegionBase::Fixed(addr) => Some(addr),
            RegionBase::QueriedRomBank2 => None,
        }
    }
}

/// Immutable per-unit region lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegionTable {
    entries: [Option<Region>; UNIT_COUNT],
}

impl RegionTable {
    /// Returns the entry for `unit`, or `None` for [`Unit::NoUnit`] and for
    /// units removed from this table.
    #[must_use]
    pub const fn lookup(&self, unit: Unit) -> Option<&Region> {
        match unit.table_index() {
            Some(index) => self.entries[index].as_ref(),
            None => None,
        }
    }

    /// Returns a copy of this table with `region` replacing its unit's entry.
    ///
    /// Entries for [`Unit::NoUnit`] are ignored.
    #[must_use]
    pub const fn with_region(mut self, region: Region) -> Self {
        if let Some(index) = region.unit.table_index() {
            self.entries[index] = Some(region);
        }
        self
    }

    /// Returns a copy of this table without an entry for `unit`.
    #[must_use]
    pub const fn without(mut self, unit: Unit) -> Self {
        if let Some(index) = unit.table_index() {
            self.entries[index] = None;
        }
        self
    }

    /// Iterates over populated entries in unit order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.entries.iter().flatten()
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        DEFAULT_REGION_TABLE
    }
}

/// Region table for the stock hardware layout.
pub const DEFAULT_REGION_TABLE: RegionTable = RegionTable {
    entries: [
        Some(Region::plain(Unit::Ram, RAM_START, RAM_SIZE)),
        Some(Region::plain(Unit::VideoRam, VIDEO_RAM_START, VIDEO_RAM_SIZE)),
        Some(Region::rom(
            Unit::RomBank1,
            RegionBase::Fixed(ROM1_START),
            ROM1_SIZE,
        )),
        Some(Region::rom(
            Unit::RomBank2,
            RegionBase::QueriedRomBank2,
            ROM2_SIZE,
        )),
        Some(Region {
            unit: Unit::ConfigRam,
            base: RegionBase::Fixed(CONFIG_RAM_START),
            size_bytes: CONFIG_RAM_SIZE,
            width: WidthPolicy::ByteOnly,
            fault_prone: true,
            writable: false,
            lanes: ByteLanes::OnePerWord,
        }),
        Some(Region::registers(
            Unit::ControllerA,
            CONTROLLER_A_START,
            CONTROLLER_A_SIZE,
        )),
        Some(Region::registers(
            Unit::ControllerB,
            CONTROLLER_B_START,
            CONTROLLER_B_SIZE,
        )),
        Some(Region::registers(
            Unit::ControllerC,
            CONTROLLER_C_START,
            CONTROLLER_C_SIZE,
        )),
    ],
};

const _: () = assert_default_region_table();

const fn assert_default_region_table() {
    let mut index = 0;
    while index < UNIT_COUNT {
        let Some(region) = DEFAULT_REGION_TABLE.entries[index] else {
            panic!("every unit needs a default region");
        };
        assert!(
            region.unit as usize == index + 1,
            "region entries must be stored in unit order"
        );
        assert!(region.size_bytes > 0, "regions cannot be empty");
        if let RegionBase::Fixed(base) = region.base {
            let span = region.size_bytes.checked_mul(region.lanes.bus_stride(Width::Byte));
            assert!(
                matches!(span, Some(span) if base.0.checked_add(span).is_some()),
                "region must fit in the bus address space"
            );
            assert!(base.is_word_aligned(), "region bases must be word aligned");
        }
        if region.fault_prone {
            assert!(!region.writable, "fault-prone regions are read-only");
        }
        index += 1;
    }

    let Some(config) = DEFAULT_REGION_TABLE.entries[Unit::ConfigRam as usize - 1] else {
        panic!("config ram entry missing");
    };
    assert!(
        matches!(config.width, WidthPolicy::ByteOnly),
        "config ram is byte-only"
    );
    assert!(
        matches!(config.lanes, ByteLanes::OnePerWord),
        "config ram bytes sit one per word"
    );

    let controllers = [Unit::ControllerA, Unit::ControllerB, Unit::ControllerC];
    let mut index = 0;
    while index < controllers.len() {
        let Some(block) = DEFAULT_REGION_TABLE.entries[controllers[index] as usize - 1] else {
            panic!("controller entry missing");
        };
        assert!(
            matches!(block.width, WidthPolicy::WordOnly),
            "register blocks are word-only"
        );
        index += 1;
    }
}
