//! Core of the `svc-mem` driver: raw byte and word access to fixed physical
//! regions, with ROM bank switching and abort-tolerant reads.

/// Memory model primitives, the region map, and request validation.
pub mod memory;
pub use memory::{
    resolve_region, validate_alignment, validate_bounds, validate_caller_access,
    validate_lane_span, validate_region_access, validate_width, validate_writable, Access,
    Address, ByteLanes, Direction, Region, RegionBase, RegionTable, Unit, Width, WidthPolicy,
    CONFIG_RAM_SIZE, CONFIG_RAM_START, CONTROLLER_A_SIZE, CONTROLLER_A_START, CONTROLLER_B_SIZE,
    CONTROLLER_B_START, CONTROLLER_C_SIZE, CONTROLLER_C_START, DEFAULT_REGION_TABLE, RAM_SIZE,
    RAM_START, ROM1_SIZE, ROM1_START, ROM2_DEFAULT_START, ROM2_SIZE, UNIT_COUNT, VIDEO_RAM_SIZE,
    VIDEO_RAM_START, WORD_BYTES,
};

/// Request error taxonomy and stable result codes.
pub mod error;
pub use error::{DriverError, ErrorClass};

/// Platform contracts: bus transactions, abort hook, and ROM banking calls.
pub mod bus;
pub use bus::{
    AbortControl, AbortHandler, BusFault, PhysicalBus, Platform, PlatformError, QuietAborts,
    RecoveryPoint, RomBank, SysInfo,
};

/// Scoped abort recovery.
pub mod recovery;
pub use recovery::AbortGuard;

/// Raw and abort-tolerant element copy loops.
pub mod accessor;
pub use accessor::{copy, copy_resilient, ResilientCopy, Transfer};

/// ROM bank selection.
pub mod bank;
pub use bank::{query_bank2_base, resolve_base, select_bank};

/// Wire-shaped request blocks.
pub mod request;
pub use request::{
    Command, IoBuffer, IoInfo, IoRequest, CMD_FLAG_WORDS, CMD_READ, CMD_STATUS, CMD_WRITE,
};

/// Command handlers and routing.
pub mod dispatch;
pub use dispatch::{
    cmd_read, cmd_status, cmd_write, command_table, dispatch, CommandHandler, COMMAND_TABLE_LEN,
};

/// Driver registration surface.
pub mod driver;
pub use driver::{Device, DriverConfig, DriverId, SvcMemDriver, DEFAULT_DRIVER_NAME};

/// Client request helpers.
pub mod client;
pub use client::{MemClient, Staging};

/// Host-side simulated platform.
pub mod sim;
pub use sim::{SimulatedPlatform, SCRATCH_SIZE, SCRATCH_START};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
