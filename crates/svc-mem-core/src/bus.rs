//! Platform contracts consumed by the driver core.
//!
//! The driver never touches hardware directly. Physical bus traffic, the
//! kernel's data-abort recovery hook, and the system-information calls that
//! switch ROM banks all go through the traits here, bundled as [`Platform`]
//! and passed explicitly to every dispatch.

use core::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::Address;

/// Fault raised by a single bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum BusFault {
    /// The access aborted and control returned to the installed recovery point.
    #[error("data abort at {0} (caught)")]
    DataAbort(Address),
    /// The access aborted with no recovery point installed.
    #[error("data abort at {0} (no recovery point)")]
    Unhandled(Address),
}

impl BusFault {
    /// Address of the faulting transaction.
    #[must_use]
    pub const fn address(self) -> Address {
        match self {
            Self::DataAbort(addr) | Self::Unhandled(addr) => addr,
        }
    }
}

/// Physical bus transactions.
pub trait PhysicalBus {
    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns a [`BusFault`] when the transaction aborts.
    fn read8(&mut self, addr: Address) -> Result<u8, BusFault>;

    /// Reads one 32-bit word.
    ///
    /// # Errors
    ///
    /// Returns a [`BusFault`] when the transaction aborts.
    fn read32(&mut self, addr: Address) -> Result<u32, BusFault>;

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns a [`BusFault`] when the transaction aborts.
    fn write8(&mut self, addr: Address, value: u8) -> Result<(), BusFault>;

    /// Writes one 32-bit word.
    ///
    /// # Errors
    ///
    /// Returns a [`BusFault`] when the transaction aborts.
    fn write32(&mut self, addr: Address, value: u32) -> Result<(), BusFault>;
}

/// Opaque identity of one installed recovery point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoveryPoint(u64);

static NEXT_RECOVERY_POINT: AtomicU64 = AtomicU64::new(1);

impl RecoveryPoint {
    /// Allocates a recovery point distinct from every other one in the process.
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_RECOVERY_POINT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identifier, for logs.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Abort classes whose diagnostics the kernel should suppress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QuietAborts(u32);

impl QuietAborts {
    /// Report every abort.
    pub const NONE: Self = Self(0);
    /// Suppress diagnostics for aborts raised by ROM and probe-style reads.
    pub const ROM_FAULT: Self = Self(0x0000_0001);

    /// Builds a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw mask bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` when every class in `other` is suppressed.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Kernel data-abort handling configuration for the current execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AbortHandler {
    /// Where a data abort returns to, if anywhere.
    pub catch: Option<RecoveryPoint>,
    /// Diagnostic suppression mask.
    pub quiet: QuietAborts,
}

/// Access to the kernel's data-abort recovery hook.
///
/// A caught abort consumes the installed recovery point: control returns to
/// it once, and a later abort is unhandled unless a point is installed again.
pub trait AbortControl {
    /// Returns the currently installed configuration.
    fn abort_handler(&self) -> AbortHandler;

    /// Replaces the installed configuration.
    fn install_abort_handler(&mut self, handler: AbortHandler);
}

/// Physical ROM bank identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RomBank {
    /// First ROM chip.
    Bank1,
    /// Second, optional ROM chip.
    Bank2,
}

impl RomBank {
    /// System-information value selecting this bank.
    #[must_use]
    pub const fn sysinfo_value(self) -> u32 {
        match self {
            Self::Bank1 => 0,
            Self::Bank2 => 1,
        }
    }
}

/// Platform configuration call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum PlatformError {
    /// The ROM bank switch was refused.
    #[error("set rom bank {0:?} refused")]
    BankSwitchRefused(RomBank),
    /// The second ROM bank base could not be queried.
    #[error("rom bank 2 base query failed")]
    BaseQueryFailed,
}

/// System-information calls for ROM banking.
pub trait SysInfo {
    /// Maps `bank` into the ROM window.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformError`] when the platform refuses the switch.
    fn set_active_rom_bank(&mut self, bank: RomBank) -> Result<(), PlatformError>;

    /// Returns the base address of the second ROM bank.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformError`] when the query fails.
    fn rom_bank2_base(&mut self) -> Result<Address, PlatformError>;
}

/// Everything the driver needs from the host platform.
pub trait Platform: PhysicalBus + AbortControl + SysInfo {}

impl<T: PhysicalBus + AbortControl + SysInfo + ?Sized> Platform for T {}
