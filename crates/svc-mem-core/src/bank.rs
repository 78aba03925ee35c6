//! ROM bank selection and base resolution.
//!
//! Both ROM banks share one window; the platform decides which chip answers.
//! Bank switches are stateful platform calls made per request and are never
//! retried.

use tracing::debug;

use crate::bus::{RomBank, SysInfo};
use crate::{Address, DriverError, Region, RegionBase, Unit};

/// Maps `bank` into the ROM window.
///
/// # Errors
///
/// Returns [`DriverError::BankSelectFailed`] when the platform refuses.
pub fn select_bank<S: SysInfo + ?Sized>(
    platform: &mut S,
    bank: RomBank,
) -> Result<(), DriverError> {
    platform.set_active_rom_bank(bank).map_err(|err| {
        debug!(%err, "rom bank select failed");
        DriverError::BankSelectFailed
    })
}

/// Queries the base address of ROM bank 2.
///
/// # Errors
///
/// Returns [`DriverError::BankSelectFailed`] when the query fails.
pub fn query_bank2_base<S: SysInfo + ?Sized>(platform: &mut S) -> Result<Address, DriverError> {
    platform.rom_bank2_base().map_err(|err| {
        debug!(%err, "rom bank 2 base query failed");
        DriverError::BankSelectFailed
    })
}

/// Resolves the base address of `region`, switching ROM banks as needed.
///
/// ROM bank 1 selects bank 1 at its fixed base. ROM bank 2 queries its base
/// first, then selects bank 2. Every other region resolves to its fixed base
/// with no platform call.
///
/// # Errors
///
/// Returns [`DriverError::BankSelectFailed`] when a platform call fails.
pub fn resolve_base<S: SysInfo + ?Sized>(
    platform: &mut S,
    region: &Region,
) -> Result<Address, DriverError> {
    let base = match region.base {
        RegionBase::Fixed(addr) => addr,
        RegionBase::QueriedRomBank2 => query_bank2_base(platform)?,
    };
    match region.unit {
        Unit::RomBank1 => select_bank(platform, RomBank::Bank1)?,
        Unit::RomBank2 => select_bank(platform, RomBank::Bank2)?,
        _ => {}
    }
    Ok(base)
}
