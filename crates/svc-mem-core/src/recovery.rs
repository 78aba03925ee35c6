//! Scoped data-abort recovery boundary.

use core::ops::{Deref, DerefMut};

use crate::bus::{AbortControl, AbortHandler, QuietAborts, RecoveryPoint};

/// Installs a recovery point for the lifetime of the guard.
///
/// The configuration that was installed before the guard is saved on
/// construction and put back in [`Drop`], so it is restored on normal exit,
/// on `?` propagation, and while unwinding.
///
/// The guard dereferences to the platform so the guarded loop keeps issuing
/// bus traffic through it.
pub struct AbortGuard<'a, P: AbortControl + ?Sized> {
    platform: &'a mut P,
    saved: AbortHandler,
    point: RecoveryPoint,
    quiet: QuietAborts,
}

impl<'a, P: AbortControl + ?Sized> AbortGuard<'a, P> {
    /// Saves the current handler and installs a fresh recovery point that
    /// suppresses diagnostics for `quiet`.
    pub fn install(platform: &'a mut P, quiet: QuietAborts) -> Self {
        let saved = platform.abort_handler();
        let mut guard = Self {
            platform,
            saved,
            point: RecoveryPoint::fresh(),
            quiet,
        };
        guard.rearm();
        guard
    }

    /// Re-installs this guard's own recovery point after a caught abort
    /// consumed it.
    pub fn rearm(&mut self) {
        let armed = AbortHandler {
            catch: Some(self.point),
            quiet: self.quiet,
        };
        self.platform.install_abort_handler(armed);
    }

    /// The recovery point owned by this guard.
    #[must_use]
    pub const fn recovery_point(&self) -> RecoveryPoint {
        self.point
    }

    /// The configuration that will be restored on drop.
    #[must_use]
    pub const fn saved(&self) -> AbortHandler {
        self.saved
    }
}

impl<P: AbortControl + ?Sized> Deref for AbortGuard<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.platform
    }
}

impl<P: AbortControl + ?Sized> DerefMut for AbortGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.platform
    }
}

impl<P: AbortControl + ?Sized> Drop for AbortGuard<'_, P> {
    fn drop(&mut self) {
        self.platform.install_abort_handler(self.saved);
    }
}
