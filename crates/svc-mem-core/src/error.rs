use thiserror::Error;

/// Broad grouping of request errors, used for log levels and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorClass {
    /// The request named a command or unit the driver does not know.
    Routing,
    /// The request failed width, alignment, or bounds validation.
    Validation,
    /// The operation is not implemented for the unit.
    Policy,
    /// A platform call or bus access failed.
    Platform,
}

/// Request error surfaced through the request's result code.
///
/// Every variant is terminal for its request; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(i32)]
pub enum DriverError {
    /// Raw command value has no registered handler.
    #[error("bad command")]
    BadCommand = -1,
    /// Raw unit value is outside the legal range.
    #[error("bad unit")]
    BadUnit = -2,
    /// Unit is legal but the region table has no entry for it.
    #[error("unknown unit")]
    UnknownUnit = -3,
    /// Element width is not permitted for this unit.
    #[error("width not permitted for unit")]
    BadSize = -4,
    /// Missing buffer, misaligned word pointer, or out-of-bounds range.
    #[error("bad pointer or out-of-bounds range")]
    BadPointer = -5,
    /// Operation is intentionally not implemented for this unit.
    #[error("operation not supported for unit")]
    Unsupported = -6,
    /// Platform ROM bank switch or bank base query failed.
    #[error("rom bank select failed")]
    BankSelectFailed = -7,
    /// A bus fault escaped every recovery point during the copy.
    #[error("unrecovered bus fault during transfer")]
    Aborted = -8,
}

impl DriverError {
    /// Returns the stable result code stored in the request.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Converts a stable result code back into an error.
    ///
    /// `0` (success) and unknown codes yield `None`.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::BadCommand),
            -2 => Some(Self::BadUnit),
            -3 => Some(Self::UnknownUnit),
            -4 => Some(Self::BadSize),
            -5 => Some(Self::BadPointer),
            -6 => Some(Self::Unsupported),
            -7 => Some(Self::BankSelectFailed),
            -8 => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Returns the class for this error.
    #[must_use]
    pub const fn class(self) -> ErrorClass {
        match self {
            Self::BadCommand | Self::BadUnit | Self::UnknownUnit => ErrorClass::Routing,
            Self::BadSize | Self::BadPointer => ErrorClass::Validation,
            Self::Unsupported => ErrorClass::Policy,
            Self::BankSelectFailed | Self::Aborted => ErrorClass::Platform,
        }
    }
}
