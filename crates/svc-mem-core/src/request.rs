//! Wire-shaped IO request blocks.
//!
//! Mirrors the host OS request layout: raw command and unit bytes, an
//! options word, an element offset, and one send and one receive buffer.
//! Raw fields are decoded by the dispatcher, not here.

use crate::{Address, DriverError, Unit, Width};

/// Raw command value: copy the send buffer into a unit.
pub const CMD_WRITE: u8 = 0;
/// Raw command value: copy from a unit into the receive buffer.
pub const CMD_READ: u8 = 1;
/// Raw command value: no-op status query.
pub const CMD_STATUS: u8 = 2;

/// Option bit selecting word elements; clear means bytes.
pub const CMD_FLAG_WORDS: u32 = 0x0000_0001;

/// Decoded driver command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Command {
    /// Region write.
    Write,
    /// Region read.
    Read,
    /// Status query.
    Status,
}

impl Command {
    /// Every command in command-table order.
    pub const ALL: [Self; 3] = [Self::Write, Self::Read, Self::Status];

    /// Stable raw value.
    #[must_use]
    pub const fn as_raw(self) -> u8 {
        match self {
            Self::Write => CMD_WRITE,
            Self::Read => CMD_READ,
            Self::Status => CMD_STATUS,
        }
    }

    /// Decodes a raw command value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            CMD_WRITE => Some(Self::Write),
            CMD_READ => Some(Self::Read),
            CMD_STATUS => Some(Self::Status),
            _ => None,
        }
    }
}

/// One caller buffer: a bus address and an element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IoBuffer {
    /// Buffer address; `None` when the caller supplied no buffer.
    pub addr: Option<Address>,
    /// Length in elements.
    pub len: i32,
}

impl IoBuffer {
    /// A buffer of `len` elements at `addr`.
    #[must_use]
    pub const fn new(addr: Address, len: i32) -> Self {
        Self {
            addr: Some(addr),
            len,
        }
    }

    /// No buffer.
    #[must_use]
    pub const fn none() -> Self {
        Self { addr: None, len: 0 }
    }
}

/// Request parameters as the caller fills them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IoInfo {
    /// Raw command value.
    pub command: u8,
    /// Command options; see [`CMD_FLAG_WORDS`].
    pub options: u32,
    /// Raw unit value.
    pub unit: u8,
    /// Element offset into the region side.
    pub offset: i32,
    /// Source buffer for writes; source address for caller-supplied reads.
    pub send: IoBuffer,
    /// Destination buffer for reads; destination address for caller-supplied writes.
    pub recv: IoBuffer,
}

impl IoInfo {
    /// Byte-width request for `command` on `unit` with empty buffers.
    #[must_use]
    pub const fn new(command: Command, unit: Unit) -> Self {
        Self {
            command: command.as_raw(),
            options: 0,
            unit: unit.as_raw(),
            offset: 0,
            send: IoBuffer::none(),
            recv: IoBuffer::none(),
        }
    }

    /// Sets the element width option.
    #[must_use]
    pub const fn with_width(mut self, width: Width) -> Self {
        self.options = match width {
            Width::Byte => self.options & !CMD_FLAG_WORDS,
            Width::Word => self.options | CMD_FLAG_WORDS,
        };
        self
    }

    /// Sets the element offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the send buffer.
    #[must_use]
    pub const fn with_send(mut self, send: IoBuffer) -> Self {
        self.send = send;
        self
    }

    /// Sets the receive buffer.
    #[must_use]
    pub const fn with_recv(mut self, recv: IoBuffer) -> Self {
        self.recv = recv;
        self
    }

    /// Element width selected by the options word.
    #[must_use]
    pub const fn width(&self) -> Width {
        if self.options & CMD_FLAG_WORDS == 0 {
            Width::Byte
        } else {
            Width::Word
        }
    }
}

/// One in-flight request and its completion fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IoRequest {
    /// Caller parameters.
    pub info: IoInfo,
    /// First error hit, or `None` on success.
    pub error: Option<DriverError>,
    /// Elements the driver reports as transferred.
    pub actual: i32,
}

impl IoRequest {
    /// Wraps `info` with cleared completion fields.
    #[must_use]
    pub const fn new(info: IoInfo) -> Self {
        Self {
            info,
            error: None,
            actual: 0,
        }
    }

    /// Result code: `0` on success, else the error's stable negative code.
    #[must_use]
    pub const fn error_code(&self) -> i32 {
        match self.error {
            Some(error) => error.code(),
            None => 0,
        }
    }

    /// Completion as a `Result` carrying `actual` on success.
    ///
    /// # Errors
    ///
    /// Returns the request's error when one was recorded.
    pub const fn result(&self) -> Result<i32, DriverError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.actual),
        }
    }

    pub(crate) const fn complete(&mut self, outcome: Result<(), DriverError>) {
        self.error = match outcome {
            Ok(()) => None,
            Err(error) => Some(error),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, IoBuffer, IoInfo, IoRequest, CMD_FLAG_WORDS};
    use crate::{Address, DriverError, Unit, Width};

    #[test]
    fn command_raw_values_follow_table_order() {
        for (index, command) in Command::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(command.as_raw()), index);
            assert_eq!(Command::from_raw(command.as_raw()), Some(command));
        }
        assert_eq!(Command::from_raw(3), None);
    }

    #[test]
    fn word_flag_drives_width() {
        let info = IoInfo::new(Command::Read, Unit::Ram);
        assert_eq!(info.width(), Width::Byte);

        let words = info.with_width(Width::Word);
        assert_eq!(words.options, CMD_FLAG_WORDS);
        assert_eq!(words.width(), Width::Word);
        assert_eq!(words.with_width(Width::Byte).width(), Width::Byte);
    }

    #[test]
    fn builder_fills_wire_fields() {
        let info = IoInfo::new(Command::Write, Unit::ControllerB)
            .with_offset(12)
            .with_send(IoBuffer::new(Address(0x100), 4));
        assert_eq!(info.command, 0);
        assert_eq!(info.unit, 7);
        assert_eq!(info.offset, 12);
        assert_eq!(info.send.addr, Some(Address(0x100)));
        assert_eq!(info.recv, IoBuffer::none());
    }

    #[test]
    fn error_code_is_zero_only_on_success() {
        let mut request = IoRequest::new(IoInfo::default());
        request.actual = 4;
        assert_eq!(request.error_code(), 0);
        assert_eq!(request.result(), Ok(4));

        request.complete(Err(DriverError::BadSize));
        assert_eq!(request.error_code(), -4);
        assert_eq!(request.result(), Err(DriverError::BadSize));
    }
}
