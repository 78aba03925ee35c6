//! Client-side request helpers.
//!
//! Each helper fills in one request block, runs it through a [`Device`], and
//! returns the transferred element count. Buffers are bus addresses the
//! caller has already mapped.

use crate::bus::Platform;
use crate::driver::{Device, SvcMemDriver};
use crate::request::{Command, IoBuffer, IoInfo};
use crate::{Address, DriverError, Unit, Width};

/// Lets a client place a single word into memory before writing it out.
pub trait Staging {
    /// Stores `value` at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Aborted`] when the store faults.
    fn stage_u32(&mut self, addr: Address, value: u32) -> Result<(), DriverError>;
}

impl<P: Platform> Staging for SvcMemDriver<P> {
    fn stage_u32(&mut self, addr: Address, value: u32) -> Result<(), DriverError> {
        self.platform_mut()
            .write32(addr, value)
            .map_err(|_| DriverError::Aborted)
    }
}

/// Request builder bound to one device.
#[derive(Debug)]
pub struct MemClient<D> {
    device: D,
}

macro_rules! unit_shorthands {
    ($($(#[$doc:meta])* $name:ident => $inner:ident($unit:expr);)*) => {
        $(
            $(#[$doc])*
            ///
            /// # Errors
            ///
            /// Returns the request's error.
            pub fn $name(
                &mut self,
                offset: i32,
                buffer: Address,
                len: i32,
            ) -> Result<i32, DriverError> {
                self.$inner($unit, offset, buffer, len)
            }
        )*
    };
}

impl<D: Device> MemClient<D> {
    /// Wraps `device`.
    pub const fn new(device: D) -> Self {
        Self { device }
    }

    /// The wrapped device.
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Exclusive access to the wrapped device.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Releases the wrapped device.
    pub fn into_inner(self) -> D {
        self.device
    }

    fn submit(&mut self, info: IoInfo) -> Result<i32, DriverError> {
        self.device.do_io(info).result()
    }

    fn read_unit(
        &mut self,
        width: Width,
        unit: Unit,
        offset: i32,
        dst: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.submit(
            IoInfo::new(Command::Read, unit)
                .with_width(width)
                .with_offset(offset)
                .with_recv(IoBuffer::new(dst, len)),
        )
    }

    fn write_unit(
        &mut self,
        width: Width,
        unit: Unit,
        offset: i32,
        src: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.submit(
            IoInfo::new(Command::Write, unit)
                .with_width(width)
                .with_offset(offset)
                .with_send(IoBuffer::new(src, len)),
        )
    }

    fn read_between(
        &mut self,
        width: Width,
        src: Address,
        offset: i32,
        dst: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.submit(
            IoInfo::new(Command::Read, Unit::NoUnit)
                .with_width(width)
                .with_offset(offset)
                .with_send(IoBuffer::new(src, 0))
                .with_recv(IoBuffer::new(dst, len)),
        )
    }

    fn write_between(
        &mut self,
        width: Width,
        src: Address,
        len: i32,
        dst: Address,
        offset: i32,
    ) -> Result<i32, DriverError> {
        self.submit(
            IoInfo::new(Command::Write, Unit::NoUnit)
                .with_width(width)
                .with_offset(offset)
                .with_send(IoBuffer::new(src, len))
                .with_recv(IoBuffer::new(dst, 0)),
        )
    }

    /// Reads `len` bytes from `unit` starting at byte `offset` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn read_u8_unit(
        &mut self,
        unit: Unit,
        offset: i32,
        dst: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.read_unit(Width::Byte, unit, offset, dst, len)
    }

    /// Reads `len` words from `unit` starting at word `offset` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn read_u32_unit(
        &mut self,
        unit: Unit,
        offset: i32,
        dst: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.read_unit(Width::Word, unit, offset, dst, len)
    }

    /// Writes `len` bytes from `src` into `unit` starting at byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn write_u8_unit(
        &mut self,
        unit: Unit,
        offset: i32,
        src: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.write_unit(Width::Byte, unit, offset, src, len)
    }

    /// Writes `len` words from `src` into `unit` starting at word `offset`.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn write_u32_unit(
        &mut self,
        unit: Unit,
        offset: i32,
        src: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.write_unit(Width::Word, unit, offset, src, len)
    }

    /// Copies `len` bytes from `src + offset` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn read_u8(
        &mut self,
        src: Address,
        offset: i32,
        dst: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.read_between(Width::Byte, src, offset, dst, len)
    }

    /// Copies `len` words from `src + 4 * offset` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn read_u32(
        &mut self,
        src: Address,
        offset: i32,
        dst: Address,
        len: i32,
    ) -> Result<i32, DriverError> {
        self.read_between(Width::Word, src, offset, dst, len)
    }

    /// Copies `len` bytes from `src` to `dst + offset`.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn write_u8(
        &mut self,
        src: Address,
        len: i32,
        dst: Address,
        offset: i32,
    ) -> Result<i32, DriverError> {
        self.write_between(Width::Byte, src, len, dst, offset)
    }

    /// Copies `len` words from `src` to `dst + 4 * offset`.
    ///
    /// # Errors
    ///
    /// Returns the request's error.
    pub fn write_u32(
        &mut self,
        src: Address,
        len: i32,
        dst: Address,
        offset: i32,
    ) -> Result<i32, DriverError> {
        self.write_between(Width::Word, src, len, dst, offset)
    }

    unit_shorthands! {
        /// Byte read from general RAM.
        read_u8_ram => read_u8_unit(Unit::Ram);
        /// Word read from general RAM.
        read_u32_ram => read_u32_unit(Unit::Ram);
        /// Byte read from video RAM.
        read_u8_video_ram => read_u8_unit(Unit::VideoRam);
        /// Word read from video RAM.
        read_u32_video_ram => read_u32_unit(Unit::VideoRam);
        /// Byte read from ROM bank 1.
        read_u8_rom1 => read_u8_unit(Unit::RomBank1);
        /// Word read from ROM bank 1.
        read_u32_rom1 => read_u32_unit(Unit::RomBank1);
        /// Byte read from ROM bank 2.
        read_u8_rom2 => read_u8_unit(Unit::RomBank2);
        /// Word read from ROM bank 2.
        read_u32_rom2 => read_u32_unit(Unit::RomBank2);
        /// Byte read from configuration RAM.
        read_u8_config_ram => read_u8_unit(Unit::ConfigRam);
        /// Word read from controller block A.
        read_u32_controller_a => read_u32_unit(Unit::ControllerA);
        /// Word read from controller block B.
        read_u32_controller_b => read_u32_unit(Unit::ControllerB);
        /// Word read from controller block C.
        read_u32_controller_c => read_u32_unit(Unit::ControllerC);
        /// Byte write to general RAM.
        write_u8_ram => write_u8_unit(Unit::Ram);
        /// Word write to general RAM.
        write_u32_ram => write_u32_unit(Unit::Ram);
        /// Byte write to video RAM.
        write_u8_video_ram => write_u8_unit(Unit::VideoRam);
        /// Word write to video RAM.
        write_u32_video_ram => write_u32_unit(Unit::VideoRam);
        /// Byte write to configuration RAM.
        write_u8_config_ram => write_u8_unit(Unit::ConfigRam);
        /// Word write to controller block A.
        write_u32_controller_a => write_u32_unit(Unit::ControllerA);
        /// Word write to controller block B.
        write_u32_controller_b => write_u32_unit(Unit::ControllerB);
        /// Word write to controller block C.
        write_u32_controller_c => write_u32_unit(Unit::ControllerC);
    }
}

impl<D: Device + Staging> MemClient<D> {
    /// Writes the single word `value` to `dst + 4 * offset`, staging it at
    /// `scratch` first.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Aborted`] when staging faults, else the
    /// request's error.
    pub fn write1_u32(
        &mut self,
        value: u32,
        scratch: Address,
        dst: Address,
        offset: i32,
    ) -> Result<i32, DriverError> {
        self.device.stage_u32(scratch, value)?;
        self.write_u32(scratch, 1, dst, offset)
    }
}
