//! Host-side simulated platform.
//!
//! Stands in for the kernel and the physical bus so the driver can be driven
//! from tests, the fuzz target, and the `svc-mem` tool. Memory is big-endian,
//! matching the target bus.

use std::collections::BTreeSet;

use crate::bus::{
    AbortControl, AbortHandler, BusFault, PhysicalBus, PlatformError, QuietAborts, RomBank,
    SysInfo,
};
use crate::{
    Address, CONFIG_RAM_SIZE, CONFIG_RAM_START, CONTROLLER_A_SIZE, CONTROLLER_A_START,
    CONTROLLER_B_SIZE, CONTROLLER_B_START, CONTROLLER_C_SIZE, CONTROLLER_C_START, RAM_SIZE,
    RAM_START, ROM1_START, ROM2_DEFAULT_START, VIDEO_RAM_SIZE, VIDEO_RAM_START, WORD_BYTES,
};

/// Base of the caller-buffer scratch window mapped by [`SimulatedPlatform::stock`].
pub const SCRATCH_START: Address = Address(0x0800_0000);
/// Size of the scratch window.
pub const SCRATCH_SIZE: u32 = 256 * 1024;

#[derive(Debug, Clone)]
struct Window {
    base: u32,
    bytes: Vec<u8>,
}

impl Window {
    fn slot(&self, addr: Address, len: u32) -> Option<usize> {
        let start = addr.get().checked_sub(self.base)?;
        let end = u64::from(start) + u64::from(len);
        if u64::try_from(self.bytes.len()).is_ok_and(|len| end <= len) {
            usize::try_from(start).ok()
        } else {
            None
        }
    }
}

/// Simulated bus, abort hook, and system-information service.
///
/// Unmapped addresses, ROM writes, reads outside the active ROM bank, and
/// addresses registered with [`inject_abort`](Self::inject_abort) all raise a
/// data abort. A caught abort consumes the installed recovery point.
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    windows: Vec<Window>,
    roms: [Vec<u8>; 2],
    rom2_base: Address,
    active_bank: RomBank,
    injected: BTreeSet<Address>,
    handler: AbortHandler,
    refuse_bank_select: bool,
    refuse_rom2_query: bool,
    bank_selects: Vec<RomBank>,
    caught: Vec<Address>,
    unhandled: Vec<Address>,
    diagnostics: Vec<Address>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlatform {
    /// Creates a platform with nothing mapped and ROM bank 1 active.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            windows: Vec::new(),
            roms: [Vec::new(), Vec::new()],
            rom2_base: ROM2_DEFAULT_START,
            active_bank: RomBank::Bank1,
            injected: BTreeSet::new(),
            handler: AbortHandler {
                catch: None,
                quiet: QuietAborts::NONE,
            },
            refuse_bank_select: false,
            refuse_rom2_query: false,
            bank_selects: Vec::new(),
            caught: Vec::new(),
            unhandled: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Creates a platform with the stock RAM, video RAM, configuration RAM,
    /// controller blocks, and the scratch window mapped and zeroed.
    ///
    /// No ROM is installed.
    #[must_use]
    pub fn stock() -> Self {
        let mut sim = Self::new();
        sim.map(RAM_START, RAM_SIZE);
        sim.map(VIDEO_RAM_START, VIDEO_RAM_SIZE);
        sim.map(CONFIG_RAM_START, CONFIG_RAM_SIZE * WORD_BYTES);
        sim.map(CONTROLLER_A_START, CONTROLLER_A_SIZE);
        sim.map(CONTROLLER_B_START, CONTROLLER_B_SIZE);
        sim.map(CONTROLLER_C_START, CONTROLLER_C_SIZE);
        sim.map(SCRATCH_START, SCRATCH_SIZE);
        sim
    }

    /// Maps `size` zeroed bytes of read/write memory at `base`.
    pub fn map(&mut self, base: Address, size: u32) {
        let len = usize::try_from(size).unwrap_or(usize::MAX);
        self.windows.push(Window {
            base: base.get(),
            bytes: vec![0; len],
        });
    }

    /// Copies `bytes` into mapped memory starting at `base`.
    ///
    /// Bytes that land outside every mapped window are dropped. Returns the
    /// number of bytes stored.
    pub fn load(&mut self, base: Address, bytes: &[u8]) -> usize {
        let mut stored = 0;
        for (addr, value) in (base.get()..).zip(bytes) {
            if self.poke8(Address(addr), *value) {
                stored += 1;
            }
        }
        stored
    }

    /// Installs the contents of a ROM bank, replacing any previous image.
    ///
    /// An empty image leaves the bank absent.
    pub fn install_rom(&mut self, bank: RomBank, bytes: &[u8]) {
        self.roms[Self::bank_index(bank)] = bytes.to_vec();
    }

    /// Sets the address reported for ROM bank 2.
    pub fn set_rom_bank2_base(&mut self, base: Address) {
        self.rom2_base = base;
    }

    /// Loads configuration RAM, one byte per 32-bit slot in the low lane.
    pub fn load_config_ram(&mut self, bytes: &[u8]) {
        for (slot, value) in (0..CONFIG_RAM_SIZE).zip(bytes) {
            let addr = CONFIG_RAM_START.wrapping_add(slot * WORD_BYTES);
            self.poke32(addr, u32::from(*value));
        }
    }

    /// Makes every transaction that starts at `addr` raise a data abort.
    pub fn inject_abort(&mut self, addr: Address) {
        self.injected.insert(addr);
    }

    /// Makes ROM bank switches fail while `refuse` is set.
    pub fn fail_bank_select(&mut self, refuse: bool) {
        self.refuse_bank_select = refuse;
    }

    /// Makes the ROM bank 2 base query fail while `refuse` is set.
    pub fn fail_rom2_query(&mut self, refuse: bool) {
        self.refuse_rom2_query = refuse;
    }

    /// The ROM bank currently mapped into the ROM window.
    #[must_use]
    pub const fn active_rom_bank(&self) -> RomBank {
        self.active_bank
    }

    /// Every successful bank switch, oldest first.
    #[must_use]
    pub fn bank_selects(&self) -> &[RomBank] {
        &self.bank_selects
    }

    /// Addresses of aborts that returned to a recovery point.
    #[must_use]
    pub fn caught_aborts(&self) -> &[Address] {
        &self.caught
    }

    /// Addresses of aborts raised with no recovery point installed.
    #[must_use]
    pub fn unhandled_aborts(&self) -> &[Address] {
        &self.unhandled
    }

    /// Addresses of aborts the kernel would have reported on its console.
    #[must_use]
    pub fn diagnostics(&self) -> &[Address] {
        &self.diagnostics
    }

    /// Total bus transactions that aborted.
    #[must_use]
    pub fn abort_count(&self) -> usize {
        self.caught.len() + self.unhandled.len()
    }

    /// Reads a byte without raising aborts; unmapped bytes read as zero.
    #[must_use]
    pub fn peek8(&self, addr: Address) -> u8 {
        self.rom_slice(addr, 1)
            .or_else(|| self.ram_slice(addr, 1))
            .map_or(0, |bytes| bytes[0])
    }

    /// Reads a big-endian word without raising aborts; unmapped bytes read as zero.
    #[must_use]
    pub fn peek32(&self, addr: Address) -> u32 {
        let mut word = [0; 4];
        for (lane, addr) in word.iter_mut().zip(addr.get()..) {
            *lane = self.peek8(Address(addr));
        }
        u32::from_be_bytes(word)
    }

    /// Reads `len` bytes without raising aborts.
    #[must_use]
    pub fn peek_bytes(&self, addr: Address, len: usize) -> Vec<u8> {
        (addr.get()..)
            .take(len)
            .map(|addr| self.peek8(Address(addr)))
            .collect()
    }

    /// Writes a byte of mapped memory without raising aborts.
    ///
    /// Returns `false` when `addr` is not mapped.
    pub fn poke8(&mut self, addr: Address, value: u8) -> bool {
        self.ram_slice_mut(addr, 1).is_some_and(|bytes| {
            bytes[0] = value;
            true
        })
    }

    /// Writes a big-endian word of mapped memory without raising aborts.
    ///
    /// Returns `false` when any byte of the word is not mapped.
    pub fn poke32(&mut self, addr: Address, value: u32) -> bool {
        self.ram_slice_mut(addr, WORD_BYTES).is_some_and(|bytes| {
            bytes.copy_from_slice(&value.to_be_bytes());
            true
        })
    }

    const fn bank_index(bank: RomBank) -> usize {
        match bank {
            RomBank::Bank1 => 0,
            RomBank::Bank2 => 1,
        }
    }

    const fn bank_base(&self, bank: RomBank) -> Address {
        match bank {
            RomBank::Bank1 => ROM1_START,
            RomBank::Bank2 => self.rom2_base,
        }
    }

    fn rom_slice(&self, addr: Address, len: u32) -> Option<&[u8]> {
        let image = &self.roms[Self::bank_index(self.active_bank)];
        let start = addr.get().checked_sub(self.bank_base(self.active_bank).get())?;
        let start = usize::try_from(start).ok()?;
        let end = start.checked_add(usize::try_from(len).ok()?)?;
        image.get(start..end)
    }

    fn ram_slice(&self, addr: Address, len: u32) -> Option<&[u8]> {
        self.windows.iter().find_map(|window| {
            let start = window.slot(addr, len)?;
            window.bytes.get(start..start + usize::try_from(len).ok()?)
        })
    }

    fn ram_slice_mut(&mut self, addr: Address, len: u32) -> Option<&mut [u8]> {
        self.windows.iter_mut().find_map(|window| {
            let start = window.slot(addr, len)?;
            window.bytes.get_mut(start..start + usize::try_from(len).ok()?)
        })
    }

    fn is_rom(&self, addr: Address) -> bool {
        [RomBank::Bank1, RomBank::Bank2].into_iter().any(|bank| {
            let image = &self.roms[Self::bank_index(bank)];
            addr.get()
                .checked_sub(self.bank_base(bank).get())
                .and_then(|rel| usize::try_from(rel).ok())
                .is_some_and(|rel| rel < image.len())
        })
    }

    fn abort(&mut self, addr: Address) -> BusFault {
        let handler = self.handler;
        if handler.catch.is_some() {
            self.handler.catch = None;
            self.caught.push(addr);
            if !handler.quiet.contains(QuietAborts::ROM_FAULT) {
                self.diagnostics.push(addr);
            }
            BusFault::DataAbort(addr)
        } else {
            self.unhandled.push(addr);
            self.diagnostics.push(addr);
            BusFault::Unhandled(addr)
        }
    }

    fn read(&mut self, addr: Address, len: u32) -> Result<&[u8], BusFault> {
        if self.injected.contains(&addr)
            || (self.rom_slice(addr, len).is_none() && self.ram_slice(addr, len).is_none())
        {
            return Err(self.abort(addr));
        }
        self.rom_slice(addr, len)
            .or_else(|| self.ram_slice(addr, len))
            .ok_or(BusFault::Unhandled(addr))
    }

    fn write(&mut self, addr: Address, bytes: &[u8]) -> Result<(), BusFault> {
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        if self.injected.contains(&addr) || self.is_rom(addr) {
            return Err(self.abort(addr));
        }
        match self.ram_slice_mut(addr, len) {
            Some(slot) => {
                slot.copy_from_slice(bytes);
                Ok(())
            }
            None => Err(self.abort(addr)),
        }
    }
}

impl PhysicalBus for SimulatedPlatform {
    fn read8(&mut self, addr: Address) -> Result<u8, BusFault> {
        self.read(addr, 1).map(|bytes| bytes[0])
    }

    fn read32(&mut self, addr: Address) -> Result<u32, BusFault> {
        let bytes = self.read(addr, WORD_BYTES)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn write8(&mut self, addr: Address, value: u8) -> Result<(), BusFault> {
        self.write(addr, &[value])
    }

    fn write32(&mut self, addr: Address, value: u32) -> Result<(), BusFault> {
        self.write(addr, &value.to_be_bytes())
    }
}

impl AbortControl for SimulatedPlatform {
    fn abort_handler(&self) -> AbortHandler {
        self.handler
    }

    fn install_abort_handler(&mut self, handler: AbortHandler) {
        self.handler = handler;
    }
}

impl SysInfo for SimulatedPlatform {
    fn set_active_rom_bank(&mut self, bank: RomBank) -> Result<(), PlatformError> {
        if self.refuse_bank_select {
            return Err(PlatformError::BankSwitchRefused(bank));
        }
        self.active_bank = bank;
        self.bank_selects.push(bank);
        Ok(())
    }

    fn rom_bank2_base(&mut self) -> Result<Address, PlatformError> {
        if self.refuse_rom2_query {
            return Err(PlatformError::BaseQueryFailed);
        }
        Ok(self.rom2_base)
    }
}
