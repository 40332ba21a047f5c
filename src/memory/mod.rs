//! Address-Range Memory Dispatch
//!
//! Routes CPU bus accesses to the appropriate backing store by 256-byte
//! page. Each page is mapped at configuration time to RAM, ROM, open bus,
//! or I/O; the per-access cost is one table lookup plus a match, which
//! preserves range-segmented dispatch performance without a global
//! dispatch table.
//!
//! Device registers (the interval timer, the drive's rotation logic) take
//! the current clock and the domain's alarm context on access so they can
//! arm and disarm alarms.

use crate::alarm::AlarmContext;
use crate::clock::Clock;
use crate::cpu::IrqStatus;
use crate::timer::{DiskRotation, IntervalTimer};
use serde::{Deserialize, Serialize};

/// Page size of the dispatch table (one 6502 page)
pub const PAGE_SIZE: usize = 256;
/// Number of pages in the 16-bit address space
pub const PAGE_COUNT: usize = 256;

/// What a page of the address space is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageTarget {
    Ram,
    Rom,
    /// Unmapped: reads return the last value seen on the bus
    OpenBus,
    /// Device registers, routed by address within the page
    Io,
}

/// One domain's memory map plus the devices that live on it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Bus {
    pages: Vec<PageTarget>,

    /// 64KB backing RAM
    pub ram: Box<[u8]>,

    /// ROM image, read-only, mapped at `rom_base`
    #[serde(skip)]
    rom: Vec<u8>,
    rom_base: u16,

    /// Last value driven onto the bus; what open-bus reads return
    open_latch: u8,

    /// Programmable interval timer
    pub timer: IntervalTimer,
    timer_base: u16,

    /// Disk-rotation cadence (meaningful on drive domains)
    pub rotation: DiskRotation,
    rotation_base: u16,

    /// This domain's interrupt lines
    pub irq: IrqStatus,
}

impl Bus {
    /// Create a bus with every page open and no ROM loaded.
    pub fn new(timer_base: u16, rotation_base: u16, cycles_per_byte: Clock) -> Self {
        Self {
            pages: vec![PageTarget::OpenBus; PAGE_COUNT],
            ram: vec![0; PAGE_COUNT * PAGE_SIZE].into_boxed_slice(),
            rom: Vec::new(),
            rom_base: 0,
            open_latch: 0xFF,
            timer: IntervalTimer::new(),
            timer_base,
            rotation: DiskRotation::new(cycles_per_byte),
            rotation_base,
            irq: IrqStatus::new(),
        }
    }

    /// Map an address range to a target. Both bounds are inclusive and
    /// must span whole pages: range dispatch is selected per page.
    pub fn map_region(&mut self, start: u16, end: u16, target: PageTarget) {
        assert!(start <= end, "empty region {start:#06x}..={end:#06x}");
        assert!(
            start % PAGE_SIZE as u16 == 0 && end % PAGE_SIZE as u16 == PAGE_SIZE as u16 - 1,
            "region {start:#06x}..={end:#06x} not page-aligned"
        );
        for page in (start as usize / PAGE_SIZE)..=(end as usize / PAGE_SIZE) {
            self.pages[page] = target;
        }
    }

    /// Attach a ROM image at `base`. Reads beyond its length float.
    pub fn attach_rom(&mut self, base: u16, data: &[u8]) {
        self.rom_base = base;
        self.rom = data.to_vec();
    }

    /// Move runtime wiring (the ROM image, the devices' alarm bindings)
    /// from a live bus into this freshly deserialized one. Snapshots do
    /// not carry either.
    pub(crate) fn carry_runtime_state(&mut self, live: &mut Bus) {
        self.rom = std::mem::take(&mut live.rom);
        if let Some(alarm) = live.timer.alarm_id() {
            self.timer.attach(alarm);
        }
        if let Some(alarm) = live.rotation.alarm_id() {
            self.rotation.attach(alarm);
        }
    }

    /// Read a byte from the memory map
    pub fn read(&mut self, addr: u16, clock: Clock, alarms: &mut AlarmContext<Bus>) -> u8 {
        let value = match self.pages[addr as usize / PAGE_SIZE] {
            PageTarget::Ram => self.ram[addr as usize],
            PageTarget::Rom => self.read_rom(addr),
            PageTarget::OpenBus => self.open_latch,
            PageTarget::Io => self.read_io(addr, clock, alarms),
        };
        self.open_latch = value;
        value
    }

    /// Write a byte to the memory map
    pub fn write(&mut self, addr: u16, value: u8, clock: Clock, alarms: &mut AlarmContext<Bus>) {
        self.open_latch = value;
        match self.pages[addr as usize / PAGE_SIZE] {
            PageTarget::Ram => self.ram[addr as usize] = value,
            PageTarget::Rom => {} // ROM ignores writes
            PageTarget::OpenBus => {}
            PageTarget::Io => self.write_io(addr, value, clock, alarms),
        }
    }

    fn read_rom(&self, addr: u16) -> u8 {
        let offset = addr.wrapping_sub(self.rom_base) as usize;
        if offset < self.rom.len() {
            self.rom[offset]
        } else {
            self.open_latch
        }
    }

    fn read_io(&mut self, addr: u16, clock: Clock, alarms: &mut AlarmContext<Bus>) -> u8 {
        if (self.timer_base..self.timer_base + 4).contains(&addr) {
            let offset = addr - self.timer_base;
            let Self { timer, irq, .. } = self;
            timer.read_reg(offset, clock, alarms, irq)
        } else if (self.rotation_base..self.rotation_base + 2).contains(&addr) {
            self.rotation.read_reg(addr - self.rotation_base)
        } else {
            self.open_latch
        }
    }

    fn write_io(&mut self, addr: u16, value: u8, clock: Clock, alarms: &mut AlarmContext<Bus>) {
        if (self.timer_base..self.timer_base + 4).contains(&addr) {
            self.timer
                .write_reg(addr - self.timer_base, value, clock, alarms);
        } else if (self.rotation_base..self.rotation_base + 2).contains(&addr) {
            self.rotation
                .write_reg(addr - self.rotation_base, value, clock, alarms);
        }
    }
}

#[cfg(test)]
mod tests_bus;
