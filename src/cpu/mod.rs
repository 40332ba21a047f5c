//! Cycle-Stepped CPU Core
//!
//! A generic fetch-decode-execute loop for 6502-family processors,
//! parameterized by an opcode table of {addressing mode, cycle cost,
//! side-effect function}. The loop charges every bus access one cycle as
//! it happens and re-checks the domain's alarms at each of those
//! boundaries, so a timer can expire in the middle of a multi-cycle
//! instruction.
//!
//! Illegal opcodes are a modeled CPU state (jammed), not an error.

use serde::{Deserialize, Serialize};

mod exec;
mod irq;
mod opcodes;
mod ops;

pub use exec::{run_until, Exec};
pub use irq::{Interrupt, IrqStatus, RECOGNITION_CYCLES};
pub use opcodes::{AddrMode, OpEntry, OpcodeTable, MOS6502};

/// Status register bits
pub mod flags {
    pub const CARRY: u8 = 0b0000_0001;
    pub const ZERO: u8 = 0b0000_0010;
    pub const IRQ_DISABLE: u8 = 0b0000_0100;
    pub const DECIMAL: u8 = 0b0000_1000;
    pub const BREAK: u8 = 0b0001_0000;
    pub const UNUSED: u8 = 0b0010_0000; // always reads as set
    pub const OVERFLOW: u8 = 0b0100_0000;
    pub const NEGATIVE: u8 = 0b1000_0000;
}

/// Interrupt vectors
pub mod vectors {
    pub const NMI: u16 = 0xFFFA;
    pub const RESET: u16 = 0xFFFC;
    pub const IRQ: u16 = 0xFFFE;
}

/// IRQ service sequence length in cycles (also NMI and BRK)
pub const INTERRUPT_CYCLES: u8 = 7;
/// RESET sequence length in cycles
pub const RESET_CYCLES: u8 = 7;

/// What the execution loop is doing at an instruction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecState {
    /// Waiting for the reset sequence to run
    Reset,
    Running,
    /// Hit an illegal opcode; burns cycles until reset (see [`JamPolicy`])
    Jammed,
    /// Transient: an interrupt was recognized and is being serviced
    InterruptPending(Interrupt),
    /// Parked for the host to inspect; resume with the machine's
    /// trap acknowledgement
    TrapPending,
}

/// What an illegal opcode does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JamPolicy {
    /// Burn cycles forever; alarms keep firing
    #[default]
    Halt,
    /// Raise a RESET-kind interrupt through the ordinary recognition path
    Reset,
}

/// 6502-family register file and loop bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub p: u8,

    pub state: ExecState,
    pub jam_policy: JamPolicy,

    /// Last instruction was a taken branch with no page crossing, which
    /// narrows the next boundary's interrupt recognition window by one
    /// cycle
    pub(crate) branch_delay: bool,
    /// The IRQ mask was just cleared; the change lands one instruction
    /// later
    pub(crate) irq_inhibit_once: bool,

    /// Per-family opcode table (the loop's parameterization point)
    #[serde(skip, default = "opcodes::mos6502_table")]
    table: &'static OpcodeTable,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// A CPU in pre-reset state using the MOS 6502 table.
    pub fn new() -> Self {
        Self::with_table(&MOS6502)
    }

    /// A CPU driven by a different family's opcode table.
    pub fn with_table(table: &'static OpcodeTable) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            p: flags::IRQ_DISABLE | flags::UNUSED,
            state: ExecState::Reset,
            jam_policy: JamPolicy::default(),
            branch_delay: false,
            irq_inhibit_once: false,
            table,
        }
    }

    /// Apply the documented RESET register pattern. The program counter
    /// is loaded from the reset vector by the service sequence.
    pub fn reset_registers(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.p = flags::IRQ_DISABLE | flags::UNUSED;
        self.branch_delay = false;
        self.irq_inhibit_once = false;
    }

    pub fn flag(&self, flag: u8) -> bool {
        self.p & flag != 0
    }

    pub fn set_flag(&mut self, flag: u8, value: bool) {
        if value {
            self.p |= flag;
        } else {
            self.p &= !flag;
        }
    }

    /// Set zero and negative from a result byte
    pub(crate) fn set_zn(&mut self, value: u8) {
        self.set_flag(flags::ZERO, value == 0);
        self.set_flag(flags::NEGATIVE, value & 0x80 != 0);
    }

    pub(crate) fn table(&self) -> &'static OpcodeTable {
        self.table
    }

    /// Cycle cost of an opcode before penalties, from the family table
    pub fn base_cycles(&self, opcode: u8) -> u8 {
        self.table[opcode as usize].cycles
    }
}

#[cfg(test)]
mod tests_interrupts;
