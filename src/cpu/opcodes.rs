//! Opcode Table
//!
//! One entry per opcode: addressing mode, documented base cycle cost,
//! whether an indexed read crossing a page costs an extra cycle, and the
//! side-effect function. The execution loop in `exec.rs` is entirely
//! table-driven; a second CPU family plugs in by supplying its own table.

use super::exec::{Exec, Operand};
use super::ops;

/// Addressing modes of the 6502 family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Imp,
    Acc,
    Imm,
    Zp,
    ZpX,
    ZpY,
    Abs,
    AbsX,
    AbsY,
    IndX,
    IndY,
    /// JMP (addr), with the page-wrap quirk
    Ind,
    Rel,
}

/// Side-effect function for one opcode.
pub type ExecFn = fn(&mut Exec<'_>, Operand);

/// One opcode's decode entry.
#[derive(Debug, Clone, Copy)]
pub struct OpEntry {
    pub mnemonic: &'static str,
    pub mode: AddrMode,
    /// Documented cycle cost before penalties
    pub cycles: u8,
    /// Indexed read costs one more when the effective address crosses a
    /// page
    pub cross_penalty: bool,
    pub exec: ExecFn,
}

pub type OpcodeTable = [OpEntry; 256];

const JAM: OpEntry = OpEntry {
    mnemonic: "JAM",
    mode: AddrMode::Imp,
    cycles: 2,
    cross_penalty: false,
    exec: ops::jam,
};

pub(crate) fn mos6502_table() -> &'static OpcodeTable {
    &MOS6502
}

macro_rules! op {
    ($t:ident, $code:expr, $m:expr, $mode:ident, $cyc:expr, $f:path) => {
        $t[$code] = OpEntry {
            mnemonic: $m,
            mode: AddrMode::$mode,
            cycles: $cyc,
            cross_penalty: false,
            exec: $f,
        };
    };
}

/// Like `op!` but with the page-cross read penalty
macro_rules! opx {
    ($t:ident, $code:expr, $m:expr, $mode:ident, $cyc:expr, $f:path) => {
        $t[$code] = OpEntry {
            mnemonic: $m,
            mode: AddrMode::$mode,
            cycles: $cyc,
            cross_penalty: true,
            exec: $f,
        };
    };
}

/// The official MOS 6502 instruction set. Unassigned opcodes jam.
pub static MOS6502: OpcodeTable = build_mos6502();

const fn build_mos6502() -> OpcodeTable {
    let mut t = [JAM; 256];

    // Loads
    op!(t, 0xA9, "LDA", Imm, 2, ops::lda);
    op!(t, 0xA5, "LDA", Zp, 3, ops::lda);
    op!(t, 0xB5, "LDA", ZpX, 4, ops::lda);
    op!(t, 0xAD, "LDA", Abs, 4, ops::lda);
    opx!(t, 0xBD, "LDA", AbsX, 4, ops::lda);
    opx!(t, 0xB9, "LDA", AbsY, 4, ops::lda);
    op!(t, 0xA1, "LDA", IndX, 6, ops::lda);
    opx!(t, 0xB1, "LDA", IndY, 5, ops::lda);
    op!(t, 0xA2, "LDX", Imm, 2, ops::ldx);
    op!(t, 0xA6, "LDX", Zp, 3, ops::ldx);
    op!(t, 0xB6, "LDX", ZpY, 4, ops::ldx);
    op!(t, 0xAE, "LDX", Abs, 4, ops::ldx);
    opx!(t, 0xBE, "LDX", AbsY, 4, ops::ldx);
    op!(t, 0xA0, "LDY", Imm, 2, ops::ldy);
    op!(t, 0xA4, "LDY", Zp, 3, ops::ldy);
    op!(t, 0xB4, "LDY", ZpX, 4, ops::ldy);
    op!(t, 0xAC, "LDY", Abs, 4, ops::ldy);
    opx!(t, 0xBC, "LDY", AbsX, 4, ops::ldy);

    // Stores
    op!(t, 0x85, "STA", Zp, 3, ops::sta);
    op!(t, 0x95, "STA", ZpX, 4, ops::sta);
    op!(t, 0x8D, "STA", Abs, 4, ops::sta);
    op!(t, 0x9D, "STA", AbsX, 5, ops::sta);
    op!(t, 0x99, "STA", AbsY, 5, ops::sta);
    op!(t, 0x81, "STA", IndX, 6, ops::sta);
    op!(t, 0x91, "STA", IndY, 6, ops::sta);
    op!(t, 0x86, "STX", Zp, 3, ops::stx);
    op!(t, 0x96, "STX", ZpY, 4, ops::stx);
    op!(t, 0x8E, "STX", Abs, 4, ops::stx);
    op!(t, 0x84, "STY", Zp, 3, ops::sty);
    op!(t, 0x94, "STY", ZpX, 4, ops::sty);
    op!(t, 0x8C, "STY", Abs, 4, ops::sty);

    // Arithmetic
    op!(t, 0x69, "ADC", Imm, 2, ops::adc);
    op!(t, 0x65, "ADC", Zp, 3, ops::adc);
    op!(t, 0x75, "ADC", ZpX, 4, ops::adc);
    op!(t, 0x6D, "ADC", Abs, 4, ops::adc);
    opx!(t, 0x7D, "ADC", AbsX, 4, ops::adc);
    opx!(t, 0x79, "ADC", AbsY, 4, ops::adc);
    op!(t, 0x61, "ADC", IndX, 6, ops::adc);
    opx!(t, 0x71, "ADC", IndY, 5, ops::adc);
    op!(t, 0xE9, "SBC", Imm, 2, ops::sbc);
    op!(t, 0xE5, "SBC", Zp, 3, ops::sbc);
    op!(t, 0xF5, "SBC", ZpX, 4, ops::sbc);
    op!(t, 0xED, "SBC", Abs, 4, ops::sbc);
    opx!(t, 0xFD, "SBC", AbsX, 4, ops::sbc);
    opx!(t, 0xF9, "SBC", AbsY, 4, ops::sbc);
    op!(t, 0xE1, "SBC", IndX, 6, ops::sbc);
    opx!(t, 0xF1, "SBC", IndY, 5, ops::sbc);

    // Logic
    op!(t, 0x29, "AND", Imm, 2, ops::and);
    op!(t, 0x25, "AND", Zp, 3, ops::and);
    op!(t, 0x35, "AND", ZpX, 4, ops::and);
    op!(t, 0x2D, "AND", Abs, 4, ops::and);
    opx!(t, 0x3D, "AND", AbsX, 4, ops::and);
    opx!(t, 0x39, "AND", AbsY, 4, ops::and);
    op!(t, 0x21, "AND", IndX, 6, ops::and);
    opx!(t, 0x31, "AND", IndY, 5, ops::and);
    op!(t, 0x09, "ORA", Imm, 2, ops::ora);
    op!(t, 0x05, "ORA", Zp, 3, ops::ora);
    op!(t, 0x15, "ORA", ZpX, 4, ops::ora);
    op!(t, 0x0D, "ORA", Abs, 4, ops::ora);
    opx!(t, 0x1D, "ORA", AbsX, 4, ops::ora);
    opx!(t, 0x19, "ORA", AbsY, 4, ops::ora);
    op!(t, 0x01, "ORA", IndX, 6, ops::ora);
    opx!(t, 0x11, "ORA", IndY, 5, ops::ora);
    op!(t, 0x49, "EOR", Imm, 2, ops::eor);
    op!(t, 0x45, "EOR", Zp, 3, ops::eor);
    op!(t, 0x55, "EOR", ZpX, 4, ops::eor);
    op!(t, 0x4D, "EOR", Abs, 4, ops::eor);
    opx!(t, 0x5D, "EOR", AbsX, 4, ops::eor);
    opx!(t, 0x59, "EOR", AbsY, 4, ops::eor);
    op!(t, 0x41, "EOR", IndX, 6, ops::eor);
    opx!(t, 0x51, "EOR", IndY, 5, ops::eor);

    // Compares
    op!(t, 0xC9, "CMP", Imm, 2, ops::cmp);
    op!(t, 0xC5, "CMP", Zp, 3, ops::cmp);
    op!(t, 0xD5, "CMP", ZpX, 4, ops::cmp);
    op!(t, 0xCD, "CMP", Abs, 4, ops::cmp);
    opx!(t, 0xDD, "CMP", AbsX, 4, ops::cmp);
    opx!(t, 0xD9, "CMP", AbsY, 4, ops::cmp);
    op!(t, 0xC1, "CMP", IndX, 6, ops::cmp);
    opx!(t, 0xD1, "CMP", IndY, 5, ops::cmp);
    op!(t, 0xE0, "CPX", Imm, 2, ops::cpx);
    op!(t, 0xE4, "CPX", Zp, 3, ops::cpx);
    op!(t, 0xEC, "CPX", Abs, 4, ops::cpx);
    op!(t, 0xC0, "CPY", Imm, 2, ops::cpy);
    op!(t, 0xC4, "CPY", Zp, 3, ops::cpy);
    op!(t, 0xCC, "CPY", Abs, 4, ops::cpy);

    // Read-modify-write
    op!(t, 0xE6, "INC", Zp, 5, ops::inc);
    op!(t, 0xF6, "INC", ZpX, 6, ops::inc);
    op!(t, 0xEE, "INC", Abs, 6, ops::inc);
    op!(t, 0xFE, "INC", AbsX, 7, ops::inc);
    op!(t, 0xC6, "DEC", Zp, 5, ops::dec);
    op!(t, 0xD6, "DEC", ZpX, 6, ops::dec);
    op!(t, 0xCE, "DEC", Abs, 6, ops::dec);
    op!(t, 0xDE, "DEC", AbsX, 7, ops::dec);
    op!(t, 0x0A, "ASL", Acc, 2, ops::asl);
    op!(t, 0x06, "ASL", Zp, 5, ops::asl);
    op!(t, 0x16, "ASL", ZpX, 6, ops::asl);
    op!(t, 0x0E, "ASL", Abs, 6, ops::asl);
    op!(t, 0x1E, "ASL", AbsX, 7, ops::asl);
    op!(t, 0x4A, "LSR", Acc, 2, ops::lsr);
    op!(t, 0x46, "LSR", Zp, 5, ops::lsr);
    op!(t, 0x56, "LSR", ZpX, 6, ops::lsr);
    op!(t, 0x4E, "LSR", Abs, 6, ops::lsr);
    op!(t, 0x5E, "LSR", AbsX, 7, ops::lsr);
    op!(t, 0x2A, "ROL", Acc, 2, ops::rol);
    op!(t, 0x26, "ROL", Zp, 5, ops::rol);
    op!(t, 0x36, "ROL", ZpX, 6, ops::rol);
    op!(t, 0x2E, "ROL", Abs, 6, ops::rol);
    op!(t, 0x3E, "ROL", AbsX, 7, ops::rol);
    op!(t, 0x6A, "ROR", Acc, 2, ops::ror);
    op!(t, 0x66, "ROR", Zp, 5, ops::ror);
    op!(t, 0x76, "ROR", ZpX, 6, ops::ror);
    op!(t, 0x6E, "ROR", Abs, 6, ops::ror);
    op!(t, 0x7E, "ROR", AbsX, 7, ops::ror);

    // Bit test
    op!(t, 0x24, "BIT", Zp, 3, ops::bit);
    op!(t, 0x2C, "BIT", Abs, 4, ops::bit);

    // Jumps and subroutines
    op!(t, 0x4C, "JMP", Abs, 3, ops::jmp);
    op!(t, 0x6C, "JMP", Ind, 5, ops::jmp);
    op!(t, 0x20, "JSR", Abs, 6, ops::jsr);
    op!(t, 0x60, "RTS", Imp, 6, ops::rts);
    op!(t, 0x40, "RTI", Imp, 6, ops::rti);
    op!(t, 0x00, "BRK", Imp, 7, ops::brk);

    // Branches (+1 taken, +1 more on page cross, charged by the op)
    op!(t, 0x90, "BCC", Rel, 2, ops::bcc);
    op!(t, 0xB0, "BCS", Rel, 2, ops::bcs);
    op!(t, 0xF0, "BEQ", Rel, 2, ops::beq);
    op!(t, 0xD0, "BNE", Rel, 2, ops::bne);
    op!(t, 0x30, "BMI", Rel, 2, ops::bmi);
    op!(t, 0x10, "BPL", Rel, 2, ops::bpl);
    op!(t, 0x50, "BVC", Rel, 2, ops::bvc);
    op!(t, 0x70, "BVS", Rel, 2, ops::bvs);

    // Stack
    op!(t, 0x48, "PHA", Imp, 3, ops::pha);
    op!(t, 0x08, "PHP", Imp, 3, ops::php);
    op!(t, 0x68, "PLA", Imp, 4, ops::pla);
    op!(t, 0x28, "PLP", Imp, 4, ops::plp);

    // Transfers
    op!(t, 0xAA, "TAX", Imp, 2, ops::tax);
    op!(t, 0x8A, "TXA", Imp, 2, ops::txa);
    op!(t, 0xA8, "TAY", Imp, 2, ops::tay);
    op!(t, 0x98, "TYA", Imp, 2, ops::tya);
    op!(t, 0xBA, "TSX", Imp, 2, ops::tsx);
    op!(t, 0x9A, "TXS", Imp, 2, ops::txs);

    // Increments and decrements
    op!(t, 0xE8, "INX", Imp, 2, ops::inx);
    op!(t, 0xC8, "INY", Imp, 2, ops::iny);
    op!(t, 0xCA, "DEX", Imp, 2, ops::dex);
    op!(t, 0x88, "DEY", Imp, 2, ops::dey);

    // Flags
    op!(t, 0x18, "CLC", Imp, 2, ops::clc);
    op!(t, 0x38, "SEC", Imp, 2, ops::sec);
    op!(t, 0x58, "CLI", Imp, 2, ops::cli);
    op!(t, 0x78, "SEI", Imp, 2, ops::sei);
    op!(t, 0xB8, "CLV", Imp, 2, ops::clv);
    op!(t, 0xD8, "CLD", Imp, 2, ops::cld);
    op!(t, 0xF8, "SED", Imp, 2, ops::sed);

    op!(t, 0xEA, "NOP", Imp, 2, ops::nop);

    t
}
