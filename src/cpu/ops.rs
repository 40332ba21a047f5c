//! Opcode Side-Effect Functions
//!
//! Referenced by the opcode table; each receives the executing context
//! and its resolved operand. Cycle costs live in the table, except branch
//! penalties which depend on whether the branch is taken.

use super::exec::{Exec, Operand};
use super::flags;
use super::vectors;

// ========== Loads and stores ==========

pub fn lda(e: &mut Exec<'_>, op: Operand) {
    e.cpu.a = e.load(op);
    e.cpu.set_zn(e.cpu.a);
}

pub fn ldx(e: &mut Exec<'_>, op: Operand) {
    e.cpu.x = e.load(op);
    e.cpu.set_zn(e.cpu.x);
}

pub fn ldy(e: &mut Exec<'_>, op: Operand) {
    e.cpu.y = e.load(op);
    e.cpu.set_zn(e.cpu.y);
}

pub fn sta(e: &mut Exec<'_>, op: Operand) {
    let a = e.cpu.a;
    e.store(op, a);
}

pub fn stx(e: &mut Exec<'_>, op: Operand) {
    let x = e.cpu.x;
    e.store(op, x);
}

pub fn sty(e: &mut Exec<'_>, op: Operand) {
    let y = e.cpu.y;
    e.store(op, y);
}

// ========== Arithmetic ==========

pub fn adc(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op);
    let carry_in = u16::from(e.cpu.flag(flags::CARRY));
    let a = u16::from(e.cpu.a);
    let v = u16::from(value);
    let bin = a + v + carry_in;

    if e.cpu.flag(flags::DECIMAL) {
        e.cpu.set_flag(flags::ZERO, bin as u8 == 0);
        let mut lo = (a & 0x0F) + (v & 0x0F) + carry_in;
        let mut hi = (a >> 4) + (v >> 4);
        if lo > 0x09 {
            lo += 0x06;
            hi += 1;
        }
        let pre = ((hi << 4) | (lo & 0x0F)) as u8;
        e.cpu.set_flag(flags::NEGATIVE, pre & 0x80 != 0);
        e.cpu
            .set_flag(flags::OVERFLOW, (a as u8 ^ pre) & (value ^ pre) & 0x80 != 0);
        if hi > 0x09 {
            hi += 0x06;
        }
        e.cpu.set_flag(flags::CARRY, hi > 0x0F);
        e.cpu.a = ((hi << 4) | (lo & 0x0F)) as u8;
    } else {
        e.cpu.set_flag(flags::CARRY, bin > 0xFF);
        e.cpu
            .set_flag(flags::OVERFLOW, (a ^ bin) & (v ^ bin) & 0x80 != 0);
        e.cpu.a = bin as u8;
        e.cpu.set_zn(e.cpu.a);
    }
}

pub fn sbc(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op);
    let borrow = u16::from(!e.cpu.flag(flags::CARRY));
    let a = u16::from(e.cpu.a);
    let v = u16::from(value);
    let bin = a.wrapping_sub(v).wrapping_sub(borrow);

    // Flags always come from the binary subtraction
    e.cpu.set_flag(flags::CARRY, bin <= 0xFF);
    e.cpu
        .set_flag(flags::OVERFLOW, (a ^ v) & (a ^ bin) & 0x80 != 0);
    e.cpu.set_zn(bin as u8);

    if e.cpu.flag(flags::DECIMAL) {
        let mut lo = (a & 0x0F) as i16 - (v & 0x0F) as i16 - borrow as i16;
        let mut hi = (a >> 4) as i16 - (v >> 4) as i16;
        if lo < 0 {
            lo -= 0x06;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 0x06;
        }
        e.cpu.a = (((hi << 4) as u8) & 0xF0) | ((lo as u8) & 0x0F);
    } else {
        e.cpu.a = bin as u8;
    }
}

fn compare(e: &mut Exec<'_>, reg: u8, op: Operand) {
    let value = e.load(op);
    let result = reg.wrapping_sub(value);
    e.cpu.set_flag(flags::CARRY, reg >= value);
    e.cpu.set_zn(result);
}

pub fn cmp(e: &mut Exec<'_>, op: Operand) {
    let a = e.cpu.a;
    compare(e, a, op);
}

pub fn cpx(e: &mut Exec<'_>, op: Operand) {
    let x = e.cpu.x;
    compare(e, x, op);
}

pub fn cpy(e: &mut Exec<'_>, op: Operand) {
    let y = e.cpu.y;
    compare(e, y, op);
}

// ========== Logic ==========

pub fn and(e: &mut Exec<'_>, op: Operand) {
    e.cpu.a &= e.load(op);
    e.cpu.set_zn(e.cpu.a);
}

pub fn ora(e: &mut Exec<'_>, op: Operand) {
    e.cpu.a |= e.load(op);
    e.cpu.set_zn(e.cpu.a);
}

pub fn eor(e: &mut Exec<'_>, op: Operand) {
    e.cpu.a ^= e.load(op);
    e.cpu.set_zn(e.cpu.a);
}

pub fn bit(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op);
    e.cpu.set_flag(flags::ZERO, e.cpu.a & value == 0);
    e.cpu.set_flag(flags::NEGATIVE, value & 0x80 != 0);
    e.cpu.set_flag(flags::OVERFLOW, value & 0x40 != 0);
}

// ========== Read-modify-write ==========

pub fn inc(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op).wrapping_add(1);
    e.store(op, value);
    e.cpu.set_zn(value);
}

pub fn dec(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op).wrapping_sub(1);
    e.store(op, value);
    e.cpu.set_zn(value);
}

pub fn asl(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op);
    let result = value << 1;
    e.cpu.set_flag(flags::CARRY, value & 0x80 != 0);
    e.store(op, result);
    e.cpu.set_zn(result);
}

pub fn lsr(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op);
    let result = value >> 1;
    e.cpu.set_flag(flags::CARRY, value & 0x01 != 0);
    e.store(op, result);
    e.cpu.set_zn(result);
}

pub fn rol(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op);
    let result = (value << 1) | u8::from(e.cpu.flag(flags::CARRY));
    e.cpu.set_flag(flags::CARRY, value & 0x80 != 0);
    e.store(op, result);
    e.cpu.set_zn(result);
}

pub fn ror(e: &mut Exec<'_>, op: Operand) {
    let value = e.load(op);
    let result = (value >> 1) | (u8::from(e.cpu.flag(flags::CARRY)) << 7);
    e.cpu.set_flag(flags::CARRY, value & 0x01 != 0);
    e.store(op, result);
    e.cpu.set_zn(result);
}

// ========== Control flow ==========

pub fn jmp(e: &mut Exec<'_>, op: Operand) {
    let Operand::Addr(addr) = op else {
        unreachable!("JMP without an address")
    };
    e.cpu.pc = addr;
}

pub fn jsr(e: &mut Exec<'_>, op: Operand) {
    let Operand::Addr(addr) = op else {
        unreachable!("JSR without an address")
    };
    let ret = e.cpu.pc.wrapping_sub(1);
    e.push((ret >> 8) as u8);
    e.push(ret as u8);
    e.cpu.pc = addr;
}

pub fn rts(e: &mut Exec<'_>, _op: Operand) {
    let lo = u16::from(e.pop());
    let hi = u16::from(e.pop());
    e.cpu.pc = ((hi << 8) | lo).wrapping_add(1);
}

pub fn rti(e: &mut Exec<'_>, _op: Operand) {
    let p = e.pop();
    e.cpu.p = (p & !flags::BREAK) | flags::UNUSED;
    let lo = u16::from(e.pop());
    let hi = u16::from(e.pop());
    e.cpu.pc = (hi << 8) | lo;
}

pub fn brk(e: &mut Exec<'_>, _op: Operand) {
    // BRK skips a padding byte and services through the IRQ vector
    let ret = e.cpu.pc.wrapping_add(1);
    e.push((ret >> 8) as u8);
    e.push(ret as u8);
    let pushed = e.cpu.p | flags::BREAK | flags::UNUSED;
    e.push(pushed);
    e.cpu.set_flag(flags::IRQ_DISABLE, true);
    let lo = u16::from(e.read(vectors::IRQ));
    let hi = u16::from(e.read(vectors::IRQ + 1));
    e.cpu.pc = (hi << 8) | lo;
}

fn branch(e: &mut Exec<'_>, op: Operand, take: bool) {
    let Operand::Rel(offset) = op else {
        unreachable!("branch without a relative operand")
    };
    if !take {
        return;
    }
    let old = e.cpu.pc;
    let new = old.wrapping_add(offset as i16 as u16);
    e.cpu.pc = new;
    e.extra += 1;
    if old & 0xFF00 != new & 0xFF00 {
        e.extra += 1;
    } else {
        // Taken branch, same page: interrupt recognition at the next
        // boundary is narrowed by one cycle
        e.cpu.branch_delay = true;
    }
}

pub fn bcc(e: &mut Exec<'_>, op: Operand) {
    let take = !e.cpu.flag(flags::CARRY);
    branch(e, op, take);
}

pub fn bcs(e: &mut Exec<'_>, op: Operand) {
    let take = e.cpu.flag(flags::CARRY);
    branch(e, op, take);
}

pub fn beq(e: &mut Exec<'_>, op: Operand) {
    let take = e.cpu.flag(flags::ZERO);
    branch(e, op, take);
}

pub fn bne(e: &mut Exec<'_>, op: Operand) {
    let take = !e.cpu.flag(flags::ZERO);
    branch(e, op, take);
}

pub fn bmi(e: &mut Exec<'_>, op: Operand) {
    let take = e.cpu.flag(flags::NEGATIVE);
    branch(e, op, take);
}

pub fn bpl(e: &mut Exec<'_>, op: Operand) {
    let take = !e.cpu.flag(flags::NEGATIVE);
    branch(e, op, take);
}

pub fn bvs(e: &mut Exec<'_>, op: Operand) {
    let take = e.cpu.flag(flags::OVERFLOW);
    branch(e, op, take);
}

pub fn bvc(e: &mut Exec<'_>, op: Operand) {
    let take = !e.cpu.flag(flags::OVERFLOW);
    branch(e, op, take);
}

// ========== Stack ==========

pub fn pha(e: &mut Exec<'_>, _op: Operand) {
    let a = e.cpu.a;
    e.push(a);
}

pub fn php(e: &mut Exec<'_>, _op: Operand) {
    let p = e.cpu.p | flags::BREAK | flags::UNUSED;
    e.push(p);
}

pub fn pla(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.a = e.pop();
    e.cpu.set_zn(e.cpu.a);
}

pub fn plp(e: &mut Exec<'_>, _op: Operand) {
    let was_masked = e.cpu.flag(flags::IRQ_DISABLE);
    let p = e.pop();
    e.cpu.p = (p & !flags::BREAK) | flags::UNUSED;
    if was_masked && !e.cpu.flag(flags::IRQ_DISABLE) {
        e.cpu.irq_inhibit_once = true;
    }
}

// ========== Transfers ==========

pub fn tax(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.x = e.cpu.a;
    e.cpu.set_zn(e.cpu.x);
}

pub fn txa(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.a = e.cpu.x;
    e.cpu.set_zn(e.cpu.a);
}

pub fn tay(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.y = e.cpu.a;
    e.cpu.set_zn(e.cpu.y);
}

pub fn tya(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.a = e.cpu.y;
    e.cpu.set_zn(e.cpu.a);
}

pub fn tsx(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.x = e.cpu.sp;
    e.cpu.set_zn(e.cpu.x);
}

pub fn txs(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.sp = e.cpu.x;
}

// ========== Increments and decrements ==========

pub fn inx(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.x = e.cpu.x.wrapping_add(1);
    e.cpu.set_zn(e.cpu.x);
}

pub fn iny(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.y = e.cpu.y.wrapping_add(1);
    e.cpu.set_zn(e.cpu.y);
}

pub fn dex(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.x = e.cpu.x.wrapping_sub(1);
    e.cpu.set_zn(e.cpu.x);
}

pub fn dey(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.y = e.cpu.y.wrapping_sub(1);
    e.cpu.set_zn(e.cpu.y);
}

// ========== Flags ==========

pub fn clc(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.set_flag(flags::CARRY, false);
}

pub fn sec(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.set_flag(flags::CARRY, true);
}

pub fn cli(e: &mut Exec<'_>, _op: Operand) {
    // The mask change lands one instruction late (hardware polls before
    // the flag update commits)
    if e.cpu.flag(flags::IRQ_DISABLE) {
        e.cpu.irq_inhibit_once = true;
    }
    e.cpu.set_flag(flags::IRQ_DISABLE, false);
}

pub fn sei(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.set_flag(flags::IRQ_DISABLE, true);
}

pub fn clv(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.set_flag(flags::OVERFLOW, false);
}

pub fn cld(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.set_flag(flags::DECIMAL, false);
}

pub fn sed(e: &mut Exec<'_>, _op: Operand) {
    e.cpu.set_flag(flags::DECIMAL, true);
}

pub fn nop(_e: &mut Exec<'_>, _op: Operand) {}

pub fn jam(e: &mut Exec<'_>, _op: Operand) {
    e.jam();
}
