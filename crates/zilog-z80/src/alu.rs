//! ALU operations for the Z80.
//!
//! Every helper is pure: it takes the operands and the current flag byte
//! and returns the result together with the new flag byte. Flags the
//! operation does not define are passed through untouched, including the
//! undocumented bits 3 and 5.

#![allow(clippy::verbose_bit_mask)] // Clearer to read mask comparisons.

use crate::flags::{CF, HF, NF, PF, SF, ZF, set_if, with_szp};

/// Result of an ALU operation with flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// Shared 8-bit add/subtract.
///
/// `x = a ^ b ^ result` carries the per-bit carries: bit 4 is the half
/// carry, bit 8 the carry out, and bit 7 XOR bit 8 the signed overflow.
fn arith8(a: u8, b: u8, carry: bool, subtract: bool, f: u8) -> AluResult {
    let c = u16::from(carry);
    let s = if subtract {
        u16::from(a).wrapping_sub(u16::from(b)).wrapping_sub(c)
    } else {
        u16::from(a) + u16::from(b) + c
    };
    let x = u16::from(a) ^ u16::from(b) ^ s;
    let value = s as u8;

    let mut flags = with_szp(f, value) & !(NF | CF | HF | PF);
    if subtract {
        flags |= NF;
    }
    if s & 0x100 != 0 {
        flags |= CF;
    }
    if x & 0x10 != 0 {
        flags |= HF;
    }
    if (x ^ (x >> 1)) & 0x80 != 0 {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// ADD A, n.
#[must_use]
pub fn add8(a: u8, b: u8, f: u8) -> AluResult {
    arith8(a, b, false, false, f)
}

/// ADC A, n - carry in from the current flags.
#[must_use]
pub fn adc8(a: u8, b: u8, f: u8) -> AluResult {
    arith8(a, b, f & CF != 0, false, f)
}

/// SUB n.
#[must_use]
pub fn sub8(a: u8, b: u8, f: u8) -> AluResult {
    arith8(a, b, false, true, f)
}

/// SBC A, n - borrow in from the current flags.
#[must_use]
pub fn sbc8(a: u8, b: u8, f: u8) -> AluResult {
    arith8(a, b, f & CF != 0, true, f)
}

/// CP n. Flags of `a - b`; the accumulator is left alone by the caller.
#[must_use]
pub fn cp8(a: u8, b: u8, f: u8) -> u8 {
    arith8(a, b, false, true, f).flags
}

/// Increment byte. Carry is preserved.
#[must_use]
pub fn inc8(a: u8, f: u8) -> AluResult {
    let value = a.wrapping_add(1);
    let mut flags = with_szp(f, value) & !(NF | PF | HF);
    if a & 0x0F == 0x0F {
        flags |= HF;
    }
    if a == 0x7F {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// Decrement byte. Carry is preserved.
#[must_use]
pub fn dec8(a: u8, f: u8) -> AluResult {
    let value = a.wrapping_sub(1);
    let mut flags = (with_szp(f, value) & !(PF | HF)) | NF;
    if a & 0x0F == 0x00 {
        flags |= HF;
    }
    if a == 0x80 {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// AND operation. H is always set.
#[must_use]
pub fn and8(a: u8, b: u8, f: u8) -> AluResult {
    let value = a & b;
    AluResult {
        value,
        flags: (with_szp(f, value) & !(CF | NF)) | HF,
    }
}

/// OR operation.
#[must_use]
pub fn or8(a: u8, b: u8, f: u8) -> AluResult {
    let value = a | b;
    AluResult {
        value,
        flags: with_szp(f, value) & !(CF | NF | HF),
    }
}

/// XOR operation.
#[must_use]
pub fn xor8(a: u8, b: u8, f: u8) -> AluResult {
    let value = a ^ b;
    AluResult {
        value,
        flags: with_szp(f, value) & !(CF | NF | HF),
    }
}

/// One of the eight accumulator ALU operations, selected by bits 5-3 of
/// the opcode (ADD, ADC, SUB, SBC, AND, XOR, OR, CP).
///
/// For CP the returned value is the unchanged accumulator.
#[must_use]
pub fn alu8(op: u8, a: u8, b: u8, f: u8) -> AluResult {
    match op & 7 {
        0 => add8(a, b, f),
        1 => adc8(a, b, f),
        2 => sub8(a, b, f),
        3 => sbc8(a, b, f),
        4 => and8(a, b, f),
        5 => xor8(a, b, f),
        6 => or8(a, b, f),
        7 => AluResult {
            value: a,
            flags: cp8(a, b, f),
        },
        _ => unreachable!(),
    }
}

/// 16-bit add for HL/IX/IY. Only H, N and C change.
#[must_use]
pub fn add16(a: u16, b: u16, f: u8) -> (u16, u8) {
    let s = u32::from(a) + u32::from(b);
    let x = (u32::from(a) ^ u32::from(b) ^ s) >> 8;

    let mut flags = f & !(NF | HF | CF);
    if x & 0x10 != 0 {
        flags |= HF;
    }
    if x & 0x100 != 0 {
        flags |= CF;
    }
    (s as u16, flags)
}

/// Shared 16-bit add/subtract with carry. Sets S, Z, H, P/V, N and C.
fn arith16(a: u16, b: u16, subtract: bool, f: u8) -> (u16, u8) {
    let c = u32::from(f & CF);
    let s = if subtract {
        u32::from(a).wrapping_sub(u32::from(b)).wrapping_sub(c)
    } else {
        u32::from(a) + u32::from(b) + c
    };
    let x = (u32::from(a) ^ u32::from(b) ^ s) >> 8;
    let value = s as u16;

    let mut flags = f & !(SF | ZF | HF | PF | NF | CF);
    if subtract {
        flags |= NF;
    }
    if x & 0x100 != 0 {
        flags |= CF;
    }
    if x & 0x10 != 0 {
        flags |= HF;
    }
    if value == 0 {
        flags |= ZF;
    }
    if value & 0x8000 != 0 {
        flags |= SF;
    }
    if (x ^ (x >> 1)) & 0x80 != 0 {
        flags |= PF;
    }
    (value, flags)
}

/// 16-bit add with carry for HL.
#[must_use]
pub fn adc16(a: u16, b: u16, f: u8) -> (u16, u8) {
    arith16(a, b, false, f)
}

/// 16-bit subtract with borrow for HL.
#[must_use]
pub fn sbc16(a: u16, b: u16, f: u8) -> (u16, u8) {
    arith16(a, b, true, f)
}

/// Decimal adjust after BCD add or subtract.
///
/// N selects the correction direction. The half-carry is recomputed from
/// the low nibble, carry is only ever set (never cleared) and S, Z and P/V
/// come from the corrected value.
#[must_use]
pub fn daa(a: u8, f: u8) -> AluResult {
    let lo = a & 0x0F;
    let mut acc = i16::from(a);
    let mut flags = f;

    if f & NF != 0 {
        let adjust_high = f & CF != 0 || a > 0x99;
        if f & HF != 0 || lo > 9 {
            if lo > 5 {
                flags &= !HF;
            }
            acc = (acc - 6) & 0xFF;
        }
        if adjust_high {
            acc -= 0x160;
        }
    } else {
        if f & HF != 0 || lo > 9 {
            flags = set_if(flags, HF, lo > 9);
            acc += 6;
        }
        if f & CF != 0 || (acc & 0x1F0) > 0x90 {
            acc += 0x60;
        }
    }

    let value = acc as u8;
    flags = with_szp(flags, value);
    if acc & 0x100 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// One of the eight CB-page rotate/shift operations, selected by bits 5-3
/// (RLC, RRC, RL, RR, SLA, SRA, SLL, SRL).
///
/// SLL is the undocumented shift that feeds a 1 into bit 0.
#[must_use]
pub fn shift8(op: u8, v: u8, f: u8) -> AluResult {
    let carry_in = f & CF;
    let (value, carry) = match op & 7 {
        0 => (v.rotate_left(1), v >> 7),
        1 => (v.rotate_right(1), v & 1),
        2 => ((v << 1) | carry_in, v >> 7),
        3 => ((v >> 1) | (carry_in << 7), v & 1),
        4 => (v << 1, v >> 7),
        5 => ((v >> 1) | (v & 0x80), v & 1),
        6 => ((v << 1) | 1, v >> 7),
        7 => (v >> 1, v & 1),
        _ => unreachable!(),
    };
    AluResult {
        value,
        flags: with_szp((f & !(NF | HF | CF)) | carry, value),
    }
}

/// RLCA/RRCA/RLA/RRA (op 0-3). Only H, N and C change.
#[must_use]
pub fn rotate_acc(op: u8, a: u8, f: u8) -> AluResult {
    let shifted = shift8(op & 3, a, f);
    AluResult {
        value: shifted.value,
        flags: (f & !(HF | NF | CF)) | (shifted.flags & CF),
    }
}

/// BIT n, v. Z reflects the tested bit, H is set, N cleared; nothing else
/// changes.
#[must_use]
pub fn bit(n: u8, v: u8, f: u8) -> u8 {
    let flags = (f & !(ZF | NF)) | HF;
    set_if(flags, ZF, v & (1 << (n & 7)) == 0)
}
