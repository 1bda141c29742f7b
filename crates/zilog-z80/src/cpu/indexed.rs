//! DD and FD pages: IX/IY forms of the base instructions.
//!
//! Both pages share one decoder parameterised on the index register. Bytes
//! the page does not define report "not handled" so the caller can run them
//! through the base table instead.

use emu_core::IoBus;

use crate::alu;
use crate::observer::Observer;
use crate::registers::IndexReg;

use super::Z80;

impl<O: Observer> Z80<O> {
    /// Execute DD/FD-prefixed instruction. Returns false if `op` has no
    /// indexed form; nothing beyond `op` has been fetched in that case.
    pub(super) fn execute_indexed<B: IoBus>(
        &mut self,
        bus: &mut B,
        index: IndexReg,
        op: u8,
    ) -> bool {
        let ix = self.regs.index(index);

        match op {
            // ADD IX, rp - rp 2 is the index register itself
            0x09 | 0x19 | 0x29 | 0x39 => {
                let rp = (op >> 4) & 3;
                let operand = if rp == 2 { ix } else { self.get_rp(rp) };
                let (result, flags) = alu::add16(ix, operand, self.regs.f);
                self.regs.set_index(index, result);
                self.regs.f = flags;
            }

            // LD IX, nn
            0x21 => {
                let value = self.fetch_word(bus);
                self.regs.set_index(index, value);
            }

            // LD (nn), IX
            0x22 => {
                let addr = self.fetch_word(bus);
                Self::write_word(bus, addr, ix);
            }

            // LD IX, (nn)
            0x2A => {
                let addr = self.fetch_word(bus);
                let value = Self::read_word(bus, addr);
                self.regs.set_index(index, value);
            }

            // INC IX / DEC IX
            0x23 => self.regs.set_index(index, ix.wrapping_add(1)),
            0x2B => self.regs.set_index(index, ix.wrapping_sub(1)),

            // INC IXH / INC IXL
            0x24 | 0x2C => {
                let r = (op >> 3) & 7;
                let result = alu::inc8(self.get_index_half(index, r), self.regs.f);
                self.set_index_half(index, r, result.value);
                self.regs.f = result.flags;
            }

            // DEC IXH / DEC IXL
            0x25 | 0x2D => {
                let r = (op >> 3) & 7;
                let result = alu::dec8(self.get_index_half(index, r), self.regs.f);
                self.set_index_half(index, r, result.value);
                self.regs.f = result.flags;
            }

            // LD IXH, n / LD IXL, n
            0x26 | 0x2E => {
                let value = self.fetch(bus);
                self.set_index_half(index, (op >> 3) & 7, value);
            }

            // INC (IX+d)
            0x34 => {
                let addr = self.indexed_address(bus, ix);
                let result = alu::inc8(bus.read(addr), self.regs.f);
                bus.write(addr, result.value);
                self.regs.f = result.flags;
            }

            // DEC (IX+d)
            0x35 => {
                let addr = self.indexed_address(bus, ix);
                let result = alu::dec8(bus.read(addr), self.regs.f);
                bus.write(addr, result.value);
                self.regs.f = result.flags;
            }

            // LD (IX+d), n - displacement comes before the immediate
            0x36 => {
                let addr = self.indexed_address(bus, ix);
                let value = self.fetch(bus);
                bus.write(addr, value);
            }

            // LD r, (IX+d) - destination is the plain register
            0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E => {
                let addr = self.indexed_address(bus, ix);
                let value = bus.read(addr);
                self.write_reg8(bus, (op >> 3) & 7, value);
            }

            // LD (IX+d), r - source is the plain register
            0x70..=0x75 | 0x77 => {
                let addr = self.indexed_address(bus, ix);
                let value = self.read_reg8(bus, op & 7);
                bus.write(addr, value);
            }

            // LD r, r' with IXH/IXL standing in for H/L
            0x40..=0x7F if op != 0x76 && (is_half(op & 7) || is_half((op >> 3) & 7)) => {
                let value = self.get_index_half(index, op & 7);
                self.set_index_half(index, (op >> 3) & 7, value);
            }

            // ALU A, (IX+d)
            0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE => {
                let addr = self.indexed_address(bus, ix);
                let value = bus.read(addr);
                self.alu_a(op >> 3, value);
            }

            // ALU A, IXH / ALU A, IXL
            0x80..=0xBF if is_half(op & 7) => {
                let value = self.get_index_half(index, op & 7);
                self.alu_a(op >> 3, value);
            }

            // DDCB/FDCB d op
            0xCB => self.execute_indexed_cb(bus, ix),

            // POP IX
            0xE1 => {
                let value = self.pop(bus);
                self.regs.set_index(index, value);
            }

            // EX (SP), IX
            0xE3 => {
                let sp = self.regs.sp;
                let value = Self::read_word(bus, sp);
                Self::write_word(bus, sp, ix);
                self.regs.set_index(index, value);
            }

            // PUSH IX
            0xE5 => self.push(bus, ix),

            // JP (IX)
            0xE9 => self.regs.pc = ix,

            // LD SP, IX
            0xF9 => self.regs.sp = ix,

            _ => return false,
        }
        true
    }

    /// DDCB/FDCB: the operand is always (IX+d). For register selectors other
    /// than 6 the result is also copied into that register, except for BIT.
    fn execute_indexed_cb<B: IoBus>(&mut self, bus: &mut B, ix: u16) {
        let addr = self.indexed_address(bus, ix);
        let op = self.fetch(bus);
        let value = bus.read(addr);
        if let Some(result) = self.execute_cb_operation(op, value) {
            bus.write(addr, result);
            let r = op & 7;
            if r != 6 {
                self.write_reg8(bus, r, result);
            }
        }
    }

    /// Fetch a displacement and add it to the index register.
    fn indexed_address<B: IoBus>(&mut self, bus: &mut B, ix: u16) -> u16 {
        let d = self.fetch_displacement(bus);
        ix.wrapping_add_signed(i16::from(d))
    }

    /// Register by 3-bit encoding with IXH/IXL in place of H/L.
    /// Selector 6 never reaches here.
    fn get_index_half(&self, index: IndexReg, r: u8) -> u8 {
        let [lo, hi] = self.regs.index(index).to_le_bytes();
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => hi,
            5 => lo,
            7 => self.regs.a,
            _ => unreachable!(),
        }
    }

    /// Set register by 3-bit encoding with IXH/IXL in place of H/L.
    fn set_index_half(&mut self, index: IndexReg, r: u8, value: u8) {
        let [lo, hi] = self.regs.index(index).to_le_bytes();
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.set_index(index, u16::from_le_bytes([lo, value])),
            5 => self.regs.set_index(index, u16::from_le_bytes([value, hi])),
            7 => self.regs.a = value,
            _ => unreachable!(),
        }
    }
}

/// Selector 4 or 5: H or L, replaced by the index halves.
const fn is_half(r: u8) -> bool {
    r == 4 || r == 5
}
