//! Instruction execution for the Z80.

use emu_core::IoBus;

use crate::alu;
use crate::error::InvalidOpcode;
use crate::flags::{CF, HF, NF};
use crate::observer::Observer;
use crate::registers::IndexReg;

use super::Z80;

impl<O: Observer> Z80<O> {
    /// Execute an instruction whose first byte has been fetched.
    ///
    /// An index prefix followed by a byte its page does not define acts as
    /// a no-op: the byte is dispatched again from the top. An index prefix
    /// followed by another index prefix is a complete no-op instruction on
    /// its own, so a run of prefixes resolves to the last one without ever
    /// holding up a batch.
    pub(super) fn execute<B: IoBus>(
        &mut self,
        bus: &mut B,
        first: u8,
    ) -> Result<(), InvalidOpcode> {
        let mut op = first;
        loop {
            match op {
                0xCB => {
                    let op = self.fetch_opcode(bus);
                    self.execute_cb(bus, op);
                    return Ok(());
                }
                0xED => {
                    let op = self.fetch_opcode(bus);
                    return self.execute_ed(bus, op);
                }
                0xDD | 0xFD => {
                    let index = if op == 0xDD { IndexReg::Ix } else { IndexReg::Iy };
                    // Superseded: the next prefix starts its own instruction.
                    if matches!(bus.read(self.regs.pc), 0xDD | 0xFD) {
                        return Ok(());
                    }
                    let next = self.fetch_opcode(bus);
                    if self.execute_indexed(bus, index, next) {
                        return Ok(());
                    }
                    op = next;
                }
                _ => {
                    self.execute_unprefixed(bus, op);
                    return Ok(());
                }
            }
        }
    }

    /// Execute unprefixed instruction.
    fn execute_unprefixed<B: IoBus>(&mut self, bus: &mut B, op: u8) {
        match op {
            // NOP
            0x00 => {}

            // LD rp, nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word(bus);
                self.set_rp(op >> 4, value);
            }

            // LD (BC), A / LD (DE), A
            0x02 => bus.write(self.regs.bc(), self.regs.a),
            0x12 => bus.write(self.regs.de(), self.regs.a),

            // LD A, (BC) / LD A, (DE)
            0x0A => self.regs.a = bus.read(self.regs.bc()),
            0x1A => self.regs.a = bus.read(self.regs.de()),

            // LD (nn), HL
            0x22 => {
                let addr = self.fetch_word(bus);
                Self::write_word(bus, addr, self.regs.hl());
            }

            // LD HL, (nn)
            0x2A => {
                let addr = self.fetch_word(bus);
                let value = Self::read_word(bus, addr);
                self.regs.set_hl(value);
            }

            // LD (nn), A
            0x32 => {
                let addr = self.fetch_word(bus);
                bus.write(addr, self.regs.a);
            }

            // LD A, (nn)
            0x3A => {
                let addr = self.fetch_word(bus);
                self.regs.a = bus.read(addr);
            }

            // INC rp
            0x03 | 0x13 | 0x23 | 0x33 => {
                let rp = op >> 4;
                self.set_rp(rp, self.get_rp(rp).wrapping_add(1));
            }

            // DEC rp
            0x0B | 0x1B | 0x2B | 0x3B => {
                let rp = op >> 4;
                self.set_rp(rp, self.get_rp(rp).wrapping_sub(1));
            }

            // ADD HL, rp
            0x09 | 0x19 | 0x29 | 0x39 => {
                let (result, flags) = alu::add16(self.regs.hl(), self.get_rp(op >> 4), self.regs.f);
                self.regs.set_hl(result);
                self.regs.f = flags;
            }

            // INC r / INC (HL)
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let r = (op >> 3) & 7;
                let value = self.read_reg8(bus, r);
                let result = alu::inc8(value, self.regs.f);
                self.write_reg8(bus, r, result.value);
                self.regs.f = result.flags;
            }

            // DEC r / DEC (HL)
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let r = (op >> 3) & 7;
                let value = self.read_reg8(bus, r);
                let result = alu::dec8(value, self.regs.f);
                self.write_reg8(bus, r, result.value);
                self.regs.f = result.flags;
            }

            // LD r, n / LD (HL), n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let value = self.fetch(bus);
                self.write_reg8(bus, (op >> 3) & 7, value);
            }

            // RLCA / RRCA / RLA / RRA
            0x07 | 0x0F | 0x17 | 0x1F => {
                let result = alu::rotate_acc(op >> 3, self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.regs.f = result.flags;
            }

            // EX AF, AF'
            0x08 => self.regs.exchange_af(),

            // DJNZ e (Decrement B and Jump if Not Zero)
            0x10 => {
                let d = self.fetch_displacement(bus);
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.jump_relative(d);
                }
            }

            // JR e
            0x18 => {
                let d = self.fetch_displacement(bus);
                self.jump_relative(d);
            }

            // JR NZ/Z/NC/C, e
            0x20 | 0x28 | 0x30 | 0x38 => {
                let d = self.fetch_displacement(bus);
                if self.condition((op >> 3) & 3) {
                    self.jump_relative(d);
                }
            }

            // DAA
            0x27 => {
                let result = alu::daa(self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.regs.f = result.flags;
            }

            // CPL
            0x2F => {
                self.regs.a = !self.regs.a;
                self.regs.f |= HF | NF;
            }

            // SCF
            0x37 => {
                self.regs.f = (self.regs.f & !(HF | NF)) | CF;
            }

            // CCF - H takes the old carry
            0x3F => {
                let carry = self.regs.f & CF != 0;
                self.regs.f &= !(HF | NF | CF);
                self.regs.f |= if carry { HF } else { CF };
            }

            // HALT
            0x76 => {
                log::debug!("Z80 HALT at {:#06X}", self.start_pc);
                self.regs.halted = true;
            }

            // LD r, r' / LD r, (HL) / LD (HL), r
            0x40..=0x7F => {
                let value = self.read_reg8(bus, op & 7);
                self.write_reg8(bus, (op >> 3) & 7, value);
            }

            // ADD/ADC/SUB/SBC/AND/XOR/OR/CP A, r
            0x80..=0xBF => {
                let value = self.read_reg8(bus, op & 7);
                self.alu_a(op >> 3, value);
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition((op >> 3) & 7) {
                    self.regs.pc = self.pop(bus);
                }
            }

            // POP BC/DE/HL
            0xC1 | 0xD1 | 0xE1 => {
                let value = self.pop(bus);
                self.set_rp((op >> 4) & 3, value);
            }

            // POP AF
            0xF1 => {
                let value = self.pop(bus);
                self.regs.set_af(value);
            }

            // JP cc, nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.fetch_word(bus);
                if self.condition((op >> 3) & 7) {
                    self.regs.pc = addr;
                }
            }

            // JP nn
            0xC3 => self.regs.pc = self.fetch_word(bus),

            // CALL cc, nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let addr = self.fetch_word(bus);
                if self.condition((op >> 3) & 7) {
                    self.call(bus, addr);
                }
            }

            // PUSH BC/DE/HL
            0xC5 | 0xD5 | 0xE5 => {
                let value = self.get_rp((op >> 4) & 3);
                self.push(bus, value);
            }

            // PUSH AF
            0xF5 => self.push(bus, self.regs.af()),

            // ADD/ADC/SUB/SBC/AND/XOR/OR/CP A, n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch(bus);
                self.alu_a(op >> 3, value);
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.call(bus, u16::from(op & 0x38));
            }

            // RET
            0xC9 => self.regs.pc = self.pop(bus),

            // CALL nn
            0xCD => {
                let addr = self.fetch_word(bus);
                self.call(bus, addr);
            }

            // OUT (n), A - A supplies the high address byte
            0xD3 => {
                let n = self.fetch(bus);
                let port = u16::from_be_bytes([self.regs.a, n]);
                bus.write_io(port, self.regs.a);
            }

            // IN A, (n)
            0xDB => {
                let n = self.fetch(bus);
                let port = u16::from_be_bytes([self.regs.a, n]);
                self.regs.a = bus.read_io(port);
            }

            // EXX
            0xD9 => self.regs.exchange_main(),

            // EX (SP), HL
            0xE3 => {
                let sp = self.regs.sp;
                let value = Self::read_word(bus, sp);
                Self::write_word(bus, sp, self.regs.hl());
                self.regs.set_hl(value);
            }

            // JP (HL)
            0xE9 => self.regs.pc = self.regs.hl(),

            // EX DE, HL
            0xEB => {
                let de = self.regs.de();
                self.regs.set_de(self.regs.hl());
                self.regs.set_hl(de);
            }

            // DI / EI
            0xF3 => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
            }
            0xFB => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
            }

            // LD SP, HL
            0xF9 => self.regs.sp = self.regs.hl(),

            // Prefixes are dispatched by execute()
            0xCB | 0xDD | 0xED | 0xFD => unreachable!(),
        }
    }

    /// One of the eight accumulator ALU operations, result into A (except CP).
    pub(super) fn alu_a(&mut self, op: u8, value: u8) {
        let result = alu::alu8(op, self.regs.a, value, self.regs.f);
        self.regs.a = result.value;
        self.regs.f = result.flags;
    }

    /// Add a signed displacement to PC.
    fn jump_relative(&mut self, d: i8) {
        self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(d));
    }

    /// Push PC and jump.
    pub(super) fn call<B: IoBus>(&mut self, bus: &mut B, addr: u16) {
        self.push(bus, self.regs.pc);
        self.regs.pc = addr;
    }
}
