//! ED page: 16-bit arithmetic, I/O through C, interrupt control and the
//! block instructions.
//!
//! Unlike the index pages there is no fallback here: undefined bytes fault.

use emu_core::IoBus;

use crate::alu;
use crate::error::InvalidOpcode;
use crate::flags::{CF, HF, NF, PF, ZF, set_if, with_szp};
use crate::observer::Observer;

use super::Z80;

/// Direction a block instruction steps HL (and DE).
#[derive(Clone, Copy)]
enum Step {
    Up,
    Down,
}

impl Step {
    fn from_opcode(op: u8) -> Self {
        if op & 0x08 == 0 { Step::Up } else { Step::Down }
    }

    fn apply(self, value: u16) -> u16 {
        match self {
            Step::Up => value.wrapping_add(1),
            Step::Down => value.wrapping_sub(1),
        }
    }
}

impl<O: Observer> Z80<O> {
    /// Execute ED-prefixed instruction.
    pub(super) fn execute_ed<B: IoBus>(
        &mut self,
        bus: &mut B,
        op: u8,
    ) -> Result<(), InvalidOpcode> {
        let y = (op >> 3) & 7;
        let p = y >> 1;

        match op {
            // IN r, (C) - 0x70 has no register form here
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x78 => {
                let value = bus.read_io(self.regs.bc());
                self.write_reg8(bus, y, value);
                self.regs.f = with_szp(self.regs.f, value) & !(HF | NF);
            }

            // OUT (C), r
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x79 => {
                let value = self.read_reg8(bus, y);
                bus.write_io(self.regs.bc(), value);
            }

            // SBC HL, rp
            0x42 | 0x52 | 0x62 | 0x72 => {
                let (result, flags) = alu::sbc16(self.regs.hl(), self.get_rp(p), self.regs.f);
                self.regs.set_hl(result);
                self.regs.f = flags;
            }

            // ADC HL, rp
            0x4A | 0x5A | 0x6A | 0x7A => {
                let (result, flags) = alu::adc16(self.regs.hl(), self.get_rp(p), self.regs.f);
                self.regs.set_hl(result);
                self.regs.f = flags;
            }

            // LD (nn), rp
            0x43 | 0x53 | 0x63 | 0x73 => {
                let addr = self.fetch_word(bus);
                Self::write_word(bus, addr, self.get_rp(p));
            }

            // LD rp, (nn)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let addr = self.fetch_word(bus);
                let value = Self::read_word(bus, addr);
                self.set_rp(p, value);
            }

            // NEG
            0x44 => {
                let result = alu::sub8(0, self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.regs.f = result.flags;
            }

            // RETN
            0x45 => {
                self.regs.iff1 = self.regs.iff2;
                self.regs.pc = self.pop(bus);
            }

            // RETI
            0x4D => self.regs.pc = self.pop(bus),

            // IM 0 / IM 1 / IM 2
            0x46 => self.regs.im = 0,
            0x56 => self.regs.im = 1,
            0x5E => self.regs.im = 2,

            // LD I, A / LD R, A
            0x47 => self.regs.i = self.regs.a,
            0x4F => self.regs.r = self.regs.a,

            // LD A, I / LD A, R - P/V reports IFF2
            0x57 | 0x5F => {
                self.regs.a = if op == 0x57 { self.regs.i } else { self.regs.r };
                let flags = with_szp(self.regs.f, self.regs.a) & !(HF | NF);
                self.regs.f = set_if(flags, PF, self.regs.iff2);
            }

            // RRD
            0x67 => {
                let addr = self.regs.hl();
                let mem = bus.read(addr);
                let a = self.regs.a;
                self.regs.a = (a & 0xF0) | (mem & 0x0F);
                bus.write(addr, (a << 4) | (mem >> 4));
                self.regs.f = with_szp(self.regs.f, self.regs.a) & !(HF | NF);
            }

            // RLD
            0x6F => {
                let addr = self.regs.hl();
                let mem = bus.read(addr);
                let a = self.regs.a;
                self.regs.a = (a & 0xF0) | (mem >> 4);
                bus.write(addr, (mem << 4) | (a & 0x0F));
                self.regs.f = with_szp(self.regs.f, self.regs.a) & !(HF | NF);
            }

            // LDI / LDD / LDIR / LDDR
            0xA0 | 0xA8 | 0xB0 | 0xB8 => {
                let step = Step::from_opcode(op);
                loop {
                    self.block_load(bus, step);
                    if op < 0xB0 || self.regs.bc() == 0 {
                        break;
                    }
                }
            }

            // CPI / CPD / CPIR / CPDR
            0xA1 | 0xA9 | 0xB1 | 0xB9 => {
                let step = Step::from_opcode(op);
                loop {
                    self.block_compare(bus, step);
                    if op < 0xB0 || self.regs.bc() == 0 || self.regs.f & ZF != 0 {
                        break;
                    }
                }
            }

            // INI / IND / INIR / INDR
            0xA2 | 0xAA | 0xB2 | 0xBA => {
                let step = Step::from_opcode(op);
                loop {
                    self.block_in(bus, step);
                    if op < 0xB0 || self.regs.b == 0 {
                        break;
                    }
                }
            }

            // OUTI / OUTD / OTIR / OTDR
            0xA3 | 0xAB | 0xB3 | 0xBB => {
                let step = Step::from_opcode(op);
                loop {
                    self.block_out(bus, step);
                    if op < 0xB0 || self.regs.b == 0 {
                        break;
                    }
                }
            }

            _ => return Err(self.invalid_opcode()),
        }
        Ok(())
    }

    /// One LDI/LDD step: (DE) <- (HL), step both, BC--.
    fn block_load<B: IoBus>(&mut self, bus: &mut B, step: Step) {
        let value = bus.read(self.regs.hl());
        bus.write(self.regs.de(), value);
        self.regs.set_hl(step.apply(self.regs.hl()));
        self.regs.set_de(step.apply(self.regs.de()));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));

        let flags = self.regs.f & !(HF | NF);
        self.regs.f = set_if(flags, PF, self.regs.bc() != 0);
    }

    /// One CPI/CPD step: compare A with (HL), step HL, BC--. Carry survives.
    fn block_compare<B: IoBus>(&mut self, bus: &mut B, step: Step) {
        let value = bus.read(self.regs.hl());
        let carry = self.regs.f & CF;
        let flags = alu::cp8(self.regs.a, value, self.regs.f);
        self.regs.set_hl(step.apply(self.regs.hl()));
        self.regs.set_bc(self.regs.bc().wrapping_sub(1));

        let flags = (flags & !CF) | carry;
        self.regs.f = set_if(flags, PF, self.regs.bc() != 0);
    }

    /// One INI/IND step: (HL) <- port BC, step HL, B--.
    fn block_in<B: IoBus>(&mut self, bus: &mut B, step: Step) {
        let value = bus.read_io(self.regs.bc());
        bus.write(self.regs.hl(), value);
        self.regs.set_hl(step.apply(self.regs.hl()));
        self.regs.b = self.regs.b.wrapping_sub(1);
        self.regs.f = set_if(self.regs.f | NF, ZF, self.regs.b == 0);
    }

    /// One OUTI/OUTD step: B--, port BC <- (HL), step HL.
    fn block_out<B: IoBus>(&mut self, bus: &mut B, step: Step) {
        let value = bus.read(self.regs.hl());
        self.regs.b = self.regs.b.wrapping_sub(1);
        bus.write_io(self.regs.bc(), value);
        self.regs.set_hl(step.apply(self.regs.hl()));
        self.regs.f = set_if(self.regs.f | NF, ZF, self.regs.b == 0);
    }
}
