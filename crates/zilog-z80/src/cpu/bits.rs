//! CB page: rotates, shifts and single-bit operations.

use emu_core::IoBus;

use crate::alu;
use crate::observer::Observer;

use super::Z80;

impl<O: Observer> Z80<O> {
    /// Execute CB-prefixed instruction. Every byte is defined.
    pub(super) fn execute_cb<B: IoBus>(&mut self, bus: &mut B, op: u8) {
        let r = op & 7;
        let value = self.read_reg8(bus, r);
        if let Some(result) = self.execute_cb_operation(op, value) {
            self.write_reg8(bus, r, result);
        }
    }

    /// Execute CB operation, returns Some(result) for write-back or None for BIT.
    pub(super) fn execute_cb_operation(&mut self, op: u8, value: u8) -> Option<u8> {
        let n = (op >> 3) & 7;
        match op >> 6 {
            // RLC/RRC/RL/RR/SLA/SRA/SLL/SRL
            0 => {
                let result = alu::shift8(n, value, self.regs.f);
                self.regs.f = result.flags;
                Some(result.value)
            }
            // BIT n
            1 => {
                self.regs.f = alu::bit(n, value, self.regs.f);
                None
            }
            // RES n
            2 => Some(value & !(1 << n)),
            // SET n
            3 => Some(value | (1 << n)),
            _ => unreachable!(),
        }
    }
}
