//! Instruction-boundary hooks.
//!
//! The interpreter calls its observer before each instruction and when a
//! fault is raised. `()` observes nothing and compiles away.

use crate::error::InvalidOpcode;
use crate::flags::{CF, HF, NF, PF, SF, ZF};
use crate::registers::Registers;

/// Hooks invoked by the CPU at instruction boundaries.
pub trait Observer {
    /// Called before the instruction at `pc` executes. `opcode` is the first
    /// byte at `pc` (a prefix byte for prefixed instructions).
    fn before_instruction(&mut self, pc: u16, opcode: u8, regs: &Registers) {
        let _ = (pc, opcode, regs);
    }

    /// Called once when an instruction faults.
    fn on_fault(&mut self, error: &InvalidOpcode) {
        let _ = error;
    }
}

impl Observer for () {}

/// Logs every instruction at `trace` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceObserver;

impl Observer for TraceObserver {
    fn before_instruction(&mut self, pc: u16, opcode: u8, regs: &Registers) {
        log::trace!(
            "{pc:04X}  {opcode:02X}  AF={:04X} BC={:04X} DE={:04X} HL={:04X} IX={:04X} IY={:04X} SP={:04X}  {}",
            regs.af(),
            regs.bc(),
            regs.de(),
            regs.hl(),
            regs.ix,
            regs.iy,
            regs.sp,
            flag_string(regs.f),
        );
    }

    fn on_fault(&mut self, error: &InvalidOpcode) {
        log::trace!("fault: {error}");
    }
}

fn flag_string(f: u8) -> String {
    [(SF, 'S'), (ZF, 'Z'), (HF, 'H'), (PF, 'P'), (NF, 'N'), (CF, 'C')]
        .iter()
        .map(|&(mask, c)| if f & mask != 0 { c } else { '-' })
        .collect()
}

/// Execution counts per primary opcode byte.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpcodeProfile {
    counts: Vec<u64>,
    total: u64,
}

impl OpcodeProfile {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: vec![0; 256],
            total: 0,
        }
    }

    /// Times `opcode` started an instruction.
    #[must_use]
    pub fn count(&self, opcode: u8) -> u64 {
        self.counts.get(opcode as usize).copied().unwrap_or(0)
    }

    /// Instructions seen in total.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// The `n` most frequent opcodes, highest first. Ties go to the lower
    /// opcode; opcodes never executed are left out.
    #[must_use]
    pub fn hottest(&self, n: usize) -> Vec<(u8, u64)> {
        let mut seen: Vec<(u8, u64)> = self
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(op, &count)| (op as u8, count))
            .collect();
        seen.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        seen.truncate(n);
        seen
    }

    /// Zero all counters.
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.total = 0;
    }
}

impl Default for OpcodeProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for OpcodeProfile {
    fn before_instruction(&mut self, _pc: u16, opcode: u8, _regs: &Registers) {
        if let Some(count) = self.counts.get_mut(opcode as usize) {
            *count += 1;
        }
        self.total += 1;
    }
}
