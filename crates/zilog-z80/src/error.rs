//! Execution errors.

use std::fmt::Write;

/// An opcode with no entry in its decode table.
///
/// Once raised, the CPU stays faulted: every later `step` returns the same
/// error until the host calls `clear_fault` (continue after the faulting
/// instruction) or `reset`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid opcode {} at {pc:#06X}", hex_bytes(.opcode))]
pub struct InvalidOpcode {
    /// Address of the first byte of the instruction, prefixes included.
    pub pc: u16,
    /// Every byte the instruction consumed before the fault.
    pub opcode: Vec<u8>,
}

fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    out
}
