//! Instruction-level Z80 CPU interpreter.
//!
//! Each call to `step()` executes a batch of whole instructions against a
//! host-supplied [`IoBus`](emu_core::IoBus). Timing is not modelled and
//! interrupts are never delivered: IFF1/IFF2 and the interrupt mode are
//! plain state.

mod alu;
mod config;
mod cpu;
mod error;
mod flags;
mod observer;
mod registers;

pub use config::Config;
pub use cpu::Z80;
pub use error::InvalidOpcode;
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use observer::{OpcodeProfile, Observer, TraceObserver};
pub use registers::{IndexReg, Registers};
