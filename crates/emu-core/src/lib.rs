//! Core traits and types for instruction-level CPU emulation.
//!
//! A CPU core never owns the machine around it. Memory, I/O ports and the
//! fault report all go through a bus handed to each `step` call, so several
//! independent cores can run side by side without shared state.

mod bus;
mod cpu;
mod flat_bus;
mod io_bus;
mod observable;

pub use bus::Bus;
pub use cpu::Cpu;
pub use flat_bus::{FaultRecord, FlatBus};
pub use io_bus::IoBus;
pub use observable::{Observable, Value};
