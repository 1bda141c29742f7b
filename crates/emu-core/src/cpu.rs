use crate::IoBus;

/// A CPU that executes whole instructions.
///
/// The type parameter `B` is the bus type this CPU operates on. The bus is
/// passed in, not owned, so the host keeps full control of memory and
/// devices between batches.
pub trait Cpu<B: IoBus> {
    /// The type used for register inspection.
    type Registers;

    /// The error returned when execution cannot continue.
    type Error;

    /// Execute `count` instructions.
    ///
    /// Running N instructions in one call and N calls of one instruction
    /// must be indistinguishable. Stops early only on error.
    fn step(&mut self, bus: &mut B, count: u32) -> Result<(), Self::Error>;

    /// Reset the CPU to its initial state.
    fn reset(&mut self);

    /// Get the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;
}
