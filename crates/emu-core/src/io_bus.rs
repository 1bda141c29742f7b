use crate::Bus;

/// A bus that also supports separate I/O port operations.
///
/// The Z80 has a separate 16-bit I/O address space accessed via IN and OUT
/// instructions. Only the low byte of a port address is architecturally
/// significant; implementations may use the high byte for device routing.
///
/// The bus is also the host's hook for illegal opcodes: the CPU reports a
/// fault here once and then refuses to run until the host clears the fault
/// or resets it.
pub trait IoBus: Bus {
    /// Read a byte from the given I/O port.
    ///
    /// May block (e.g. waiting on a real input device). The CPU stalls for
    /// as long as the bus does.
    fn read_io(&mut self, port: u16) -> u8;

    /// Write a byte to the given I/O port.
    fn write_io(&mut self, port: u16, value: u8);

    /// Report an illegal opcode.
    ///
    /// `pc` is the address of the first byte of the faulting instruction and
    /// `opcode` holds every byte the CPU consumed for it, prefixes included.
    fn fault(&mut self, pc: u16, opcode: &[u8]);
}
