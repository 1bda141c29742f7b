//! Memory bus interface.

/// A bus that supports memory read/write operations.
///
/// The address space is a flat 64K. Accesses never fail; a bus that maps
/// less memory than that decides for itself what unmapped reads return.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}
