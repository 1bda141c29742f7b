//! Flat 64K memory array with a simple port model.

use std::collections::{HashMap, VecDeque};

use crate::{Bus, IoBus};

/// A fault reported through [`IoBus::fault`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaultRecord {
    /// Address of the first byte of the faulting instruction.
    pub pc: u16,
    /// Bytes consumed by the faulting instruction.
    pub opcode: Vec<u8>,
}

/// Flat 64KB RAM bus with I/O port support.
///
/// Ports are decoded on the low address byte only. A read takes the next
/// queued byte for that port if there is one, otherwise the port's latched
/// value (0xFF until set). Every port write is logged with its full 16-bit
/// address.
pub struct FlatBus {
    memory: Box<[u8; 0x10000]>,
    latched: [u8; 0x100],
    queued: HashMap<u8, VecDeque<u8>>,
    port_writes: Vec<(u16, u8)>,
    faults: Vec<FaultRecord>,
}

impl FlatBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            latched: [0xFF; 0x100],
            queued: HashMap::new(),
            port_writes: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at 64K.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.memory[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read memory without going through the bus trait.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    /// Write memory without going through the bus trait.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }

    /// Set the value a port returns once its queue is empty.
    pub fn set_port(&mut self, port: u8, value: u8) {
        self.latched[port as usize] = value;
    }

    /// Queue bytes to be returned by successive reads of `port`.
    pub fn queue_input(&mut self, port: u8, data: &[u8]) {
        self.queued.entry(port).or_default().extend(data.iter().copied());
    }

    /// All port writes so far, oldest first.
    #[must_use]
    pub fn port_writes(&self) -> &[(u16, u8)] {
        &self.port_writes
    }

    /// Drain the port write log.
    pub fn take_port_writes(&mut self) -> Vec<(u16, u8)> {
        std::mem::take(&mut self.port_writes)
    }

    /// All faults reported so far, oldest first.
    #[must_use]
    pub fn faults(&self) -> &[FaultRecord] {
        &self.faults
    }
}

impl Default for FlatBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FlatBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }
}

impl IoBus for FlatBus {
    fn read_io(&mut self, port: u16) -> u8 {
        let low = port as u8;
        self.queued
            .get_mut(&low)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.latched[low as usize])
    }

    fn write_io(&mut self, port: u16, value: u8) {
        self.port_writes.push((port, value));
    }

    fn fault(&mut self, pc: u16, opcode: &[u8]) {
        self.faults.push(FaultRecord {
            pc,
            opcode: opcode.to_vec(),
        });
    }
}
