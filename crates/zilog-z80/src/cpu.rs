//! Z80 CPU core with instruction-level execution.

use emu_core::{Cpu, IoBus, Observable, Value};

use crate::config::Config;
use crate::error::InvalidOpcode;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::observer::Observer;
use crate::registers::Registers;

// Decoders split into separate files for readability
mod bits;
mod execute;
mod extended;
mod indexed;

/// Z80 CPU.
///
/// The CPU does not own the bus. Instead, the bus is passed to `step()` so
/// the host keeps control of memory and devices between batches.
///
/// `O` receives a call before every instruction; the default `()` does
/// nothing.
pub struct Z80<O: Observer = ()> {
    /// Main register set.
    pub(crate) regs: Registers,
    config: Config,
    observer: O,

    /// Set by the first invalid opcode; cleared by `clear_fault()` or `reset()`.
    fault: Option<InvalidOpcode>,
    /// Instructions executed since reset.
    instructions: u64,

    // === Current instruction ===
    /// Address of the first byte.
    start_pc: u16,
    /// Bytes fetched so far, prefixes included.
    fetched: Vec<u8>,
}

impl Z80 {
    /// Create a new Z80 in its reset state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new Z80 with non-default behaviour.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self::build(config, ())
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Observer> Z80<O> {
    /// Create a new Z80 that reports to `observer`.
    #[must_use]
    pub fn with_observer(observer: O) -> Self {
        Self::build(Config::default(), observer)
    }

    /// Create a new Z80 with both a configuration and an observer.
    #[must_use]
    pub fn build(config: Config, observer: O) -> Self {
        Self {
            regs: Registers::power_on(),
            config,
            observer,
            fault: None,
            instructions: 0,
            start_pc: 0,
            fetched: Vec::with_capacity(4),
        }
    }

    /// The attached observer.
    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The attached observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Consume the CPU, returning its observer.
    #[must_use]
    pub fn into_observer(self) -> O {
        self.observer
    }

    /// The configuration this CPU was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute `count` instructions.
    ///
    /// While halted each counted instruction is idle: nothing is fetched and
    /// PC does not move. An invalid opcode reports to [`IoBus::fault`] once,
    /// then this and every later call return the same error without
    /// touching the bus until the host calls [`clear_fault`](Self::clear_fault)
    /// or [`reset`](Self::reset).
    pub fn step<B: IoBus>(&mut self, bus: &mut B, count: u32) -> Result<(), InvalidOpcode> {
        if let Some(error) = &self.fault {
            return Err(error.clone());
        }

        for _ in 0..count {
            // Nothing changes while halted, so the rest of the batch is idle.
            if self.regs.halted {
                break;
            }
            if let Err(error) = self.execute_one(bus) {
                log::warn!("Z80 fault: {error}");
                bus.fault(error.pc, &error.opcode);
                self.observer.on_fault(&error);
                self.fault = Some(error.clone());
                return Err(error);
            }
        }
        Ok(())
    }

    /// Reset registers to their power-on state, clearing HALT and any fault.
    pub fn reset(&mut self) {
        log::debug!("Z80 reset");
        self.regs = Registers::power_on();
        self.fault = None;
        self.instructions = 0;
        self.start_pc = 0;
        self.fetched.clear();
    }

    /// Drop a recorded fault so `step` runs again, returning it.
    ///
    /// Registers are left as the faulting instruction left them, so
    /// execution resumes at the byte after it.
    pub fn clear_fault(&mut self) -> Option<InvalidOpcode> {
        let fault = self.fault.take();
        if let Some(error) = &fault {
            log::debug!("Z80 resuming after {error}");
        }
        fault
    }

    /// Instructions executed since reset. Idle steps while halted do not
    /// count.
    #[must_use]
    pub const fn instructions(&self) -> u64 {
        self.instructions
    }

    /// The fault that stopped this CPU, if any.
    #[must_use]
    pub fn fault(&self) -> Option<&InvalidOpcode> {
        self.fault.as_ref()
    }

    /// Current register state.
    #[must_use]
    pub const fn regs(&self) -> &Registers {
        &self.regs
    }

    /// Get the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// Get the stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.regs.sp
    }

    /// Get the A register.
    #[must_use]
    pub const fn a(&self) -> u8 {
        self.regs.a
    }

    /// Get the F register (flags).
    #[must_use]
    pub const fn f(&self) -> u8 {
        self.regs.f
    }

    /// Get the C register.
    #[must_use]
    pub const fn c(&self) -> u8 {
        self.regs.c
    }

    /// Get the E register.
    #[must_use]
    pub const fn e(&self) -> u8 {
        self.regs.e
    }

    /// Get the BC register pair.
    #[must_use]
    pub const fn bc(&self) -> u16 {
        self.regs.bc()
    }

    /// Get the DE register pair.
    #[must_use]
    pub const fn de(&self) -> u16 {
        self.regs.de()
    }

    /// Get the HL register pair.
    #[must_use]
    pub const fn hl(&self) -> u16 {
        self.regs.hl()
    }

    /// True once HALT has executed, until reset.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.regs.halted
    }

    /// Mutable access to every register.
    ///
    /// Only available in test builds.
    #[cfg(feature = "test-utils")]
    pub fn regs_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Set the program counter.
    ///
    /// Only available in test builds.
    #[cfg(feature = "test-utils")]
    pub fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
    }

    /// Set the stack pointer.
    ///
    /// Only available in test builds.
    #[cfg(feature = "test-utils")]
    pub fn set_sp(&mut self, value: u16) {
        self.regs.sp = value;
    }

    /// Execute one complete instruction.
    fn execute_one<B: IoBus>(&mut self, bus: &mut B) -> Result<(), InvalidOpcode> {
        self.start_pc = self.regs.pc;
        self.fetched.clear();

        let opcode = self.fetch_opcode(bus);
        self.observer.before_instruction(self.start_pc, opcode, &self.regs);
        self.instructions += 1;

        self.execute(bus, opcode)
    }

    /// The error for the instruction being executed.
    fn invalid_opcode(&self) -> InvalidOpcode {
        InvalidOpcode {
            pc: self.start_pc,
            opcode: self.fetched.clone(),
        }
    }

    /// M1 fetch: read the opcode or prefix byte at PC.
    fn fetch_opcode<B: IoBus>(&mut self, bus: &mut B) -> u8 {
        if self.config.increment_refresh {
            self.inc_r();
        }
        self.fetch(bus)
    }

    /// Read the byte at PC and advance.
    fn fetch<B: IoBus>(&mut self, bus: &mut B) -> u8 {
        let byte = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.fetched.push(byte);
        byte
    }

    /// Read a little-endian word at PC and advance.
    fn fetch_word<B: IoBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Fetch a signed displacement byte.
    fn fetch_displacement<B: IoBus>(&mut self, bus: &mut B) -> i8 {
        self.fetch(bus) as i8
    }

    /// Read a little-endian word from memory.
    fn read_word<B: IoBus>(bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr);
        let hi = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Write a little-endian word to memory.
    fn write_word<B: IoBus>(bus: &mut B, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        bus.write(addr, lo);
        bus.write(addr.wrapping_add(1), hi);
    }

    /// Push a word: high byte at SP-1, low byte at SP-2.
    fn push<B: IoBus>(&mut self, bus: &mut B, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, lo);
    }

    /// Pop a word pushed by [`push`](Self::push).
    fn pop<B: IoBus>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    /// Increment R register (lower 7 bits only).
    fn inc_r(&mut self) {
        self.regs.r = (self.regs.r & 0x80) | (self.regs.r.wrapping_add(1) & 0x7F);
    }

    /// Get register by 3-bit encoding. Selector 6 reads (HL).
    fn read_reg8<B: IoBus>(&mut self, bus: &mut B, r: u8) -> u8 {
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => bus.read(self.regs.hl()),
            7 => self.regs.a,
            _ => unreachable!(),
        }
    }

    /// Set register by 3-bit encoding. Selector 6 writes (HL).
    fn write_reg8<B: IoBus>(&mut self, bus: &mut B, r: u8, value: u8) {
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            6 => bus.write(self.regs.hl(), value),
            7 => self.regs.a = value,
            _ => unreachable!(),
        }
    }

    /// Get register pair by 2-bit encoding (BC, DE, HL, SP).
    fn get_rp(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            3 => self.regs.sp,
            _ => unreachable!(),
        }
    }

    /// Set register pair by 2-bit encoding (BC, DE, HL, SP).
    fn set_rp(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            3 => self.regs.sp = value,
            _ => unreachable!(),
        }
    }

    /// Evaluate condition code.
    fn condition(&self, cc: u8) -> bool {
        match cc & 7 {
            0 => self.regs.f & ZF == 0, // NZ
            1 => self.regs.f & ZF != 0, // Z
            2 => self.regs.f & CF == 0, // NC
            3 => self.regs.f & CF != 0, // C
            4 => self.regs.f & PF == 0, // PO
            5 => self.regs.f & PF != 0, // PE
            6 => self.regs.f & SF == 0, // P
            7 => self.regs.f & SF != 0, // M
            _ => unreachable!(),
        }
    }
}

impl<B: IoBus, O: Observer> Cpu<B> for Z80<O> {
    type Registers = Registers;
    type Error = InvalidOpcode;

    fn step(&mut self, bus: &mut B, count: u32) -> Result<(), InvalidOpcode> {
        Z80::step(self, bus, count)
    }

    fn reset(&mut self) {
        Z80::reset(self);
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }
}

/// All query paths supported by the Z80.
const Z80_QUERY_PATHS: &[&str] = &[
    // Main registers
    "a", "f", "b", "c", "d", "e", "h", "l",
    // Register pairs
    "af", "bc", "de", "hl",
    // Alternate registers
    "a'", "f'", "b'", "c'", "d'", "e'", "h'", "l'",
    "af'", "bc'", "de'", "hl'",
    // Index registers
    "ix", "iy", "ixh", "ixl", "iyh", "iyl",
    // Other registers
    "sp", "pc", "i", "r",
    // Flags (individual)
    "flags.s", "flags.z", "flags.y", "flags.h",
    "flags.x", "flags.p", "flags.n", "flags.c",
    // Interrupt state
    "iff1", "iff2", "im",
    // CPU state
    "halted", "faulted", "instructions",
];

impl<O: Observer> Observable for Z80<O> {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let pair = |hi: u8, lo: u8| Value::from(u16::from_be_bytes([hi, lo]));
        match path {
            // Main registers
            "a" => Some(r.a.into()),
            "f" => Some(r.f.into()),
            "b" => Some(r.b.into()),
            "c" => Some(r.c.into()),
            "d" => Some(r.d.into()),
            "e" => Some(r.e.into()),
            "h" => Some(r.h.into()),
            "l" => Some(r.l.into()),

            // Register pairs
            "af" => Some(r.af().into()),
            "bc" => Some(r.bc().into()),
            "de" => Some(r.de().into()),
            "hl" => Some(r.hl().into()),

            // Alternate registers
            "a'" => Some(r.a_alt.into()),
            "f'" => Some(r.f_alt.into()),
            "b'" => Some(r.b_alt.into()),
            "c'" => Some(r.c_alt.into()),
            "d'" => Some(r.d_alt.into()),
            "e'" => Some(r.e_alt.into()),
            "h'" => Some(r.h_alt.into()),
            "l'" => Some(r.l_alt.into()),

            // Alternate pairs
            "af'" => Some(pair(r.a_alt, r.f_alt)),
            "bc'" => Some(pair(r.b_alt, r.c_alt)),
            "de'" => Some(pair(r.d_alt, r.e_alt)),
            "hl'" => Some(pair(r.h_alt, r.l_alt)),

            // Index registers
            "ix" => Some(r.ix.into()),
            "iy" => Some(r.iy.into()),
            "ixh" => Some(((r.ix >> 8) as u8).into()),
            "ixl" => Some((r.ix as u8).into()),
            "iyh" => Some(((r.iy >> 8) as u8).into()),
            "iyl" => Some((r.iy as u8).into()),

            // Other registers
            "sp" => Some(r.sp.into()),
            "pc" => Some(r.pc.into()),
            "i" => Some(r.i.into()),
            "r" => Some(r.r.into()),

            // Individual flags
            "flags.s" => Some((r.f & SF != 0).into()),
            "flags.z" => Some((r.f & ZF != 0).into()),
            "flags.y" => Some((r.f & YF != 0).into()),
            "flags.h" => Some((r.f & HF != 0).into()),
            "flags.x" => Some((r.f & XF != 0).into()),
            "flags.p" => Some((r.f & PF != 0).into()),
            "flags.n" => Some((r.f & NF != 0).into()),
            "flags.c" => Some((r.f & CF != 0).into()),

            // Interrupt state
            "iff1" => Some(r.iff1.into()),
            "iff2" => Some(r.iff2.into()),
            "im" => Some(r.im.into()),

            // CPU state
            "halted" => Some(r.halted.into()),
            "faulted" => Some(self.fault.is_some().into()),
            "instructions" => Some(self.instructions.into()),

            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}
