//! Simulating and execution for MIPS machine code.
//!
//! This module is focused on executing instruction words loaded into memory.
//!
//! This module consists of:
//! - [`Simulator`]: The struct that simulates machine code.
//! - [`mem`]: The module handling memory and the register file.
//! - [`debug`]: The module handling breakpoints and the memory viewport.
//! - [`observer`]: The module tracking which memory and registers were touched.
//!
//! # Usage
//!
//! To simulate some code, you need to instantiate a Simulator and load a program into it:
//!
//! ```
//! use mips_ensemble::parse::parse_ast;
//! use mips_ensemble::asm::assemble;
//! use mips_ensemble::sim::Simulator;
//! use mips_ensemble::ast::reg_consts::{T1, T2, T3};
//!
//! let src = "
//!     add $t1, $t2, $t3
//!     add $t1, $t1, $t1
//! ";
//! let ast = parse_ast(src).unwrap();
//! let obj_file = assemble(&ast).unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.load_obj_file(&obj_file, 0).unwrap();
//! sim.reg_file[T2] = 0x1234;
//! sim.reg_file[T3] = 0x5678;
//!
//! // Running step by step:
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[T1], 0x68AC);
//! assert_eq!(sim.pc, 4);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[T1], 0xD158);
//! assert_eq!(sim.pc, 8);
//! ```
//!
//! ## Flags
//!
//! Here, we define `sim` to have the default flags.
//! We could also configure the simulator by editing the flags. For example,
//! if we wish to treat unknown instructions as no-ops, we can edit the flags like so:
//!
//! ```
//! # use mips_ensemble::sim::{Simulator, SimFlags};
//! let mut sim = Simulator::new(SimFlags { illegal_as_nop: true, ..Default::default() });
//! ```
//!
//! All of the available flags can be found in [`SimFlags`].
//!
//! ## Execution
//!
//! The machine has no instruction which stops it, so execution is always driven by the caller:
//! - [`Simulator::step_in`]: executes exactly one instruction
//! - [`Simulator::run_while`]: executes until a tripwire returns false or a breakpoint is hit
//! - [`Simulator::run_with_limit`]: executes a bounded number of instructions
//! - [`Simulator::run`]: executes until a breakpoint is hit or an error occurs
//!
//! A failed instruction leaves the PC at the failing instruction and puts the machine in
//! [`SimState::Halted`]. Any later execution call fails with [`SimErr::Halted`]
//! until the machine is moved with [`Simulator::jump_to`] or [`Simulator::reset`].
//!
//! ## Debugging with breakpoints
//!
//! Breakpoints are accessible through the `breakpoints` field on [`Simulator`].
//!
//! To add a `breakpoint`, simply insert a [`Breakpoint`] and
//! it will break if its condition is met during all execution functions (except [`Simulator::step_in`]).
//!
//! ```
//! use mips_ensemble::parse::parse_ast;
//! use mips_ensemble::asm::assemble;
//! use mips_ensemble::sim::Simulator;
//! use mips_ensemble::sim::debug::Breakpoint;
//!
//! let src = "
//!     add $t0, $t0, $t1
//!     add $t0, $t0, $t1
//!     add $t0, $t0, $t1
//!     j 0
//! ";
//! let obj_file = assemble(&parse_ast(src).unwrap()).unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.load_obj_file(&obj_file, 0).unwrap();
//! sim.breakpoints.insert(Breakpoint::PC(8));
//! sim.run().unwrap();
//!
//! assert!(sim.hit_breakpoint());
//! assert_eq!(sim.pc, 8);
//! ```

pub mod mem;
pub mod debug;
pub mod observer;

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::asm::ObjectFile;
use crate::ast::sim::{Fields, IFields, JFields, RFields, SimInstr};
use crate::ast::reg_consts::ZERO;
use crate::ast::Reg;
use crate::isa::Op;
use debug::Breakpoint;
use observer::{AccessObserver, AccessSet};

use self::mem::{MachineInitStrategy, Mem, RegFile};

/// Errors that can occur during simulation.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SimErr {
    /// The word at `pc` has no defined behavior (unknown opcode, or unknown funct for an R-type opcode).
    IllegalInstruction {
        /// The address of the instruction.
        pc: u32,
        /// The instruction word.
        word: u32
    },
    /// A fetch or load used an address which is misaligned or outside of memory.
    AddressLoad {
        /// The address accessed.
        addr: u32
    },
    /// A store used an address which is misaligned or outside of memory.
    AddressStore {
        /// The address accessed.
        addr: u32
    },
    /// The machine is halted and cannot execute.
    Halted,
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErr::IllegalInstruction { pc, word } => write!(f, "illegal instruction {word:#010x} at {pc:#010x}"),
            SimErr::AddressLoad { addr }  => write!(f, "cannot load from address {addr:#010x}"),
            SimErr::AddressStore { addr } => write!(f, "cannot store to address {addr:#010x}"),
            SimErr::Halted => f.write_str("machine is halted"),
        }
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            SimErr::IllegalInstruction { .. } => Some("only add, j, beq, lw, and sw can be executed".into()),
            SimErr::AddressLoad { .. } | SimErr::AddressStore { .. } => Some("word addresses must be multiples of 4 and inside memory".into()),
            SimErr::Halted => Some("move the pc with a jump or reset the machine to continue".into()),
        }
    }
}

/// Errors that can occur while loading a program into memory.
#[derive(Debug)]
pub enum LoadErr {
    /// The file could not be read.
    Io(std::io::Error),
    /// The load offset is not a multiple of 4.
    Misaligned {
        /// The requested offset.
        offset: u32
    },
    /// The program does not fit in memory at the offset.
    OutOfBounds {
        /// The requested offset.
        offset: u32,
        /// The length of the program in bytes.
        len: usize
    },
    /// The program's length is not a multiple of 4 bytes.
    PartialWord {
        /// The length of the program in bytes.
        len: usize
    },
}
impl std::fmt::Display for LoadErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadErr::Io(e) => write!(f, "cannot read program: {e}"),
            LoadErr::Misaligned { offset } => write!(f, "load offset {offset:#010x} is not word-aligned"),
            LoadErr::OutOfBounds { offset, len } => write!(f, "program of {len} bytes does not fit in memory at {offset:#010x}"),
            LoadErr::PartialWord { len } => write!(f, "program length {len} is not a whole number of words"),
        }
    }
}
impl std::error::Error for LoadErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadErr::Io(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for LoadErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LoadErr::Io(_) => None,
            LoadErr::Misaligned { .. } => Some("load offsets must be multiples of 4".into()),
            LoadErr::OutOfBounds { .. } => Some("try a lower load offset or a larger memory size".into()),
            LoadErr::PartialWord { .. } => Some("programs are a sequence of 4-byte big-endian words".into()),
        }
    }
}
impl From<std::io::Error> for LoadErr {
    fn from(value: std::io::Error) -> Self {
        LoadErr::Io(value)
    }
}

/// The run state of the machine.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub enum SimState {
    /// Instructions can execute.
    #[default]
    Running,
    /// An instruction failed. Execution is refused until the PC is moved.
    Halted,
}

/// Reason for why execution paused if it wasn't due to an error.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum PauseCondition {
    /// A breakpoint matched.
    Breakpoint,
    /// The tripwire condition was triggered.
    Tripwire,
    /// Program hit an error and did not pause successfully.
    #[default]
    Unsuccessful
}

/// Configuration flags for [`Simulator`].
///
/// These can be modified after the `Simulator` is created with [`Simulator::new`]
/// and their effects should still apply.
///
/// Read the field descriptions for more details.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SimFlags {
    /// The size of memory in bytes (rounded down to a multiple of 4).
    ///
    /// This flag only goes into effect after a `Simulator::new` or `Simulator::reset` call.
    ///
    /// By default, this flag is `0x10000`.
    pub mem_size: usize,

    /// The creation strategy for memory and register values.
    ///
    /// This flag only goes into effect after a `Simulator::new` or `Simulator::reset` call.
    ///
    /// By default, this flag is [`MachineInitStrategy::default`] (all zeroes).
    pub machine_init: MachineInitStrategy,

    /// Whether instructions with an unknown opcode or funct execute as a no-op.
    ///
    /// If false, they halt the machine with [`SimErr::IllegalInstruction`].
    ///
    /// By default, this flag is `false`.
    pub illegal_as_nop: bool,

    /// Whether register 0 can be written.
    ///
    /// If false, register 0 always reads as zero and writes to it are discarded.
    ///
    /// By default, this flag is `false`.
    pub writable_zero: bool,
}

impl Default for SimFlags {
    fn default() -> Self {
        Self {
            mem_size: 0x10000,
            machine_init: Default::default(),
            illegal_as_nop: false,
            writable_zero: false,
        }
    }
}

/// A serializable copy of the machine's architectural state.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct MachineSnapshot {
    /// The program counter.
    pub pc: u32,
    /// The run state.
    pub state: SimState,
    /// The number of instructions executed.
    pub instructions_run: u64,
    /// Every register, in register-number order.
    pub registers: [u32; Reg::COUNT],
}

/// Executes machine code.
#[derive(Debug)]
pub struct Simulator {
    // ------------------ SIMULATION STATE ------------------
    // Calling [`Simulator::reset`] resets these values.

    /// The simulator's memory.
    pub mem: Mem,

    /// The simulator's register file.
    ///
    /// Writing here directly bypasses the hard-wired zero register.
    pub reg_file: RegFile,

    /// The program counter (a byte address).
    pub pc: u32,

    /// The run state.
    pub state: SimState,

    /// The number of instructions successfully run since this `Simulator` was initialized.
    ///
    /// This can be set to 0 to reset the counter.
    pub instructions_run: u64,

    /// Indicates whether the PC has been incremented in the fetch stage yet.
    ///
    /// This is just for error handling purposes. It's used to compute
    /// the PC of the instruction that caused an error. See [`Simulator::prefetch_pc`].
    prefetch: bool,

    /// Indicates the reason why the last execution (via [`Simulator::run_while`] and adjacent)
    /// had paused.
    pause_condition: PauseCondition,

    /// Tracks accesses to memory and registers.
    pub observer: AccessObserver,

    // ------------------ CONFIG/DEBUG STATE ------------------
    // Calling [`Simulator::reset`] does not reset these values.

    /// Configuration settings for the simulator.
    ///
    /// These are preserved between resets.
    ///
    /// See [`SimFlags`] for more details on what configuration
    /// settings are available.
    pub flags: SimFlags,

    /// Breakpoints for the simulator.
    pub breakpoints: HashSet<Breakpoint>,
}
impl Simulator where Simulator: Send + Sync {}

impl Simulator {
    /// Creates a new simulator with the provided flags and with empty memory.
    pub fn new(flags: SimFlags) -> Self {
        let mut filler = flags.machine_init.generator();

        let mut sim = Self {
            mem: Mem::new(flags.mem_size, &mut filler),
            reg_file: RegFile::new(&mut filler),
            pc: 0,
            state: SimState::Running,
            instructions_run: 0,
            prefetch: true,
            pause_condition: Default::default(),
            observer: Default::default(),

            flags,
            breakpoints: Default::default(),
        };

        if !flags.writable_zero {
            sim.reg_file[ZERO] = 0;
        }
        sim
    }

    /// Resets the simulator.
    ///
    /// This resets the state of the `Simulator` back to before any execution calls,
    /// while preserving configuration and debug state.
    ///
    /// Note that this function preserves:
    /// - Flags
    /// - Breakpoints
    ///
    /// This also does not reload programs. Any program has to be reloaded into the Simulator.
    pub fn reset(&mut self) {
        let flags = self.flags;
        let breakpoints = std::mem::take(&mut self.breakpoints);

        *self = Simulator::new(flags);
        self.breakpoints = breakpoints;
    }

    /// Copies a program's bytes into memory at the offset.
    ///
    /// The bytes are a sequence of big-endian words.
    /// This returns the number of words loaded.
    pub fn load_binary(&mut self, bytes: &[u8], offset: u32) -> Result<usize, LoadErr> {
        let len = bytes.len();
        if offset % 4 != 0 { return Err(LoadErr::Misaligned { offset }) };
        if len % 4 != 0 { return Err(LoadErr::PartialWord { len }) };

        let fits = usize::try_from(offset).ok()
            .and_then(|o| o.checked_add(len))
            .is_some_and(|end| end <= self.mem.len());
        if !fits { return Err(LoadErr::OutOfBounds { offset, len }) };

        for (addr, chunk) in (offset..).step_by(4).zip(bytes.chunks_exact(4)) {
            let word = <[u8; 4]>::try_from(chunk).map(u32::from_be_bytes)
                .map_err(|_| LoadErr::PartialWord { len })?;
            self.mem.write_word(addr, word)
                .ok_or(LoadErr::OutOfBounds { offset, len })?;
        }

        let words = len / 4;
        tracing::debug!(offset = format_args!("{offset:#010x}"), words, "loaded program");
        Ok(words)
    }

    /// Reads a binary program file and copies it into memory at the offset.
    ///
    /// This returns the number of words loaded.
    pub fn load_file(&mut self, path: impl AsRef<Path>, offset: u32) -> Result<usize, LoadErr> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), "read program file");
        self.load_binary(&bytes, offset)
    }

    /// Loads an object file into memory at the offset.
    pub fn load_obj_file(&mut self, obj: &ObjectFile, offset: u32) -> Result<usize, LoadErr> {
        let bytes: Vec<_> = obj.words()
            .iter()
            .flat_map(|w| w.to_be_bytes())
            .collect();
        self.load_binary(&bytes, offset)
    }

    /// Reads a register, as an instruction would.
    pub fn reg(&mut self, reg: Reg) -> u32 {
        self.observer.update_reg_accesses(reg, AccessSet::READ);
        self.reg_file[reg]
    }

    /// Writes a register, as an instruction would.
    ///
    /// Writes to register 0 are discarded unless [`SimFlags::writable_zero`] is set.
    pub fn set_reg(&mut self, reg: Reg, value: u32) {
        let value = match reg == ZERO && !self.flags.writable_zero {
            true  => 0,
            false => value,
        };

        let old = std::mem::replace(&mut self.reg_file[reg], value);
        self.observer.update_reg_accesses(reg, AccessSet::write(old, value));
    }

    /// Reads the word at the address, as an instruction would.
    ///
    /// This fails if the address is misaligned or outside of memory.
    pub fn read_mem(&mut self, addr: u32) -> Result<u32, SimErr> {
        let word = self.mem.read_word(addr).ok_or(SimErr::AddressLoad { addr })?;
        self.observer.update_mem_accesses(addr, AccessSet::READ);
        Ok(word)
    }

    /// Writes the word at the address, as an instruction would.
    ///
    /// This fails if the address is misaligned or outside of memory.
    pub fn write_mem(&mut self, addr: u32, word: u32) -> Result<(), SimErr> {
        let old = self.mem.read_word(addr).ok_or(SimErr::AddressStore { addr })?;
        self.mem.write_word(addr, word).ok_or(SimErr::AddressStore { addr })?;
        self.observer.update_mem_accesses(addr, AccessSet::write(old, word));
        Ok(())
    }

    /// Gets the value of the prefetch PC.
    ///
    /// This function is useful as it returns the location of the currently
    /// executing instruction in memory.
    pub fn prefetch_pc(&self) -> u32 {
        match self.prefetch {
            true  => self.pc,
            false => self.pc.wrapping_sub(4),
        }
    }

    /// Decodes the instruction the PC points to, without executing it.
    ///
    /// This is `None` if the PC does not point to a word in memory.
    pub fn current_instr(&self) -> Option<SimInstr> {
        self.mem.read_word(self.pc).map(SimInstr::decode)
    }

    /// Moves the PC to the address and lets the machine run again.
    ///
    /// This fails (without moving the PC) if the address is not a word address in memory.
    pub fn jump_to(&mut self, addr: u32) -> Result<(), SimErr> {
        if !self.mem.is_word_addr(addr) {
            return Err(SimErr::AddressLoad { addr });
        }
        self.pc = addr;
        self.prefetch = true;
        self.state = SimState::Running;
        Ok(())
    }

    /// Indicates whether the last execution of the simulator hit a breakpoint.
    pub fn hit_breakpoint(&self) -> bool {
        matches!(self.pause_condition, PauseCondition::Breakpoint)
    }

    /// Indicates whether the machine is halted.
    pub fn is_halted(&self) -> bool {
        self.state == SimState::Halted
    }

    /// Copies the architectural state of the machine.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            pc: self.pc,
            state: self.state,
            instructions_run: self.instructions_run,
            registers: *self.reg_file.as_array(),
        }
    }

    /// Runs until the tripwire condition returns false (or any of the typical breaks occur).
    ///
    /// The typical break conditions are:
    /// - An instruction fails (the machine halts and the error is returned)
    /// - A breakpoint matches
    pub fn run_while(&mut self, mut tripwire: impl FnMut(&mut Simulator) -> bool) -> Result<(), SimErr> {
        self.observer.clear();
        self.pause_condition = Default::default();

        // event loop
        // run until:
        // 1. the tripwire condition returns false
        // 2. any of the breakpoints are hit
        // 3. an instruction fails
        let result = loop {
            // Tripwire turned off:
            if !tripwire(self) {
                break Ok(PauseCondition::Tripwire);
            }

            // Run a step:
            if let Err(e) = self.step() {
                break Err(e);
            }

            // After executing, check that any breakpoints were hit.
            if self.breakpoints.iter().any(|bp| bp.check(self)) {
                break Ok(PauseCondition::Breakpoint);
            }
        };

        self.pause_condition = result?;
        Ok(())
    }

    /// Execute the program.
    ///
    /// This blocks until a breakpoint is hit or an instruction fails.
    /// If you would like to limit the maximum number of steps to execute, consider [`Simulator::run_with_limit`].
    pub fn run(&mut self) -> Result<(), SimErr> {
        self.run_while(|_| true)
    }

    /// Execute the program with a limit on how many steps to execute.
    ///
    /// This blocks until the program ends or until the number of steps to execute has been hit.
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<(), SimErr> {
        let i = self.instructions_run;
        self.run_while(|sim| sim.instructions_run.wrapping_sub(i) < max_steps)
    }

    /// Simulate one step, executing one instruction.
    ///
    /// If the instruction fails, the PC is put back on it and the machine halts.
    fn step(&mut self) -> Result<(), SimErr> {
        if self.is_halted() { return Err(SimErr::Halted) };

        match self.step_inner() {
            Ok(()) => {
                self.instructions_run = self.instructions_run.wrapping_add(1);
                Ok(())
            },
            Err(e) => {
                self.pc = self.prefetch_pc();
                self.prefetch = true;
                self.state = SimState::Halted;
                tracing::warn!(pc = format_args!("{:#010x}", self.pc), "halted: {e}");
                Err(e)
            }
        }
    }

    fn step_inner(&mut self) -> Result<(), SimErr> {
        self.prefetch = true;

        // FETCH
        let word = self.mem.read_word(self.pc)
            .ok_or(SimErr::AddressLoad { addr: self.pc })?;
        // DECODE
        let instr = SimInstr::decode(word);
        tracing::trace!(pc = format_args!("{:#010x}", self.pc), word = format_args!("{word:#010x}"), "{instr}");

        self.pc = self.pc.wrapping_add(4);
        self.prefetch = false;

        // EXECUTE
        let Some(desc) = instr.desc() else {
            return match self.flags.illegal_as_nop {
                true  => Ok(()),
                false => Err(SimErr::IllegalInstruction { pc: self.prefetch_pc(), word }),
            };
        };

        match (desc.op, instr.fields) {
            (Op::Add, Fields::R(RFields { rd, rs, rt, .. })) => {
                let result = self.reg(rs).wrapping_add(self.reg(rt));
                self.set_reg(rd, result);
            },
            (Op::J, Fields::J(JFields { target })) => {
                self.pc = target.get();
            },
            (Op::Beq, Fields::I(IFields { rs, rt, imm })) => {
                if self.reg(rs) == self.reg(rt) {
                    self.pc = self.pc.wrapping_add_signed(imm.sext());
                }
            },
            (Op::Lw, Fields::I(IFields { rs, rt, imm })) => {
                let addr = self.reg(rs).wrapping_add_signed(imm.sext());
                let val = self.read_mem(addr)?;
                self.set_reg(rt, val);
            },
            (Op::Sw, Fields::I(IFields { rs, rt, imm })) => {
                let addr = self.reg(rs).wrapping_add_signed(imm.sext());
                let val = self.reg(rt);
                self.write_mem(addr, val)?;
            },
            // decode always pairs an opcode with its own layout
            _ => return Err(SimErr::IllegalInstruction { pc: self.prefetch_pc(), word }),
        }

        Ok(())
    }

    /// Simulate one step, executing one instruction.
    ///
    /// Breakpoints are not checked.
    pub fn step_in(&mut self) -> Result<(), SimErr> {
        self.observer.clear();
        self.step()
    }
}
impl Default for Simulator {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::asm::assemble;
    use crate::ast::reg_consts::{S0, T0, T1, T2, T3};
    use crate::parse::parse_ast;

    use super::debug::{Breakpoint, Comparator};
    use super::mem::MachineInitStrategy;
    use super::*;

    fn load(src: &str, flags: SimFlags) -> Simulator {
        let obj = assemble(&parse_ast(src).unwrap()).unwrap();
        let mut sim = Simulator::new(flags);
        sim.load_obj_file(&obj, 0).unwrap();
        sim
    }
    fn sim_with(src: &str) -> Simulator {
        load(src, Default::default())
    }

    #[test]
    fn test_add() {
        let mut sim = sim_with("add $t1, $t2, $t3");
        sim.reg_file[T2] = 0x1234;
        sim.reg_file[T3] = 0x5678;
        sim.step_in().unwrap();

        assert_eq!(sim.reg_file[T1], 0x1234 + 0x5678);
        assert_eq!(sim.pc, 4);
        assert_eq!(sim.instructions_run, 1);
    }

    #[test]
    fn test_add_wraps() {
        let mut sim = sim_with("add $t1, $t2, $t3");
        sim.reg_file[T2] = 0xFFFF_FFFF;
        sim.reg_file[T3] = 2;
        sim.step_in().unwrap();
        assert_eq!(sim.reg_file[T1], 1);
    }

    #[test]
    fn test_beq() {
        // taken
        let mut sim = sim_with("beq $t1, $t2, 16");
        sim.reg_file[T1] = 7;
        sim.reg_file[T2] = 7;
        sim.step_in().unwrap();
        assert_eq!(sim.pc, 4 + 16);

        // not taken
        let mut sim = sim_with("beq $t1, $t2, 16");
        sim.reg_file[T1] = 7;
        sim.step_in().unwrap();
        assert_eq!(sim.pc, 4);

        // backwards
        let mut sim = sim_with("add $t0, $t0, $t0\nbeq $zero, $zero, -8");
        sim.step_in().unwrap();
        sim.step_in().unwrap();
        assert_eq!(sim.pc, 0);
    }

    #[test]
    fn test_jump_absolute() {
        let mut sim = sim_with("add $t0, $t0, $t0\nj 0x40");
        sim.step_in().unwrap();
        sim.step_in().unwrap();
        assert_eq!(sim.pc, 0x40);
    }

    #[test]
    fn test_store_load() {
        let mut sim = sim_with("sw $t1, 12($t2)\nlw $t3, 12($t2)");
        sim.reg_file[T1] = 0xCAFEF00D;
        sim.reg_file[T2] = 0x100;
        sim.run_with_limit(2).unwrap();

        assert_eq!(sim.reg_file[T3], 0xCAFEF00D);
        assert_eq!(sim.mem.read_word(0x10C), Some(0xCAFEF00D));
        assert!(sim.observer.get_mem_accesses(0x10C).modified());
        assert!(sim.observer.get_mem_accesses(0x10C).read());
    }

    #[test]
    fn test_negative_offset() {
        let mut sim = sim_with("lw $t0, -4($t1)");
        sim.reg_file[T1] = 0x104;
        sim.mem.write_word(0x100, 99).unwrap();
        sim.step_in().unwrap();
        assert_eq!(sim.reg_file[T0], 99);
    }

    #[test]
    fn test_zero_register() {
        let mut sim = sim_with("add $zero, $t0, $t0");
        sim.reg_file[T0] = 5;
        sim.step_in().unwrap();
        assert_eq!(sim.reg_file[ZERO], 0);
        assert_eq!(sim.observer.modified_regs().count(), 0);

        let mut sim = load("add $zero, $t0, $t0", SimFlags { writable_zero: true, ..Default::default() });
        sim.reg_file[T0] = 5;
        sim.step_in().unwrap();
        assert_eq!(sim.reg_file[ZERO], 10);
    }

    #[test]
    fn test_illegal_instruction_halts() {
        let mut sim = sim_with("add $t0, $t0, $t0");
        sim.mem.write_word(4, 0xFC00_0000).unwrap();

        sim.step_in().unwrap();
        assert_eq!(sim.step_in(), Err(SimErr::IllegalInstruction { pc: 4, word: 0xFC00_0000 }));
        assert_eq!(sim.pc, 4);
        assert_eq!(sim.state, SimState::Halted);
        assert_eq!(sim.instructions_run, 1);

        // stays halted until moved
        assert_eq!(sim.step_in(), Err(SimErr::Halted));
        assert_eq!(sim.run(), Err(SimErr::Halted));
        sim.jump_to(0).unwrap();
        assert_eq!(sim.state, SimState::Running);
        sim.step_in().unwrap();
    }

    #[test]
    fn test_unknown_funct_is_illegal() {
        let mut sim = Simulator::default();
        // opcode 0, funct 0x22
        sim.mem.write_word(0, 0x012A_4022).unwrap();
        assert_eq!(sim.step_in(), Err(SimErr::IllegalInstruction { pc: 0, word: 0x012A_4022 }));
    }

    #[test]
    fn test_illegal_as_nop() {
        let mut sim = Simulator::new(SimFlags { illegal_as_nop: true, ..Default::default() });
        sim.mem.write_word(0, 0xFC00_0000).unwrap();
        sim.step_in().unwrap();
        assert_eq!(sim.pc, 4);
        assert_eq!(sim.snapshot().registers, [0; 32]);
    }

    #[test]
    fn test_address_errors() {
        let mut sim = sim_with("lw $t0, 2($zero)");
        assert_eq!(sim.step_in(), Err(SimErr::AddressLoad { addr: 2 }));
        assert_eq!(sim.pc, 0);

        let mut sim = sim_with("sw $t0, 0($t1)");
        sim.reg_file[T1] = 0x10000;
        assert_eq!(sim.step_in(), Err(SimErr::AddressStore { addr: 0x10000 }));

        // fetch from past the end of memory
        let mut sim = load("j 0x100", SimFlags { mem_size: 0x100, ..Default::default() });
        sim.step_in().unwrap();
        assert_eq!(sim.step_in(), Err(SimErr::AddressLoad { addr: 0x100 }));
        assert_eq!(sim.pc, 0x100);

        // misaligned jump target
        let mut sim = sim_with("j 6");
        sim.step_in().unwrap();
        assert_eq!(sim.step_in(), Err(SimErr::AddressLoad { addr: 6 }));
    }

    #[test]
    fn test_run_limit_and_breakpoints() {
        let src = "
            add $t0, $t0, $t1
            beq $zero, $zero, -8
        ";
        let mut sim = sim_with(src);
        sim.reg_file[T1] = 1;
        sim.run_with_limit(10).unwrap();
        assert!(!sim.hit_breakpoint());
        assert_eq!(sim.instructions_run, 10);
        assert_eq!(sim.reg_file[T0], 5);

        sim.breakpoints.insert(Breakpoint::Reg { reg: T0, value: Comparator::Eq(8) });
        sim.run().unwrap();
        assert!(sim.hit_breakpoint());
        assert_eq!(sim.reg_file[T0], 8);
        assert_eq!(sim.pc, 4);
    }

    #[test]
    fn test_observer_regs() {
        let mut sim = sim_with("add $s0, $t0, $t1");
        sim.reg_file[T0] = 1;
        sim.step_in().unwrap();
        assert_eq!(sim.observer.modified_regs().collect::<Vec<_>>(), [S0]);
        assert!(sim.observer.get_reg_accesses(T1).read());
    }

    #[test]
    fn test_loading() {
        let mut sim = Simulator::new(SimFlags { mem_size: 16, ..Default::default() });

        assert_eq!(sim.load_binary(&[0x01, 0x2A, 0x40, 0x20], 8).unwrap(), 1);
        assert_eq!(sim.mem.read_word(8), Some(0x012A4020));

        assert!(matches!(sim.load_binary(&[0; 4], 2), Err(LoadErr::Misaligned { offset: 2 })));
        assert!(matches!(sim.load_binary(&[0; 6], 0), Err(LoadErr::PartialWord { len: 6 })));
        assert!(matches!(sim.load_binary(&[0; 8], 12), Err(LoadErr::OutOfBounds { offset: 12, len: 8 })));
        assert!(matches!(sim.load_binary(&[0; 4], u32::MAX - 3), Err(LoadErr::OutOfBounds { .. })));
        assert!(matches!(sim.load_file("/this/path/does/not/exist.bin", 0), Err(LoadErr::Io(_))));

        // a failed load leaves memory alone
        assert_eq!(sim.mem.read_word(12), Some(0));
    }

    #[test]
    fn test_current_instr_and_jump() {
        let mut sim = sim_with("add $t1, $t2, $t3\nj 0");
        assert_eq!(sim.current_instr().map(|i| i.to_string()).as_deref(), Some("add $t1, $t2, $t3"));
        sim.jump_to(4).unwrap();
        assert_eq!(sim.current_instr().map(|i| i.to_string()).as_deref(), Some("j 0x00000000"));

        assert_eq!(sim.jump_to(5), Err(SimErr::AddressLoad { addr: 5 }));
        assert_eq!(sim.jump_to(0x10000), Err(SimErr::AddressLoad { addr: 0x10000 }));
        assert_eq!(sim.pc, 4);
    }

    #[test]
    fn test_reset_and_snapshot() {
        let flags = SimFlags { machine_init: MachineInitStrategy::Known { value: 0x11 }, ..Default::default() };
        let mut sim = load("add $t1, $t2, $t3", flags);
        sim.breakpoints.insert(Breakpoint::PC(0x20));
        sim.step_in().unwrap();

        let snap = sim.snapshot();
        assert_eq!(snap.pc, 4);
        assert_eq!(snap.state, SimState::Running);
        assert_eq!(snap.instructions_run, 1);
        assert_eq!(snap.registers[0], 0);
        assert_eq!(snap.registers[9], 0x22);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["pc"], 4);
        assert_eq!(json["state"], "Running");
        assert_eq!(json["registers"][9], 0x22);

        sim.reset();
        assert_eq!(sim.pc, 0);
        assert_eq!(sim.instructions_run, 0);
        assert_eq!(sim.reg_file[T1], 0x11);
        assert_eq!(sim.breakpoints.len(), 1);
        assert_eq!(sim.flags, flags);
    }
}
