//! Utilities to debug simulation.
//!
//! The key types here are:
//! - [`Breakpoint`], which can be appended to the [`Simulator`]'s
//!   breakpoint field to cause the simulator to break.
//! - [`MemView`], a scrollable window over memory which front ends render from.
use std::fmt::Write;

use crate::ast::sim::SimInstr;
use crate::ast::Reg;

use super::{SimErr, Simulator};

/// Common breakpoints.
#[derive(PartialEq, Eq, Hash)]
pub enum Breakpoint {
    /// Break when the PC is equal to the given value.
    PC(u32),

    /// Break when the provided register is set to a given value.
    Reg {
        /// Register to check.
        reg: Reg,
        /// Predicate to break against.
        value: Comparator
    },
    /// Break when the word at the provided memory address matches a given value.
    Mem {
        /// Address to check.
        addr: u32,
        /// Predicate to break against.
        value: Comparator
    },
}

impl Breakpoint where Breakpoint: Send + Sync { /* assert Breakpoint is send/sync */ }

impl Breakpoint {
    /// Checks if a break should occur.
    pub fn check(&self, sim: &Simulator) -> bool {
        match self {
            Breakpoint::PC(expected) => expected == &sim.pc,
            Breakpoint::Reg { reg, value: cmp } => cmp.check(sim.reg_file[*reg]),
            Breakpoint::Mem { addr, value: cmp } => sim.mem.read_word(*addr).is_some_and(|w| cmp.check(w)),
        }
    }

    fn fmt_bp(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::PC(expected) => {
                write!(f, "pc == {expected:#010x}")?;
            },
            Self::Reg { reg, value } => {
                write!(f, "{reg} ")?;
                value.fmt_cmp(f)?;
            },
            Self::Mem { addr, value } => {
                write!(f, "mem[{addr:#010x}] ")?;
                value.fmt_cmp(f)?;
            },
        }
        Ok(())
    }
}
impl std::fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Breakpoint(")?;
        self.fmt_bp(f)?;
        f.write_char(')')
    }
}
/// Predicate checking whether the current value is equal to the value.
#[derive(PartialEq, Eq, Hash, Debug)]
pub enum Comparator {
    /// Never breaks.
    Never,
    /// Break if the desired value is less than the provided value.
    Lt(u32),
    /// Break if the desired value is equal to the provided value.
    Eq(u32),
    /// Break if the desired value is less than or equal to the provided value.
    Le(u32),
    /// Break if the desired value is greater than the provided value.
    Gt(u32),
    /// Break if the desired value is not equal to the provided value.
    Ne(u32),
    /// Break if the desired value is greater than or equal to the provided value.
    Ge(u32),
    /// Always breaks.
    Always
}
impl Comparator {
    /// Checks if the operand passes the comparator.
    pub fn check(&self, operand: u32) -> bool {
        match *self {
            Comparator::Never  => false,
            Comparator::Lt(r)  => operand < r,
            Comparator::Eq(r)  => operand == r,
            Comparator::Le(r)  => operand <= r,
            Comparator::Gt(r)  => operand > r,
            Comparator::Ne(r)  => operand != r,
            Comparator::Ge(r)  => operand >= r,
            Comparator::Always => true,
        }
    }

    fn fmt_cmp(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparator::Never  => f.write_str("never"),
            Comparator::Lt(r)  => write!(f, "< {r:#x}"),
            Comparator::Eq(r)  => write!(f, "== {r:#x}"),
            Comparator::Le(r)  => write!(f, "<= {r:#x}"),
            Comparator::Gt(r)  => write!(f, "> {r:#x}"),
            Comparator::Ne(r)  => write!(f, "!= {r:#x}"),
            Comparator::Ge(r)  => write!(f, ">= {r:#x}"),
            Comparator::Always => f.write_str("always"),
        }
    }
}

/// One row of a [`MemView`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MemRow {
    /// The byte address of this word.
    pub addr: u32,
    /// The word stored at this address.
    pub word: u32,
    /// Whether the PC points at this word.
    pub is_pc: bool,
}
impl MemRow {
    /// Decodes this row's word.
    pub fn instr(&self) -> SimInstr {
        SimInstr::decode(self.word)
    }
}

/// A window of consecutive words in memory.
///
/// The view holds only its position; the memory it shows is passed in
/// whenever it is moved or rendered.
///
/// ```
/// use mips_ensemble::sim::Simulator;
/// use mips_ensemble::sim::debug::MemView;
///
/// let sim = Simulator::default();
/// let mut view = MemView::default();
/// view.scroll_down(&sim);
/// assert_eq!(view.top, 4);
///
/// let rows: Vec<_> = view.rows(&sim).collect();
/// assert_eq!(rows.len(), 33);
/// assert_eq!(rows[0].addr, 4);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MemView {
    /// The address of the first row.
    pub top: u32,
    /// The number of rows shown.
    pub rows: usize,
}
impl Default for MemView {
    fn default() -> Self {
        Self::new(33)
    }
}
impl MemView {
    /// Creates a view at address 0 with the given number of rows.
    pub fn new(rows: usize) -> Self {
        Self { top: 0, rows }
    }

    fn span(&self) -> u64 {
        4 * self.rows as u64
    }

    /// Moves the view up by one word.
    pub fn scroll_up(&mut self) {
        self.top = self.top.saturating_sub(4) & !3;
    }

    /// Moves the view down by one word, stopping at the end of memory.
    pub fn scroll_down(&mut self, sim: &Simulator) {
        self.top = self.top.saturating_add(4);
        self.clamp(sim);
    }

    /// Moves the view so its first row is `addr`.
    ///
    /// This fails if the address is not a word address in memory.
    pub fn jump(&mut self, addr: u32, sim: &Simulator) -> Result<(), SimErr> {
        if !sim.mem.is_word_addr(addr) {
            return Err(SimErr::AddressLoad { addr });
        }
        self.top = addr;
        self.clamp(sim);
        Ok(())
    }

    /// Moves the view so `addr` is visible,
    /// centering it if it was outside the view.
    pub fn follow(&mut self, addr: u32, sim: &Simulator) {
        let top = u64::from(self.top);
        if (top..top + self.span()).contains(&u64::from(addr)) { return; }

        let half = u32::try_from(self.rows / 2).unwrap_or(u32::MAX).saturating_mul(4);
        self.top = addr.saturating_sub(half) & !3;
        self.clamp(sim);
    }

    /// Keeps the view aligned and within memory.
    pub fn clamp(&mut self, sim: &Simulator) {
        let max_top = (sim.mem.len() as u64).saturating_sub(self.span());
        let max_top = u32::try_from(max_top).unwrap_or(u32::MAX) & !3;
        self.top = self.top.min(max_top) & !3;
    }

    /// The rows of this view which are inside memory.
    pub fn rows<'s>(&self, sim: &'s Simulator) -> impl Iterator<Item=MemRow> + 's {
        (u64::from(self.top)..)
            .step_by(4)
            .take(self.rows)
            .map_while(|a| u32::try_from(a).ok())
            .map_while(|addr| {
                let word = sim.mem.read_word(addr)?;
                Some(MemRow { addr, word, is_pc: addr == sim.pc })
            })
    }
}
