//! Module handles access observers,
//! which store which accesses occur at a given memory location or register.
//!
//! You would typically access an observer via the [`Simulator::observer`] field.
//! This [`AccessObserver`] is cleared at the start of every execution call
//! ([`Simulator::step_in`], [`Simulator::run_while`], and adjacent),
//! so after a call it holds what that call touched.
//!
//! [`Simulator::observer`]: crate::sim::Simulator::observer
//! [`Simulator::step_in`]: crate::sim::Simulator::step_in
//! [`Simulator::run_while`]: crate::sim::Simulator::run_while

use std::collections::BTreeMap;

use crate::ast::Reg;

/// The set of accesses which have occurred at this location.
///
/// ## Example
///
/// ```
/// # use mips_ensemble::sim::observer::AccessSet;
///
/// let accesses = AccessSet::READ;
/// assert!(accesses.accessed());
/// assert!(accesses.read());
/// assert!(!accesses.written());
/// assert!(!accesses.modified());
/// ```
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessSet(u8);
impl AccessSet {
    /// Set with only the read flag enabled.
    pub const READ: Self = Self(1 << 0);
    /// Set with only the write flag enabled.
    pub const WRITTEN: Self = Self(1 << 1);
    /// Set with only the modify flag enabled.
    pub const MODIFIED: Self = Self(1 << 2);

    /// True if any access has occurred.
    pub fn accessed(&self) -> bool {
        self.0 != 0
    }

    /// True if a read has occurred.
    pub fn read(&self) -> bool {
        self.0 & Self::READ.0 != 0
    }
    /// True if a write has occurred (does not necessarily have to change data).
    pub fn written(&self) -> bool {
        self.0 & Self::WRITTEN.0 != 0
    }
    /// True if a write has occurred (data must change).
    pub fn modified(&self) -> bool {
        self.0 & Self::MODIFIED.0 != 0
    }

    /// The set for a write which replaced `old` with `new`.
    pub fn write(old: u32, new: u32) -> Self {
        match old != new {
            true  => Self::WRITTEN | Self::MODIFIED,
            false => Self::WRITTEN,
        }
    }
}
impl std::ops::BitOr for AccessSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
impl std::ops::BitOrAssign for AccessSet {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}
impl std::fmt::Debug for AccessSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessFlags")
            .field("accessed", &self.accessed())
            .field("read", &self.read())
            .field("written", &self.written())
            .field("modified", &self.modified())
            .finish()
    }
}

/// A struct that tracks accesses in memory and the register file.
///
/// Memory accesses are keyed by word address.
/// Instruction fetches are not recorded.
#[derive(Debug, Default)]
pub struct AccessObserver {
    mem: BTreeMap<u32, AccessSet>,
    regs: BTreeMap<Reg, AccessSet>,
}
impl AccessObserver {
    /// Creates a new access observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all accesses.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Gets the access set for the given memory location.
    pub fn get_mem_accesses(&self, addr: u32) -> AccessSet {
        self.mem.get(&addr).copied().unwrap_or_default()
    }

    /// Adds new flags to the access set for the given memory location.
    pub fn update_mem_accesses(&mut self, addr: u32, set: AccessSet) {
        *self.mem.entry(addr).or_default() |= set;
    }

    /// Takes all memory accesses which have occurred since last clear,
    /// as well as clearing memory accesses.
    ///
    /// This iterator is sorted in address order.
    pub fn take_mem_accesses(&mut self) -> impl Iterator<Item=(u32, AccessSet)> {
        std::mem::take(&mut self.mem).into_iter()
    }

    /// Gets the access set for the given register.
    pub fn get_reg_accesses(&self, reg: Reg) -> AccessSet {
        self.regs.get(&reg).copied().unwrap_or_default()
    }

    /// Adds new flags to the access set for the given register.
    pub fn update_reg_accesses(&mut self, reg: Reg, set: AccessSet) {
        *self.regs.entry(reg).or_default() |= set;
    }

    /// Iterates over the registers whose values changed since last clear, in register order.
    pub fn modified_regs(&self) -> impl Iterator<Item=Reg> + '_ {
        self.regs.iter()
            .filter(|(_, set)| set.modified())
            .map(|(&r, _)| r)
    }
}
