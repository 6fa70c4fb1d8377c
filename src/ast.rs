//! Components relating to the abstract syntax trees (ASTs)
//! used in representing MIPS instructions.
//!
//! These components together are used to construct...
//! - [`asm::AsmInstr`] (a data structure holding a parsed assembly source instruction),
//! - and [`sim::SimInstr`] (a data structure holding the typed view of an instruction word).

pub mod asm;
pub mod sim;

use std::num::TryFromIntError;
use offset_base::OffsetBacking;

use crate::isa;

/// A general-purpose register. Must be between 0 and 31.
///
/// This `Reg` struct can either be constructed by selecting a register from [`reg_consts`],
/// by using [`Reg::try_from`] with a register number,
/// or by parsing a register name (e.g., `"$t0"`, `"sp"`, `"$31"`).
///
/// ## Examples
///
/// ```text
/// add $t0, $t1, $t2
///     ~~~  ~~~  ~~~
/// lw $t1, 48($zero)
///    ~~~     ~~~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Reg(pub(crate) u8);

/// Register constants, named by their conventional MIPS role.
pub mod reg_consts {
    #![allow(missing_docs)]
    use super::Reg;

    /// The hard-wired zero register.
    pub const ZERO: Reg = Reg(0);
    /// The assembler temporary.
    pub const AT: Reg = Reg(1);
    pub const V0: Reg = Reg(2);
    pub const V1: Reg = Reg(3);
    pub const A0: Reg = Reg(4);
    pub const A1: Reg = Reg(5);
    pub const A2: Reg = Reg(6);
    pub const A3: Reg = Reg(7);
    pub const T0: Reg = Reg(8);
    pub const T1: Reg = Reg(9);
    pub const T2: Reg = Reg(10);
    pub const T3: Reg = Reg(11);
    pub const T4: Reg = Reg(12);
    pub const T5: Reg = Reg(13);
    pub const T6: Reg = Reg(14);
    pub const T7: Reg = Reg(15);
    pub const S0: Reg = Reg(16);
    pub const S1: Reg = Reg(17);
    pub const S2: Reg = Reg(18);
    pub const S3: Reg = Reg(19);
    pub const S4: Reg = Reg(20);
    pub const S5: Reg = Reg(21);
    pub const S6: Reg = Reg(22);
    pub const S7: Reg = Reg(23);
    pub const T8: Reg = Reg(24);
    pub const T9: Reg = Reg(25);
    pub const K0: Reg = Reg(26);
    pub const K1: Reg = Reg(27);
    pub const GP: Reg = Reg(28);
    /// The stack pointer.
    pub const SP: Reg = Reg(29);
    /// The frame pointer.
    pub const FP: Reg = Reg(30);
    /// The return address.
    pub const RA: Reg = Reg(31);
}
impl Reg {
    /// The number of general-purpose registers.
    pub const COUNT: usize = 32;

    /// Gets the register number of this [`Reg`]. This is always between 0 and 31.
    pub fn reg_no(self) -> u8 {
        self.0
    }

    /// Gets the conventional name of this register (without the `$` prefix).
    pub fn name(self) -> &'static str {
        isa::index_to_register_name(self)
    }

    /// Iterates over all registers in index order.
    pub fn all() -> impl Iterator<Item=Reg> {
        (0..Self::COUNT as u8).map(Reg)
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.name())
    }
}
impl From<Reg> for usize {
    // Used for indexing the reg file in [`crate::sim::mem::RegFile`].
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = TryFromIntError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=31 => Ok(Reg(value)),
            // HACKy, but there's no other way to create this error
            _      => u8::try_from(256).map(|_| unreachable!("should've been TryFromIntError")),
        }
    }
}
impl std::str::FromStr for Reg {
    type Err = isa::IsaErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        isa::register_name_to_index(s)
    }
}

/// A value that must fit within `N` bits of its backing integer.
///
/// This is used for each fixed-width field of an instruction word:
/// - [`Shamt`] and [`Funct`] in R-type words,
/// - [`Imm16`] in I-type words,
/// - [`Target26`] in J-type words.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Offset<OFF, const N: u32>(OFF);

/// The 5-bit shift amount of an R-type instruction.
pub type Shamt = Offset<u8, 5>;
/// The 6-bit function selector of an R-type instruction.
pub type Funct = Offset<u8, 6>;
/// The 6-bit primary opcode of any instruction.
pub type Opcode = Offset<u8, 6>;
/// The raw 16-bit immediate of an I-type instruction.
///
/// Whether this is interpreted as signed is up to the instruction.
/// See [`Imm16::sext`].
pub type Imm16 = Offset<u16, 16>;
/// The 26-bit target of a J-type instruction.
pub type Target26 = Offset<u32, 26>;

impl Imm16 {
    /// Sign-extends this immediate to 32 bits.
    pub fn sext(&self) -> i32 {
        i32::from(self.0 as i16)
    }
}

impl<OFF: std::fmt::Display, const N: u32> std::fmt::Display for Offset<OFF, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
impl<OFF: std::fmt::LowerHex, const N: u32> std::fmt::LowerHex for Offset<OFF, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The errors that can result from calling [`Offset::new`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OffsetNewErr {
    /// The provided value cannot fit an unsigned integer of the given bitsize.
    CannotFitUnsigned(u32),
}

impl std::fmt::Display for OffsetNewErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetNewErr::CannotFitUnsigned(n) => write!(f, "value is too big for unsigned {n}-bit field"),
        }
    }
}
impl std::error::Error for OffsetNewErr {}
impl crate::err::Error for OffsetNewErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            OffsetNewErr::CannotFitUnsigned(n) => Some(format!("the range for an unsigned {n}-bit field is [0, {}]", (1u64 << n) - 1).into()),
        }
    }
}

mod offset_base {
    use super::OffsetNewErr;

    /// Any type that could store a value for [`Offset`].
    ///
    /// [`Offset`]: super::Offset
    pub trait OffsetBacking: Copy + Eq {
        /// How many bits are contained within this backing.
        ///
        /// For example, `u16` has 16 bits and thus BITS == 16.
        const BITS: u32;

        /// Truncates the given value to the provided `bit_size`.
        ///
        /// This bit size is always known to be at most BITS.
        fn truncate(self, bit_size: u32) -> Self;

        /// The error to raise if a given value doesn't match
        /// its provided value when truncated to a given `bit_size`.
        fn does_not_fit_error(bit_size: u32) -> OffsetNewErr;
    }

    macro_rules! impl_offset_backing_for_ints {
        ($($Int:ty),*) => {
            $(
                impl OffsetBacking for $Int {
                    const BITS: u32 = Self::BITS;

                    fn truncate(self, bit_size: u32) -> Self {
                        (self << (Self::BITS - bit_size)) >> (Self::BITS - bit_size)
                    }

                    fn does_not_fit_error(bit_size: u32) -> OffsetNewErr {
                        OffsetNewErr::CannotFitUnsigned(bit_size)
                    }
                }
            )*
        }
    }
    impl_offset_backing_for_ints! { u8, u16, u32 }
}

impl<OFF: OffsetBacking, const N: u32> Offset<OFF, N> {
    /// Creates a new field value.
    /// This must fit within `N` bits of the representation, otherwise an error is raised.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mips_ensemble::ast::Offset;
    /// #
    /// let pos31 = Offset::<u8, 5>::new(31);
    /// let pos32 = Offset::<u8, 5>::new(32);
    /// assert!(pos31.is_ok());
    /// assert!(pos32.is_err());
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is larger than the backing (e.g., for backing `u16`, larger than 16).
    ///
    /// ```should_panic
    /// # use mips_ensemble::ast::Offset;
    /// #
    /// let oh_no = Offset::<u16, 17>::new(18);
    /// ```
    pub fn new(n: OFF) -> Result<Self, OffsetNewErr> {
        assert!(N <= OFF::BITS, "bit size {N} exceeds size of backing ({})", OFF::BITS);
        match n == n.truncate(N) {
            true  => Ok(Offset(n)),
            false => Err(OFF::does_not_fit_error(N)),
        }
    }

    /// Creates a new field value by keeping the low N bits of the integer
    /// and discarding the rest.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mips_ensemble::ast::Offset;
    /// #
    /// let pos31 = Offset::<u8, 5>::new_trunc(31); // 0b000_11111
    /// let pos32 = Offset::<u8, 5>::new_trunc(32); // 0b001_00000
    /// assert_eq!(pos31.get(), 31);
    /// assert_eq!(pos32.get(), 0);
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is larger than the backing (e.g., for backing `u16`, larger than 16).
    pub fn new_trunc(n: OFF) -> Self {
        assert!(N <= OFF::BITS, "bit size {N} exceeds size of backing ({})", OFF::BITS);
        Self(n.truncate(N))
    }

    /// Gets the value of the field.
    pub fn get(&self) -> OFF {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::reg_consts::{RA, T0, ZERO};
    use super::{Imm16, Reg, Target26};

    #[test]
    fn test_reg_conversions() {
        assert_eq!(Reg::try_from(8), Ok(T0));
        assert!(Reg::try_from(32).is_err());
        assert_eq!("$ra".parse::<Reg>(), Ok(RA));
        assert_eq!("zero".parse::<Reg>(), Ok(ZERO));
        assert_eq!(T0.to_string(), "$t0");
        assert_eq!(Reg::all().count(), 32);
    }

    #[test]
    fn test_field_widths() {
        assert!(Imm16::new(0xFFFF).is_ok());
        assert_eq!(Imm16::new_trunc(0xFFF0).sext(), -16);
        assert_eq!(Imm16::new_trunc(0x0010).sext(), 16);
        assert!(Target26::new(0x03FF_FFFF).is_ok());
        assert!(Target26::new(0x0400_0000).is_err());
        assert_eq!(Target26::new_trunc(0x0A34_5678).get(), 0x0234_5678);
    }
}
