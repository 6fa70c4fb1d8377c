//! Memory handling for the MIPS simulator.
//!
//! This module consists of:
//! - [`Mem`]: The byte-addressable memory.
//! - [`RegFile`]: The register file.
//! - [`MachineInitStrategy`]: How memory and registers are filled when the machine is created.

use rand::rngs::StdRng;
use rand::Rng;

use crate::ast::Reg;

/// Trait that describes types that can be used to create the data for an uninitialized word.
pub trait WordFiller {
    /// Generate the data of one word.
    fn generate(&mut self) -> u32;
}
impl WordFiller for () {
    fn generate(&mut self) -> u32 {
        rand::random()
    }
}
impl WordFiller for u32 {
    fn generate(&mut self) -> u32 {
        *self
    }
}
impl WordFiller for StdRng {
    fn generate(&mut self) -> u32 {
        self.gen()
    }
}

/// Strategy used to fill memory and registers when a machine is created.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MachineInitStrategy {
    /// Initializes each word randomly and non-deterministically.
    Unseeded,

    /// Initializes each word randomly and deterministically.
    Seeded {
        /// The seed the RNG was initialized with.
        seed: u64
    },

    /// Initializes each word to a known value.
    Known {
        /// The value to initialize each word to.
        value: u32
    }
}
impl Default for MachineInitStrategy {
    fn default() -> Self {
        MachineInitStrategy::Known { value: 0 }
    }
}
impl MachineInitStrategy {
    pub(super) fn generator(&self) -> impl WordFiller {
        use rand::SeedableRng;

        match self {
            MachineInitStrategy::Unseeded => WCGenerator::Unseeded,
            MachineInitStrategy::Seeded { seed } => WCGenerator::Seeded(Box::new(StdRng::seed_from_u64(*seed))),
            MachineInitStrategy::Known { value } => WCGenerator::Known(*value),
        }
    }
}

enum WCGenerator {
    Unseeded,
    Seeded(Box<StdRng>),
    Known(u32)
}
impl WordFiller for WCGenerator {
    fn generate(&mut self) -> u32 {
        match self {
            WCGenerator::Unseeded  => ().generate(),
            WCGenerator::Seeded(r) => r.generate(),
            WCGenerator::Known(k)  => k.generate(),
        }
    }
}

/// Memory.
///
/// This is a fixed-capacity buffer of bytes. Words are 4 bytes in big-endian order
/// and must be accessed at addresses which are multiples of 4.
///
/// Accessors return `None` for misaligned or out-of-bounds addresses;
/// the simulator turns those into address exceptions.
#[derive(Debug, Clone)]
pub struct Mem {
    data: Box<[u8]>
}
impl Mem {
    /// Creates a new memory of `size` bytes, filling each word with the filler.
    ///
    /// The size is rounded down to a multiple of 4.
    pub fn new(size: usize, filler: &mut impl WordFiller) -> Self {
        let words = size / 4;
        let data = std::iter::repeat_with(|| filler.generate().to_be_bytes())
            .take(words)
            .flatten()
            .collect();

        Self { data }
    }

    /// The size of memory in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether memory has no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether a word can be accessed at this address (aligned and in bounds).
    pub fn is_word_addr(&self, addr: u32) -> bool {
        self.word_range(addr).is_some()
    }

    fn word_range(&self, addr: u32) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(addr).ok()?;
        let end = start.checked_add(4)?;
        (addr % 4 == 0 && end <= self.data.len()).then_some(start..end)
    }

    /// Reads the word at the address.
    pub fn read_word(&self, addr: u32) -> Option<u32> {
        let range = self.word_range(addr)?;
        let bytes = <[u8; 4]>::try_from(&self.data[range]).ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Writes the word at the address.
    pub fn write_word(&mut self, addr: u32, word: u32) -> Option<()> {
        let range = self.word_range(addr)?;
        self.data[range].copy_from_slice(&word.to_be_bytes());
        Some(())
    }

    /// The raw bytes of memory.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// The register file.
///
/// This holds the raw register values and applies no rules.
/// Whether register 0 is hard-wired to zero is decided by the simulator
/// (see [`Simulator::set_reg`]).
///
/// [`Simulator::set_reg`]: super::Simulator::set_reg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegFile([u32; Reg::COUNT]);
impl RegFile {
    /// Creates a register file, filling each register with the filler.
    pub fn new(filler: &mut impl WordFiller) -> Self {
        Self(std::array::from_fn(|_| filler.generate()))
    }

    /// All register values, in register-number order.
    pub fn as_array(&self) -> &[u32; Reg::COUNT] {
        &self.0
    }
}
impl std::ops::Index<Reg> for RegFile {
    type Output = u32;

    fn index(&self, index: Reg) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<Reg> for RegFile {
    fn index_mut(&mut self, index: Reg) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::reg_consts::{T0, T9};

    use super::{Mem, MachineInitStrategy, RegFile, WordFiller};

    #[test]
    fn test_word_access() {
        let mut mem = Mem::new(16, &mut 0u32);
        assert_eq!(mem.len(), 16);

        assert_eq!(mem.write_word(4, 0x8C090030), Some(()));
        assert_eq!(mem.read_word(4), Some(0x8C090030));
        // big-endian bytes
        assert_eq!(&mem.as_slice()[4..8], [0x8C, 0x09, 0x00, 0x30]);

        // misaligned or out of bounds
        assert_eq!(mem.read_word(2), None);
        assert_eq!(mem.read_word(16), None);
        assert_eq!(mem.read_word(u32::MAX - 3), None);
        assert_eq!(mem.write_word(6, 0), None);
        assert_eq!(mem.write_word(16, 0), None);
        assert!(mem.is_word_addr(12));
        assert!(!mem.is_word_addr(13));
    }

    #[test]
    fn test_size_rounds_down() {
        assert_eq!(Mem::new(10, &mut 0u32).len(), 8);
        assert!(Mem::new(3, &mut 0u32).is_empty());
    }

    #[test]
    fn test_init_strategies() {
        let mut known = MachineInitStrategy::Known { value: 0xDEADBEEF }.generator();
        let mem = Mem::new(8, &mut known);
        assert_eq!(mem.read_word(0), Some(0xDEADBEEF));
        assert_eq!(mem.read_word(4), Some(0xDEADBEEF));

        // same seed, same machine
        let a = RegFile::new(&mut MachineInitStrategy::Seeded { seed: 2110 }.generator());
        let b = RegFile::new(&mut MachineInitStrategy::Seeded { seed: 2110 }.generator());
        assert_eq!(a, b);

        assert_eq!(MachineInitStrategy::default(), MachineInitStrategy::Known { value: 0 });
        assert_eq!(MachineInitStrategy::default().generator().generate(), 0);
    }

    #[test]
    fn test_reg_file_index() {
        let mut regs = RegFile::new(&mut 0u32);
        regs[T0] = 0x1234;
        regs[T9] = 7;
        assert_eq!(regs[T0], 0x1234);
        assert_eq!(regs.as_array()[8], 0x1234);
        assert_eq!(regs.as_array()[25], 7);
    }
}
