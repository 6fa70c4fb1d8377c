//! The instruction set descriptor table.
//!
//! This is the single source of truth for the modeled instruction set,
//! which is consulted by the parser, the assembler, the decoder, and the simulator:
//! - [`INSTRUCTIONS`]: each supported mnemonic with its opcode, funct, and operand template
//! - [`REG_NAMES`]: the conventional register names in register-number order
//!
//! All lookups here are pure and case-insensitive.
//!
//! ```
//! use mips_ensemble::isa::{self, ITemplate};
//! use mips_ensemble::ast::reg_consts::T1;
//!
//! assert_eq!(isa::mnemonic_to_opcode("lw"), Ok(0x23));
//! assert_eq!(isa::opcode_to_template(0x23), Some(ITemplate::RtImmRs));
//! assert_eq!(isa::opcode_to_template(0x3F), None);
//! assert_eq!(isa::register_name_to_index("$t1"), Ok(T1));
//! assert_eq!(isa::index_to_register_name(T1), "t1");
//! ```

use crate::ast::Reg;

/// The operand layout of an instruction, both in source order and in which
/// fields of the instruction word are populated.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ITemplate {
    /// `op rd, rs, rt` (R-type)
    RdRsRt,
    /// `op rt, imm(rs)` (I-type, memory access)
    RtImmRs,
    /// `op rs, rt, imm` (I-type, branch)
    RsRtImm,
    /// `op target` (J-type)
    JImm,
}
impl ITemplate {
    /// The word layout this template is encoded with.
    pub fn format(self) -> Format {
        match self {
            ITemplate::RdRsRt  => Format::R,
            ITemplate::RtImmRs => Format::I,
            ITemplate::RsRtImm => Format::I,
            ITemplate::JImm    => Format::J,
        }
    }
}

/// The three instruction word layouts.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Format {
    /// `opcode:6 | rs:5 | rt:5 | rd:5 | shamt:5 | funct:6`
    R,
    /// `opcode:6 | rs:5 | rt:5 | imm:16`
    I,
    /// `opcode:6 | target:26`
    J,
}

/// The operations the simulator can execute.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(missing_docs)]
pub enum Op {
    Add,
    J,
    Beq,
    Lw,
    Sw,
}
impl Op {
    /// Gets the descriptor for this operation.
    pub fn desc(self) -> &'static InstrDesc {
        match self {
            Op::Add => &INSTRUCTIONS[0],
            Op::J   => &INSTRUCTIONS[1],
            Op::Beq => &INSTRUCTIONS[2],
            Op::Lw  => &INSTRUCTIONS[3],
            Op::Sw  => &INSTRUCTIONS[4],
        }
    }
}
impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.desc().mnemonic)
    }
}

/// A row of the descriptor table.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct InstrDesc {
    /// The operation this row describes.
    pub op: Op,
    /// The lowercase mnemonic.
    pub mnemonic: &'static str,
    /// The 6-bit primary opcode.
    pub opcode: u8,
    /// The 6-bit function selector (R-type only).
    pub funct: Option<u8>,
    /// The operand template.
    pub template: ITemplate,
}

/// Every supported instruction.
pub static INSTRUCTIONS: [InstrDesc; 5] = [
    InstrDesc { op: Op::Add, mnemonic: "add", opcode: 0x00, funct: Some(0x20), template: ITemplate::RdRsRt },
    InstrDesc { op: Op::J,   mnemonic: "j",   opcode: 0x02, funct: None,       template: ITemplate::JImm },
    InstrDesc { op: Op::Beq, mnemonic: "beq", opcode: 0x0C, funct: None,       template: ITemplate::RsRtImm },
    InstrDesc { op: Op::Lw,  mnemonic: "lw",  opcode: 0x23, funct: None,       template: ITemplate::RtImmRs },
    InstrDesc { op: Op::Sw,  mnemonic: "sw",  opcode: 0x2B, funct: None,       template: ITemplate::RtImmRs },
];

/// Conventional register names, indexed by register number.
pub const REG_NAMES: [&str; Reg::COUNT] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3",
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7",
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7",
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

/// Errors from failed lookups in the descriptor table.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum IsaErr {
    /// Mnemonic is not in the table.
    UnknownMnemonic(String),
    /// Register name does not name any register.
    UnknownRegister(String),
}
impl std::fmt::Display for IsaErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsaErr::UnknownMnemonic(s) => write!(f, "unknown mnemonic {s:?}"),
            IsaErr::UnknownRegister(s) => write!(f, "unknown register {s:?}"),
        }
    }
}
impl std::error::Error for IsaErr {}
impl crate::err::Error for IsaErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            IsaErr::UnknownMnemonic(_) => Some(supported_mnemonics_help().into()),
            IsaErr::UnknownRegister(_) => Some(REGISTER_HELP.into()),
        }
    }
}

pub(crate) const REGISTER_HELP: &str = "registers are $zero, $at, $v0-$v1, $a0-$a3, $t0-$t9, $s0-$s7, $k0-$k1, $gp, $sp, $fp, $ra, or $0-$31";
pub(crate) fn supported_mnemonics_help() -> String {
    let names: Vec<_> = INSTRUCTIONS.iter().map(|d| d.mnemonic).collect();
    format!("supported instructions are {}", names.join(", "))
}

/// Looks up the descriptor for a mnemonic.
pub fn lookup_mnemonic(name: &str) -> Option<&'static InstrDesc> {
    INSTRUCTIONS.iter().find(|d| d.mnemonic.eq_ignore_ascii_case(name))
}

/// Gets the opcode of a mnemonic.
pub fn mnemonic_to_opcode(name: &str) -> Result<u8, IsaErr> {
    lookup_mnemonic(name)
        .map(|d| d.opcode)
        .ok_or_else(|| IsaErr::UnknownMnemonic(name.to_string()))
}

/// Gets the template for an opcode.
///
/// This is `None` for any opcode that is not in the table.
pub fn opcode_to_template(opcode: u8) -> Option<ITemplate> {
    INSTRUCTIONS.iter()
        .find(|d| d.opcode == opcode)
        .map(|d| d.template)
}

/// Looks up the descriptor that executes an (opcode, funct) pair.
///
/// The funct is only consulted for R-type opcodes.
pub fn lookup_opcode(opcode: u8, funct: u8) -> Option<&'static InstrDesc> {
    INSTRUCTIONS.iter()
        .find(|d| d.opcode == opcode && d.funct.map_or(true, |f| f == funct))
}

/// Resolves a register name into a register.
///
/// This accepts conventional names (`t0`, `zero`, `sp`) and numeric names (`0`-`31`),
/// each with or without the `$` prefix.
pub fn register_name_to_index(name: &str) -> Result<Reg, IsaErr> {
    let bare = name.strip_prefix('$').unwrap_or(name);

    let by_name = REG_NAMES.iter()
        .position(|n| n.eq_ignore_ascii_case(bare));
    let by_number = || Some(bare)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<u8>().ok())
        .filter(|&n| usize::from(n) < Reg::COUNT)
        .map(usize::from);

    by_name.or_else(by_number)
        .map(|i| Reg(i as u8))
        .ok_or_else(|| IsaErr::UnknownRegister(name.to_string()))
}

/// Gets the conventional name of a register.
pub fn index_to_register_name(reg: Reg) -> &'static str {
    REG_NAMES[usize::from(reg)]
}

#[cfg(test)]
mod tests {
    use crate::ast::Reg;
    use crate::ast::reg_consts::{FP, T0, T9, ZERO};

    use super::*;

    #[test]
    fn test_table_is_bidirectional() {
        for desc in &INSTRUCTIONS {
            assert_eq!(lookup_mnemonic(desc.mnemonic), Some(desc));
            assert_eq!(mnemonic_to_opcode(desc.mnemonic), Ok(desc.opcode));
            assert_eq!(opcode_to_template(desc.opcode), Some(desc.template));
            assert_eq!(lookup_opcode(desc.opcode, desc.funct.unwrap_or(0)), Some(desc));
            assert_eq!(desc.op.desc(), desc);
        }
    }

    #[test]
    fn test_unknown_opcodes() {
        let known: Vec<_> = INSTRUCTIONS.iter().map(|d| d.opcode).collect();
        for opcode in 0..64 {
            assert_eq!(opcode_to_template(opcode).is_some(), known.contains(&opcode), "opcode {opcode:#04x}");
        }

        // opcode 0 with any other funct does not execute as add
        assert_eq!(lookup_opcode(0x00, 0x20).map(|d| d.op), Some(Op::Add));
        assert_eq!(lookup_opcode(0x00, 0x00), None);
        assert_eq!(lookup_opcode(0x00, 0x22), None);
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(mnemonic_to_opcode("ADD"), Ok(0x00));
        assert_eq!(mnemonic_to_opcode("Beq"), Ok(0x0C));
        assert_eq!(mnemonic_to_opcode("sub"), Err(IsaErr::UnknownMnemonic("sub".to_string())));
    }

    #[test]
    fn test_register_lookup() {
        for reg in Reg::all() {
            let name = index_to_register_name(reg);
            assert_eq!(register_name_to_index(name), Ok(reg));
            assert_eq!(register_name_to_index(&format!("${name}")), Ok(reg));
            assert_eq!(register_name_to_index(&format!("${}", reg.reg_no())), Ok(reg));
        }

        assert_eq!(register_name_to_index("$zero"), Ok(ZERO));
        assert_eq!(register_name_to_index("$T0"), Ok(T0));
        assert_eq!(register_name_to_index("$t9"), Ok(T9));
        assert_eq!(register_name_to_index("$fp"), Ok(FP));
        assert_eq!(index_to_register_name(Reg(5)), "a1");

        for bad in ["$t10", "$32", "$", "", "$+1", "$x0", "$zer"] {
            assert_eq!(register_name_to_index(bad), Err(IsaErr::UnknownRegister(bad.to_string())), "{bad:?}");
        }
    }
}
