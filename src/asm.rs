//! Assembling assembly source ASTs into object files.
//!
//! This module is used to convert source ASTs ([`Program`]) into object files
//! that can be loaded into the simulator.
//!
//! The assembler module notably consists of:
//! - [`encode`]: packs one [`AsmInstr`] into one 32-bit instruction word
//! - [`assemble`]: encodes a whole program, in order, into an [`ObjectFile`]
//! - [`ObjectFile`]: the assembled words, which can be written to disk with a format from [`encoding`]
//!
//! There is no symbol resolution: every operand is a register or a literal constant.
//!
//! [`Program`]: crate::ast::asm::Program

pub mod encoding;

use crate::ast::asm::AsmInstr;
use crate::ast::sim::SimInstr;
use crate::ast::{Imm16, OffsetNewErr, Reg, Target26};
use crate::err::ErrSpan;
use crate::isa::{self, ITemplate};
use crate::parse::lex::{Token, TokenKind};

/// Encodes a single instruction into its machine word.
///
/// # Example
/// ```
/// use mips_ensemble::parse::parse_ast;
/// use mips_ensemble::asm::encode;
///
/// let ast = parse_ast("add $t0, $t1, $t2").unwrap();
/// assert_eq!(encode(&ast[0]), Ok(0x012A4020));
/// ```
pub fn encode(instr: &AsmInstr) -> Result<u32, AsmErr> {
    instr.into_sim_instr().map(|si| si.encode())
}

/// Assembles a program into an object file.
///
/// Every instruction produces exactly one word, in program order.
/// Assembly stops at the first instruction which cannot be encoded.
///
/// # Example
/// ```
/// use mips_ensemble::parse::parse_ast;
/// use mips_ensemble::asm::assemble;
///
/// let src = "
///     lw $t1, 0x30($zero)
///     j 0
/// ";
/// let ast = parse_ast(src).unwrap();
/// let obj = assemble(&ast).unwrap();
/// assert_eq!(obj.words(), [0x8C090030, 0x08000000]);
/// ```
pub fn assemble(ast: &[AsmInstr]) -> Result<ObjectFile, AsmErr> {
    let words = ast.iter()
        .enumerate()
        .map(|(i, instr)| {
            let word = encode(instr)?;
            tracing::debug!(index = i, word = format_args!("{word:#010x}"), instr = %instr, "encoded instruction");
            Ok(word)
        })
        .collect::<Result<_, AsmErr>>()?;

    Ok(ObjectFile::new(words))
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with span information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// The mnemonic is not in the descriptor table.
    UnknownMnemonic(String),
    /// The register name is not in the descriptor table.
    UnknownRegister(String),
    /// The operand is not a numeric constant, or its digits could not be read.
    InvalidNumeric(String),
    /// The immediate does not fit in 16 bits (signed or unsigned).
    ImmediateOutOfRange {
        /// The value given.
        value: i64,
        /// The smallest accepted value.
        min: i64,
        /// The largest accepted value.
        max: i64
    },
    /// The jump target does not fit in 26 bits.
    TargetOutOfRange {
        /// The value given.
        value: i64
    },
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMnemonic(m) => write!(f, "unknown instruction {m:?}"),
            Self::UnknownRegister(r) => write!(f, "unknown register {r:?}"),
            Self::InvalidNumeric(s)  => write!(f, "invalid numeric constant {s:?}"),
            Self::ImmediateOutOfRange { value, .. } => write!(f, "immediate {value} does not fit in 16 bits"),
            Self::TargetOutOfRange { value } => write!(f, "jump target {value} does not fit in 26 bits"),
        }
    }
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// The kind of error.
    pub kind: AsmErrKind,
    /// The span in the source associated with this error.
    pub span: ErrSpan
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new<E: Into<ErrSpan>>(kind: AsmErrKind, span: E) -> Self {
        AsmErr { kind, span: span.into() }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for AsmErr {}
impl crate::err::Error for AsmErr {
    fn span(&self) -> Option<ErrSpan> {
        Some(self.span.clone())
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            AsmErrKind::UnknownMnemonic(_) => Some(isa::supported_mnemonics_help().into()),
            AsmErrKind::UnknownRegister(_) => Some(isa::REGISTER_HELP.into()),
            AsmErrKind::InvalidNumeric(_)  => Some("constants are decimal (e.g., 16, -4) or hex with a 0x prefix (e.g., 0x10)".into()),
            AsmErrKind::ImmediateOutOfRange { min, max, .. } => Some(format!("the range for a 16-bit immediate is [{min}, {max}]").into()),
            AsmErrKind::TargetOutOfRange { .. } => Some("jump targets are byte addresses in [0, 0x03FFFFFF]".into()),
        }
    }
}

const IMM_MIN: i64 = i16::MIN as i64;
const IMM_MAX: i64 = u16::MAX as i64;

/// Reads the numeric value of a constant token.
fn parse_numeric(tok: &Token) -> Result<i64, AsmErr> {
    let invalid = || AsmErr::new(AsmErrKind::InvalidNumeric(tok.lexeme.clone()), tok.span.clone());

    match tok.kind {
        TokenKind::ZeroConstant => Ok(0),
        TokenKind::DecimalConstant => tok.lexeme.parse::<i64>().map_err(|_| invalid()),
        TokenKind::HexConstant => {
            let digits = tok.lexeme.get(2..).ok_or_else(invalid)?;
            i64::from_str_radix(digits, 16).map_err(|_| invalid())
        },
        _ => Err(invalid()),
    }
}

fn resolve_reg(tok: &Token) -> Result<Reg, AsmErr> {
    isa::register_name_to_index(&tok.lexeme)
        .map_err(|_| AsmErr::new(AsmErrKind::UnknownRegister(tok.lexeme.clone()), tok.span.clone()))
}

fn resolve_imm(tok: &Token) -> Result<Imm16, AsmErr> {
    let value = parse_numeric(tok)?;
    match (IMM_MIN..=IMM_MAX).contains(&value) {
        // negative values keep their 16-bit two's complement pattern
        true  => Ok(Imm16::new_trunc(value as u16)),
        false => Err(AsmErr::new(AsmErrKind::ImmediateOutOfRange { value, min: IMM_MIN, max: IMM_MAX }, tok.span.clone())),
    }
}

fn resolve_target(tok: &Token) -> Result<Target26, AsmErr> {
    let value = parse_numeric(tok)?;
    let err = || AsmErr::new(AsmErrKind::TargetOutOfRange { value }, tok.span.clone());

    let value32 = u32::try_from(value).map_err(|_| err())?;
    Target26::new(value32).map_err(|_: OffsetNewErr| err())
}

impl AsmInstr {
    /// Converts an ASM instruction into a simulator instruction ([`SimInstr`])
    /// by resolving its register names and constants.
    pub fn into_sim_instr(&self) -> Result<SimInstr, AsmErr> {
        let op = self.op();
        let desc = self.desc()
            .ok_or_else(|| AsmErr::new(AsmErrKind::UnknownMnemonic(op.lexeme.clone()), op.span.clone()))?;

        match (self, desc.template) {
            (AsmInstr::RType { rd, rs, rt, .. }, ITemplate::RdRsRt) => {
                Ok(SimInstr::r(desc, resolve_reg(rd)?, resolve_reg(rs)?, resolve_reg(rt)?))
            },
            (AsmInstr::IType { rs, rt, immediate, .. }, ITemplate::RtImmRs | ITemplate::RsRtImm) => {
                Ok(SimInstr::i(desc, resolve_reg(rs)?, resolve_reg(rt)?, resolve_imm(immediate)?))
            },
            (AsmInstr::JType { target, .. }, ITemplate::JImm) => {
                Ok(SimInstr::j(desc, resolve_target(target)?))
            },
            // the node's shape disagrees with the mnemonic's template
            _ => Err(AsmErr::new(AsmErrKind::UnknownMnemonic(op.lexeme.clone()), self.span())),
        }
    }
}

/// An object file.
///
/// This is the final product after assembly source code is fully assembled:
/// one word per source instruction, in program order.
/// It carries no origin; the address it is placed at is chosen when it is loaded.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ObjectFile {
    words: Vec<u32>
}
impl ObjectFile {
    /// Creates an empty object file.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates an object file holding the given words.
    pub fn new(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// The assembled words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// The number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the object file has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Gets an iterator over the byte address of every word,
    /// if the object file is loaded at `base`.
    pub fn addr_iter(&self, base: u32) -> impl Iterator<Item=(u32, u32)> + '_ {
        (base..).step_by(4)
            .zip(self.words.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::asm::AsmInstr;
    use crate::ast::sim::{Fields, SimInstr};
    use crate::ast::reg_consts::{T0, T1, T2};
    use crate::err::ErrSpan;
    use crate::parse::lex::{Token, TokenKind};
    use crate::parse::parse_ast;

    use super::{assemble, encode, AsmErr, AsmErrKind, ObjectFile};

    fn assemble_src(src: &str) -> Result<ObjectFile, AsmErr> {
        let ast = parse_ast(src).unwrap();
        assemble(&ast)
    }
    fn encode_one(src: &str) -> Result<u32, AsmErr> {
        let ast = parse_ast(src).unwrap();
        assert_eq!(ast.len(), 1);
        encode(&ast[0])
    }
    fn assert_asm_fail<T: std::fmt::Debug>(r: Result<T, AsmErr>, kind: AsmErrKind) {
        assert_eq!(r.unwrap_err().kind, kind);
    }

    #[test]
    fn test_encode_each_format() {
        assert_eq!(encode_one("add $t0, $t1, $t2"), Ok(0x012A4020));
        assert_eq!(encode_one("add $t1, $t2, $t3"), Ok(0x014B4820));
        assert_eq!(encode_one("lw $t1, 48($zero)"), Ok(0x8C090030));
        assert_eq!(encode_one("sw $t1, 4($t0)"), Ok(0xAD090004));
        assert_eq!(encode_one("beq $t1, $t2, 16"), Ok(0x312A0010));
        assert_eq!(encode_one("j 0x0A"), Ok(0x0800000A));
    }

    #[test]
    fn test_encode_constants() {
        // negative immediates are two's complement
        assert_eq!(encode_one("beq $t1, $t2, -4"), Ok(0x312AFFFC));
        assert_eq!(encode_one("lw $t1, -32768($sp)"), Ok(0x8FA98000));
        assert_eq!(encode_one("lw $t1, 0xFFFF($sp)"), Ok(0x8FA9FFFF));
        assert_eq!(encode_one("lw $t1, 0($sp)"), Ok(0x8FA90000));
        // numeric register names
        assert_eq!(encode_one("add $8, $9, $10"), encode_one("add $t0, $t1, $t2"));
        // leading zeroes are decimal
        assert_eq!(encode_one("j 010"), Ok(0x0800000A));
        assert_eq!(encode_one("j 0x03FFFFFF"), Ok(0x0BFFFFFF));
    }

    #[test]
    fn test_encode_decode_agree() {
        let instr = SimInstr::decode(encode_one("add $t0, $t1, $t2").unwrap());
        let Fields::R(r) = instr.fields else { panic!("expected R fields") };
        assert_eq!((r.rd, r.rs, r.rt, r.shamt.get(), r.funct.get()), (T0, T1, T2, 0, 0x20));

        let instr = SimInstr::decode(encode_one("beq $t0, $t1, -8").unwrap());
        let Fields::I(i) = instr.fields else { panic!("expected I fields") };
        assert_eq!((i.rs, i.rt, i.imm.sext()), (T0, T1, -8));

        let src = "
            add $s0, $s1, $s2
            lw $ra, 0x7FFC($sp)
            sw $a0, -4($fp)
            beq $zero, $zero, -32768
            j 0x03FFFFFC
        ";
        let ast = parse_ast(src).unwrap();
        for instr in &ast {
            let word = encode(instr).unwrap();
            let decoded = SimInstr::decode(word);
            assert_eq!(decoded, instr.into_sim_instr().unwrap(), "{instr}");
            assert_eq!(decoded.encode(), word, "{instr}");
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_asm_fail(encode_one("lw $t1, 65536($zero)"), AsmErrKind::ImmediateOutOfRange { value: 65536, min: -32768, max: 65535 });
        assert_asm_fail(encode_one("beq $t1, $t2, -32769"), AsmErrKind::ImmediateOutOfRange { value: -32769, min: -32768, max: 65535 });
        assert_asm_fail(encode_one("j 0x04000000"), AsmErrKind::TargetOutOfRange { value: 0x04000000 });
        assert_asm_fail(encode_one("j -4"), AsmErrKind::TargetOutOfRange { value: -4 });
        assert_asm_fail(encode_one("j 0xFFFFFFFFFFFFFFFFFF"), AsmErrKind::InvalidNumeric("0xFFFFFFFFFFFFFFFFFF".to_string()));
    }

    #[test]
    fn test_unknown_register_is_an_error() {
        // `$t10` lexes as a register but names nothing
        let err = encode_one("add $t0, $t10, $t2").unwrap_err();
        assert_eq!(err.kind, AsmErrKind::UnknownRegister("$t10".to_string()));
        assert_eq!(err.span, ErrSpan::One(9..13));

        assert_asm_fail(encode_one("sw $t1, 0($32)"), AsmErrKind::UnknownRegister("$32".to_string()));
    }

    #[test]
    fn test_unknown_mnemonic_is_an_error() {
        let tok = |kind, s: &str| Token::new(kind, s, 0..s.len());
        let instr = AsmInstr::JType {
            op: tok(TokenKind::Mnemonic, "jal"),
            target: tok(TokenKind::ZeroConstant, "0"),
        };
        assert_asm_fail(encode(&instr), AsmErrKind::UnknownMnemonic("jal".to_string()));

        // shape does not match mnemonic
        let instr = AsmInstr::JType {
            op: tok(TokenKind::Mnemonic, "add"),
            target: tok(TokenKind::ZeroConstant, "0"),
        };
        assert_asm_fail(encode(&instr), AsmErrKind::UnknownMnemonic("add".to_string()));
    }

    #[test]
    fn test_assemble_program() {
        let src = "
            add $t1, $t2, $t3
            lw $t1, 0x30($zero)
            sw $t1, 4($t0)
            beq $t1, $t2, 16
            j 0x0A
        ";
        let obj = assemble_src(src).unwrap();
        assert_eq!(obj.words(), [0x014B4820, 0x8C090030, 0xAD090004, 0x312A0010, 0x0800000A]);
        assert_eq!(obj.len(), 5);

        let addrs: Vec<_> = obj.addr_iter(0x100).map(|(a, _)| a).collect();
        assert_eq!(addrs, [0x100, 0x104, 0x108, 0x10C, 0x110]);

        assert!(assemble_src("").unwrap().is_empty());
        assert_asm_fail(assemble_src("add $t0, $t1, $t2\nj 0x10000000"), AsmErrKind::TargetOutOfRange { value: 0x10000000 });
    }
}
