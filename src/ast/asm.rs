//! This module holds the AST produced by the parser.
//!
//! Each [`AsmInstr`] keeps the source tokens for its operands,
//! so that the assembler can report errors at the exact operand that caused them.

use std::ops::Range;

use crate::isa::{InstrDesc, ITemplate};
use crate::parse::lex::Token;

/// A parsed program: its instructions in source order.
pub type Program = Vec<AsmInstr>;

/// One parsed instruction, shaped by its instruction format.
///
/// The parser builds R-type nodes from the [`ITemplate::RdRsRt`] template,
/// I-type nodes from [`ITemplate::RtImmRs`] and [`ITemplate::RsRtImm`],
/// and J-type nodes from [`ITemplate::JImm`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AsmInstr {
    /// A register-register instruction (`add rd, rs, rt`).
    RType {
        /// The mnemonic.
        op: Token,
        /// The destination register.
        rd: Token,
        /// The first source register.
        rs: Token,
        /// The second source register.
        rt: Token,
        /// The shift amount (always 0 for the modeled set).
        shamt: u8,
        /// The function selector, taken from the descriptor table.
        funct: u8,
    },
    /// A register-immediate instruction (`lw rt, imm(rs)`, `beq rs, rt, imm`).
    IType {
        /// The mnemonic.
        op: Token,
        /// The base (memory access) or first compared (branch) register.
        rs: Token,
        /// The data (memory access) or second compared (branch) register.
        rt: Token,
        /// The immediate constant.
        immediate: Token,
    },
    /// A jump instruction (`j target`).
    JType {
        /// The mnemonic.
        op: Token,
        /// The jump target constant.
        target: Token,
    },
}
impl AsmInstr {
    /// The mnemonic token of this instruction.
    pub fn op(&self) -> &Token {
        match self {
            AsmInstr::RType { op, .. } => op,
            AsmInstr::IType { op, .. } => op,
            AsmInstr::JType { op, .. } => op,
        }
    }

    /// The descriptor table entry for this instruction's mnemonic, if it exists.
    pub fn desc(&self) -> Option<&'static InstrDesc> {
        crate::isa::lookup_mnemonic(&self.op().lexeme)
    }

    /// The operand template of this instruction, if its mnemonic is known.
    pub fn template(&self) -> Option<ITemplate> {
        self.desc().map(|d| d.template)
    }

    /// The source span covered by this instruction.
    pub fn span(&self) -> Range<usize> {
        let op = self.op();
        let end = match self {
            AsmInstr::RType { rd, rs, rt, .. } => [rd, rs, rt].map(|t| t.span.end).into_iter().max(),
            AsmInstr::IType { rs, rt, immediate, .. } => [rs, rt, immediate].map(|t| t.span.end).into_iter().max(),
            AsmInstr::JType { target, .. } => Some(target.span.end),
        };
        op.span.start..end.unwrap_or(op.span.end)
    }
}
impl std::fmt::Display for AsmInstr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsmInstr::RType { op, rd, rs, rt, .. } => write!(f, "{} {}, {}, {}", op.lexeme, rd.lexeme, rs.lexeme, rt.lexeme),
            AsmInstr::IType { op, rs, rt, immediate } => match self.template() {
                Some(ITemplate::RsRtImm) => write!(f, "{} {}, {}, {}", op.lexeme, rs.lexeme, rt.lexeme, immediate.lexeme),
                _ => write!(f, "{} {}, {}({})", op.lexeme, rt.lexeme, immediate.lexeme, rs.lexeme),
            },
            AsmInstr::JType { op, target } => write!(f, "{} {}", op.lexeme, target.lexeme),
        }
    }
}
