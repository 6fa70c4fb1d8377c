//! Parsing assembly source code into an AST.
//!
//! This module is used to convert strings (which represent assembly source code)
//! into abstract syntax trees ([`Program`]).
//!
//! The parser walks the token stream from [`lex::tokenize`] with one token of lookahead.
//! On each mnemonic, it selects a grammar from the mnemonic's [`ITemplate`]:
//!
//! | template  | grammar                           |
//! |-----------|-----------------------------------|
//! | `RdRsRt`  | `op REG , REG , REG`              |
//! | `RtImmRs` | `op REG , CONST ( REG )`          |
//! | `RsRtImm` | `op REG , REG , CONST`            |
//! | `JImm`    | `op CONST`                        |
//!
//! Parsing stops at the first error, and no partial program is returned.
//!
//! # Example
//! ```
//! use mips_ensemble::parse::parse_ast;
//!
//! let src = "
//!     add $t1, $t2, $t3
//!     sw $t1, 0x10($zero)
//! ";
//! let ast = parse_ast(src).unwrap();
//! assert_eq!(ast.len(), 2);
//! assert_eq!(ast[1].to_string(), "sw $t1, 0x10($zero)");
//! ```
//!
//! [`Program`]: crate::ast::asm::Program
pub mod lex;

use std::borrow::Cow;

use crate::ast::asm::{AsmInstr, Program};
use crate::err::ErrSpan;
use crate::isa::{self, ITemplate};
use lex::{LexErr, Token, TokenKind};

/// Parses a source string into a program.
///
/// This tokenizes the source and then parses its tokens (see [`parse_tokens`]).
pub fn parse_ast(src: &str) -> Result<Program, ParseErr> {
    let tokens = lex::tokenize(src);
    parse_tokens(&tokens)
}

/// Parses a token stream into a program.
///
/// If the stream contains any [`TokenKind::Error`] tokens,
/// parsing fails with [`ParseErrKind::Lex`] before any grammar is applied.
/// That error holds the first lexical error and the spans of all of them.
pub fn parse_tokens(tokens: &[Token]) -> Result<Program, ParseErr> {
    let mut lex_errs = lex::errors(tokens);
    if let Some((first, first_tok)) = lex_errs.next() {
        let index = tokens.iter()
            .position(|t| std::ptr::eq(t, first_tok))
            .unwrap_or_default();
        let spans: Vec<_> = std::iter::once(first_tok.span.clone())
            .chain(lex_errs.map(|(_, t)| t.span.clone()))
            .collect();

        return Err(ParseErr::new(ParseErrKind::Lex(first), index, spans));
    }

    Parser::new(tokens).parse_program()
}

/// The token (or token class) a grammar expected.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Expected {
    /// An instruction mnemonic.
    Mnemonic,
    /// A register.
    Register,
    /// A decimal, hex, or zero constant.
    Constant,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
}
impl Expected {
    fn matches(self, kind: TokenKind) -> bool {
        match self {
            Expected::Mnemonic   => kind == TokenKind::Mnemonic,
            Expected::Register   => kind == TokenKind::Register,
            Expected::Constant   => kind.is_constant(),
            Expected::Comma      => kind == TokenKind::Comma,
            Expected::LeftParen  => kind == TokenKind::LeftParen,
            Expected::RightParen => kind == TokenKind::RightParen,
        }
    }
}
impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Mnemonic   => f.write_str("mnemonic"),
            Expected::Register   => f.write_str("register"),
            Expected::Constant   => f.write_str("constant"),
            Expected::Comma      => f.write_str("comma"),
            Expected::LeftParen  => f.write_str("left parenthesis"),
            Expected::RightParen => f.write_str("right parenthesis"),
        }
    }
}

/// Kinds of errors that can occur from parsing a token stream.
///
/// See [`ParseErr`] for this error type with span and position information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ParseErrKind {
    /// The token stream contained invalid tokens.
    Lex(LexErr),
    /// The mnemonic does not name a supported instruction.
    UnknownMnemonic(String),
    /// A token did not have the kind the grammar expected.
    Unexpected {
        /// What the grammar expected.
        expected: Expected,
        /// What was found.
        found: TokenKind
    },
    /// The token stream ended in the middle of an instruction.
    UnexpectedEof {
        /// What the grammar expected.
        expected: Expected
    },
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrKind::Lex(e) => e.fmt(f),
            ParseErrKind::UnknownMnemonic(m) => write!(f, "unknown instruction {m:?}"),
            ParseErrKind::Unexpected { expected, found } => write!(f, "expected {expected}, found {found}"),
            ParseErrKind::UnexpectedEof { expected } => write!(f, "expected {expected}, found end of input"),
        }
    }
}

/// Error from parsing assembly source code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseErr {
    /// The kind of error.
    pub kind: ParseErrKind,
    /// The index of the offending token in the token stream.
    ///
    /// For [`ParseErrKind::UnexpectedEof`], this is the length of the stream.
    pub index: usize,
    /// The span in the source associated with this error.
    pub span: ErrSpan
}
impl ParseErr {
    /// Creates a new [`ParseErr`].
    pub fn new<E: Into<ErrSpan>>(kind: ParseErrKind, index: usize, span: E) -> Self {
        ParseErr { kind, index, span: span.into() }
    }
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (token {})", self.kind, self.index)
    }
}
impl std::error::Error for ParseErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrKind::Lex(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for ParseErr {
    fn span(&self) -> Option<ErrSpan> {
        Some(self.span.clone())
    }

    fn help(&self) -> Option<Cow<str>> {
        use crate::err::Error;

        match &self.kind {
            ParseErrKind::Lex(e) => e.help(),
            ParseErrKind::UnknownMnemonic(_) => Some(isa::supported_mnemonics_help().into()),
            ParseErrKind::Unexpected { found: TokenKind::Label, .. } => Some("labels are not supported; use a numeric address or offset".into()),
            ParseErrKind::Unexpected { expected: Expected::Comma, .. } => Some("operands are separated by commas".into()),
            ParseErrKind::Unexpected { expected: Expected::Constant, .. } => Some("constants are decimal (e.g., 16, -4) or hex with a 0x prefix (e.g., 0x10)".into()),
            ParseErrKind::Unexpected { expected: Expected::Mnemonic, .. } => Some("each instruction starts with a mnemonic".into()),
            ParseErrKind::UnexpectedEof { .. } => Some("this instruction is missing operands".into()),
            _ => None,
        }
    }
}

/// A cursor over a token stream, which applies the instruction grammars.
pub struct Parser<'t> {
    tokens: &'t [Token],
    index: usize,
}
impl<'t> Parser<'t> {
    /// Creates a parser over the given tokens.
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, index: 0 }
    }

    /// The index of the next token to be consumed.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether all tokens have been consumed.
    pub fn is_empty(&self) -> bool {
        self.index >= self.tokens.len()
    }

    /// Peeks at the next token without consuming it.
    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.index)
    }

    /// Consumes the next token if it matches the expected class,
    /// and raises an error (without consuming) otherwise.
    pub fn expect(&mut self, expected: Expected) -> Result<&'t Token, ParseErr> {
        match self.peek() {
            Some(tok) if expected.matches(tok.kind) => {
                self.index += 1;
                Ok(tok)
            },
            Some(tok) => Err(ParseErr::new(
                ParseErrKind::Unexpected { expected, found: tok.kind },
                self.index,
                tok.span.clone()
            )),
            None => {
                let eof = self.tokens.last().map_or(0, |t| t.span.end);
                Err(ParseErr::new(ParseErrKind::UnexpectedEof { expected }, self.index, eof..eof))
            }
        }
    }

    /// Parses every remaining instruction.
    pub fn parse_program(&mut self) -> Result<Program, ParseErr> {
        let mut program = vec![];
        while !self.is_empty() {
            program.push(self.parse_instr()?);
        }
        Ok(program)
    }

    /// Parses one instruction.
    pub fn parse_instr(&mut self) -> Result<AsmInstr, ParseErr> {
        let op_index = self.index;
        let op = self.expect(Expected::Mnemonic)?;
        let desc = isa::lookup_mnemonic(&op.lexeme)
            .ok_or_else(|| ParseErr::new(ParseErrKind::UnknownMnemonic(op.lexeme.clone()), op_index, op.span.clone()))?;
        let op = op.clone();

        let instr = match desc.template {
            ITemplate::RdRsRt => {
                let rd = self.expect(Expected::Register)?.clone();
                self.expect(Expected::Comma)?;
                let rs = self.expect(Expected::Register)?.clone();
                self.expect(Expected::Comma)?;
                let rt = self.expect(Expected::Register)?.clone();

                AsmInstr::RType { op, rd, rs, rt, shamt: 0, funct: desc.funct.unwrap_or(0) }
            },
            ITemplate::RtImmRs => {
                let rt = self.expect(Expected::Register)?.clone();
                self.expect(Expected::Comma)?;
                let immediate = self.expect(Expected::Constant)?.clone();
                self.expect(Expected::LeftParen)?;
                let rs = self.expect(Expected::Register)?.clone();
                self.expect(Expected::RightParen)?;

                AsmInstr::IType { op, rs, rt, immediate }
            },
            ITemplate::RsRtImm => {
                let rs = self.expect(Expected::Register)?.clone();
                self.expect(Expected::Comma)?;
                let rt = self.expect(Expected::Register)?.clone();
                self.expect(Expected::Comma)?;
                let immediate = self.expect(Expected::Constant)?.clone();

                AsmInstr::IType { op, rs, rt, immediate }
            },
            ITemplate::JImm => {
                let target = self.expect(Expected::Constant)?.clone();

                AsmInstr::JType { op, target }
            },
        };

        tracing::trace!(index = op_index, instr = %instr, "parsed instruction");
        Ok(instr)
    }
}
