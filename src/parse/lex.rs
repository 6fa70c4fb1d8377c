//! Tokenizing MIPS assembly.
//!
//! This module holds the tokens that characterize the assembly language ([`Token`], [`TokenKind`]).
//! This module is used by the parser to facilitate the conversion of
//! assembly source code into an AST.
//!
//! Lexing never stops early: any run of characters that cannot start a token
//! is emitted as a [`TokenKind::Error`] token and scanning resumes after it,
//! so every lexical error in a source file is collected in one pass.
//! Whitespace, newlines, and `#` comments never produce tokens.

use std::ops::Range;

use logos::Logos;

/// The raw scanner, as a logos DFA.
///
/// This is mapped onto [`TokenKind`] by [`tokenize`], which also
/// turns the incomplete forms (`$`, `0x`) into error tokens.
#[derive(Debug, Logos, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[ \t\r\n\f]+", error = LexErr)]
#[logos(skip r"#[^\n]*")]
enum RawToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*:")]
    Label,

    #[token("$zero", ignore(ascii_case))]
    #[regex(r"\$[A-Za-z][A-Za-z]?[0-9]*")]
    #[regex(r"\$[0-9]+")]
    Reg,

    // `$` not followed by a register name
    #[token("$")]
    RegPrefix,

    #[regex(r"-?[1-9][0-9]*")]
    #[regex(r"-?0[0-9]+")]
    #[regex(r"-0")]
    Dec,

    #[regex(r"0[xX][0-9A-Fa-f]+")]
    Hex,

    // `0x` not followed by hex digits
    #[regex(r"0[xX]")]
    HexPrefix,

    #[token("0")]
    Zero,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,
}

/// The classification of a [`Token`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TokenKind {
    /// An identifier (e.g., `add`, `lw`).
    ///
    /// Any identifier that is not a label is classified as a mnemonic;
    /// whether it names a real instruction is decided by the parser.
    Mnemonic,
    /// A register name (e.g., `$t0`, `$zero`, `$31`).
    Register,
    /// An identifier immediately followed by `:` (e.g., `loop:`).
    Label,
    /// A decimal constant (e.g., `48`, `-8`, `012`).
    DecimalConstant,
    /// A hex constant, which requires a `0x` or `0X` prefix (e.g., `0x30`).
    HexConstant,
    /// The constant `0`.
    ZeroConstant,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// A run of characters that is not a valid token.
    Error(LexErr),
}
impl TokenKind {
    /// Whether this token is one of the numeric constant kinds.
    pub fn is_constant(self) -> bool {
        matches!(self, TokenKind::DecimalConstant | TokenKind::HexConstant | TokenKind::ZeroConstant)
    }
}
impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Mnemonic        => f.write_str("mnemonic"),
            TokenKind::Register        => f.write_str("register"),
            TokenKind::Label           => f.write_str("label"),
            TokenKind::DecimalConstant => f.write_str("decimal constant"),
            TokenKind::HexConstant     => f.write_str("hex constant"),
            TokenKind::ZeroConstant    => f.write_str("zero constant"),
            TokenKind::Comma           => f.write_str("comma"),
            TokenKind::LeftParen       => f.write_str("left parenthesis"),
            TokenKind::RightParen      => f.write_str("right parenthesis"),
            TokenKind::Error(_)        => f.write_str("invalid token"),
        }
    }
}

/// A unit of information in MIPS source code.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Token {
    /// The classification of this token.
    pub kind: TokenKind,
    /// The source text of this token.
    pub lexeme: String,
    /// The byte range of this token in source.
    pub span: Range<usize>,
}
impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Range<usize>) -> Self {
        Self { kind, lexeme: lexeme.into(), span }
    }
}

/// Any errors raised in attempting to tokenize an input stream.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum LexErr {
    /// Hex literal (starting with 0x) doesn't have digits after it.
    InvalidHexEmpty,
    /// A `$` which is not followed by a register name.
    InvalidRegister,
    /// A symbol was used which is not allowed in assembly files
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::InvalidHexEmpty => f.write_str("invalid hex literal"),
            LexErr::InvalidRegister => f.write_str("invalid register"),
            LexErr::InvalidSymbol   => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::InvalidHexEmpty => Some("there should be hex digits (0-9, A-F) here".into()),
            LexErr::InvalidRegister => Some(crate::isa::REGISTER_HELP.into()),
            LexErr::InvalidSymbol   => Some("this char does not occur in any token in MIPS assembly".into()),
        }
    }
}

/// Tokenizes a source string.
///
/// This never fails. Invalid input is emitted as [`TokenKind::Error`] tokens
/// in source order alongside all of the valid tokens.
///
/// # Example
/// ```
/// use mips_ensemble::parse::lex::{tokenize, TokenKind};
///
/// let kinds: Vec<_> = tokenize("lw $t1, 48($zero) # load")
///     .into_iter()
///     .map(|t| t.kind)
///     .collect();
///
/// assert_eq!(kinds, [
///     TokenKind::Mnemonic, TokenKind::Register, TokenKind::Comma,
///     TokenKind::DecimalConstant, TokenKind::LeftParen, TokenKind::Register,
///     TokenKind::RightParen
/// ]);
/// ```
pub fn tokenize(src: &str) -> Vec<Token> {
    let mut spans: Vec<(TokenKind, Range<usize>)> = vec![];

    for (result, span) in RawToken::lexer(src).spanned() {
        let kind = match result {
            Ok(RawToken::Ident)     => TokenKind::Mnemonic,
            Ok(RawToken::Label)     => TokenKind::Label,
            Ok(RawToken::Reg)       => TokenKind::Register,
            Ok(RawToken::RegPrefix) => TokenKind::Error(LexErr::InvalidRegister),
            Ok(RawToken::Dec)       => TokenKind::DecimalConstant,
            Ok(RawToken::Hex)       => TokenKind::HexConstant,
            Ok(RawToken::HexPrefix) => TokenKind::Error(LexErr::InvalidHexEmpty),
            Ok(RawToken::Zero)      => TokenKind::ZeroConstant,
            Ok(RawToken::Comma)     => TokenKind::Comma,
            Ok(RawToken::LParen)    => TokenKind::LeftParen,
            Ok(RawToken::RParen)    => TokenKind::RightParen,
            Err(e)                  => TokenKind::Error(e),
        };

        // Adjacent unrecognized characters are one error span.
        match spans.last_mut() {
            Some((last, last_span)) if kind == TokenKind::Error(LexErr::InvalidSymbol) && *last == kind && last_span.end == span.start => {
                last_span.end = span.end;
            }
            _ => spans.push((kind, span)),
        }
    }

    let tokens: Vec<_> = spans.into_iter()
        .map(|(kind, span)| {
            let lexeme = String::from_utf8_lossy(&src.as_bytes()[span.clone()]);
            Token::new(kind, lexeme, span)
        })
        .collect();

    tracing::trace!(count = tokens.len(), "tokenized source");
    tokens
}

/// Collects the error tokens from a token stream.
pub fn errors(tokens: &[Token]) -> impl Iterator<Item=(LexErr, &Token)> + '_ {
    tokens.iter().filter_map(|t| match t.kind {
        TokenKind::Error(e) => Some((e, t)),
        _ => None
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::err::LexErr;
    use super::{tokenize, Token, TokenKind};

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).into_iter().map(|t| t.kind).collect()
    }
    fn lexemes(src: &str) -> Vec<String> {
        tokenize(src).into_iter().map(|t| t.lexeme).collect()
    }

    #[test]
    fn test_load_word() {
        let tokens = tokenize("lw $t1, 48($zero)");
        assert_eq!(tokens, vec![
            Token::new(TokenKind::Mnemonic,        "lw",    0..2),
            Token::new(TokenKind::Register,        "$t1",   3..6),
            Token::new(TokenKind::Comma,           ",",     6..7),
            Token::new(TokenKind::DecimalConstant, "48",    8..10),
            Token::new(TokenKind::LeftParen,       "(",     10..11),
            Token::new(TokenKind::Register,        "$zero", 11..16),
            Token::new(TokenKind::RightParen,      ")",     16..17),
        ]);
    }

    #[test]
    fn test_constants() {
        use TokenKind::*;

        assert_eq!(kinds("0 7 48 -8 012 0x30 0XfF -0"), [
            ZeroConstant, DecimalConstant, DecimalConstant, DecimalConstant,
            DecimalConstant, HexConstant, HexConstant, DecimalConstant
        ]);
        // a constant stops at the first character which cannot continue it
        assert_eq!(lexemes("48($t0)"), ["48", "(", "$t0", ")"]);
        assert_eq!(kinds("12abc"), [DecimalConstant, Mnemonic]);
    }

    #[test]
    fn test_registers() {
        use TokenKind::*;

        assert_eq!(kinds("$zero $ZERO $t0 $s7 $sp $ra $31 $0"), [Register; 8]);
        assert_eq!(lexemes("$t0,$t1"), ["$t0", ",", "$t1"]);
    }

    #[test]
    fn test_comments_and_whitespace() {
        use TokenKind::*;

        let src = "
            # comment on its own line
            add $t0, $t1, $t2 # trailing comment
            \tj 0x10\r\n
        ";
        assert_eq!(kinds(src), [
            Mnemonic, Register, Comma, Register, Comma, Register,
            Mnemonic, HexConstant
        ]);
    }

    #[test]
    fn test_labels() {
        use TokenKind::*;

        assert_eq!(kinds("loop: beq $t0, $t1, 0"), [Label, Mnemonic, Register, Comma, Register, Comma, ZeroConstant]);
        assert_eq!(lexemes("loop:"), ["loop:"]);
        // a space between the identifier and colon is not a label
        assert_eq!(kinds("loop :"), [Mnemonic, Error(LexErr::InvalidSymbol)]);
    }

    #[test]
    fn test_errors_are_collected() {
        use TokenKind::*;

        let tokens = tokenize("add $t0, @@, $t2\nlw $t1, 0x($) \n sw ~");
        assert_eq!(tokens.iter().map(|t| t.kind).collect::<Vec<_>>(), [
            Mnemonic, Register, Comma, Error(LexErr::InvalidSymbol), Comma, Register,
            Mnemonic, Register, Comma, Error(LexErr::InvalidHexEmpty), LeftParen, Error(LexErr::InvalidRegister), RightParen,
            Mnemonic, Error(LexErr::InvalidSymbol)
        ]);

        // scanning continued past every error, and each error token keeps its text
        let errs: Vec<_> = super::errors(&tokens).map(|(e, t)| (e, t.lexeme.as_str())).collect();
        assert_eq!(errs, [
            (LexErr::InvalidSymbol, "@@"),
            (LexErr::InvalidHexEmpty, "0x"),
            (LexErr::InvalidRegister, "$"),
            (LexErr::InvalidSymbol, "~"),
        ]);
    }

    #[test]
    fn test_program() {
        let src = "
            add $t1, $t2, $t3
            lw $t1, 0x30($zero)
            sw $t1, 4($t0)
            beq $t1, $t2, 16
            j 0x0A
            add $s0, $zero, $zero
        ";
        let tokens = tokenize(src);
        assert_eq!(tokens.len(), 34);
        assert!(super::errors(&tokens).next().is_none());
    }
}
