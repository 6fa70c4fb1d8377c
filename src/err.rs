//! Error interface for this crate.
//!
//! This module re-exports the error types of each stage of the toolchain
//! and defines the [`Error`] trait, which adds diagnostic information
//! (source spans and help messages) on top of [`std::error::Error`].
//!
//! [`report`] renders any such error against its source text.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::ops::Range;

pub use crate::parse::lex::LexErr;
pub use crate::parse::ParseErr;
pub use crate::isa::IsaErr;
pub use crate::asm::AsmErr;
pub use crate::sim::{LoadErr, SimErr};

/// Unified error interface for all errors in this crate.
///
/// Note that the [`std::fmt::Display`] implementation is used for the brief message.
pub trait Error: std::error::Error {
    /// The range where this error occurs in source.
    ///
    /// If this is not known, this can be set to `None`.
    fn span(&self) -> Option<ErrSpan> {
        None
    }

    /// A simple help message on how to fix this error, if one exists.
    fn help(&self) -> Option<Cow<str>> {
        None
    }
}

/// The source span(s) an error refers to.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrSpan {
    /// One contiguous range.
    One(Range<usize>),
    /// Two ranges (e.g., a conflict between two tokens).
    Two([Range<usize>; 2]),
    /// Any number of ranges.
    Many(Vec<Range<usize>>),
}
impl ErrSpan {
    /// Gets the first range of this span, if one exists.
    pub fn first(&self) -> Option<Range<usize>> {
        match self {
            ErrSpan::One(r) => Some(r.clone()),
            ErrSpan::Two([r, _]) => Some(r.clone()),
            ErrSpan::Many(rs) => rs.first().cloned(),
        }
    }

    /// Iterates over every range in this span.
    pub fn iter(&self) -> impl Iterator<Item=&Range<usize>> + '_ {
        let slice: &[Range<usize>] = match self {
            ErrSpan::One(r) => std::slice::from_ref(r),
            ErrSpan::Two(rs) => rs,
            ErrSpan::Many(rs) => rs,
        };
        slice.iter()
    }
}
impl From<Range<usize>> for ErrSpan {
    fn from(value: Range<usize>) -> Self {
        ErrSpan::One(value)
    }
}
impl From<[Range<usize>; 2]> for ErrSpan {
    fn from(value: [Range<usize>; 2]) -> Self {
        ErrSpan::Two(value)
    }
}
impl From<Vec<Range<usize>>> for ErrSpan {
    fn from(mut value: Vec<Range<usize>>) -> Self {
        match value.len() {
            1 => ErrSpan::One(value.remove(0)),
            _ => ErrSpan::Many(value),
        }
    }
}

/// Line information for a source string.
///
/// This is used to convert byte indices (which all spans are given in)
/// into line and column numbers.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SourceInfo<'s> {
    src: &'s str,
    /// The index of each new line in source code.
    nl_indices: Vec<usize>
}
impl<'s> SourceInfo<'s> {
    /// Computes the source info from a given string.
    pub fn new(src: &'s str) -> Self {
        let nl_indices = src
            .match_indices('\n')
            .map(|(i, _)| i)
            .collect();

        Self { src, nl_indices }
    }

    /// Counts the number of lines in the source string.
    pub fn count_lines(&self) -> usize {
        self.nl_indices.len() + 1
    }

    /// Reads a line from source (without its line terminator).
    ///
    /// This returns None if line is not in the interval `[0, number of lines)`.
    pub fn read_line(&self, line: usize) -> Option<&'s str> {
        if line >= self.count_lines() { return None };

        let start = match line {
            0 => 0,
            _ => self.nl_indices[line - 1] + 1
        };
        let end = self.nl_indices.get(line).copied().unwrap_or(self.src.len());
        Some(self.src[start..end].trim_end_matches('\r'))
    }

    /// Calculates the (0-indexed) line and column number for a given byte index.
    ///
    /// Indices past the end of the string are clamped to the end of the last line.
    pub fn get_pos_pair(&self, index: usize) -> (usize, usize) {
        let index = index.min(self.src.len());
        let lno = self.nl_indices.partition_point(|&nl| nl < index);
        let lstart = match lno {
            0 => 0,
            _ => self.nl_indices[lno - 1] + 1
        };
        (lno, index - lstart)
    }
}

/// Renders an error as a multi-line diagnostic against the source it came from.
///
/// The output looks like:
/// ```text
/// error: expected comma, found register
///  --> 1:9
///   |
/// 1 | add $t0 $t1, $t2
///   |         ^^^
///   = help: operands are separated by commas
/// ```
pub fn report(err: &impl Error, src: &str) -> String {
    let info = SourceInfo::new(src);
    let mut out = format!("error: {err}\n");

    if let Some(span) = err.span().and_then(|s| s.first()) {
        let (lno, cno) = info.get_pos_pair(span.start);
        let line = info.read_line(lno).unwrap_or("");
        let gutter = " ".repeat((lno + 1).to_string().len());
        let width = span.len().clamp(1, line.len().saturating_sub(cno).max(1));

        let _ = writeln!(out, "{gutter}--> {}:{}", lno + 1, cno + 1);
        let _ = writeln!(out, "{gutter} |");
        let _ = writeln!(out, "{} | {line}", lno + 1);
        let _ = writeln!(out, "{gutter} | {}{}", " ".repeat(cno), "^".repeat(width));
    }
    if let Some(help) = err.help() {
        let _ = writeln!(out, "  = help: {help}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{ErrSpan, SourceInfo};

    #[test]
    fn test_pos_pair() {
        let info = SourceInfo::new("add $t0, $t1, $t2\nlw $t1, 4($t0)\n");
        assert_eq!(info.count_lines(), 3);
        assert_eq!(info.get_pos_pair(0), (0, 0));
        assert_eq!(info.get_pos_pair(4), (0, 4));
        assert_eq!(info.get_pos_pair(18), (1, 0));
        assert_eq!(info.get_pos_pair(26), (1, 8));
        assert_eq!(info.read_line(1), Some("lw $t1, 4($t0)"));
        assert_eq!(info.read_line(2), Some(""));
        assert_eq!(info.read_line(3), None);
    }

    #[test]
    fn test_span_conversions() {
        assert_eq!(ErrSpan::from(vec![1..2]), ErrSpan::One(1..2));
        assert_eq!(ErrSpan::from(vec![1..2, 4..5]).iter().count(), 2);
        assert_eq!(ErrSpan::from([0..1, 3..4]).first(), Some(0..1));
    }
}
