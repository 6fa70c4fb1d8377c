//! Formatters which can read and write object files to disk.
//!
//! The [`ObjFileFormat`] trait describes an implementation of reading/writing object files into disk.
//! This module provides two implementations of the trait:
//! - [`BinaryFormat`]: the raw instruction stream, which the simulator loads
//! - [`TextFormat`]: one line of binary digits per word, for reading by eye

use super::ObjectFile;

/// A trait defining object file formats.
pub trait ObjFileFormat {
    /// Representation of the serialized format.
    ///
    /// For binary formats, `[u8]` should be used.
    /// For text-based formats,`str` should be used.
    type Stream: ToOwned + ?Sized;
    /// Serializes into the stream format.
    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned;
    /// Deserializes from the stream format, returning `None`
    /// if an error occurred during deserialization.
    fn deserialize(i: &Self::Stream) -> Option<ObjectFile>;
}

// BINARY!
/// A binary format of object file data.
///
/// The stream is every word of the object file, 4 bytes each in big-endian order,
/// with no header, trailer, or padding.
///
/// ```
/// use mips_ensemble::asm::ObjectFile;
/// use mips_ensemble::asm::encoding::{BinaryFormat, ObjFileFormat};
///
/// let obj = ObjectFile::new(vec![0x012A4020]);
/// assert_eq!(BinaryFormat::serialize(&obj), [0x01, 0x2A, 0x40, 0x20]);
/// ```
pub struct BinaryFormat;

impl ObjFileFormat for BinaryFormat {
    type Stream = [u8];

    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned {
        o.words()
            .iter()
            .flat_map(|w| w.to_be_bytes())
            .collect()
    }

    fn deserialize(bytes: &Self::Stream) -> Option<ObjectFile> {
        if bytes.len() % 4 != 0 { return None; }

        let words = bytes.chunks_exact(4)
            .map(|c| <[u8; 4]>::try_from(c).ok().map(u32::from_be_bytes))
            .collect::<Option<_>>()?;
        Some(ObjectFile::new(words))
    }
}

// TEXT!
/// A text-based format of object file data.
///
/// Each word is written on its own line as 32 binary digits, most significant bit first.
/// When reading, blank lines and `//` comments are ignored.
///
/// ```text
/// 00000001001010100100000000100000
/// 10001100000010010000000000110000
/// ```
pub struct TextFormat;

const TFMT_WIDTH: usize = 32;

impl ObjFileFormat for TextFormat {
    type Stream = str;

    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned {
        o.words()
            .iter()
            .map(|w| format!("{w:0width$b}\n", width = TFMT_WIDTH))
            .collect()
    }

    fn deserialize(string: &Self::Stream) -> Option<ObjectFile> {
        let words = string.lines()
            .map(|l| l.split_once("//").map_or(l, |(left, _)| left).trim())
            .filter(|l| !l.is_empty())
            .map(|l| match l.len() == TFMT_WIDTH && l.bytes().all(|b| matches!(b, b'0' | b'1')) {
                true  => u32::from_str_radix(l, 2).ok(),
                false => None
            })
            .collect::<Option<_>>()?;

        Some(ObjectFile::new(words))
    }
}
