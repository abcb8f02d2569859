//! Binary NBT reading.
//!
//! A named tag on the wire is a kind byte, a length-prefixed modified
//! UTF-8 name (absent for `TAG_End`), then the kind's payload. The
//! gzip/zlib entry points wrap the input in the matching decompressor.

use crate::nbt::mutf8::Mutf8Error;
use crate::nbt::{mutf8, CompoundTag, Tag, MAX_DEPTH};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::{GzDecoder, ZlibDecoder};
use std::fmt;
use std::io;
use std::io::Read;

/// Possible errors while decoding binary data to an NBT tag.
#[derive(Debug)]
pub enum TagDecodeError {
    /// Kind byte does not name any tag kind.
    UnknownTagType { tag_type: u8 },
    /// Array or list length is negative.
    NegativeLength { length: i32 },
    /// String payload is not valid modified UTF-8.
    InvalidString { error: Mutf8Error },
    /// Compound/list nesting exceeds [`MAX_DEPTH`].
    DepthLimitExceeded { depth: usize },
    /// Root tag of the document is not a compound.
    RootTagNotCompound { actual: &'static str },
    /// I/O error while reading; an unexpected end of stream means the
    /// document was truncated mid-tag.
    IOError { io_error: io::Error },
}

impl fmt::Display for TagDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagDecodeError::UnknownTagType { tag_type } => {
                write!(f, "unknown tag type {}", tag_type)
            }
            TagDecodeError::NegativeLength { length } => {
                write!(f, "negative length {}", length)
            }
            TagDecodeError::InvalidString { error } => write!(f, "{}", error),
            TagDecodeError::DepthLimitExceeded { depth } => {
                write!(f, "nesting depth {} exceeds limit {}", depth, MAX_DEPTH)
            }
            TagDecodeError::RootTagNotCompound { actual } => {
                write!(f, "root tag is {}, expected TAG_Compound", actual)
            }
            TagDecodeError::IOError { io_error } => write!(f, "{}", io_error),
        }
    }
}

impl std::error::Error for TagDecodeError {}

impl From<io::Error> for TagDecodeError {
    fn from(io_error: io::Error) -> Self {
        TagDecodeError::IOError { io_error }
    }
}

impl From<Mutf8Error> for TagDecodeError {
    fn from(error: Mutf8Error) -> Self {
        TagDecodeError::InvalidString { error }
    }
}

/// Reads a named tag from an uncompressed stream.
///
/// A `TAG_End` kind byte yields `("", Tag::End)` without a name on the
/// wire.
pub fn read_named_tag<R: Read>(reader: &mut R) -> Result<(String, Tag), TagDecodeError> {
    let tag_id = reader.read_u8()?;

    if tag_id == 0 {
        return Ok((String::new(), Tag::End));
    }

    let name = read_string(reader)?;
    let tag = read_tag_payload(reader, tag_id, 0)?;

    Ok((name, tag))
}

/// Reads a named tag from a gzip-compressed stream.
pub fn read_gzip_named_tag<R: Read>(reader: &mut R) -> Result<(String, Tag), TagDecodeError> {
    read_named_tag(&mut GzDecoder::new(reader))
}

/// Reads a root compound from an uncompressed stream, discarding its name.
pub fn read_compound_tag<R: Read>(reader: &mut R) -> Result<CompoundTag, TagDecodeError> {
    let (_, tag) = read_named_tag(reader)?;

    match tag {
        Tag::Compound(compound) => Ok(compound),
        tag => Err(TagDecodeError::RootTagNotCompound {
            actual: tag.kind_name(),
        }),
    }
}

/// Reads a root compound from a gzip-compressed stream.
pub fn read_gzip_compound_tag<R: Read>(reader: &mut R) -> Result<CompoundTag, TagDecodeError> {
    read_compound_tag(&mut GzDecoder::new(reader))
}

/// Reads a root compound from a zlib-compressed stream.
pub fn read_zlib_compound_tag<R: Read>(reader: &mut R) -> Result<CompoundTag, TagDecodeError> {
    read_compound_tag(&mut ZlibDecoder::new(reader))
}

fn read_tag_payload<R: Read>(
    reader: &mut R,
    tag_id: u8,
    depth: usize,
) -> Result<Tag, TagDecodeError> {
    match tag_id {
        0 => Ok(Tag::End),
        1 => Ok(Tag::Byte(reader.read_i8()?)),
        2 => Ok(Tag::Short(reader.read_i16::<BigEndian>()?)),
        3 => Ok(Tag::Int(reader.read_i32::<BigEndian>()?)),
        4 => Ok(Tag::Long(reader.read_i64::<BigEndian>()?)),
        5 => Ok(Tag::Float(reader.read_f32::<BigEndian>()?)),
        6 => Ok(Tag::Double(reader.read_f64::<BigEndian>()?)),
        7 => {
            let length = read_length(reader)?;
            let mut bytes = vec![0u8; length];
            reader.read_exact(&mut bytes)?;
            Ok(Tag::ByteArray(bytes.into_iter().map(|byte| byte as i8).collect()))
        }
        8 => Ok(Tag::String(read_string(reader)?)),
        9 => {
            let element_id = reader.read_u8()?;

            if element_id > 12 {
                return Err(TagDecodeError::UnknownTagType {
                    tag_type: element_id,
                });
            }

            let length = read_length(reader)?;
            let depth = enter(depth)?;
            let mut elements = Vec::with_capacity(length.min(1024));

            for _ in 0..length {
                elements.push(read_tag_payload(reader, element_id, depth)?);
            }

            Ok(Tag::List(elements))
        }
        10 => {
            let depth = enter(depth)?;
            let mut compound = CompoundTag::new();

            loop {
                let element_id = reader.read_u8()?;

                if element_id == 0 {
                    break;
                }

                let name = read_string(reader)?;
                let tag = read_tag_payload(reader, element_id, depth)?;
                compound.insert(name, tag);
            }

            Ok(Tag::Compound(compound))
        }
        11 => {
            let length = read_length(reader)?;
            let mut values = Vec::with_capacity(length.min(1024));

            for _ in 0..length {
                values.push(reader.read_i32::<BigEndian>()?);
            }

            Ok(Tag::IntArray(values))
        }
        12 => {
            let length = read_length(reader)?;
            let mut values = Vec::with_capacity(length.min(1024));

            for _ in 0..length {
                values.push(reader.read_i64::<BigEndian>()?);
            }

            Ok(Tag::LongArray(values))
        }
        tag_type => Err(TagDecodeError::UnknownTagType { tag_type }),
    }
}

fn enter(depth: usize) -> Result<usize, TagDecodeError> {
    if depth >= MAX_DEPTH {
        return Err(TagDecodeError::DepthLimitExceeded { depth });
    }

    Ok(depth + 1)
}

fn read_length<R: Read>(reader: &mut R) -> Result<usize, TagDecodeError> {
    let length = reader.read_i32::<BigEndian>()?;

    if length < 0 {
        return Err(TagDecodeError::NegativeLength { length });
    }

    Ok(length as usize)
}

fn read_string<R: Read>(reader: &mut R) -> Result<String, TagDecodeError> {
    let length = reader.read_u16::<BigEndian>()?;
    let mut bytes = vec![0u8; length as usize];
    reader.read_exact(&mut bytes)?;

    Ok(mutf8::decode(&bytes)?)
}
