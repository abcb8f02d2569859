//! Binary NBT writing.
//!
//! Writers are symmetric to [`crate::nbt::decode`]: a named tag is a kind
//! byte, a length-prefixed modified UTF-8 name (absent for `TAG_End`),
//! then the payload. The gzip/zlib entry points wrap the output in the
//! matching encoder and finalize its framing before returning.

use crate::nbt::{mutf8, CompoundTag, Tag};
use byteorder::{BigEndian, WriteBytesExt};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use std::io;
use std::io::Write;

/// Writes a named tag to an uncompressed stream.
pub fn write_named_tag<W: Write>(writer: &mut W, name: &str, tag: &Tag) -> io::Result<()> {
    writer.write_u8(tag.id())?;

    if let Tag::End = tag {
        return Ok(());
    }

    write_string(writer, name)?;
    write_tag_payload(writer, tag)
}

/// Writes a root compound, named "" on the wire, to an uncompressed
/// stream.
pub fn write_compound_tag<W: Write>(writer: &mut W, compound: &CompoundTag) -> io::Result<()> {
    writer.write_u8(10)?;
    write_string(writer, "")?;

    for (name, tag) in compound.iter() {
        write_named_tag(writer, name, tag)?;
    }

    writer.write_u8(0)
}

/// Writes a root compound framed as gzip.
pub fn write_gzip_compound_tag<W: Write>(writer: &mut W, compound: &CompoundTag) -> io::Result<()> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    write_compound_tag(&mut encoder, compound)?;
    encoder.finish()?;

    Ok(())
}

/// Writes a root compound framed as zlib.
pub fn write_zlib_compound_tag<W: Write>(writer: &mut W, compound: &CompoundTag) -> io::Result<()> {
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    write_compound_tag(&mut encoder, compound)?;
    encoder.finish()?;

    Ok(())
}

fn write_tag_payload<W: Write>(writer: &mut W, tag: &Tag) -> io::Result<()> {
    match tag {
        Tag::End => Ok(()),
        Tag::Byte(value) => writer.write_i8(*value),
        Tag::Short(value) => writer.write_i16::<BigEndian>(*value),
        Tag::Int(value) => writer.write_i32::<BigEndian>(*value),
        Tag::Long(value) => writer.write_i64::<BigEndian>(*value),
        Tag::Float(value) => writer.write_f32::<BigEndian>(*value),
        Tag::Double(value) => writer.write_f64::<BigEndian>(*value),
        Tag::ByteArray(values) => {
            write_length(writer, values.len())?;

            for value in values {
                writer.write_i8(*value)?;
            }

            Ok(())
        }
        Tag::String(value) => write_string(writer, value),
        Tag::List(elements) => {
            // Empty lists declare TAG_End as their element kind.
            let element_id = elements.first().map_or(0, Tag::id);

            if elements.iter().any(|element| element.id() != element_id) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "list elements have differing kinds",
                ));
            }

            writer.write_u8(element_id)?;
            write_length(writer, elements.len())?;

            for element in elements {
                write_tag_payload(writer, element)?;
            }

            Ok(())
        }
        Tag::Compound(compound) => {
            for (name, tag) in compound.iter() {
                write_named_tag(writer, name, tag)?;
            }

            writer.write_u8(0)
        }
        Tag::IntArray(values) => {
            write_length(writer, values.len())?;

            for value in values {
                writer.write_i32::<BigEndian>(*value)?;
            }

            Ok(())
        }
        Tag::LongArray(values) => {
            write_length(writer, values.len())?;

            for value in values {
                writer.write_i64::<BigEndian>(*value)?;
            }

            Ok(())
        }
    }
}

fn write_length<W: Write>(writer: &mut W, length: usize) -> io::Result<()> {
    let length = i32::try_from(length)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "length exceeds i32::MAX"))?;

    writer.write_i32::<BigEndian>(length)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let bytes = mutf8::encode(value);

    let length = u16::try_from(bytes.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "string exceeds 65535 bytes of modified UTF-8",
        )
    })?;

    writer.write_u16::<BigEndian>(length)?;
    writer.write_all(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::decode::{read_named_tag, read_zlib_compound_tag};
    use std::io::Cursor;

    #[test]
    fn test_named_tag_layout() {
        let mut buffer = Vec::new();
        write_named_tag(&mut buffer, "hp", &Tag::Short(300)).unwrap();

        assert_eq!(buffer, [2, 0, 2, b'h', b'p', 0x01, 0x2C]);
    }

    #[test]
    fn test_end_tag_has_no_name() {
        let mut buffer = Vec::new();
        write_named_tag(&mut buffer, "ignored", &Tag::End).unwrap();

        assert_eq!(buffer, [0]);
    }

    #[test]
    fn test_empty_list_declares_end_kind() {
        let mut buffer = Vec::new();
        write_named_tag(&mut buffer, "xs", &Tag::List(Vec::new())).unwrap();

        assert_eq!(buffer, [9, 0, 2, b'x', b's', 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_mixed_list_rejected() {
        let mut buffer = Vec::new();
        let mixed = Tag::List(vec![Tag::Int(1), Tag::Byte(2)]);

        let error = write_named_tag(&mut buffer, "xs", &mixed).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_string_over_length_limit_rejected() {
        let mut buffer = Vec::new();
        let long = "a".repeat(65536);

        let error = write_named_tag(&mut buffer, "s", &Tag::String(long)).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_zlib_round_trip() {
        let mut compound = CompoundTag::new();
        compound.insert_str("status", "full");
        compound.insert_i64_vec("motion", vec![1, -2, 3]);

        let mut buffer = Vec::new();
        write_zlib_compound_tag(&mut buffer, &compound).unwrap();

        let read = read_zlib_compound_tag(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(read, compound);
    }

    #[test]
    fn test_root_compound_is_named_empty() {
        let compound = CompoundTag::new();

        let mut buffer = Vec::new();
        write_compound_tag(&mut buffer, &compound).unwrap();
        assert_eq!(buffer, [10, 0, 0, 0]);

        let (name, tag) = read_named_tag(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(name, "");
        assert_eq!(tag, Tag::Compound(compound));
    }
}
