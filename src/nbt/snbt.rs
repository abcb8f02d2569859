//! SNBT, the stringified human form of an NBT tree.
//!
//! Numbers carry type suffixes (`b`, `s`, `L`, `f`, `d`; ints are bare),
//! strings are double-quoted with `\` and `"` escaped, typed arrays open
//! with `B;`, `I;` or `L;`, and compound keys stay bare when they match
//! `[A-Za-z0-9_\-.+]+`.

use crate::nbt::Tag;
use std::fmt::Write;

impl Tag {
    /// Renders this tag as SNBT. `TAG_End` has no SNBT form and renders
    /// as the empty string.
    pub fn to_snbt(&self) -> String {
        let mut out = String::new();
        write_snbt(self, &mut out);
        out
    }
}

fn write_snbt(tag: &Tag, out: &mut String) {
    match tag {
        Tag::End => {}
        Tag::Byte(value) => {
            let _ = write!(out, "{}b", value);
        }
        Tag::Short(value) => {
            let _ = write!(out, "{}s", value);
        }
        Tag::Int(value) => {
            let _ = write!(out, "{}", value);
        }
        Tag::Long(value) => {
            let _ = write!(out, "{}L", value);
        }
        Tag::Float(value) => {
            let _ = write!(out, "{}f", value);
        }
        Tag::Double(value) => {
            let _ = write!(out, "{}d", value);
        }
        Tag::ByteArray(values) => {
            out.push_str("[B;");
            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}b", value);
            }
            out.push(']');
        }
        Tag::String(value) => write_quoted(value, out),
        Tag::List(elements) => {
            out.push('[');
            for (index, element) in elements.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_snbt(element, out);
            }
            out.push(']');
        }
        Tag::Compound(compound) => {
            out.push('{');
            for (index, (name, tag)) in compound.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_key(name, out);
                out.push(':');
                write_snbt(tag, out);
            }
            out.push('}');
        }
        Tag::IntArray(values) => {
            out.push_str("[I;");
            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", value);
            }
            out.push(']');
        }
        Tag::LongArray(values) => {
            out.push_str("[L;");
            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}L", value);
            }
            out.push(']');
        }
    }
}

fn write_key(key: &str, out: &mut String) {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'));

    if bare {
        out.push_str(key);
    } else {
        write_quoted(key, out);
    }
}

fn write_quoted(value: &str, out: &mut String) {
    out.push('"');

    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }

    out.push('"');
}

#[cfg(test)]
mod tests {
    use crate::nbt::{CompoundTag, Tag};

    #[test]
    fn test_number_suffixes() {
        assert_eq!(Tag::Byte(-5).to_snbt(), "-5b");
        assert_eq!(Tag::Short(300).to_snbt(), "300s");
        assert_eq!(Tag::Int(42).to_snbt(), "42");
        assert_eq!(Tag::Long(42).to_snbt(), "42L");
        assert_eq!(Tag::Float(0.5).to_snbt(), "0.5f");
        assert_eq!(Tag::Double(-1.25).to_snbt(), "-1.25d");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(
            Tag::String("say \"hi\" \\ bye".to_owned()).to_snbt(),
            r#""say \"hi\" \\ bye""#
        );
    }

    #[test]
    fn test_typed_arrays() {
        assert_eq!(Tag::ByteArray(vec![1, -2]).to_snbt(), "[B;1b,-2b]");
        assert_eq!(Tag::IntArray(vec![3, 4]).to_snbt(), "[I;3,4]");
        assert_eq!(Tag::LongArray(vec![5]).to_snbt(), "[L;5L]");
        assert_eq!(Tag::IntArray(Vec::new()).to_snbt(), "[I;]");
    }

    #[test]
    fn test_list() {
        let list = Tag::List(vec![Tag::Int(1), Tag::Int(2)]);
        assert_eq!(list.to_snbt(), "[1,2]");
        assert_eq!(Tag::List(Vec::new()).to_snbt(), "[]");
    }

    #[test]
    fn test_compound_key_quoting() {
        let mut compound = CompoundTag::new();
        compound.insert_i32("bare_key-1.2+", 1);
        compound.insert_i32("needs quoting", 2);

        assert_eq!(
            Tag::Compound(compound).to_snbt(),
            r#"{bare_key-1.2+:1,"needs quoting":2}"#
        );
    }

    #[test]
    fn test_end_has_no_snbt_form() {
        assert_eq!(Tag::End.to_snbt(), "");
        assert_eq!(Tag::End.to_string(), "<TAG_End>");
    }

    #[test]
    fn test_nested() {
        let mut inner = CompoundTag::new();
        inner.insert_str("name", "Eggbert");

        let mut compound = CompoundTag::new();
        compound.insert_compound_tag("egg", inner);
        compound.insert_list("xs", vec![Tag::Long(11), Tag::Long(12)]);

        assert_eq!(
            Tag::Compound(compound).to_snbt(),
            r#"{egg:{name:"Eggbert"},xs:[11L,12L]}"#
        );
    }

    #[test]
    fn test_snbt_of_clone_matches_original() {
        let mut compound = CompoundTag::new();
        compound.insert_i8_vec("bytes", vec![0, 62, 34]);
        compound.insert_f64("d", 0.49312871321823148);

        let original = Tag::Compound(compound);
        let clone = original.clone();

        assert_eq!(original.to_snbt(), clone.to_snbt());
    }
}
