//! Builds a [`Structure`] from a `struct`-style pack format string instead of
//! spelling out each integer field by hand (spec.md §4.9 "FormatStructure").
//!
//! `format_structure(name, ">BHI", &[Some("F1"), Some("F2"), Some("F3")])`
//! parses identically to the equivalent hand-built `Structure` of three
//! `Integer` fields. A `None` entry in `names` parses and discards that
//! position's value instead of retaining it (spec.md §3.2), the same way an
//! unnamed field embedded in a hand-built `Structure` would.

use crate::error::FieldError;
use crate::field::FieldBox;
use crate::fields::integer::{Bits, Endian, Integer};
use crate::fields::structure::Structure;
use std::rc::Rc;

pub fn format_structure(
    name: Option<&str>,
    fmt: &str,
    names: &[Option<&str>],
) -> Result<Structure, FieldError> {
    let mut chars = fmt.chars().peekable();
    let mut endian = Endian::Native;
    match chars.peek() {
        Some('>') | Some('!') => {
            endian = Endian::Big;
            chars.next();
        }
        Some('<') => {
            endian = Endian::Little;
            chars.next();
        }
        Some('=') => {
            chars.next();
        }
        _ => {}
    }

    let mut fields: Vec<FieldBox> = Vec::new();
    for (idx, c) in chars.enumerate() {
        let field_name = *names.get(idx).ok_or_else(|| {
            FieldError::InvalidFieldParameter(
                "format string has more fields than names".to_owned(),
            )
        })?;
        let (bits, signed) = match c {
            'B' => (Bits::B8, false),
            'b' => (Bits::B8, true),
            'H' => (Bits::B16, false),
            'h' => (Bits::B16, true),
            'I' | 'L' => (Bits::B32, false),
            'i' | 'l' => (Bits::B32, true),
            'Q' => (Bits::B64, false),
            'q' => (Bits::B64, true),
            other => {
                return Err(FieldError::InvalidFieldParameter(format!(
                    "unsupported format character '{other}'"
                )))
            }
        };
        let field: FieldBox = match field_name {
            Some(n) => Rc::new(Integer::new(n, bits, signed, endian)),
            None => Rc::new(Integer::discard(bits, signed, endian)),
        };
        fields.push(field);
    }

    if fields.len() != names.len() {
        return Err(FieldError::InvalidFieldParameter(
            "format string and name list length mismatch".to_owned(),
        ));
    }

    match name {
        Some(n) => Structure::named(n, fields),
        None => Structure::anonymous(fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextExt;
    use crate::field::Field;
    use crate::stream::SliceStream;

    #[test]
    fn matches_explicit_field_list() {
        let explicit = Structure::anonymous(vec![
            Rc::new(Integer::u8("F1")),
            Rc::new(Integer::u16("F2", Endian::Big)),
            Rc::new(Integer::u32("F3", Endian::Big)),
        ])
        .unwrap();
        let from_format =
            format_structure(None, ">BHI", &[Some("F1"), Some("F2"), Some("F3")]).unwrap();

        let bytes = vec![0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03];
        let mut s1 = SliceStream::new(bytes.clone());
        let mut s2 = SliceStream::new(bytes);
        let v1 = explicit.parse(&mut s1, None).unwrap();
        let v2 = from_format.parse(&mut s2, None).unwrap();
        let c1 = v1.as_struct().unwrap();
        let c2 = v2.as_struct().unwrap();
        for name in ["F1", "F2", "F3"] {
            assert_eq!(
                c1.field(name).unwrap().as_scalar().unwrap().as_u64(),
                c2.field(name).unwrap().as_scalar().unwrap().as_u64()
            );
        }
    }

    #[test]
    fn rejects_mismatched_name_count() {
        assert!(format_structure(None, ">BH", &[Some("OnlyOne")]).is_err());
    }

    #[test]
    fn none_entry_parses_and_discards_that_position() {
        let s = format_structure(None, ">BHB", &[Some("F1"), None, Some("F3")]).unwrap();
        let mut stream = SliceStream::new(vec![0x01, 0x00, 0x02, 0x03]);
        let v = s.parse(&mut stream, None).unwrap();
        let c = v.as_struct().unwrap();
        assert_eq!(c.field("F1").unwrap().as_scalar().unwrap().as_u64(), Some(1));
        assert_eq!(c.field("F3").unwrap().as_scalar().unwrap().as_u64(), Some(3));
        assert_eq!(stream.tell().unwrap(), 4);
    }
}
