//! Text field with fixed/dynamic/null-terminated length and a fixed or
//! context-resolved encoding (spec.md §4.2 "String").

use crate::context::{ContextHandle, Scalar, Value};
use crate::error::ParseError;
use crate::error::SizeofError;
use crate::field::Field;
use crate::predicate::{EncodingPredicate, SizePredicate};
use crate::stream::Stream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Ascii,
    Utf16Be,
    Utf16Le,
}

impl Encoding {
    fn from_name(name: &str) -> Result<Self, ParseError> {
        match name.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            "utf-16-be" | "utf-16be" | "utf16be" => Ok(Encoding::Utf16Be),
            "utf-16-le" | "utf-16le" | "utf16le" => Ok(Encoding::Utf16Le),
            other => Err(ParseError::Validation(format!(
                "unknown string encoding '{other}'"
            ))),
        }
    }

    fn decode(self, raw: &[u8]) -> Result<String, ParseError> {
        match self {
            Encoding::Utf8 => String::from_utf8(raw.to_vec())
                .map_err(|e| ParseError::Validation(format!("invalid utf-8: {e}"))),
            Encoding::Ascii => {
                if let Some(&bad) = raw.iter().find(|&&b| b > 0x7F) {
                    return Err(ParseError::Validation(format!(
                        "byte 0x{bad:02x} is not valid ascii"
                    )));
                }
                Ok(raw.iter().map(|&b| b as char).collect())
            }
            Encoding::Utf16Be | Encoding::Utf16Le => {
                if raw.len() % 2 != 0 {
                    return Err(ParseError::Validation(
                        "utf-16 string has an odd number of bytes".to_owned(),
                    ));
                }
                let units = raw.chunks_exact(2).map(|pair| {
                    let arr = [pair[0], pair[1]];
                    if self == Encoding::Utf16Be {
                        u16::from_be_bytes(arr)
                    } else {
                        u16::from_le_bytes(arr)
                    }
                });
                char::decode_utf16(units)
                    .collect::<Result<String, _>>()
                    .map_err(|e| ParseError::Validation(format!("invalid utf-16: {e}")))
            }
        }
    }

    /// Width in bytes of the terminator this encoding uses for
    /// null-terminated strings.
    fn terminator_width(self) -> usize {
        match self {
            Encoding::Utf16Be | Encoding::Utf16Le => 2,
            Encoding::Utf8 | Encoding::Ascii => 1,
        }
    }
}

#[derive(Clone)]
pub enum StringLength {
    Fixed(u64),
    Dynamic(SizePredicate),
    /// Reads up to (and consumes) the encoding's null terminator.
    NullTerminated,
}

#[derive(Clone)]
pub enum EncodingSpec {
    Static(Encoding),
    Dynamic(EncodingPredicate),
}

#[derive(Clone)]
pub struct StringField {
    name: Option<String>,
    length: StringLength,
    encoding: EncodingSpec,
    /// Trailing byte stripped from a `Fixed`-length decode before the
    /// encoding is applied, e.g. space-padded fixed-width fields.
    pad_byte: Option<u8>,
}

impl StringField {
    pub fn new(name: impl Into<String>, length: StringLength, encoding: EncodingSpec) -> Self {
        Self {
            name: Some(name.into()),
            length,
            encoding,
            pad_byte: None,
        }
    }

    /// An anonymous instance: decoded and discarded rather than retained
    /// under a name (spec.md §3.2).
    pub fn discard(length: StringLength, encoding: EncodingSpec) -> Self {
        Self {
            name: None,
            length,
            encoding,
            pad_byte: None,
        }
    }

    pub fn with_pad_byte(mut self, pad_byte: u8) -> Self {
        self.pad_byte = Some(pad_byte);
        self
    }

    fn resolve_encoding(&self, ctx: Option<&ContextHandle>) -> Result<Encoding, ParseError> {
        match &self.encoding {
            EncodingSpec::Static(e) => Ok(*e),
            EncodingSpec::Dynamic(pred) => {
                let ctx = ctx.ok_or_else(|| {
                    ParseError::Validation("dynamic encoding requires a parse context".to_owned())
                })?;
                Encoding::from_name(&pred.call(ctx))
            }
        }
    }
}

impl Field for StringField {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let encoding = self.resolve_encoding(ctx)?;
        let raw = match &self.length {
            StringLength::Fixed(n) => {
                let mut buf = vec![0u8; *n as usize];
                stream.read_exact(&mut buf)?;
                if let Some(pad) = self.pad_byte {
                    while buf.last() == Some(&pad) {
                        buf.pop();
                    }
                }
                buf
            }
            StringLength::Dynamic(pred) => {
                let ctx = ctx.ok_or_else(|| {
                    ParseError::Validation("dynamic length requires a parse context".to_owned())
                })?;
                let n = pred.call(ctx) as usize;
                let mut buf = vec![0u8; n];
                stream.read_exact(&mut buf)?;
                buf
            }
            StringLength::NullTerminated => {
                let width = encoding.terminator_width();
                let mut raw = Vec::new();
                loop {
                    let mut unit = vec![0u8; width];
                    stream.read_exact(&mut unit)?;
                    if unit.iter().all(|&b| b == 0) {
                        break;
                    }
                    raw.extend_from_slice(&unit);
                }
                raw
            }
        };
        Ok(Value::Scalar(Scalar::Str(encoding.decode(&raw)?)))
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        match &self.length {
            StringLength::Fixed(n) => Ok(*n),
            StringLength::Dynamic(pred) => match ctx {
                Some(ctx) => Ok(pred.call(ctx)),
                None => Err(SizeofError(
                    "dynamic length requires a parse context".to_owned(),
                )),
            },
            // A null terminator's position is only known after reading it,
            // so this stays data-dependent even with a context in hand.
            StringLength::NullTerminated => Err(SizeofError(
                "null-terminated string size is only known once parsed".to_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SliceStream;

    #[test]
    fn fixed_length_strips_trailing_pad() {
        let f = StringField::new(
            "S",
            StringLength::Fixed(8),
            EncodingSpec::Static(Encoding::Ascii),
        )
        .with_pad_byte(b' ');
        let mut s = SliceStream::new(b"hi      ".to_vec());
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_str(), Some("hi"));
    }

    #[test]
    fn utf16_be_decodes_two_byte_units() {
        let f = StringField::new(
            "S",
            StringLength::Fixed(4),
            EncodingSpec::Static(Encoding::Utf16Be),
        );
        let mut s = SliceStream::new(vec![0x00, b'H', 0x00, b'i']);
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_str(), Some("Hi"));
    }

    #[test]
    fn null_terminated_stops_at_zero_and_consumes_it() {
        let f = StringField::new(
            "S",
            StringLength::NullTerminated,
            EncodingSpec::Static(Encoding::Ascii),
        );
        let mut s = SliceStream::new(b"abc\0def".to_vec());
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_str(), Some("abc"));
        assert_eq!(s.tell().unwrap(), 4);
    }

    #[test]
    fn null_terminated_sizeof_is_data_dependent() {
        let f = StringField::new(
            "S",
            StringLength::NullTerminated,
            EncodingSpec::Static(Encoding::Ascii),
        );
        assert!(f.sizeof(None).is_err());
    }

    #[test]
    fn discard_has_no_name_but_still_consumes_its_length() {
        let f = StringField::discard(
            StringLength::Fixed(3),
            EncodingSpec::Static(Encoding::Ascii),
        );
        assert!(f.name().is_none());
        let mut s = SliceStream::new(b"abcd".to_vec());
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_str(), Some("abc"));
        assert_eq!(s.tell().unwrap(), 3);
    }
}
