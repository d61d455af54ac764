//! Filler bytes (spec.md §4.2 "Padding"): always consumed, optionally
//! checked against an expected fill byte.

use crate::context::{ContextHandle, Scalar, Value};
use crate::error::{ParseError, SizeofError};
use crate::field::Field;
use crate::predicate::Length;
use crate::stream::Stream;
use std::io::SeekFrom;

/// Consumes `length` bytes. In strict mode every byte must equal `pad_byte`
/// or the parse fails; lax mode discards the bytes unchecked (spec.md §4.2
/// "strict padding validates its fill byte, lax padding does not").
#[derive(Clone, Debug)]
pub struct Padding {
    length: Length,
    strict: bool,
    pad_byte: u8,
}

impl Padding {
    pub fn lax(length: impl Into<Length>) -> Self {
        Self {
            length: length.into(),
            strict: false,
            pad_byte: 0,
        }
    }

    pub fn strict(length: impl Into<Length>, pad_byte: u8) -> Self {
        Self {
            length: length.into(),
            strict: true,
            pad_byte,
        }
    }
}

impl Field for Padding {
    fn name(&self) -> Option<&str> {
        None
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let n = self.length.resolve(ctx)? as usize;
        // Lax padding never inspects its bytes, so on a seekable stream it
        // skips the run instead of materializing and discarding a buffer
        // (spec.md §4.2: "in lax mode, if the stream is seekable, advances
        // the cursor without reading").
        if !self.strict && stream.seekable() {
            stream.seek(SeekFrom::Current(n as i64))?;
            return Ok(Value::Scalar(Scalar::Bytes(bytes::Bytes::new())));
        }
        let mut buf = vec![0u8; n];
        stream.read_exact(&mut buf)?;
        if self.strict {
            if let Some(&bad) = buf.iter().find(|&&b| b != self.pad_byte) {
                return Err(ParseError::Validation(format!(
                    "padding byte 0x{bad:02x} does not match expected 0x{:02x}",
                    self.pad_byte
                )));
            }
        }
        Ok(Value::Scalar(Scalar::Bytes(bytes::Bytes::from(buf))))
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        self.length.resolve(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{ReaderStream, SliceStream};

    #[test]
    fn strict_padding_rejects_mismatched_byte() {
        let f = Padding::strict(3u64, 0x00);
        let mut s = SliceStream::new(vec![0x00, 0x00, 0xFF]);
        assert!(f.parse(&mut s, None).is_err());
    }

    #[test]
    fn lax_padding_ignores_content() {
        let f = Padding::lax(3u64);
        let mut s = SliceStream::new(vec![0xAA, 0xBB, 0xCC]);
        assert!(f.parse(&mut s, None).is_ok());
    }

    #[test]
    fn lax_padding_skips_via_seek_on_a_seekable_stream() {
        let f = Padding::lax(3u64);
        let mut s = SliceStream::new(vec![0xAA, 0xBB, 0xCC, 0xDD]);
        f.parse(&mut s, None).unwrap();
        assert_eq!(s.tell().unwrap(), 3);
    }

    #[test]
    fn lax_padding_falls_back_to_reading_on_a_non_seekable_stream() {
        let f = Padding::lax(3u64);
        let mut s = ReaderStream::new(&b"xyz"[..]);
        assert!(!s.seekable());
        f.parse(&mut s, None).unwrap();
        assert_eq!(s.tell().unwrap(), 3);
    }

    #[test]
    fn strict_padding_still_reads_even_when_seekable() {
        let f = Padding::strict(3u64, 0x00);
        let mut s = SliceStream::new(vec![0x00, 0x00, 0x00, 0xFF]);
        f.parse(&mut s, None).unwrap();
        assert_eq!(s.tell().unwrap(), 3);
    }
}
