//! Raw byte-blob field (spec.md §4.2 "Bytes").

use crate::context::{ContextHandle, Scalar, Value};
use crate::error::{ParseError, SizeofError};
use crate::field::Field;
use crate::predicate::Length;
use crate::stream::Stream;

/// Reads a run of `length` raw bytes, fixed or computed from context.
#[derive(Clone, Debug)]
pub struct Bytes {
    name: Option<String>,
    length: Length,
}

impl Bytes {
    pub fn new(name: impl Into<String>, length: impl Into<Length>) -> Self {
        Self {
            name: Some(name.into()),
            length: length.into(),
        }
    }

    /// An anonymous instance: parsed and discarded rather than retained
    /// under a name (spec.md §3.2).
    pub fn discard(length: impl Into<Length>) -> Self {
        Self {
            name: None,
            length: length.into(),
        }
    }
}

impl Field for Bytes {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let len = self.length.resolve(ctx)? as usize;
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf)?;
        Ok(Value::Scalar(Scalar::Bytes(bytes::Bytes::from(buf))))
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        self.length.resolve(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::SizePredicate;
    use crate::stream::SliceStream;

    #[test]
    fn fixed_length_reads_exact_bytes() {
        let f = Bytes::new("B", 3u64);
        let mut s = SliceStream::new(vec![1u8, 2, 3, 4]);
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(
            v.as_scalar().unwrap().as_bytes().unwrap().as_ref(),
            &[1, 2, 3]
        );
    }

    #[test]
    fn dynamic_length_without_context_fails_sizeof() {
        let f = Bytes::new("B", Length::Dynamic(SizePredicate::new(|_| 4)));
        assert!(f.sizeof(None).is_err());
    }

    #[test]
    fn discard_has_no_name_but_still_consumes_its_length() {
        let f = Bytes::discard(3u64);
        assert!(f.name().is_none());
        let mut s = SliceStream::new(vec![1u8, 2, 3, 4]);
        f.parse(&mut s, None).unwrap();
        assert_eq!(s.tell().unwrap(), 3);
    }
}
