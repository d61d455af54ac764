//! Zero-width bookkeeping fields (spec.md §4.2 "Anchor", "NullField",
//! "Calculate"): none of these read a byte of input.

use crate::context::{ContextHandle, Scalar, Value};
use crate::error::{ParseError, SizeofError};
use crate::field::Field;
use crate::predicate::ValuePredicate;
use crate::stream::Stream;

/// Records the stream's current offset under `name`, without consuming
/// anything. Typically paired with another `Anchor` later in the same
/// structure so a `Calculate` can derive a span (spec.md §9 scenario:
/// `Calculate('Size', lambda c: c.EndPosition - c.StartPosition)`).
#[derive(Clone, Debug)]
pub struct Anchor {
    name: Option<String>,
}

impl Anchor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// An anonymous instance: the offset is computed and discarded rather
    /// than retained under a name (spec.md §3.2).
    pub fn discard() -> Self {
        Self { name: None }
    }
}

impl Field for Anchor {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, _ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        Ok(Value::Scalar(Scalar::UInt(stream.tell()?)))
    }

    fn sizeof(&self, _ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        Ok(0)
    }
}

/// Consumes nothing and stores no observable value; used purely to occupy a
/// declared slot (e.g. a reserved field a format defines but a parser need
/// not surface).
#[derive(Clone, Debug, Default)]
pub struct NullField {
    name: Option<String>,
}

impl NullField {
    pub fn new() -> Self {
        Self { name: None }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

impl Field for NullField {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, _stream: &mut dyn Stream, _ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        Ok(Value::Scalar(Scalar::Bool(true)))
    }

    fn sizeof(&self, _ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        Ok(0)
    }
}

/// Derives a value from the context already parsed so far, without touching
/// the stream (spec.md §4.2 "Calculate").
#[derive(Clone)]
pub struct Calculate {
    name: Option<String>,
    predicate: ValuePredicate,
}

impl Calculate {
    pub fn new(name: impl Into<String>, predicate: ValuePredicate) -> Self {
        Self {
            name: Some(name.into()),
            predicate,
        }
    }

    /// An anonymous instance: the computed value is discarded rather than
    /// retained under a name (spec.md §3.2).
    pub fn discard(predicate: ValuePredicate) -> Self {
        Self {
            name: None,
            predicate,
        }
    }
}

impl Field for Calculate {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, _stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let ctx = ctx.ok_or_else(|| {
            ParseError::Validation("Calculate requires an enclosing context".to_owned())
        })?;
        Ok(Value::Scalar(self.predicate.call(ctx)))
    }

    fn sizeof(&self, _ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextExt, StructContext};
    use crate::stream::SliceStream;

    #[test]
    fn anchor_records_offset_without_consuming() {
        let f = Anchor::new("Mark");
        let mut s = SliceStream::new(vec![1u8, 2, 3]);
        s.seek(std::io::SeekFrom::Start(2)).unwrap();
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_u64(), Some(2));
        assert_eq!(s.tell().unwrap(), 2);
    }

    #[test]
    fn calculate_reads_sibling_fields() {
        let root = StructContext::new_handle(None, None);
        {
            let mut b = root.borrow_mut();
            if let crate::context::ContextNode::Struct(s) = &mut *b {
                s.insert(
                    internment::Intern::new("Start".to_owned()),
                    Scalar::UInt(2).into(),
                );
                s.insert(
                    internment::Intern::new("End".to_owned()),
                    Scalar::UInt(9).into(),
                );
            }
        }
        let f = Calculate::new(
            "Size",
            ValuePredicate::new(|ctx| {
                let start = ctx.field("Start").unwrap().as_scalar().unwrap().as_u64().unwrap();
                let end = ctx.field("End").unwrap().as_scalar().unwrap().as_u64().unwrap();
                Scalar::UInt(end - start)
            }),
        );
        let mut s = SliceStream::new(Vec::<u8>::new());
        let v = f.parse(&mut s, Some(&root)).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_u64(), Some(7));
    }

    #[test]
    fn anchor_discard_has_no_name_but_still_records_offset() {
        let f = Anchor::discard();
        assert!(f.name().is_none());
        let mut s = SliceStream::new(vec![1u8, 2, 3]);
        s.seek(std::io::SeekFrom::Start(2)).unwrap();
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_u64(), Some(2));
    }

    #[test]
    fn calculate_discard_has_no_name_but_still_computes() {
        let root = StructContext::new_handle(None, None);
        {
            let mut b = root.borrow_mut();
            if let crate::context::ContextNode::Struct(s) = &mut *b {
                s.insert(
                    internment::Intern::new("Start".to_owned()),
                    Scalar::UInt(2).into(),
                );
                s.insert(
                    internment::Intern::new("End".to_owned()),
                    Scalar::UInt(9).into(),
                );
            }
        }
        let f = Calculate::discard(ValuePredicate::new(|ctx| {
            let start = ctx.field("Start").unwrap().as_scalar().unwrap().as_u64().unwrap();
            let end = ctx.field("End").unwrap().as_scalar().unwrap().as_u64().unwrap();
            Scalar::UInt(end - start)
        }));
        assert!(f.name().is_none());
        let mut s = SliceStream::new(Vec::<u8>::new());
        let v = f.parse(&mut s, Some(&root)).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_u64(), Some(7));
    }
}
