//! Positional, repeated-element combinators (spec.md §4.5 "Array",
//! "RepeatUntil").

use crate::context::{ArrayContext, ContextHandle, ContextNode, Value};
use crate::error::{ParseError, SizeofError};
use crate::field::{Field, FieldBox};
use crate::predicate::{BoolPredicate, Length};
use crate::stream::Stream;

/// Repeats `element` a fixed or context-computed number of times. The count
/// predicate (when dynamic) sees the *enclosing* context, since the array
/// itself doesn't exist until the count is known (spec.md §4.5, mirrors
/// `Array('Items', lambda c: c.Count, Byte())`).
#[derive(Clone)]
pub struct Array {
    name: Option<String>,
    element: FieldBox,
    count: Length,
}

impl Array {
    pub fn new(name: impl Into<String>, count: impl Into<Length>, element: FieldBox) -> Self {
        Self {
            name: Some(name.into()),
            element,
            count: count.into(),
        }
    }
}

impl Field for Array {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let count = self.count.resolve(ctx)?;
        let handle = ArrayContext::new_handle(self.name.clone(), ctx);
        for _ in 0..count {
            let v = self.element.parse(stream, Some(&handle))?;
            let mut b = handle.borrow_mut();
            if let ContextNode::Array(a) = &mut *b {
                a.push(v);
            }
        }
        Ok(Value::Array(handle))
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        let count = self.count.resolve(ctx)?;
        let elem = self.element.sizeof(ctx)?;
        Ok(count * elem)
    }

    fn is_nested(&self) -> bool {
        true
    }
}

/// Repeats `element` until `stop` (evaluated against the array context
/// *after* each element is appended, so it can inspect `len()`/the last
/// element) returns true, or, when `stop_on_eof` is set, the stream runs out
/// (spec.md §4.5, mirrors
/// `RepeatUntil('Strings', lambda c: len(c) > 0 and c[-1] == c.__.Last, ...)`).
#[derive(Clone)]
pub struct RepeatUntil {
    name: Option<String>,
    element: FieldBox,
    stop: BoolPredicate,
    stop_on_eof: bool,
}

impl RepeatUntil {
    pub fn new(name: impl Into<String>, element: FieldBox, stop: BoolPredicate, stop_on_eof: bool) -> Self {
        Self {
            name: Some(name.into()),
            element,
            stop,
            stop_on_eof,
        }
    }
}

impl Field for RepeatUntil {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let handle = ArrayContext::new_handle(self.name.clone(), ctx);
        loop {
            match self.element.parse(stream, Some(&handle)) {
                Ok(v) => {
                    {
                        let mut b = handle.borrow_mut();
                        if let ContextNode::Array(a) = &mut *b {
                            a.push(v);
                        }
                    }
                    if self.stop.call(&handle) {
                        tracing::trace!(name = self.name.as_deref().unwrap_or("<anonymous>"), "repeat_until stop condition met");
                        break;
                    }
                }
                Err(ParseError::StreamExhausted { .. }) if self.stop_on_eof => {
                    tracing::trace!(name = self.name.as_deref().unwrap_or("<anonymous>"), "repeat_until stopped on eof");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Value::Array(handle))
    }

    fn sizeof(&self, _ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        Err(SizeofError(
            "RepeatUntil size is only known once parsed".to_owned(),
        ))
    }

    fn is_nested(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextExt;
    use crate::fields::integer::{Bits, Endian, Integer};
    use crate::stream::SliceStream;
    use std::rc::Rc;

    #[test]
    fn fixed_count_reads_n_elements() {
        let f = Array::new("Items", 3u64, Rc::new(Integer::discard(Bits::B8, false, Endian::Native)));
        let mut s = SliceStream::new(vec![1u8, 2, 3, 4]);
        let v = f.parse(&mut s, None).unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(arr.len_ctx(), 3);
        assert_eq!(s.tell().unwrap(), 3);
    }

    #[test]
    fn repeat_until_stops_when_predicate_is_true() {
        let f = RepeatUntil::new(
            "Items",
            Rc::new(Integer::discard(Bits::B8, false, Endian::Native)),
            BoolPredicate::new(|ctx| ctx.last_ctx().unwrap().as_scalar().unwrap().as_u64() == Some(0)),
            false,
        );
        let mut s = SliceStream::new(vec![1u8, 2, 0, 9]);
        let v = f.parse(&mut s, None).unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(arr.len_ctx(), 3);
        assert_eq!(s.tell().unwrap(), 3);
    }

    #[test]
    fn repeat_until_stop_on_eof_consumes_whole_stream() {
        let f = RepeatUntil::new(
            "Items",
            Rc::new(Integer::discard(Bits::B8, false, Endian::Native)),
            BoolPredicate::new(|_| false),
            true,
        );
        let mut s = SliceStream::new(vec![1u8, 2, 3]);
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_array().unwrap().len_ctx(), 3);
    }
}
