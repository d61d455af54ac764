//! Parses every alternative against the same starting bytes and merges all
//! of their scopes into one `StructContext`, then advances the stream past
//! the *widest* alternative rather than whichever happened to be declared
//! last (spec.md §4.6).
//!
//! Both halves of this are corrections against a naive reading: a naive
//! implementation would (a) stop at the first alternative that parses,
//! discarding the rest, and (b) leave the stream positioned wherever that
//! one alternative left it, which silently depends on alternative order
//! whenever the variants have different widths. Spec scenario (spec.md §8
//! "Union") requires every alternative's fields to be visible at once
//! (`I8`, `I16`, `I32` all present alongside the anonymous pair's `X`/`Y`),
//! so all alternatives are parsed unconditionally — a failing alternative
//! fails the whole `Union`, there is no discriminated "first that matches"
//! selection here — and merged the same way `Structure` merges an embedded
//! child: named results inserted by name, struct-valued results (named or
//! not) spliced directly into the Union's own scope.

use crate::context::{ContextHandle, ContextNode, StructContext, Value};
use crate::error::{ParseError, SizeofError};
use crate::field::{Field, FieldBox};
use crate::stream::Stream;
use internment::Intern;
use std::io::SeekFrom;

#[derive(Clone)]
pub struct Union {
    name: Option<String>,
    alternatives: Vec<FieldBox>,
}

impl Union {
    pub fn new(name: impl Into<String>, alternatives: Vec<FieldBox>) -> Self {
        Self {
            name: Some(name.into()),
            alternatives,
        }
    }
}

impl Field for Union {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        if self.alternatives.is_empty() {
            return Err(ParseError::Validation(
                "Union requires at least one alternative".to_owned(),
            ));
        }
        if !stream.seekable() {
            return Err(ParseError::Stream(
                "Union requires a seekable stream".to_owned(),
            ));
        }
        let start = stream.tell()?;
        let handle = StructContext::new_handle(self.name.clone(), ctx);
        let mut max_width = 0u64;
        for alt in &self.alternatives {
            stream.seek(SeekFrom::Start(start))?;
            let value = alt.parse(stream, ctx)?;
            let consumed = stream.tell()? - start;
            max_width = max_width.max(consumed);
            match &value {
                Value::Struct(child) => {
                    let entries: Vec<_> = {
                        let child_borrow = child.borrow();
                        let ContextNode::Struct(child_struct) = &*child_borrow else {
                            unreachable!("Value::Struct always wraps a ContextNode::Struct")
                        };
                        child_struct
                            .keys()
                            .iter()
                            .map(|k| (*k, child_struct.get(k.as_str()).unwrap().clone()))
                            .collect()
                    };
                    let mut b = handle.borrow_mut();
                    if let ContextNode::Struct(s) = &mut *b {
                        for (key, v) in entries {
                            s.insert(key, v);
                        }
                    }
                }
                _ => {
                    if let Some(name) = alt.name() {
                        let key = Intern::new(name.to_owned());
                        let mut b = handle.borrow_mut();
                        if let ContextNode::Struct(s) = &mut *b {
                            s.insert(key, value);
                        }
                    }
                }
            }
        }
        tracing::debug!(
            name = self.name.as_deref().unwrap_or("<anonymous>"),
            max_width,
            "union merged all alternatives, advancing to widest"
        );
        stream.seek(SeekFrom::Start(start + max_width))?;
        Ok(Value::Struct(handle))
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        let mut max = 0u64;
        for alt in &self.alternatives {
            max = max.max(alt.sizeof(ctx)?);
        }
        Ok(max)
    }

    fn is_nested(&self) -> bool {
        true
    }
}
