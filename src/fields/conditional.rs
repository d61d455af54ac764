//! Branch-selecting combinators (spec.md §4.7 "Switch", "Select", "IfElse").

use crate::context::{ContextHandle, Scalar, Value};
use crate::error::{ParseError, SizeofError};
use crate::field::{Field, FieldBox};
use crate::predicate::{BoolPredicate, KeyPredicate};
use crate::stream::Stream;
use fxhash::FxHashMap;
use std::io::SeekFrom;

/// Picks one of `cases` by a key computed from the context, falling back to
/// `default` when the key isn't mapped (spec.md §4.7 "Switch").
#[derive(Clone)]
pub struct Switch {
    name: String,
    key: KeyPredicate,
    cases: FxHashMap<String, FieldBox>,
    default: Option<FieldBox>,
}

impl Switch {
    pub fn new(
        name: impl Into<String>,
        key: KeyPredicate,
        cases: FxHashMap<String, FieldBox>,
        default: Option<FieldBox>,
    ) -> Self {
        Self {
            name: name.into(),
            key,
            cases,
            default,
        }
    }

    fn resolve(&self, ctx: Option<&ContextHandle>) -> Result<&FieldBox, ParseError> {
        let ctx = ctx
            .ok_or_else(|| ParseError::Validation("Switch requires an enclosing context".to_owned()))?;
        let key = self.key.call(ctx);
        let chosen = self.cases.get(&key).or(self.default.as_ref());
        tracing::trace!(name = %self.name, key, matched = chosen.is_some(), "switch resolved key");
        chosen.ok_or(ParseError::NoDefaultField)
    }
}

impl Field for Switch {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        self.resolve(ctx)?.clone().parse(stream, ctx)
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        let chosen = self.resolve(ctx).map_err(|_| {
            SizeofError("Switch size depends on a key resolved from context".to_owned())
        })?;
        chosen.sizeof(ctx)
    }
}

/// Tries each alternative in order (rewinding between attempts) and keeps
/// the first that parses without error, leaving the stream exactly where
/// that alternative left it — unlike [`crate::fields::union::Union`], no
/// width reconciliation across untried alternatives is performed
/// (spec.md §4.7 "Select").
#[derive(Clone)]
pub struct Select {
    name: String,
    alternatives: Vec<FieldBox>,
}

impl Select {
    pub fn new(name: impl Into<String>, alternatives: Vec<FieldBox>) -> Self {
        Self {
            name: name.into(),
            alternatives,
        }
    }
}

impl Field for Select {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        if !stream.seekable() {
            return Err(ParseError::Stream(
                "Select requires a seekable stream".to_owned(),
            ));
        }
        let start = stream.tell()?;
        let mut last_err = None;
        for alt in &self.alternatives {
            stream.seek(SeekFrom::Start(start))?;
            match alt.parse(stream, ctx) {
                Ok(value) => return Ok(value),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| ParseError::Validation("Select has no alternatives".to_owned())))
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        // Only meaningful if every alternative agrees; otherwise the actual
        // size depends on which one parses, which requires the data.
        let mut sizes = self.alternatives.iter().map(|a| a.sizeof(ctx));
        let first = sizes.next().transpose()?;
        match first {
            Some(n) => {
                for s in sizes {
                    if s? != n {
                        return Err(SizeofError(
                            "Select alternatives disagree on size".to_owned(),
                        ));
                    }
                }
                Ok(n)
            }
            None => Ok(0),
        }
    }
}

/// Parses `then_field` if `condition` holds, otherwise `else_field`
/// (or, with no `else_field`, consumes nothing and yields `false`)
/// (spec.md §4.7 "IfElse").
#[derive(Clone)]
pub struct IfElse {
    name: String,
    condition: BoolPredicate,
    then_field: FieldBox,
    else_field: Option<FieldBox>,
}

impl IfElse {
    pub fn new(
        name: impl Into<String>,
        condition: BoolPredicate,
        then_field: FieldBox,
        else_field: Option<FieldBox>,
    ) -> Self {
        Self {
            name: name.into(),
            condition,
            then_field,
            else_field,
        }
    }
}

impl Field for IfElse {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let ctx_handle = ctx
            .ok_or_else(|| ParseError::Validation("IfElse requires an enclosing context".to_owned()))?;
        if self.condition.call(ctx_handle) {
            self.then_field.parse(stream, ctx)
        } else {
            match &self.else_field {
                Some(f) => f.parse(stream, ctx),
                None => Ok(Value::Scalar(Scalar::Bool(false))),
            }
        }
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        let ctx_handle = ctx.ok_or_else(|| {
            SizeofError("IfElse size depends on a condition resolved from context".to_owned())
        })?;
        if self.condition.call(ctx_handle) {
            self.then_field.sizeof(ctx)
        } else {
            match &self.else_field {
                Some(f) => f.sizeof(ctx),
                None => Ok(0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextExt, StructContext};
    use crate::fields::integer::Integer;
    use crate::stream::SliceStream;
    use std::rc::Rc;

    fn ctx_with(key: &str, value: u64) -> ContextHandle {
        let root = StructContext::new_handle(None, None);
        {
            let mut b = root.borrow_mut();
            if let crate::context::ContextNode::Struct(s) = &mut *b {
                s.insert(internment::Intern::new(key.to_owned()), Scalar::UInt(value).into());
            }
        }
        root
    }

    #[test]
    fn switch_falls_back_to_default() {
        let mut cases: FxHashMap<String, FieldBox> = FxHashMap::default();
        cases.insert("A".to_owned(), Rc::new(Integer::u8("V")));
        let sw = Switch::new(
            "S",
            KeyPredicate::new(|_| "unknown".to_owned()),
            cases,
            Some(Rc::new(Integer::u8("V"))),
        );
        let ctx = ctx_with("Tag", 0);
        let mut s = SliceStream::new(vec![42u8]);
        let v = sw.parse(&mut s, Some(&ctx)).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_u64(), Some(42));
    }

    #[test]
    fn if_else_without_else_yields_false_and_consumes_nothing() {
        let f = IfElse::new("F", BoolPredicate::new(|_| false), Rc::new(Integer::u8("V")), None);
        let ctx = ctx_with("Flag", 0);
        let mut s = SliceStream::new(vec![9u8]);
        let v = f.parse(&mut s, Some(&ctx)).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_bool(), Some(false));
        assert_eq!(s.tell().unwrap(), 0);
    }
}
