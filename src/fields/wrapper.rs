//! Single-child combinators that leave parsing to an inner field and adjust
//! its name, value, or enclosing scope (spec.md §4.3).

use crate::context::{ContextHandle, Scalar, Value};
use crate::error::{ParseError, SizeofError};
use crate::field::{Field, FieldBox};
use crate::predicate::ValuePredicate;
use crate::stream::Stream;
use std::rc::Rc;

/// A predicate over just the freshly parsed scalar, used by `Validator`'s
/// `Assertion` variant (no other context is needed to judge a single value).
#[derive(Clone)]
pub struct ScalarPredicate(Rc<dyn Fn(&Scalar) -> bool>);

impl ScalarPredicate {
    pub fn new(f: impl Fn(&Scalar) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, v: &Scalar) -> bool {
        (self.0)(v)
    }
}

/// Gives an inner field a different name than the one it was built with
/// (spec.md §4.3 "Rename").
#[derive(Clone)]
pub struct Rename {
    name: String,
    inner: FieldBox,
}

impl Rename {
    pub fn new(name: impl Into<String>, inner: FieldBox) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl Field for Rename {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        self.inner.parse(stream, ctx)
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        self.inner.sizeof(ctx)
    }

    fn is_embedded(&self) -> bool {
        self.inner.is_embedded()
    }

    fn is_nested(&self) -> bool {
        self.inner.is_nested()
    }
}

/// Transforms an inner field's decoded scalar into a more convenient form
/// (spec.md §4.3 "Adapter": `Hex`, `Bin`, `Boolean`, `Enum`).
#[derive(Clone)]
pub struct Adapter {
    inner: FieldBox,
    transform: Rc<dyn Fn(Scalar) -> Result<Scalar, ParseError>>,
}

impl Adapter {
    pub fn new(inner: FieldBox, transform: impl Fn(Scalar) -> Result<Scalar, ParseError> + 'static) -> Self {
        Self {
            inner,
            transform: Rc::new(transform),
        }
    }

    /// Formats an unsigned integer as a lowercase `0x`-prefixed hex string.
    pub fn hex(inner: FieldBox) -> Self {
        Self::new(inner, |s| match s.as_u64() {
            Some(v) => Ok(Scalar::Str(format!("0x{v:x}"))),
            None => Err(ParseError::Validation("Hex adapter requires an integer".to_owned())),
        })
    }

    /// Formats an unsigned integer as a `0b`-prefixed binary string.
    pub fn bin(inner: FieldBox) -> Self {
        Self::new(inner, |s| match s.as_u64() {
            Some(v) => Ok(Scalar::Str(format!("0b{v:b}"))),
            None => Err(ParseError::Validation("Bin adapter requires an integer".to_owned())),
        })
    }

    /// Maps an integer to a human-readable name via `mappings`, falling back
    /// to `default` (or failing with `InvalidEnumValue`) when unmapped.
    pub fn enum_mapping(
        inner: FieldBox,
        mappings: fxhash::FxHashMap<i64, String>,
        default: Option<String>,
    ) -> Self {
        Self::new(inner, move |s| {
            let key = s
                .as_i64()
                .ok_or_else(|| ParseError::Validation("Enum adapter requires an integer".to_owned()))?;
            match mappings.get(&key) {
                Some(name) => Ok(Scalar::Str(name.clone())),
                None => match &default {
                    Some(name) => Ok(Scalar::Str(name.clone())),
                    None => Err(ParseError::InvalidEnumValue(key)),
                },
            }
        })
    }
}

impl Field for Adapter {
    fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        match self.inner.parse(stream, ctx)? {
            Value::Scalar(s) => Ok(Value::Scalar((self.transform)(s)?)),
            other => Ok(other),
        }
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        self.inner.sizeof(ctx)
    }
}

#[derive(Clone)]
pub enum ValidatorKind {
    /// The parsed value must equal exactly this constant.
    Constant(Scalar),
    /// The parsed value must be one of these.
    Contains(Vec<Scalar>),
    /// The parsed value must satisfy an arbitrary single-value predicate.
    Assertion(ScalarPredicate),
    /// The parsed value must equal a value computed from the context (e.g.
    /// a checksum or length field that must match an independently derived
    /// expectation).
    EqualsContext(ValuePredicate),
}

/// Wraps an inner field and rejects the parse if its value fails a check
/// (spec.md §4.3 "Validator"). The value itself passes through unchanged.
#[derive(Clone)]
pub struct Validator {
    inner: FieldBox,
    kind: ValidatorKind,
}

impl Validator {
    pub fn new(inner: FieldBox, kind: ValidatorKind) -> Self {
        Self { inner, kind }
    }
}

impl Field for Validator {
    fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let value = self.inner.parse(stream, ctx)?;
        let scalar = value
            .as_scalar()
            .ok_or_else(|| ParseError::Validation("Validator requires a scalar field".to_owned()))?;
        let ok = match &self.kind {
            ValidatorKind::Constant(expected) => scalar == expected,
            ValidatorKind::Contains(options) => options.contains(scalar),
            ValidatorKind::Assertion(pred) => pred.call(scalar),
            ValidatorKind::EqualsContext(pred) => {
                let ctx = ctx.ok_or_else(|| {
                    ParseError::Validation("Validator requires an enclosing context".to_owned())
                })?;
                *scalar == pred.call(ctx)
            }
        };
        if !ok {
            return Err(ParseError::Validation(format!(
                "validation failed for '{}': {:?}",
                self.inner.name().unwrap_or("<unnamed>"),
                scalar
            )));
        }
        Ok(value)
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        self.inner.sizeof(ctx)
    }
}

/// A predicate over the whole enclosing context rather than a single parsed
/// scalar, used by the detached [`Assertion`] field.
#[derive(Clone)]
pub struct ContextPredicate(Rc<dyn Fn(&ContextHandle) -> bool>);

impl ContextPredicate {
    pub fn new(f: impl Fn(&ContextHandle) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, ctx: &ContextHandle) -> bool {
        (self.0)(ctx)
    }
}

/// A standalone context-wide check with no wrapped field: consumes zero
/// bytes and yields no retained value, just fails the parse if `predicate`
/// is false (spec.md §4.3 "Validator": "a detached `Assertion` (predicate
/// over context alone, yields nothing)"). Declared as a `Structure` child
/// the same way `Anchor`/`NullField` are, rather than as a `ValidatorKind`
/// variant, since `Validator` always wraps and re-parses an `inner` field
/// and this has none — matching how `original_source/demo_itunesdb.py` and
/// `demo_png.py` use `Assertion(lambda c: ..., 'msg')` as a bare Structure
/// member, never wrapping another field.
#[derive(Clone)]
pub struct Assertion {
    message: String,
    predicate: ContextPredicate,
}

impl Assertion {
    pub fn new(predicate: ContextPredicate, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            predicate,
        }
    }
}

impl Field for Assertion {
    fn name(&self) -> Option<&str> {
        None
    }

    fn parse(&self, _stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let ctx = ctx.ok_or_else(|| {
            ParseError::Validation("Assertion requires an enclosing context".to_owned())
        })?;
        if self.predicate.call(ctx) {
            Ok(Value::Scalar(Scalar::Bool(true)))
        } else {
            Err(ParseError::Validation(self.message.clone()))
        }
    }

    fn sizeof(&self, _ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        Ok(0)
    }
}

/// Marks an inner `Structure`/`Array` so its parsed scope is spliced into the
/// enclosing structure instead of nested under a name (spec.md §4.3
/// "Embed").
#[derive(Clone)]
pub struct Embed {
    inner: FieldBox,
}

impl Embed {
    pub fn new(inner: FieldBox) -> Self {
        Self { inner }
    }
}

impl Field for Embed {
    fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        self.inner.parse(stream, ctx)
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        self.inner.sizeof(ctx)
    }

    fn is_embedded(&self) -> bool {
        true
    }

    fn is_nested(&self) -> bool {
        self.inner.is_nested()
    }
}
