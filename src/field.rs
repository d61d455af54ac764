//! L3: the uniform field contract (spec.md §4.1).
//!
//! Every primitive and combinator is a `Field`. A field tree is built once,
//! immutably, by ordinary constructor calls, then reused across any number of
//! `parse` calls against different streams (spec.md §3.3, §5).

use crate::context::{ContextHandle, Value};
use crate::error::{ParseError, SizeofError};
use crate::stream::Stream;
use std::rc::Rc;

/// A parseable unit: a primitive scalar, or a combinator built from other
/// fields.
///
/// `parse` and `sizeof` both take an optional context: `None` only at the
/// very root of a parse (or when probing a detached field's static size),
/// `Some` everywhere a field is nested under a `Structure`/`Array`/etc. and
/// may need to see already-parsed sibling or ancestor values.
pub trait Field {
    /// The field's own name, as given to its containing `Structure`/`Array`.
    /// Combinators with no name of their own (e.g. a bare top-level `Array`)
    /// return `None`.
    fn name(&self) -> Option<&str>;

    /// Consumes bytes from `stream` and returns the parsed value.
    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError>;

    /// The number of bytes a `parse` call would consume, without reading.
    /// Fails with [`SizeofError`] if the width is data-dependent and `ctx` is
    /// `None` or doesn't carry the needed value (spec.md §4.1 "A field whose
    /// size depends on not-yet-parsed data reports that via `SizeofError`
    /// rather than guessing").
    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError>;

    /// `true` for fields (`Embed`, `FormatStructure`'s members) whose parsed
    /// value is spliced into the parent's own scope rather than stored under
    /// this field's name (spec.md §4.3 "Embedding").
    fn is_embedded(&self) -> bool {
        false
    }

    /// `true` for fields (`Structure`, `Array`, `Union`, bitwise structures)
    /// whose parsed value is itself a context node rather than a scalar.
    fn is_nested(&self) -> bool {
        false
    }
}

/// A shared, cloneable handle to a field, used wherever a combinator holds
/// child fields (spec.md §4: field trees are built from `Rc`-shared nodes so
/// the same sub-tree can be reused by more than one parent, e.g. a repeated
/// element type in `Array`).
pub type FieldBox = Rc<dyn Field>;

/// Parses `field` against `stream` as the root of a tree, with no enclosing
/// context. Equivalent to calling [`Field::parse`] with `ctx = None`, spelled
/// out because it's the one call site every caller of this crate reaches for
/// first (spec.md §6.1).
pub fn parse_root(field: &dyn Field, stream: &mut dyn Stream) -> Result<Value, ParseError> {
    field.parse(stream, None)
}
