//! A declarative binary-data parser combinator library.
//!
//! A format is described once, as a tree of [`field::Field`] implementors
//! (primitives from [`fields::integer`], [`fields::bytes`], [`fields::string`]
//! and friends, composed with [`fields::structure`], [`fields::array`],
//! [`fields::union`], [`fields::conditional`] and [`fields::bitwise`]), then
//! reused to parse any number of streams via [`field::parse_root`]. Parsing
//! produces a [`context::ContextHandle`] tree that preserves field order and
//! lets predicates look at already-parsed sibling and ancestor values.

pub mod context;
pub mod error;
pub mod field;
pub mod fields;
pub mod predicate;
pub mod stream;

pub use context::{ArrayContext, ContextExt, ContextHandle, ContextNode, Scalar, StructContext, Value};
pub use error::{ContextError, FieldError, ParseError, SizeofError};
pub use field::{parse_root, Field, FieldBox};
pub use predicate::{BoolPredicate, EncodingPredicate, KeyPredicate, Length, Predicate, SizePredicate, ValuePredicate};
pub use stream::{with_bookmark, ReaderStream, SeekableReaderStream, SliceStream, Stream};
