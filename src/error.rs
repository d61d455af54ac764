use thiserror::Error;

/// Errors raised synchronously from field constructors, before any byte is read.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),

    #[error("invalid child field: {0}")]
    InvalidChildField(String),

    #[error("invalid functor: {0}")]
    InvalidFunctor(String),

    #[error("invalid field parameter: {0}")]
    InvalidFieldParameter(String),

    #[error("invalid field size: {0}")]
    InvalidFieldSize(String),
}

/// Raised when [`crate::field::Field::sizeof`] cannot determine a byte width
/// without consulting data that hasn't been parsed yet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("size of '{0}' is data-dependent and cannot be computed without a parse")]
pub struct SizeofError(pub String);

/// Errors raised while a parse is in progress.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("stream exhausted: needed {needed} byte(s), got {got}")]
    StreamExhausted { needed: u64, got: u64 },

    #[error("operation requires a seekable stream: {0}")]
    Stream(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("value {0} has no enumeration mapping and no default was configured")]
    InvalidEnumValue(i64),

    #[error("no default field configured for unmatched key")]
    NoDefaultField,

    #[error(transparent)]
    Sizeof(#[from] SizeofError),

    /// Reserved for future use, mirrors the source taxonomy's `FieldNameError`.
    #[error("field name error")]
    FieldName,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Errors raised by read-only utilities that operate on an already-built
/// context tree (e.g. a debug accessor looking up a missing name).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("no such field '{0}' in context")]
    NoSuchField(String),

    #[error("value at '{0}' is not a {1}")]
    WrongType(String, &'static str),

    #[error("context has no parent")]
    NoParent,
}
