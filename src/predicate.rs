//! User-supplied callbacks consulted at parse time (spec.md §3.1, §9 "User
//! predicates -> function objects").
//!
//! Every predicate role shares one arity — one argument, the context currently
//! in scope — so a single generic wrapper monomorphized by return type covers
//! size, boolean, key, encoding, and computed-value predicates alike.

use crate::context::ContextHandle;
use std::fmt;
use std::rc::Rc;

/// A reusable, `Clone`-cheap unary callback over the current context.
///
/// Fields hold these instead of raw closures so that a frozen field tree
/// remains `Clone` and can be shared (via `Rc`) across any number of parses.
pub struct Predicate<T>(Rc<dyn Fn(&ContextHandle) -> T>);

impl<T> Predicate<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ContextHandle) -> T + 'static,
    {
        Predicate(Rc::new(f))
    }

    pub fn call(&self, ctx: &ContextHandle) -> T {
        (self.0)(ctx)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Predicate(self.0.clone())
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Size predicates answer in bytes, consulted by `Bytes`, `String`, `Padding`
/// (dynamic length) and `Array` (dynamic count).
pub type SizePredicate = Predicate<u64>;

/// Boolean predicates drive `IfElse`, `Select`, and `RepeatUntil`'s stop check.
pub type BoolPredicate = Predicate<bool>;

/// Key predicates resolve `Switch`'s lookup key.
pub type KeyPredicate = Predicate<String>;

/// Encoding-name predicates resolve `String`'s dynamic encoding.
pub type EncodingPredicate = Predicate<String>;

/// Value predicates compute a [`crate::context::Scalar`] from the context,
/// consulted by `Calculate` and by `Switch`'s key predicate when the key
/// isn't a plain string.
pub type ValuePredicate = Predicate<crate::context::Scalar>;

/// A byte width that is either fixed at construction time or computed from
/// the context at parse time (spec.md §4: "Length/size ... may be given as a
/// constant or a predicate").
#[derive(Clone, Debug)]
pub enum Length {
    Fixed(u64),
    Dynamic(SizePredicate),
}

impl Length {
    /// Resolves the width. A `Dynamic` length with no context in scope (i.e.
    /// called from [`crate::field::Field::sizeof`] with no prior parse) is a
    /// data dependency that cannot be satisfied and fails with
    /// [`crate::error::SizeofError`].
    pub fn resolve(&self, ctx: Option<&ContextHandle>) -> Result<u64, crate::error::SizeofError> {
        match self {
            Length::Fixed(n) => Ok(*n),
            Length::Dynamic(pred) => match ctx {
                Some(ctx) => Ok(pred.call(ctx)),
                None => Err(crate::error::SizeofError(
                    "dynamic length requires a parse context".to_owned(),
                )),
            },
        }
    }
}

impl From<u64> for Length {
    fn from(n: u64) -> Self {
        Length::Fixed(n)
    }
}

impl From<SizePredicate> for Length {
    fn from(p: SizePredicate) -> Self {
        Length::Dynamic(p)
    }
}
