//! L2: the ordered, parent-linked result tree (spec.md §3).
//!
//! `StructContext` mirrors a `Structure`/`Union`/`Switch` parse: an ordered
//! key -> value map. `ArrayContext` mirrors an `Array`/`RepeatUntil` parse: a
//! positional sequence. Both carry a non-owning, upward-only parent link used
//! exclusively by predicates that need to see already-parsed sibling or
//! ancestor fields (spec.md §9 "Upward parent pointers -> weak/back references").

use fxhash::FxHashMap;
use internment::Intern;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Hidden, `StructContext`-only name prefix for anchors (spec.md §3.2): stored
/// but excluded from visible ordered iteration.
pub fn is_anchor_name(name: &str) -> bool {
    name.len() > 2 && name.starts_with("__")
}

/// The non-`StructContext`/`ArrayContext` values a context slot can hold
/// (spec.md §3.2: "primitive (integer, boolean, string, byte blob,
/// tuple-of-primitives)").
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Str(String),
    Bytes(bytes::Bytes),
    Tuple(Vec<Scalar>),
}

impl Scalar {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::UInt(v) => Some(*v),
            Scalar::Int(v) if *v >= 0 => Some(*v as u64),
            Scalar::Bool(b) => Some(*b as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::UInt(v) => i64::try_from(*v).ok(),
            Scalar::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&bytes::Bytes> {
        match self {
            Scalar::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! scalar_from_int {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for Scalar {
            fn from(v: $t) -> Self {
                Scalar::$variant(v as _)
            }
        })*
    };
}
scalar_from_int!(i8 => Int, i16 => Int, i32 => Int, i64 => Int);
scalar_from_int!(u8 => UInt, u16 => UInt, u32 => UInt, u64 => UInt);

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_owned())
    }
}

impl From<bytes::Bytes> for Scalar {
    fn from(v: bytes::Bytes) -> Self {
        Scalar::Bytes(v)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Scalar::Bytes(bytes::Bytes::from(v))
    }
}

/// One slot in a context tree: a scalar, or a nested node (spec.md §3.2).
#[derive(Debug, Clone)]
pub enum Value {
    Scalar(Scalar),
    Struct(ContextHandle),
    Array(ContextHandle),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&ContextHandle> {
        match self {
            Value::Struct(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ContextHandle> {
        match self {
            Value::Array(c) => Some(c),
            _ => None,
        }
    }
}

impl<T: Into<Scalar>> From<T> for Value {
    fn from(v: T) -> Self {
        Value::Scalar(v.into())
    }
}

/// Either kind of nested context node; [`ContextHandle`] always points at one
/// of these, so a single parent link type serves both `Structure` and `Array`
/// parents.
#[derive(Debug)]
pub enum ContextNode {
    Struct(StructContext),
    Array(ArrayContext),
}

/// Shared, interior-mutable handle to a context node.
///
/// `Rc` gives shared ownership (a completed child context is attached by
/// value into its parent's value map, but a predicate evaluated *during* the
/// parse also needs a live reference to the same, still-being-populated
/// node); `RefCell` allows `Structure::parse` to keep inserting fields while
/// predicates elsewhere hold a read-only borrow for the duration of one call.
pub type ContextHandle = Rc<RefCell<ContextNode>>;

#[derive(Debug)]
pub struct StructContext {
    name: Option<String>,
    parent: Option<Weak<RefCell<ContextNode>>>,
    order: Vec<Intern<String>>,
    values: FxHashMap<Intern<String>, Value>,
}

impl StructContext {
    pub fn new(name: Option<String>, parent: Option<&ContextHandle>) -> Self {
        Self {
            name,
            parent: parent.map(Rc::downgrade),
            order: Vec::new(),
            values: FxHashMap::default(),
        }
    }

    pub fn new_handle(name: Option<String>, parent: Option<&ContextHandle>) -> ContextHandle {
        Rc::new(RefCell::new(ContextNode::Struct(Self::new(name, parent))))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<ContextHandle> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Inserts `name -> value`, appending `name` to the order list only the
    /// first time it is seen (so re-inserting, e.g. from `Calculate`
    /// memoizing over an existing anchor, doesn't duplicate the key).
    pub fn insert(&mut self, name: Intern<String>, value: Value) {
        if !self.values.contains_key(&name) {
            self.order.push(name);
        }
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&Intern::new(name.to_owned()))
    }

    /// All keys in declaration/embedded order, anchors included.
    pub fn keys(&self) -> &[Intern<String>] {
        &self.order
    }

    /// Keys in declaration order, `__`-prefixed anchors hidden
    /// (spec.md §3.2, §5 "iteration in insertion order (hiding internal
    /// anchors)").
    pub fn visible_keys(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(|k| k.as_str())
            .filter(|k| !is_anchor_name(k))
    }

    pub fn append_order(&mut self, names: impl IntoIterator<Item = Intern<String>>) {
        for n in names {
            if !self.order.contains(&n) {
                self.order.push(n);
            }
        }
    }
}

#[derive(Debug)]
pub struct ArrayContext {
    name: Option<String>,
    parent: Option<Weak<RefCell<ContextNode>>>,
    values: Vec<Value>,
}

impl ArrayContext {
    pub fn new(name: Option<String>, parent: Option<&ContextHandle>) -> Self {
        Self {
            name,
            parent: parent.map(Rc::downgrade),
            values: Vec::new(),
        }
    }

    pub fn new_handle(name: Option<String>, parent: Option<&ContextHandle>) -> ContextHandle {
        Rc::new(RefCell::new(ContextNode::Array(Self::new(name, parent))))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<ContextHandle> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn last(&self) -> Option<&Value> {
        self.values.last()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Value> {
        self.values.iter()
    }

    /// Mirrors the source's (buggy, per spec.md §9) `get_reversed_items`:
    /// reverse iteration yields the same elements as forward iteration, in
    /// reverse order.
    pub fn reversed(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().rev()
    }
}

/// Convenience accessors shared by predicates, regardless of whether the
/// context handle in scope wraps a `Structure` or an `Array`
/// (spec.md §9 "User predicates take the context as an argument and
/// navigate it explicitly").
pub trait ContextExt {
    fn field(&self, name: &str) -> Option<Value>;
    fn parent_ctx(&self) -> Option<ContextHandle>;
    fn len_ctx(&self) -> usize;
    fn last_ctx(&self) -> Option<Value>;
}

impl ContextExt for ContextHandle {
    fn field(&self, name: &str) -> Option<Value> {
        match &*self.borrow() {
            ContextNode::Struct(s) => s.get(name).cloned(),
            ContextNode::Array(_) => None,
        }
    }

    fn parent_ctx(&self) -> Option<ContextHandle> {
        match &*self.borrow() {
            ContextNode::Struct(s) => s.parent(),
            ContextNode::Array(a) => a.parent(),
        }
    }

    fn len_ctx(&self) -> usize {
        match &*self.borrow() {
            ContextNode::Struct(s) => s.visible_keys().count(),
            ContextNode::Array(a) => a.len(),
        }
    }

    fn last_ctx(&self) -> Option<Value> {
        match &*self.borrow() {
            ContextNode::Struct(_) => None,
            ContextNode::Array(a) => a.last().cloned(),
        }
    }
}

impl fmt::Display for StructContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, k) in self.visible_keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved_and_anchors_hidden() {
        let root = StructContext::new_handle(None, None);
        {
            let mut borrow = root.borrow_mut();
            if let ContextNode::Struct(s) = &mut *borrow {
                s.insert(Intern::new("B".to_owned()), Scalar::UInt(2).into());
                s.insert(Intern::new("A".to_owned()), Scalar::UInt(1).into());
                s.insert(Intern::new("__hidden".to_owned()), Scalar::UInt(0).into());
            }
        }
        let borrow = root.borrow();
        let ContextNode::Struct(s) = &*borrow else {
            unreachable!()
        };
        assert_eq!(s.visible_keys().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(s.keys().len(), 3);
        assert_eq!(s.get("__hidden").unwrap().as_scalar().unwrap().as_u64(), Some(0));
    }

    #[test]
    fn parent_is_weak_and_navigable() {
        let parent = StructContext::new_handle(Some("Outer".to_owned()), None);
        let child = StructContext::new_handle(Some("Inner".to_owned()), Some(&parent));
        assert_eq!(child.parent_ctx().is_some(), true);
        drop(parent);
        // parent handle still alive via the local `parent` until dropped above;
        // after drop the weak ref can no longer upgrade.
        assert!(child.parent_ctx().is_none());
    }

    #[test]
    fn array_reversed_mirrors_forward_in_reverse() {
        let arr = ArrayContext::new_handle(None, None);
        {
            let mut b = arr.borrow_mut();
            if let ContextNode::Array(a) = &mut *b {
                a.push(Scalar::UInt(1).into());
                a.push(Scalar::UInt(2).into());
                a.push(Scalar::UInt(3).into());
            }
        }
        let b = arr.borrow();
        let ContextNode::Array(a) = &*b else {
            unreachable!()
        };
        let fwd: Vec<_> = a.iter().map(|v| v.as_scalar().unwrap().as_u64()).collect();
        let rev: Vec<_> = a.reversed().map(|v| v.as_scalar().unwrap().as_u64()).collect();
        assert_eq!(fwd, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(rev, vec![Some(3), Some(2), Some(1)]);
    }
}
