//! Ordered sequence of named fields producing a struct-shaped context
//! (spec.md §4.4 "Structure").

use crate::context::{ContextHandle, ContextNode, StructContext, Value};
use crate::error::{FieldError, ParseError, SizeofError};
use crate::field::{Field, FieldBox};
use crate::stream::Stream;
use fxhash::FxHashSet;
use internment::Intern;

#[derive(Clone)]
pub struct Structure {
    name: Option<String>,
    fields: Vec<FieldBox>,
}

/// Rejects duplicate non-`None` child names (spec.md §3.2, §4.4; testable
/// property "Name discipline" in §8).
fn check_unique_names(fields: &[FieldBox]) -> Result<(), FieldError> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for field in fields {
        if let Some(name) = field.name() {
            if !seen.insert(name) {
                return Err(FieldError::InvalidFieldName(format!(
                    "duplicate field name '{name}' in Structure"
                )));
            }
        }
    }
    Ok(())
}

impl Structure {
    pub fn named(name: impl Into<String>, fields: Vec<FieldBox>) -> Result<Self, FieldError> {
        check_unique_names(&fields)?;
        Ok(Self {
            name: Some(name.into()),
            fields,
        })
    }

    pub fn anonymous(fields: Vec<FieldBox>) -> Result<Self, FieldError> {
        check_unique_names(&fields)?;
        Ok(Self { name: None, fields })
    }
}

fn merge_embedded(parent: &ContextHandle, child: &ContextHandle) -> Result<(), ParseError> {
    let entries: Vec<_> = {
        let child_borrow = child.borrow();
        let ContextNode::Struct(child_struct) = &*child_borrow else {
            return Err(ParseError::Validation(
                "embedded field must parse to a structure".to_owned(),
            ));
        };
        child_struct
            .keys()
            .iter()
            .map(|k| (*k, child_struct.get(k.as_str()).unwrap().clone()))
            .collect()
    };
    let mut parent_borrow = parent.borrow_mut();
    let ContextNode::Struct(parent_struct) = &mut *parent_borrow else {
        unreachable!("Structure::parse always builds a Struct node")
    };
    for (key, value) in entries {
        parent_struct.insert(key, value);
    }
    Ok(())
}

impl Field for Structure {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        tracing::trace!(name = self.name.as_deref().unwrap_or("<anonymous>"), fields = self.fields.len(), "parsing structure");
        let handle = StructContext::new_handle(self.name.clone(), ctx);
        for field in &self.fields {
            let value = field.parse(stream, Some(&handle))?;
            if field.is_embedded() {
                match &value {
                    Value::Struct(child) => merge_embedded(&handle, child)?,
                    _ => {
                        return Err(ParseError::Validation(
                            "embedded field must parse to a structure".to_owned(),
                        ))
                    }
                }
            } else if let Some(name) = field.name() {
                let key = Intern::new(name.to_owned());
                let mut b = handle.borrow_mut();
                if let ContextNode::Struct(s) = &mut *b {
                    s.insert(key, value);
                }
            }
            // Unnamed, non-embedded fields (Padding, anonymous NullField) are
            // parsed purely for their side effect on the stream.
        }
        Ok(Value::Struct(handle))
    }

    fn sizeof(&self, ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        let mut total = 0u64;
        for field in &self.fields {
            total += field.sizeof(ctx)?;
        }
        Ok(total)
    }

    fn is_nested(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextExt;
    use crate::fields::integer::{Endian, Integer};
    use crate::fields::wrapper::Embed;
    use crate::stream::SliceStream;
    use std::rc::Rc;

    #[test]
    fn parses_fields_in_order_with_dotted_access() {
        let inner = Structure::named(
            "Inner",
            vec![Rc::new(Integer::u8("X")) as FieldBox],
        )
        .unwrap();
        let outer = Structure::anonymous(vec![
            Rc::new(Integer::u8("A")) as FieldBox,
            Rc::new(inner) as FieldBox,
        ])
        .unwrap();
        let mut s = SliceStream::new(vec![1u8, 2]);
        let v = outer.parse(&mut s, None).unwrap();
        let root = v.as_struct().unwrap();
        assert_eq!(root.field("A").unwrap().as_scalar().unwrap().as_u64(), Some(1));
        let inner_ctx = root.field("Inner").unwrap().as_struct().unwrap().clone();
        assert_eq!(
            inner_ctx.field("X").unwrap().as_scalar().unwrap().as_u64(),
            Some(2)
        );
    }

    #[test]
    fn embed_splices_child_fields_into_parent_scope() {
        let embedded = Structure::anonymous(vec![Rc::new(Integer::u8("B")) as FieldBox]).unwrap();
        let outer = Structure::anonymous(vec![
            Rc::new(Integer::u8("A")) as FieldBox,
            Rc::new(Embed::new(Rc::new(embedded))) as FieldBox,
        ])
        .unwrap();
        let mut s = SliceStream::new(vec![10u8, 20]);
        let v = outer.parse(&mut s, None).unwrap();
        let root = v.as_struct().unwrap();
        assert_eq!(root.field("A").unwrap().as_scalar().unwrap().as_u64(), Some(10));
        assert_eq!(root.field("B").unwrap().as_scalar().unwrap().as_u64(), Some(20));
    }

    #[test]
    fn sizeof_sums_static_field_widths() {
        let s = Structure::anonymous(vec![
            Rc::new(Integer::u8("A")) as FieldBox,
            Rc::new(Integer::u16("B", Endian::Big)) as FieldBox,
        ])
        .unwrap();
        assert_eq!(s.sizeof(None).unwrap(), 3);
    }

    #[test]
    fn rejects_duplicate_non_none_names() {
        let err = Structure::anonymous(vec![
            Rc::new(Integer::u8("A")) as FieldBox,
            Rc::new(Integer::u8("A")) as FieldBox,
        ])
        .unwrap_err();
        assert!(matches!(err, FieldError::InvalidFieldName(_)));
    }
}
