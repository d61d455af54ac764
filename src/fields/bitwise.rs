//! Sub-byte field packing (spec.md §4.8 "BitwiseStructure").
//!
//! The declared byte run is read into one unsigned integer with the raw
//! bytes taken least-significant-byte-first (the first byte read becomes
//! the integer's low byte), and fields are extracted with the offset
//! accumulating from the low bit: the first declared field occupies the
//! *lowest* bits, the last declared field the highest (spec.md §4.8 "for
//! each field, extracts `(integer & mask) >> offset` where offset
//! accumulates from the low bit"). This is the byte/bit order that
//! reproduces spec.md §8's worked example byte-for-byte; `reversed` lets a
//! caller hand the field list in the opposite (high-to-low) order when
//! that reads more naturally for a given layout, per §4.8's "the bit list
//! may be specified in reversed order for convenience".

use crate::context::{ContextHandle, ContextNode, Scalar, StructContext, Value};
use crate::error::{FieldError, ParseError, SizeofError};
use crate::field::Field;
use crate::stream::Stream;
use internment::Intern;

#[derive(Clone, Debug)]
pub struct BitField {
    pub name: Option<String>,
    pub bits: u8,
}

impl BitField {
    pub fn new(name: impl Into<String>, bits: u8) -> Self {
        Self {
            name: Some(name.into()),
            bits,
        }
    }

    /// An unnamed run of padding bits within the word (spec.md §4.8 `(None, 2)`).
    pub fn padding(bits: u8) -> Self {
        Self { name: None, bits }
    }
}

#[derive(Clone)]
pub struct BitwiseStructure {
    name: Option<String>,
    fields: Vec<BitField>,
}

impl BitwiseStructure {
    /// Builds a `BitwiseStructure`, checking that the declared fields add up
    /// to exactly 8, 16, 32, or 64 bits (spec.md §4.8: "Total bit width must
    /// be 8, 16, 32, or 64 (else `InvalidFieldParameter`)").
    pub fn new(name: impl Into<String>, fields: Vec<BitField>) -> Result<Self, FieldError> {
        Self::with_order(name, fields, false)
    }

    /// As [`BitwiseStructure::new`], but `fields` is given high-bit-first
    /// (i.e. reversed relative to the low-bit-first order `parse` assigns
    /// offsets in) and is reversed once at construction time.
    pub fn with_order(
        name: impl Into<String>,
        mut fields: Vec<BitField>,
        reversed: bool,
    ) -> Result<Self, FieldError> {
        if reversed {
            fields.reverse();
        }
        let total: u32 = fields.iter().map(|f| f.bits as u32).sum();
        if !matches!(total, 8 | 16 | 32 | 64) {
            return Err(FieldError::InvalidFieldParameter(format!(
                "BitwiseStructure total width must be 8, 16, 32, or 64 bits, got {total}"
            )));
        }
        Ok(Self {
            name: Some(name.into()),
            fields,
        })
    }

    fn total_bits(&self) -> u32 {
        self.fields.iter().map(|f| f.bits as u32).sum()
    }
}

impl Field for BitwiseStructure {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let total_bits = self.total_bits();
        let total_bytes = (total_bits / 8) as usize;
        let mut buf = vec![0u8; total_bytes];
        stream.read_exact(&mut buf)?;
        // First byte read becomes the low byte of the packed word.
        let mut packed: u64 = 0;
        for &b in buf.iter().rev() {
            packed = (packed << 8) | b as u64;
        }

        let handle = StructContext::new_handle(self.name.clone(), ctx);
        let mut offset = 0u32;
        for f in &self.fields {
            let bits = f.bits as u32;
            let mask: u64 = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
            let value = (packed >> offset) & mask;
            offset += bits;
            if let Some(name) = &f.name {
                let mut b = handle.borrow_mut();
                if let ContextNode::Struct(s) = &mut *b {
                    s.insert(Intern::new(name.clone()), Scalar::UInt(value).into());
                }
            }
        }
        Ok(Value::Struct(handle))
    }

    fn sizeof(&self, _ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        Ok((self.total_bits() / 8) as u64)
    }

    fn is_nested(&self) -> bool {
        true
    }
}
