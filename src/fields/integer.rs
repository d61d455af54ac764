//! Fixed-width integer primitives (spec.md §4.2).

use crate::context::{ContextHandle, Scalar, Value};
use crate::error::{ParseError, SizeofError};
use crate::field::Field;
use crate::stream::Stream;
use byteordered::ByteOrdered;
use std::io;

/// Byte order for a multi-byte integer. `Native` resolves to the build
/// target's order at construction time, not at parse time, so a frozen field
/// tree behaves the same on every run (spec.md §3.3, reuse across parses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
    Native,
}

impl Endian {
    fn resolved(self) -> byteordered::Endianness {
        match self {
            Endian::Big => byteordered::Endianness::Big,
            Endian::Little => byteordered::Endianness::Little,
            Endian::Native => {
                if cfg!(target_endian = "big") {
                    byteordered::Endianness::Big
                } else {
                    byteordered::Endianness::Little
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bits {
    B8,
    B16,
    B32,
    B64,
}

impl Bits {
    fn byte_len(self) -> u64 {
        match self {
            Bits::B8 => 1,
            Bits::B16 => 2,
            Bits::B32 => 4,
            Bits::B64 => 8,
        }
    }
}

/// A `UInt*`/`Int*` primitive field (spec.md §4.2 "Integer fields"):
/// consumes exactly `bits` worth of bytes, interpreted with `endian` and
/// `signed`. Single-byte fields ignore `endian`.
#[derive(Debug, Clone)]
pub struct Integer {
    name: Option<String>,
    bits: Bits,
    signed: bool,
    endian: Endian,
}

impl Integer {
    pub fn new(name: impl Into<String>, bits: Bits, signed: bool, endian: Endian) -> Self {
        Self {
            name: Some(name.into()),
            bits,
            signed,
            endian,
        }
    }

    /// An anonymous instance: parsed and discarded rather than retained
    /// under a name (spec.md §3.2: a field's name is optional and `None`
    /// means "parse and discard value").
    pub fn discard(bits: Bits, signed: bool, endian: Endian) -> Self {
        Self {
            name: None,
            bits,
            signed,
            endian,
        }
    }

    pub fn u8(name: impl Into<String>) -> Self {
        Self::new(name, Bits::B8, false, Endian::Native)
    }

    pub fn i8(name: impl Into<String>) -> Self {
        Self::new(name, Bits::B8, true, Endian::Native)
    }

    pub fn u16(name: impl Into<String>, endian: Endian) -> Self {
        Self::new(name, Bits::B16, false, endian)
    }

    pub fn i16(name: impl Into<String>, endian: Endian) -> Self {
        Self::new(name, Bits::B16, true, endian)
    }

    pub fn u32(name: impl Into<String>, endian: Endian) -> Self {
        Self::new(name, Bits::B32, false, endian)
    }

    pub fn i32(name: impl Into<String>, endian: Endian) -> Self {
        Self::new(name, Bits::B32, true, endian)
    }

    pub fn u64(name: impl Into<String>, endian: Endian) -> Self {
        Self::new(name, Bits::B64, false, endian)
    }

    pub fn i64(name: impl Into<String>, endian: Endian) -> Self {
        Self::new(name, Bits::B64, true, endian)
    }
}

impl Field for Integer {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn parse(&self, stream: &mut dyn Stream, _ctx: Option<&ContextHandle>) -> Result<Value, ParseError> {
        let len = self.bits.byte_len() as usize;
        let mut buf = [0u8; 8];
        stream.read_exact(&mut buf[..len])?;
        let mut reader = ByteOrdered::new(io::Cursor::new(&buf[..len]), self.endian.resolved());
        let scalar = match (self.bits, self.signed) {
            (Bits::B8, false) => Scalar::UInt(reader.read_u8()? as u64),
            (Bits::B8, true) => Scalar::Int(reader.read_i8()? as i64),
            (Bits::B16, false) => Scalar::UInt(reader.read_u16()? as u64),
            (Bits::B16, true) => Scalar::Int(reader.read_i16()? as i64),
            (Bits::B32, false) => Scalar::UInt(reader.read_u32()? as u64),
            (Bits::B32, true) => Scalar::Int(reader.read_i32()? as i64),
            (Bits::B64, false) => Scalar::UInt(reader.read_u64()?),
            (Bits::B64, true) => Scalar::Int(reader.read_i64()?),
        };
        Ok(Value::Scalar(scalar))
    }

    fn sizeof(&self, _ctx: Option<&ContextHandle>) -> Result<u64, SizeofError> {
        Ok(self.bits.byte_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SliceStream;

    #[test]
    fn reads_big_and_little_endian_u16() {
        let be = Integer::u16("V", Endian::Big);
        let le = Integer::u16("V", Endian::Little);
        let mut s = SliceStream::new(vec![0x01, 0x02]);
        let v = be.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_u64(), Some(0x0102));
        let mut s = SliceStream::new(vec![0x01, 0x02]);
        let v = le.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_u64(), Some(0x0201));
    }

    #[test]
    fn signed_i8_round_trips_negative() {
        let f = Integer::i8("V");
        let mut s = SliceStream::new(vec![0xFFu8]);
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_i64(), Some(-1));
    }

    #[test]
    fn discard_has_no_name_but_still_consumes_its_width() {
        let f = Integer::discard(Bits::B16, false, Endian::Big);
        assert!(f.name().is_none());
        let mut s = SliceStream::new(vec![0x01, 0x02]);
        let v = f.parse(&mut s, None).unwrap();
        assert_eq!(v.as_scalar().unwrap().as_u64(), Some(0x0102));
        assert_eq!(s.tell().unwrap(), 2);
    }

    #[test]
    fn sizeof_matches_width_without_reading() {
        let f = Integer::u64("V", Endian::Big);
        assert_eq!(f.sizeof(None).unwrap(), 8);
    }
}
