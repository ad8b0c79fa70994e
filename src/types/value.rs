//! Tagged values
//!
//! `Value` is what keys are made of, and what generic ("any") payloads and
//! record attributes decode into.

use std::collections::BTreeMap;
use std::fmt;

use crate::buffer::{BufferStream, Streamable};
use crate::error::{Result, TowerError};

use super::Reference;

/// Type discriminator written ahead of every encoded `Value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Null = 0x00,
    Bool = 0x01,
    Byte = 0x02,
    Short = 0x03,
    Int = 0x04,
    Long = 0x05,
    Float = 0x06,
    Double = 0x07,
    Char = 0x08,
    Text = 0x09,
    Bytes = 0x0A,
    Date = 0x0B,
    Reference = 0x0C,
    List = 0x0D,
    Map = 0x0E,
}

impl TypeTag {
    /// Decode a tag byte
    pub fn from_u8(byte: u8) -> Result<Self> {
        let tag = match byte {
            0x00 => TypeTag::Null,
            0x01 => TypeTag::Bool,
            0x02 => TypeTag::Byte,
            0x03 => TypeTag::Short,
            0x04 => TypeTag::Int,
            0x05 => TypeTag::Long,
            0x06 => TypeTag::Float,
            0x07 => TypeTag::Double,
            0x08 => TypeTag::Char,
            0x09 => TypeTag::Text,
            0x0A => TypeTag::Bytes,
            0x0B => TypeTag::Date,
            0x0C => TypeTag::Reference,
            0x0D => TypeTag::List,
            0x0E => TypeTag::Map,
            other => return Err(TowerError::UnknownTypeTag(other)),
        };
        Ok(tag)
    }

    /// Human readable name, used in mismatch errors
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Byte => "byte",
            TypeTag::Short => "short",
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Char => "char",
            TypeTag::Text => "text",
            TypeTag::Bytes => "bytes",
            TypeTag::Date => "date",
            TypeTag::Reference => "reference",
            TypeTag::List => "list",
            TypeTag::Map => "map",
        }
    }
}

/// A dynamically typed value
///
/// Equality (`==`) is structural: `Int(5) != Long(5)`. Key ordering and key
/// equality go through [`Value::force_compare`] instead, which widens across
/// the numeric family.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Text(String),
    Bytes(Vec<u8>),
    /// Milliseconds since the Unix epoch
    Date(i64),
    Reference(Reference),
    /// Ordered collection; doubles as a composite key
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Tag written ahead of this value's payload
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Byte(_) => TypeTag::Byte,
            Value::Short(_) => TypeTag::Short,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::Char(_) => TypeTag::Char,
            Value::Text(_) => TypeTag::Text,
            Value::Bytes(_) => TypeTag::Bytes,
            Value::Date(_) => TypeTag::Date,
            Value::Reference(_) => TypeTag::Reference,
            Value::List(_) => TypeTag::List,
            Value::Map(_) => TypeTag::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integral view of the value (integers and dates)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) | Value::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating point view of any numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            Value::Reference(v) => Some(*v),
            _ => None,
        }
    }

    /// Encode into a standalone byte vector
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut stream = BufferStream::pooled();
        self.write(&mut stream)?;
        Ok(stream.to_vec())
    }

    /// Decode from a standalone byte slice
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut stream = BufferStream::from_bytes(bytes);
        Self::read(&mut stream)
    }

    /// Decode the payload that follows an already consumed tag
    pub(crate) fn read_payload(tag: TypeTag, buffer: &mut BufferStream) -> Result<Self> {
        let value = match tag {
            TypeTag::Null => Value::Null,
            TypeTag::Bool => Value::Bool(buffer.get_bool()?),
            TypeTag::Byte => Value::Byte(buffer.get_i8()?),
            TypeTag::Short => Value::Short(buffer.get_i16()?),
            TypeTag::Int => Value::Int(buffer.get_i32()?),
            TypeTag::Long => Value::Long(buffer.get_i64()?),
            TypeTag::Float => Value::Float(buffer.get_f32()?),
            TypeTag::Double => Value::Double(buffer.get_f64()?),
            TypeTag::Char => Value::Char(decode_char(buffer.get_u32()?)?),
            TypeTag::Text => Value::Text(buffer.get_str()?),
            TypeTag::Bytes => Value::Bytes(buffer.get_bytes()?),
            TypeTag::Date => Value::Date(buffer.get_i64()?),
            TypeTag::Reference => Value::Reference(Reference::read(buffer)?),
            TypeTag::List => {
                let count = buffer.get_u32()? as usize;
                let mut items = Vec::with_capacity(count.min(buffer.remaining()));
                for _ in 0..count {
                    items.push(Value::read(buffer)?);
                }
                Value::List(items)
            }
            TypeTag::Map => {
                let count = buffer.get_u32()? as usize;
                let mut entries = BTreeMap::new();
                for _ in 0..count {
                    let name = buffer.get_str()?;
                    let value = Value::read(buffer)?;
                    entries.insert(name, value);
                }
                Value::Map(entries)
            }
        };
        Ok(value)
    }
}

pub(crate) fn decode_char(code: u32) -> Result<char> {
    char::from_u32(code)
        .ok_or_else(|| TowerError::Serialization(format!("invalid char code point {:#x}", code)))
}

fn collection_len(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| TowerError::Serialization(format!("collection of {} items is too long", len)))
}

impl Streamable for Value {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        buffer.put_u8(self.tag() as u8);
        match self {
            Value::Null => {}
            Value::Bool(v) => buffer.put_bool(*v),
            Value::Byte(v) => buffer.put_i8(*v),
            Value::Short(v) => buffer.put_i16(*v),
            Value::Int(v) => buffer.put_i32(*v),
            Value::Long(v) | Value::Date(v) => buffer.put_i64(*v),
            Value::Float(v) => buffer.put_f32(*v),
            Value::Double(v) => buffer.put_f64(*v),
            Value::Char(v) => buffer.put_u32(*v as u32),
            Value::Text(v) => buffer.put_str(v)?,
            Value::Bytes(v) => buffer.put_bytes(v)?,
            Value::Reference(v) => v.write(buffer)?,
            Value::List(items) => {
                buffer.put_u32(collection_len(items.len())?);
                for item in items {
                    item.write(buffer)?;
                }
            }
            Value::Map(entries) => {
                buffer.put_u32(collection_len(entries.len())?);
                for (name, value) in entries {
                    buffer.put_str(name)?;
                    value.write(buffer)?;
                }
            }
        }
        Ok(())
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        let tag = TypeTag::from_u8(buffer.get_u8()?)?;
        Value::read_payload(tag, buffer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Date(v) => write!(f, "date({})", v),
            Value::Reference(r) => write!(f, "ref({}:{})", r.partition, r.position),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (name, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! value_from {
    ($($ty:ty => $variant:ident;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool;
    i8 => Byte;
    i16 => Short;
    i32 => Int;
    i64 => Long;
    f32 => Float;
    f64 => Double;
    char => Char;
    String => Text;
    Vec<u8> => Bytes;
    Reference => Reference;
    Vec<Value> => List;
    BTreeMap<String, Value> => Map;
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
