//! Streamable contract
//!
//! Types that know how to write themselves into a `BufferStream` and read
//! themselves back.

use crate::error::Result;

use super::BufferStream;

/// A value with a binary representation
///
/// `write` must not modify the source value. `read` builds a fresh value;
/// `read_into` rebuilds an existing instance so its allocations can be reused.
pub trait Streamable: Sized {
    /// Encode `self` at the end of the buffer
    fn write(&self, buffer: &mut BufferStream) -> Result<()>;

    /// Decode a new value from the front of the buffer
    fn read(buffer: &mut BufferStream) -> Result<Self>;

    /// Decode into an existing instance
    fn read_into(&mut self, buffer: &mut BufferStream) -> Result<()> {
        *self = Self::read(buffer)?;
        Ok(())
    }
}

macro_rules! streamable_primitive {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl Streamable for $ty {
                fn write(&self, buffer: &mut BufferStream) -> Result<()> {
                    buffer.$put(*self);
                    Ok(())
                }

                fn read(buffer: &mut BufferStream) -> Result<Self> {
                    buffer.$get()
                }
            }
        )*
    };
}

streamable_primitive! {
    u8 => put_u8, get_u8;
    i8 => put_i8, get_i8;
    bool => put_bool, get_bool;
    u16 => put_u16, get_u16;
    i16 => put_i16, get_i16;
    u32 => put_u32, get_u32;
    i32 => put_i32, get_i32;
    u64 => put_u64, get_u64;
    i64 => put_i64, get_i64;
    f32 => put_f32, get_f32;
    f64 => put_f64, get_f64;
}

impl Streamable for String {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        buffer.put_str(self)
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        buffer.get_str()
    }

    fn read_into(&mut self, buffer: &mut BufferStream) -> Result<()> {
        let decoded = buffer.get_str()?;
        self.clear();
        self.push_str(&decoded);
        Ok(())
    }
}

impl<T: Streamable> Streamable for Vec<T> {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        let count = u32::try_from(self.len()).map_err(|_| {
            crate::error::TowerError::Serialization(format!(
                "collection of {} items is too long",
                self.len()
            ))
        })?;
        buffer.put_u32(count);
        for item in self {
            item.write(buffer)?;
        }
        Ok(())
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        let mut items = Vec::new();
        items.read_into(buffer)?;
        Ok(items)
    }

    fn read_into(&mut self, buffer: &mut BufferStream) -> Result<()> {
        let count = buffer.get_u32()? as usize;
        self.clear();
        // Every item takes at least one byte, so cap the reservation by what is left
        self.reserve(count.min(buffer.remaining()));
        for _ in 0..count {
            self.push(T::read(buffer)?);
        }
        Ok(())
    }
}

impl<T: Streamable> Streamable for Option<T> {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        match self {
            Some(item) => {
                buffer.put_bool(true);
                item.write(buffer)
            }
            None => {
                buffer.put_bool(false);
                Ok(())
            }
        }
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        if buffer.get_bool()? {
            Ok(Some(T::read(buffer)?))
        } else {
            Ok(None)
        }
    }
}
