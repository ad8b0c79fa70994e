//! Buffer Stream
//!
//! A growable byte buffer that is written at the back and read from the front.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TowerError};
use crate::types::Value;

use super::{BufferPool, Streamable};

/// Binary encode/decode buffer
///
/// Writes append to the end, reads consume from the front. A stream obtained from
/// a [`BufferPool`] hands its allocation back to the pool when dropped.
pub struct BufferStream {
    buf: BytesMut,
    pool: Option<&'static BufferPool>,
}

impl BufferStream {
    /// Create an empty, unpooled stream
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            pool: None,
        }
    }

    /// Create an unpooled stream with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            pool: None,
        }
    }

    /// Take a stream from the global pool
    pub fn pooled() -> Self {
        BufferPool::global().acquire()
    }

    /// Create a pooled stream holding a copy of `bytes`, ready to be read
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut stream = Self::pooled();
        stream.buf.extend_from_slice(bytes);
        stream
    }

    pub(super) fn from_parts(buf: BytesMut, pool: &'static BufferPool) -> Self {
        Self {
            buf,
            pool: Some(pool),
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Bytes still readable (equals bytes written when nothing was read yet)
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Check whether no readable bytes are left
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the readable bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Copy the readable bytes out
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Convert into immutable bytes; the allocation is not returned to the pool
    pub fn freeze(mut self) -> Bytes {
        std::mem::take(&mut self.buf).freeze()
    }

    /// Drop all content, keeping the allocation
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.len() < needed {
            return Err(TowerError::BufferUnderflow {
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Writing
    // =========================================================================

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16(v);
    }

    pub fn put_i16(&mut self, v: i16) {
        self.buf.put_i16(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64(v);
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32(v);
    }

    pub fn put_f64(&mut self, v: f64) {
        self.buf.put_f64(v);
    }

    /// Append raw bytes with no length prefix
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Append a length-prefixed byte string
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            TowerError::Serialization(format!("byte string of {} bytes is too long", bytes.len()))
        })?;
        self.buf.put_u32(len);
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Append a length-prefixed UTF-8 string
    pub fn put_str(&mut self, s: &str) -> Result<()> {
        self.put_bytes(s.as_bytes())
    }

    /// Append a tagged value
    pub fn put_value(&mut self, value: &Value) -> Result<()> {
        value.write(self)
    }

    /// Append any streamable object
    pub fn put_object<T: Streamable>(&mut self, object: &T) -> Result<()> {
        object.write(self)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    pub fn get_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(TowerError::Serialization(format!(
                "invalid boolean byte 0x{:02x}",
                other
            ))),
        }
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.buf.get_f32())
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    /// Take exactly `len` raw bytes
    pub fn get_raw(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        Ok(self.buf.split_to(len).freeze())
    }

    /// Skip `len` bytes without decoding them
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.buf.advance(len);
        Ok(())
    }

    /// Read a length-prefixed byte string
    pub fn get_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.get_u32()? as usize;
        Ok(self.get_raw(len)?.to_vec())
    }

    /// Read a length-prefixed UTF-8 string
    pub fn get_str(&mut self) -> Result<String> {
        let len = self.get_u32()? as usize;
        let raw = self.get_raw(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| TowerError::Serialization(format!("invalid UTF-8 string: {}", e)))
    }

    /// Read a tagged value
    pub fn get_value(&mut self) -> Result<Value> {
        Value::read(self)
    }

    /// Read any streamable object
    pub fn get_object<T: Streamable>(&mut self) -> Result<T> {
        T::read(self)
    }
}

impl Default for BufferStream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BufferStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferStream")
            .field("remaining", &self.buf.len())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl Drop for BufferStream {
    fn drop(&mut self) {
        if let Some(pool) = self.pool {
            pool.release(std::mem::take(&mut self.buf));
        }
    }
}
