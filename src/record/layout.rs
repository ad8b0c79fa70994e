//! Record encoding and single-attribute reads

use crate::buffer::{BufferStream, Streamable};
use crate::error::{Result, TowerError};
use crate::store::Store;
use crate::types::{decode_char, TypeTag, Value};

use super::{Field, RecordSchema};

/// Field count (2) + heap length (4)
pub const RECORD_HEADER_SIZE: usize = 6;

/// Tag (1) + payload (8)
pub const SLOT_SIZE: usize = 9;

enum Slot {
    Inline(Value),
    Heap { tag: TypeTag, offset: u64, len: usize },
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode `values` (one per schema field, in order) as a record body
pub fn encode_record(schema: &RecordSchema, values: &[Value], buffer: &mut BufferStream) -> Result<()> {
    if values.len() != schema.len() {
        return Err(TowerError::Serialization(format!(
            "record {} has {} fields, got {} values",
            schema.name(),
            schema.len(),
            values.len()
        )));
    }
    let count = u16::try_from(values.len()).map_err(|_| {
        TowerError::Serialization(format!("record {} has too many fields", schema.name()))
    })?;

    let mut slots = BufferStream::with_capacity(values.len() * SLOT_SIZE);
    let mut heap = BufferStream::pooled();
    for (field, value) in schema.fields().iter().zip(values) {
        encode_slot(field, value, &mut slots, &mut heap)?;
    }

    buffer.put_u16(count);
    buffer.put_u32(to_u32(heap.remaining())?);
    buffer.put_raw(slots.as_slice());
    buffer.put_raw(heap.as_slice());
    Ok(())
}

fn encode_slot(field: &Field, value: &Value, slots: &mut BufferStream, heap: &mut BufferStream) -> Result<()> {
    let tag = value.tag();
    if !field.kind.accepts(tag) {
        return Err(field.mismatch(tag));
    }

    slots.put_u8(tag as u8);
    match value {
        Value::Null => slots.put_u64(0),
        Value::Bool(v) => slots.put_u64(*v as u64),
        Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) | Value::Date(_) => {
            slots.put_i64(value.as_i64().unwrap_or_default())
        }
        Value::Float(v) => slots.put_f64(*v as f64),
        Value::Double(v) => slots.put_f64(*v),
        Value::Char(v) => slots.put_u64(*v as u64),
        Value::Text(v) => put_heap_ref(slots, heap, |heap| {
            heap.put_raw(v.as_bytes());
            Ok(())
        })?,
        Value::Bytes(v) => put_heap_ref(slots, heap, |heap| {
            heap.put_raw(v);
            Ok(())
        })?,
        Value::Reference(_) | Value::List(_) | Value::Map(_) => {
            put_heap_ref(slots, heap, |heap| value.write(heap))?
        }
    }
    Ok(())
}

fn put_heap_ref<F>(slots: &mut BufferStream, heap: &mut BufferStream, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufferStream) -> Result<()>,
{
    let offset = heap.remaining();
    fill(heap)?;
    slots.put_u32(to_u32(offset)?);
    slots.put_u32(to_u32(heap.remaining() - offset)?);
    Ok(())
}

fn to_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| TowerError::Serialization(format!("record section of {} bytes is too large", n)))
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a whole record body into one value per schema field
///
/// Fields the stored record does not have (it was written with a shorter
/// schema) come back as `Null`; extra stored slots are ignored.
pub fn decode_record(schema: &RecordSchema, buffer: &mut BufferStream) -> Result<Vec<Value>> {
    let count = buffer.get_u16()? as usize;
    let heap_len = buffer.get_u32()? as usize;
    let slots = buffer.get_raw(count * SLOT_SIZE)?;
    let heap = buffer.get_raw(heap_len)?;

    let mut values = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        if field.index >= count {
            values.push(Value::Null);
            continue;
        }
        let start = field.index * SLOT_SIZE;
        let value = match parse_slot(&slots[start..start + SLOT_SIZE])? {
            Slot::Inline(value) => value,
            Slot::Heap { tag, offset, len } => {
                let start = offset as usize;
                let bytes = heap.get(start..start + len).ok_or_else(|| {
                    TowerError::Corruption(format!(
                        "attribute {} points outside the record heap",
                        field.name
                    ))
                })?;
                resolve_heap(tag, bytes)?
            }
        };
        check_type(field, &value)?;
        values.push(value);
    }
    Ok(values)
}

/// Read one attribute of the record whose body starts at `body`
///
/// Touches only the record header, the field's slot and, for variable length
/// values, the referenced heap bytes. Returns `None` when any of those lie
/// outside the store.
pub fn read_attribute<S>(store: &S, body: u64, field: &Field) -> Result<Option<Value>>
where
    S: Store + ?Sized,
{
    let Some(header) = store.read(body, RECORD_HEADER_SIZE)? else {
        return Ok(None);
    };
    let count = u16::from_be_bytes([header[0], header[1]]) as usize;
    if field.index >= count {
        return Ok(Some(Value::Null));
    }

    let Some(slot_position) = body.checked_add(field.slot_offset as u64) else {
        return Ok(None);
    };
    let Some(slot) = store.read(slot_position, SLOT_SIZE)? else {
        return Ok(None);
    };
    let value = match parse_slot(&slot)? {
        Slot::Inline(value) => value,
        Slot::Heap { tag, offset, len } => {
            let heap_position = body
                .checked_add((RECORD_HEADER_SIZE + count * SLOT_SIZE) as u64)
                .and_then(|heap_start| heap_start.checked_add(offset));
            let Some(heap_position) = heap_position else {
                return Ok(None);
            };
            let Some(bytes) = store.read(heap_position, len)? else {
                return Ok(None);
            };
            resolve_heap(tag, &bytes)?
        }
    };
    check_type(field, &value)?;
    Ok(Some(value))
}

fn check_type(field: &Field, value: &Value) -> Result<()> {
    let tag = value.tag();
    if field.kind.accepts(tag) {
        Ok(())
    } else {
        Err(field.mismatch(tag))
    }
}

fn parse_slot(raw: &[u8]) -> Result<Slot> {
    if raw.len() < SLOT_SIZE {
        return Err(TowerError::Corruption(format!("short attribute slot ({} bytes)", raw.len())));
    }
    let tag = TypeTag::from_u8(raw[0])?;
    let mut payload = [0u8; 8];
    payload.copy_from_slice(&raw[1..SLOT_SIZE]);
    let bits = u64::from_be_bytes(payload);

    let value = match tag {
        TypeTag::Null => Value::Null,
        TypeTag::Bool => Value::Bool(bits != 0),
        TypeTag::Byte => Value::Byte(narrow(bits as i64)?),
        TypeTag::Short => Value::Short(narrow(bits as i64)?),
        TypeTag::Int => Value::Int(narrow(bits as i64)?),
        TypeTag::Long => Value::Long(bits as i64),
        TypeTag::Date => Value::Date(bits as i64),
        TypeTag::Float => Value::Float(f64::from_bits(bits) as f32),
        TypeTag::Double => Value::Double(f64::from_bits(bits)),
        TypeTag::Char => Value::Char(decode_char(narrow(bits)?)?),
        TypeTag::Text | TypeTag::Bytes | TypeTag::Reference | TypeTag::List | TypeTag::Map => {
            return Ok(Slot::Heap {
                tag,
                offset: bits >> 32,
                len: (bits & 0xFFFF_FFFF) as usize,
            });
        }
    };
    Ok(Slot::Inline(value))
}

fn narrow<T, U: TryFrom<T>>(wide: T) -> Result<U> {
    U::try_from(wide).map_err(|_| TowerError::Corruption("attribute slot value out of range".to_string()))
}

fn resolve_heap(tag: TypeTag, bytes: &[u8]) -> Result<Value> {
    match tag {
        TypeTag::Text => String::from_utf8(bytes.to_vec())
            .map(Value::Text)
            .map_err(|e| TowerError::Serialization(format!("invalid UTF-8 attribute: {}", e))),
        TypeTag::Bytes => Ok(Value::Bytes(bytes.to_vec())),
        _ => {
            let value = Value::from_bytes(bytes)?;
            if value.tag() != tag {
                return Err(TowerError::Corruption(format!(
                    "slot tagged {} holds a {} value",
                    tag.name(),
                    value.tag().name()
                )));
            }
            Ok(value)
        }
    }
}
