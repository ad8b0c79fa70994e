//! Record schemas

use std::collections::HashMap;

use crate::error::{Result, TowerError};
use crate::types::TypeTag;

use super::layout::{RECORD_HEADER_SIZE, SLOT_SIZE};

/// Declared type of an entity attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Date,
    Text,
    Bytes,
    Reference,
    /// Any tagged value, including lists and maps
    Any,
}

impl FieldType {
    /// Tag a stored value of this type carries (`None` for `Any`)
    pub fn tag(self) -> Option<TypeTag> {
        let tag = match self {
            FieldType::Bool => TypeTag::Bool,
            FieldType::Byte => TypeTag::Byte,
            FieldType::Short => TypeTag::Short,
            FieldType::Int => TypeTag::Int,
            FieldType::Long => TypeTag::Long,
            FieldType::Float => TypeTag::Float,
            FieldType::Double => TypeTag::Double,
            FieldType::Char => TypeTag::Char,
            FieldType::Date => TypeTag::Date,
            FieldType::Text => TypeTag::Text,
            FieldType::Bytes => TypeTag::Bytes,
            FieldType::Reference => TypeTag::Reference,
            FieldType::Any => return None,
        };
        Some(tag)
    }

    /// Null is accepted by every field
    pub fn accepts(self, tag: TypeTag) -> bool {
        tag == TypeTag::Null || self.tag().map_or(true, |expected| expected == tag)
    }

    pub fn name(self) -> &'static str {
        self.tag().map_or("any", TypeTag::name)
    }
}

/// One attribute of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub index: usize,
    pub kind: FieldType,
    /// Offset of this field's slot from the start of the record body
    pub slot_offset: usize,
}

impl Field {
    pub(crate) fn mismatch(&self, found: TypeTag) -> TowerError {
        TowerError::AttributeTypeMismatch {
            field: self.name.clone(),
            expected: self.kind.name().to_string(),
            found: found.name().to_string(),
        }
    }
}

/// Field table of a record type
///
/// Built once per type (typically inside a `OnceLock`), after which a field
/// lookup by name is a single hash probe and its slot offset is precomputed.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: String,
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
}

impl RecordSchema {
    /// Build a schema; fields keep the given order. A repeated name resolves
    /// to its first occurrence.
    pub fn new<N, I>(name: impl Into<String>, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, FieldType)>,
    {
        let mut table = Vec::new();
        let mut by_name = HashMap::new();

        for (index, (field_name, kind)) in fields.into_iter().enumerate() {
            let field_name = field_name.into();
            by_name.entry(field_name.clone()).or_insert(index);
            table.push(Field {
                name: field_name,
                index,
                kind,
                slot_offset: RECORD_HEADER_SIZE + index * SLOT_SIZE,
            });
        }

        Self {
            name: name.into(),
            fields: table,
            by_name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.by_name
            .get(name)
            .map(|&index| &self.fields[index])
            .ok_or_else(|| TowerError::UnknownAttribute(format!("{}.{}", self.name, name)))
    }
}
