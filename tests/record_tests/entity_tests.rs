//! Tests for the Entity contract
//!
//! These tests verify:
//! - Entities stream through their schema layout
//! - from_attributes rejects values of the wrong shape

use std::sync::OnceLock;

use towerdb::buffer::{BufferStream, Streamable};
use towerdb::record::{read_entity, write_entity, Entity, FieldType, RecordSchema};
use towerdb::types::Value;
use towerdb::{Result, TowerError};

#[derive(Debug, Clone, PartialEq)]
struct Book {
    title: String,
    pages: i32,
    isbn: Option<String>,
}

impl Entity for Book {
    fn schema() -> &'static RecordSchema {
        static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            RecordSchema::new(
                "Book",
                [
                    ("title", FieldType::Text),
                    ("pages", FieldType::Int),
                    ("isbn", FieldType::Text),
                ],
            )
        })
    }

    fn attributes(&self) -> Vec<Value> {
        vec![
            Value::from(&self.title),
            Value::Int(self.pages),
            Value::from(self.isbn.clone()),
        ]
    }

    fn from_attributes(values: Vec<Value>) -> Result<Self> {
        match values.as_slice() {
            [Value::Text(title), Value::Int(pages), isbn] => Ok(Self {
                title: title.clone(),
                pages: *pages,
                isbn: isbn.as_str().map(str::to_string),
            }),
            _ => Err(TowerError::Serialization("malformed book".to_string())),
        }
    }
}

impl Streamable for Book {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        write_entity(self, buffer)
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        read_entity(buffer)
    }
}

#[test]
fn test_entity_streams_through_layout() {
    let book = Book {
        title: "Dune".to_string(),
        pages: 412,
        isbn: None,
    };
    let mut stream = BufferStream::new();
    book.write(&mut stream).unwrap();

    assert_eq!(&stream.as_slice()[0..2], &3u16.to_be_bytes());
    assert_eq!(Book::read(&mut stream).unwrap(), book);
}

#[test]
fn test_optional_attribute_present() {
    let book = Book {
        title: "Emma".to_string(),
        pages: 300,
        isbn: Some("978-0".to_string()),
    };
    let mut stream = BufferStream::new();
    book.write(&mut stream).unwrap();
    assert_eq!(Book::read(&mut stream).unwrap().isbn.as_deref(), Some("978-0"));
}

#[test]
fn test_null_required_attribute_is_rejected() {
    let mut stream = BufferStream::new();
    towerdb::record::encode_record(
        Book::schema(),
        &[Value::Null, Value::Int(1), Value::Null],
        &mut stream,
    )
    .unwrap();

    assert!(matches!(
        Book::read(&mut stream),
        Err(TowerError::Serialization(_))
    ));
}
