//! Tests for entity maps
//!
//! These tests verify:
//! - Entities stored in maps read back whole
//! - Attribute maps and single attributes by record id
//! - Type mismatch when the schema disagrees with the stored record
//! - Unknown attribute names

use std::sync::OnceLock;

use towerdb::buffer::{BufferStream, Streamable};
use towerdb::record::{read_entity, write_entity, Entity, FieldType, RecordSchema};
use towerdb::skiplist::{DiskMap, SkipListMap};
use towerdb::types::Value;
use towerdb::{MapFactory, Result, TowerError};

// =============================================================================
// Test Entities
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Account {
    id: i64,
    owner: String,
    balance: f64,
}

impl Entity for Account {
    fn schema() -> &'static RecordSchema {
        static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            RecordSchema::new(
                "Account",
                [
                    ("id", FieldType::Long),
                    ("owner", FieldType::Text),
                    ("balance", FieldType::Double),
                ],
            )
        })
    }

    fn attributes(&self) -> Vec<Value> {
        vec![
            Value::Long(self.id),
            Value::from(&self.owner),
            Value::Double(self.balance),
        ]
    }

    fn from_attributes(values: Vec<Value>) -> Result<Self> {
        match values.as_slice() {
            [Value::Long(id), Value::Text(owner), Value::Double(balance)] => Ok(Self {
                id: *id,
                owner: owner.clone(),
                balance: *balance,
            }),
            _ => Err(TowerError::Serialization("malformed account".to_string())),
        }
    }
}

impl Streamable for Account {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        write_entity(self, buffer)
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        read_entity(buffer)
    }
}

/// Same layout as `Account`, but declares `balance` as text
#[derive(Debug)]
struct LegacyAccount;

impl Entity for LegacyAccount {
    fn schema() -> &'static RecordSchema {
        static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            RecordSchema::new(
                "LegacyAccount",
                [
                    ("id", FieldType::Long),
                    ("owner", FieldType::Text),
                    ("balance", FieldType::Text),
                ],
            )
        })
    }

    fn attributes(&self) -> Vec<Value> {
        vec![Value::Null; 3]
    }

    fn from_attributes(_values: Vec<Value>) -> Result<Self> {
        Ok(LegacyAccount)
    }
}

impl Streamable for LegacyAccount {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        write_entity(self, buffer)
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        read_entity(buffer)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_accounts() -> (MapFactory, SkipListMap<Account>, u64) {
    let factory = MapFactory::in_memory().unwrap();
    let map: SkipListMap<Account> = factory.skip_list_map("accounts").unwrap();
    map.put(
        1i64,
        Account {
            id: 1,
            owner: "ada".to_string(),
            balance: 12.5,
        },
    )
    .unwrap();
    let rec_id = map.get_rec_id(1i64).unwrap().unwrap();
    (factory, map, rec_id)
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_entity_roundtrip_through_map() {
    let (_factory, map, rec_id) = setup_accounts();
    let account = map.get(1i64).unwrap().unwrap();
    assert_eq!(account.owner, "ada");
    assert_eq!(map.get_with_rec_id(rec_id).unwrap(), Some(account));
}

#[test]
fn test_attribute_map_by_rec_id() {
    let (_factory, map, rec_id) = setup_accounts();
    let attributes = map.get_map_with_rec_id(rec_id).unwrap().unwrap();

    assert_eq!(attributes.len(), 3);
    assert_eq!(attributes["owner"], Value::from("ada"));
    assert_eq!(attributes["balance"], Value::Double(12.5));
}

#[test]
fn test_single_attribute_by_rec_id() {
    let (_factory, map, rec_id) = setup_accounts();

    assert_eq!(
        map.get_attribute_with_rec_id("owner", rec_id).unwrap(),
        Some(Value::from("ada"))
    );
    assert_eq!(
        map.get_attribute_with_rec_id("id", rec_id).unwrap(),
        Some(Value::Long(1))
    );
}

#[test]
fn test_attribute_after_overwrite() {
    let (_factory, map, rec_id) = setup_accounts();
    map.put(
        1i64,
        Account {
            id: 1,
            owner: "grace".to_string(),
            balance: 0.0,
        },
    )
    .unwrap();

    assert_eq!(
        map.get_attribute_with_rec_id("owner", rec_id).unwrap(),
        Some(Value::from("grace"))
    );
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_attribute_type_mismatch() {
    let (factory, _map, rec_id) = setup_accounts();
    let legacy: SkipListMap<LegacyAccount> = factory.skip_list_map("accounts").unwrap();

    match legacy.get_attribute_with_rec_id("balance", rec_id) {
        Err(TowerError::AttributeTypeMismatch { field, expected, found }) => {
            assert_eq!(field, "balance");
            assert_eq!(expected, "text");
            assert_eq!(found, "double");
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
    assert!(matches!(
        legacy.get_attribute_with_rec_id("owner", rec_id),
        Ok(Some(Value::Text(_)))
    ));
}

#[test]
fn test_unknown_attribute() {
    let (_factory, map, rec_id) = setup_accounts();
    assert!(matches!(
        map.get_attribute_with_rec_id("email", rec_id),
        Err(TowerError::UnknownAttribute(_))
    ));
}

#[test]
fn test_attribute_of_unknown_record_is_absent() {
    let (_factory, map, _) = setup_accounts();
    assert!(map.get_attribute_with_rec_id("owner", 0).unwrap().is_none());
    assert!(map.get_map_with_rec_id(1 << 40).unwrap().is_none());
    assert!(map.get_map_with_rec_id(u64::MAX).unwrap().is_none());
    assert!(map.get_attribute_with_rec_id("owner", u64::MAX - 10).unwrap().is_none());
}
