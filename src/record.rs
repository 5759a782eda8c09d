//! Materialized records.
//!
//! A [`Record`] decorates a backing type's data with the stubbing metadata the engine needs:
//! the assigned identifier, whether the record counts as saved, the resolved attribute values
//! (associations point at other records, not stubs) and the flat row written by bulk insert.
//! Records are shared through `Rc`, so the same stub materialized twice without overrides
//! yields the very same object.

use std::{cell::Cell, fmt, rc::Rc};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::{
    attribute::ID,
    error::{internal::InternalError, StubError},
    value::Value,
};

/// Flat column → value snapshot written to storage.
pub type Row = IndexMap<String, Value>;

/// Resolved attribute name → field mapping.
pub type Fields = IndexMap<String, Field>;

/// A resolved attribute on a materialized record.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    /// Single association, such as a post's author.
    One(Rc<Record>),
    /// Ordered to-many association.
    Many(Vec<Rc<Record>>),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Rc<Record>> {
        match self {
            Self::One(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&[Rc<Record>]> {
        match self {
            Self::Many(records) => Some(records),
            _ => None,
        }
    }
}

pub struct Record {
    backing: String,
    table: String,
    stub: String,
    id: Option<i64>,
    new_record: Cell<bool>,
    fields: Fields,
    row: Row,
}

impl Record {
    pub(crate) fn new(
        backing: &str,
        table: &str,
        stub: &str,
        id: Option<i64>,
        new_record: bool,
        fields: Fields,
        mut row: Row,
    ) -> Self {
        row.shift_remove(ID);
        if let Some(id) = id {
            row.insert(ID.to_string(), Value::Int(id));
        }

        Self {
            backing: backing.to_string(),
            table: table.to_string(),
            stub: stub.to_string(),
            id,
            new_record: Cell::new(new_record),
            fields,
            row,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Whether the record has not been written to storage.
    pub fn is_new_record(&self) -> bool {
        self.new_record.get()
    }

    pub(crate) fn mark_saved(&self) {
        self.new_record.set(false);
    }

    /// Name of the backing type, such as `User`.
    pub fn backing(&self) -> &str {
        &self.backing
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Global key of the stub this record was materialized from.
    pub fn stub(&self) -> &str {
        &self.stub
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Insertable snapshot: scalars, foreign-key columns and `id`.
    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(Field::as_value)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(Value::as_bool)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(Value::as_int)
    }

    pub fn time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.value(key).and_then(Value::as_time)
    }

    pub fn association(&self, key: &str) -> Option<&Rc<Record>> {
        self.get(key).and_then(Field::as_record)
    }

    /// Records of a to-many association, empty when the key is not one.
    pub fn associations(&self, key: &str) -> &[Rc<Record>] {
        self.get(key).and_then(Field::as_records).unwrap_or_default()
    }

    /// The insertable row as a JSON object.
    pub fn to_json(&self) -> Result<serde_json::Value, StubError> {
        serde_json::to_value(&self.row).map_err(|e| InternalError::Serialize(e).into())
    }

    /// Decodes the insertable row into a host model type.
    ///
    /// Works with any `Deserialize` type whose fields are the table's columns, such as a
    /// SeaORM entity `Model`. Times decode from RFC 3339 strings.
    ///
    /// # Returns
    /// - `Ok(T)` - Decoded model
    /// - `Err(StubError::Internal)` - Row does not match the target type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StubError> {
        serde_json::from_value(self.to_json()?).map_err(|e| InternalError::Serialize(e).into())
    }
}

/// Records are equal when they are the same object, or share a backing type and a saved id.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.backing == other.backing && self.id.is_some() && self.id == other.id)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.map_or_else(|| "new".to_string(), |id| id.to_string());
        write!(f, "{} #{} => {:?}", self.backing, id, self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: Option<i64>) -> Record {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Field::Value(Value::from("bob")));
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from("bob"));
        Record::new("User", "user", "user", id, id.is_none(), fields, row)
    }

    #[test]
    fn row_carries_assigned_id() {
        let record = user(Some(1000));

        assert_eq!(record.row().get(ID), Some(&Value::Int(1000)));
        assert_eq!(record.text("name"), Some("bob"));
        assert!(!record.is_new_record());
    }

    #[test]
    fn records_with_same_id_are_equal() {
        assert_eq!(user(Some(1000)), user(Some(1000)));
        assert_ne!(user(Some(1000)), user(Some(1001)));
    }

    #[test]
    fn unsaved_records_are_only_equal_to_themselves() {
        let record = user(None);
        let same = &record;

        assert!(record == *same);
        assert_ne!(user(None), user(None));
        assert!(record.row().get(ID).is_none());
    }

    #[test]
    fn decodes_into_host_model() {
        #[derive(serde::Deserialize)]
        struct User {
            id: i64,
            name: String,
        }

        let decoded: User = user(Some(1000)).decode().unwrap();

        assert_eq!(decoded.id, 1000);
        assert_eq!(decoded.name, "bob");
    }
}
