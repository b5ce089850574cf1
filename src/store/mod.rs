//! Record-store seam: the generic CRUD client every repository talks to.
//!
//! Records are JSON objects keyed by a store-assigned opaque `_id`. Backends differ in the
//! shape of their create responses; [`extract_remote_id`] accepts all of them.

mod memory;
mod sqlite;

pub use memory::{CreateShape, MemoryRecordStore};
pub use sqlite::SqliteRecordStore;

use crate::error::RemoteError;
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

pub const CATEGORIES: &str = "categories";
pub const TEAMS: &str = "teams";
pub const ASSIGNMENTS: &str = "team_activities";
pub const ACTIVITIES: &str = "activities";
pub const USERS: &str = "users";

/// Equality filter on a top-level record field, under its canonical name or any alias.
///
/// The first non-null alias present is compared, the same lookup the record mappers use,
/// and the comparison is [`loose_eq`] so `7` and `"7"` select the same rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub fields: Vec<String>,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::any_of(&[field], value)
    }

    pub fn any_of(fields: &[&str], value: impl Into<Value>) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let names: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        crate::dto::field(record, &names)
            .map(|v| loose_eq(v, &self.value))
            .unwrap_or(false)
    }
}

pub trait RecordStore {
    fn create(&self, collection: &str, record: Record) -> Result<Value, RemoteError>;

    fn read(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Record>, RemoteError>;

    fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, RemoteError>;

    fn get_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, RemoteError> {
        self.read(collection, &[Filter::eq(field, value.clone())])
    }

    fn update(&self, collection: &str, id: &str, patch: Record) -> Result<Value, RemoteError>;

    fn delete(&self, collection: &str, id: &str) -> Result<Value, RemoteError>;
}

impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    fn create(&self, collection: &str, record: Record) -> Result<Value, RemoteError> {
        (**self).create(collection, record)
    }

    fn read(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Record>, RemoteError> {
        (**self).read(collection, filters)
    }

    fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, RemoteError> {
        (**self).get_by_id(collection, id)
    }

    fn get_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, RemoteError> {
        (**self).get_where(collection, field, value)
    }

    fn update(&self, collection: &str, id: &str, patch: Record) -> Result<Value, RemoteError> {
        (**self).update(collection, id, patch)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<Value, RemoteError> {
        (**self).delete(collection, id)
    }
}

/// Pull the remote id out of a create response.
///
/// Accepted shapes: a record object (`{"_id": ..}` or `{"id": ..}`), a batch wrapper
/// (`{"inserted": [record, ..]}`), a bare array of records, or a bare string/number id.
pub fn extract_remote_id(resp: &Value) -> Option<String> {
    match resp {
        Value::Object(obj) => {
            if let Some(inserted) = obj.get("inserted") {
                return extract_remote_id(inserted);
            }
            [ID_FIELD, "id"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(scalar_id))
        }
        Value::Array(items) => items.first().and_then(extract_remote_id),
        other => scalar_id(other),
    }
}

fn scalar_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Equality that treats `42`, `42.0` and `"42"` alike, and `true`/`"true"`/`1` alike.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => s
            .trim()
            .parse::<f64>()
            .map(|v| Some(v) == n.as_f64())
            .unwrap_or(false),
        (Value::Bool(x), other) | (other, Value::Bool(x)) => {
            crate::dto::coerce_bool(other) == Some(*x)
        }
        _ => false,
    }
}
