use super::{Filter, Record, RecordStore, ID_FIELD};
use crate::error::RemoteError;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Shape of the body returned from `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateShape {
    /// The stored record itself.
    #[default]
    Record,
    /// `{"inserted": [record], "skipped": []}`.
    Inserted,
    /// The bare id string.
    Bare,
    /// A body with no identifier at all.
    Empty,
}

impl CreateShape {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Some(CreateShape::Record),
            "inserted" => Some(CreateShape::Inserted),
            "bare" => Some(CreateShape::Bare),
            "empty" => Some(CreateShape::Empty),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    // Insertion order is preserved per collection.
    collections: HashMap<String, Vec<Record>>,
    failing_ids: HashSet<String>,
    failing_reads: HashSet<String>,
    #[cfg(test)]
    reads: usize,
}

impl Inner {
    fn note_read(&mut self) {
        #[cfg(test)]
        {
            self.reads += 1;
        }
    }
}

/// Process-local record store. Backs the `inMemory` workspace and the unit tests.
///
/// Failure injection, seeding and the read counter exist only in test builds.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: Mutex<Inner>,
    shape: CreateShape,
}

impl MemoryRecordStore {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_shape(shape: CreateShape) -> Self {
        Self {
            inner: Mutex::default(),
            shape,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every update/delete of `id` fail with a remote error.
    #[cfg(test)]
    pub fn fail_writes_to(&self, id: &str) {
        self.lock().failing_ids.insert(id.to_string());
    }

    #[cfg(test)]
    pub fn fail_reads_of(&self, collection: &str) {
        self.lock().failing_reads.insert(collection.to_string());
    }

    #[cfg(test)]
    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.failing_ids.clear();
        inner.failing_reads.clear();
    }

    /// Number of `read`/`get_where`/`get_by_id` calls served so far.
    #[cfg(test)]
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Insert a record under a caller-chosen id, bypassing `create`.
    #[cfg(test)]
    pub fn seed(&self, collection: &str, id: &str, mut record: Record) {
        record.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }

    #[cfg(test)]
    pub fn count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    fn begin_read(&self, collection: &str) -> Result<MutexGuard<'_, Inner>, RemoteError> {
        let mut inner = self.lock();
        inner.note_read();
        if inner.failing_reads.contains(collection) {
            return Err(RemoteError::new(format!("read of {collection} failed")));
        }
        Ok(inner)
    }
}

fn record_id(r: &Record) -> Option<&str> {
    r.get(ID_FIELD).and_then(|v| v.as_str())
}

impl RecordStore for MemoryRecordStore {
    fn create(&self, collection: &str, mut record: Record) -> Result<Value, RemoteError> {
        let id = Uuid::new_v4().simple().to_string();
        record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(match self.shape {
            CreateShape::Record => Value::Object(record),
            CreateShape::Inserted => json!({ "inserted": [record], "skipped": [] }),
            CreateShape::Bare => Value::String(id),
            CreateShape::Empty => json!({ "ok": true }),
        })
    }

    fn read(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Record>, RemoteError> {
        let inner = self.begin_read(collection)?;
        Ok(inner
            .collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filters.iter().all(|f| f.matches(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, RemoteError> {
        let inner = self.begin_read(collection)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .cloned())
    }

    fn update(&self, collection: &str, id: &str, patch: Record) -> Result<Value, RemoteError> {
        let mut inner = self.lock();
        if inner.failing_ids.contains(id) {
            return Err(RemoteError::new(format!("update of {id} rejected")));
        }
        let record = inner
            .collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| record_id(r) == Some(id)))
            .ok_or_else(|| RemoteError::new(format!("{collection}/{id} not found")))?;
        for (k, v) in patch {
            if k != ID_FIELD {
                record.insert(k, v);
            }
        }
        Ok(Value::Object(record.clone()))
    }

    fn delete(&self, collection: &str, id: &str) -> Result<Value, RemoteError> {
        let mut inner = self.lock();
        if inner.failing_ids.contains(id) {
            return Err(RemoteError::new(format!("delete of {id} rejected")));
        }
        let records = inner
            .collections
            .get_mut(collection)
            .ok_or_else(|| RemoteError::new(format!("{collection}/{id} not found")))?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Err(RemoteError::new(format!("{collection}/{id} not found")));
        }
        Ok(json!({ "deleted": id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn create_read_update_delete() {
        let store = MemoryRecordStore::new();
        let resp = store
            .create("teams", rec(json!({ "name": "A", "category_id": 7 })))
            .expect("create");
        let id = super::super::extract_remote_id(&resp).expect("id");

        let rows = store
            .get_where("teams", "category_id", &json!("7"))
            .expect("get_where");
        assert_eq!(rows.len(), 1);

        store
            .update("teams", &id, rec(json!({ "name": "B", "_id": "hijack" })))
            .expect("update");
        let got = store.get_by_id("teams", &id).expect("get").expect("some");
        assert_eq!(got.get("name"), Some(&json!("B")));
        assert_eq!(got.get("_id"), Some(&json!(id.clone())));

        store.delete("teams", &id).expect("delete");
        assert!(store.delete("teams", &id).is_err());
        assert_eq!(store.count("teams"), 0);
    }

    #[test]
    fn injected_failures_surface_as_remote_errors() {
        let store = MemoryRecordStore::new();
        store.seed("teams", "t1", Record::new());
        store.fail_writes_to("t1");
        assert!(store.delete("teams", "t1").is_err());
        store.fail_reads_of("teams");
        assert!(store.read("teams", &[]).is_err());
        store.clear_failures();
        assert!(store.delete("teams", "t1").is_ok());
    }
}
