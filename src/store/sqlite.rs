use super::{Filter, Record, RecordStore, ID_FIELD};
use crate::error::RemoteError;
use anyhow::{anyhow, Context};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};
use std::path::Path;
use uuid::Uuid;

pub const DB_FILE: &str = "courseteams.sqlite3";

/// Document-style record store on SQLite: one JSON body per (collection, id).
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!(
                "failed to create workspace {}",
                workspace.to_string_lossy()
            )
        })?;
        let conn = Connection::open(workspace.join(DB_FILE))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records(
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                PRIMARY KEY(collection, id)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection, created_at)",
            [],
        )?;
        Ok(Self { conn })
    }

    fn insert(&self, collection: &str, mut record: Record) -> anyhow::Result<Value> {
        let id = Uuid::new_v4().to_string();
        record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        let body = serde_json::to_string(&record)?;
        self.conn.execute(
            "INSERT INTO records(collection, id, body, created_at) VALUES(?, ?, ?, ?)",
            params![collection, id, body, now_ts()],
        )?;
        Ok(json!({ "inserted": [record], "skipped": [] }))
    }

    // Filters run on the decoded bodies so matching follows `loose_eq` and field aliases.
    fn select(&self, collection: &str, filters: &[Filter]) -> anyhow::Result<Vec<Record>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM records WHERE collection = ? ORDER BY created_at, rowid")?;
        let bodies = stmt
            .query_map([collection], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut out = Vec::new();
        for body in &bodies {
            let record = parse_body(body)?;
            if filters.iter().all(|f| f.matches(&record)) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn select_one(&self, collection: &str, id: &str) -> anyhow::Result<Option<Record>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE collection = ? AND id = ?",
                [collection, id],
                |r| r.get(0),
            )
            .optional()?;
        body.map(|b| parse_body(&b)).transpose()
    }

    fn patch(&self, collection: &str, id: &str, patch: Record) -> anyhow::Result<Value> {
        let mut record = self
            .select_one(collection, id)?
            .ok_or_else(|| anyhow!("{collection}/{id} not found"))?;
        for (k, v) in patch {
            if k != ID_FIELD {
                record.insert(k, v);
            }
        }
        let body = serde_json::to_string(&record)?;
        self.conn.execute(
            "UPDATE records SET body = ?, updated_at = ? WHERE collection = ? AND id = ?",
            params![body, now_ts(), collection, id],
        )?;
        Ok(Value::Object(record))
    }

    fn remove(&self, collection: &str, id: &str) -> anyhow::Result<Value> {
        let n = self.conn.execute(
            "DELETE FROM records WHERE collection = ? AND id = ?",
            [collection, id],
        )?;
        if n == 0 {
            return Err(anyhow!("{collection}/{id} not found"));
        }
        Ok(json!({ "deleted": id }))
    }
}

impl RecordStore for SqliteRecordStore {
    fn create(&self, collection: &str, record: Record) -> Result<Value, RemoteError> {
        self.insert(collection, record)
            .with_context(|| format!("insert into {collection}"))
            .map_err(RemoteError::from)
    }

    fn read(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Record>, RemoteError> {
        self.select(collection, filters)
            .with_context(|| format!("read {collection}"))
            .map_err(RemoteError::from)
    }

    fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, RemoteError> {
        self.select_one(collection, id)
            .with_context(|| format!("read {collection}/{id}"))
            .map_err(RemoteError::from)
    }

    fn update(&self, collection: &str, id: &str, patch: Record) -> Result<Value, RemoteError> {
        self.patch(collection, id, patch)
            .with_context(|| format!("update {collection}/{id}"))
            .map_err(RemoteError::from)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<Value, RemoteError> {
        self.remove(collection, id)
            .with_context(|| format!("delete {collection}/{id}"))
            .map_err(RemoteError::from)
    }
}

fn parse_body(body: &str) -> anyhow::Result<Record> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(m) => Ok(m),
        other => Err(anyhow!("stored body is not an object: {other}")),
    }
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339()
}
