use super::{contains_ci, create_mapped, require_remote, resolve_for_read, Backend, CategoryRepo};
use crate::clock::Clock;
use crate::dto::{self, bool_field, datetime_field, i64_field, str_field};
use crate::error::{CoreError, CoreResult};
use crate::model::Activity;
use crate::registry::IdRegistry;
use crate::store::{Filter, Record, RecordStore, ACTIVITIES};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

const CATEGORY_ID: &[&str] = &["category_id", "categoryId", "categoria_id"];
const START_DATE: &[&str] = &["start_date", "startDate", "fecha_inicio"];
const DUE_DATE: &[&str] = &["due_date", "dueDate", "fecha_entrega"];
const DELETED: &[&str] = &["deleted", "is_deleted", "isDeleted"];

pub struct ActivityRepo<'a> {
    backend: &'a Backend,
    store: &'a dyn RecordStore,
    ids: &'a IdRegistry,
    clock: &'a dyn Clock,
}

impl<'a> ActivityRepo<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self {
            backend,
            store: backend.store.as_ref(),
            ids: &backend.ids.activities,
            clock: backend.clock.as_ref(),
        }
    }

    fn from_record(&self, r: &Record) -> Option<Activity> {
        let remote_id = dto::remote_id(r)?;
        Some(Activity {
            id: self.ids.intern(&remote_id),
            remote_id,
            category_id: i64_field(r, CATEGORY_ID).unwrap_or_default(),
            name: str_field(r, &["name", "title"]).unwrap_or_default(),
            description: str_field(r, &["description"]).unwrap_or_default(),
            start_date: datetime_field(r, START_DATE),
            due_date: datetime_field(r, DUE_DATE),
            deleted: bool_field(r, DELETED).unwrap_or(false),
        })
    }

    fn to_record(a: &Activity) -> Record {
        let mut r = Record::new();
        r.insert("category_id".into(), json!(a.category_id));
        r.insert("name".into(), json!(a.name.trim()));
        r.insert("description".into(), json!(a.description));
        r.insert("start_date".into(), dto::datetime_value(a.start_date.as_ref()));
        r.insert("due_date".into(), dto::datetime_value(a.due_date.as_ref()));
        r.insert("deleted".into(), Value::Bool(a.deleted));
        r
    }

    fn translate(&self, rows: Vec<Record>) -> Vec<Activity> {
        rows.iter().filter_map(|r| self.from_record(r)).collect()
    }

    fn validate(a: &Activity) -> CoreResult<()> {
        if a.name.trim().is_empty() {
            return Err(CoreError::validation("activity name must not be empty"));
        }
        let Some(due) = a.due_date else {
            return Err(CoreError::validation("activity needs a due date"));
        };
        if let Some(start) = a.start_date {
            if start > due {
                return Err(CoreError::validation("start date must not be after the due date"));
            }
        }
        Ok(())
    }

    pub fn create(&self, a: &Activity) -> CoreResult<i64> {
        let fresh = Activity {
            id: 0,
            deleted: false,
            ..a.clone()
        };
        Self::validate(&fresh)?;
        if fresh.due_date.map(|d| d < self.clock.now()).unwrap_or(false) {
            return Err(CoreError::validation("due date is in the past"));
        }
        if !CategoryRepo::new(self.backend).exists(fresh.category_id)? {
            return Err(CoreError::validation(format!(
                "category {} does not exist",
                fresh.category_id
            )));
        }
        create_mapped(self.store, self.ids, ACTIVITIES, Self::to_record(&fresh))
    }

    pub fn list_all(&self) -> CoreResult<Vec<Activity>> {
        let rows = self.store.read(ACTIVITIES, &[])?;
        let out = self.translate(rows);
        self.ids.mark_indexed();
        Ok(out)
    }

    pub fn list_by_category(&self, category_id: i64, include_deleted: bool) -> CoreResult<Vec<Activity>> {
        let rows = self
            .store
            .read(ACTIVITIES, &[Filter::any_of(CATEGORY_ID, category_id)])?;
        Ok(self
            .translate(rows)
            .into_iter()
            .filter(|a| include_deleted || !a.deleted)
            .collect())
    }

    /// Started and not yet due, as of the backend clock.
    pub fn list_in_progress(&self, category_id: i64) -> CoreResult<Vec<Activity>> {
        let now = self.clock.now();
        Ok(self
            .list_by_category(category_id, false)?
            .into_iter()
            .filter(|a| a.is_in_progress(now))
            .collect())
    }

    pub fn list_in_range(
        &self,
        category_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Activity>> {
        if from > to {
            return Err(CoreError::validation("range start is after range end"));
        }
        Ok(self
            .list_by_category(category_id, false)?
            .into_iter()
            .filter(|a| a.overlaps(from, to))
            .collect())
    }

    /// Case-insensitive match on name or description.
    pub fn search(&self, category_id: i64, query: &str) -> CoreResult<Vec<Activity>> {
        let q = query.trim().to_lowercase();
        Ok(self
            .list_by_category(category_id, false)?
            .into_iter()
            .filter(|a| q.is_empty() || contains_ci(&a.name, &q) || contains_ci(&a.description, &q))
            .collect())
    }

    pub fn get_by_id(&self, id: i64) -> CoreResult<Option<Activity>> {
        let Some(remote) = resolve_for_read(self.ids, id, || self.list_all().map(|_| ()))? else {
            return Ok(None);
        };
        match self.store.get_by_id(ACTIVITIES, &remote)? {
            Some(r) => Ok(self.from_record(&r)),
            None => {
                self.ids.unregister(id);
                Ok(None)
            }
        }
    }

    pub fn update(&self, a: &Activity) -> CoreResult<()> {
        let remote = require_remote(self.ids, a.id)?;
        Self::validate(a)?;
        self.store.update(ACTIVITIES, &remote, Self::to_record(a))?;
        Ok(())
    }

    /// Soft delete: the record stays but default listings hide it.
    pub fn archive(&self, id: i64) -> CoreResult<()> {
        let remote = require_remote(self.ids, id)?;
        let mut patch = Record::new();
        patch.insert(DELETED[0].into(), Value::Bool(true));
        self.store.update(ACTIVITIES, &remote, patch)?;
        Ok(())
    }

    /// Delete the activity record only. Use the cascade to remove its assignments first.
    pub fn delete_record(&self, id: i64) -> CoreResult<()> {
        let remote = require_remote(self.ids, id)?;
        self.store.delete(ACTIVITIES, &remote)?;
        self.ids.unregister(id);
        Ok(())
    }
}
