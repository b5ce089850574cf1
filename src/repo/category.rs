use super::{create_mapped, require_remote, resolve_for_read, Backend};
use crate::dto::{self, bool_field, i64_field, str_field};
use crate::error::{CoreError, CoreResult};
use crate::model::{AssignmentMode, Category};
use crate::registry::IdRegistry;
use crate::store::{Filter, Record, RecordStore, CATEGORIES};
use serde_json::{json, Value};

const COURSE_ID: &[&str] = &["course_id", "courseId", "curso_id"];
const MODE: &[&str] = &["grouping_method", "groupingMethod", "mode", "assignment_mode"];
const MAX_MEMBERS: &[&str] = &["max_members", "maxMembers", "max_members_per_team"];
const TEAM_IDS: &[&str] = &["team_ids", "teamIds", "generated_team_ids"];
const TEAMS_GENERATED: &[&str] = &["teams_generated", "teamsGenerated"];

pub struct CategoryRepo<'a> {
    store: &'a dyn RecordStore,
    ids: &'a IdRegistry,
}

impl<'a> CategoryRepo<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self {
            store: backend.store.as_ref(),
            ids: &backend.ids.categories,
        }
    }

    fn from_record(&self, r: &Record) -> Option<Category> {
        let remote_id = dto::remote_id(r)?;
        Some(Category {
            id: self.ids.intern(&remote_id),
            remote_id,
            name: str_field(r, &["name"]).unwrap_or_default(),
            course_id: i64_field(r, COURSE_ID).unwrap_or_default(),
            mode: str_field(r, MODE)
                .and_then(|s| AssignmentMode::parse(&s))
                .unwrap_or_default(),
            max_members: i64_field(r, MAX_MEMBERS).unwrap_or(1).max(1),
            generated_team_ids: dto::field(r, TEAM_IDS)
                .map(dto::coerce_id_list)
                .unwrap_or_default(),
            teams_generated: bool_field(r, TEAMS_GENERATED).unwrap_or(false),
        })
    }

    fn to_record(c: &Category) -> Record {
        let mut r = Record::new();
        r.insert("name".into(), json!(c.name.trim()));
        r.insert("course_id".into(), json!(c.course_id));
        r.insert("grouping_method".into(), json!(c.mode.as_str()));
        r.insert("max_members".into(), json!(c.max_members));
        r.insert("team_ids".into(), json!(c.generated_team_ids));
        r.insert("teams_generated".into(), json!(c.teams_generated));
        r
    }

    fn translate(&self, rows: Vec<Record>) -> Vec<Category> {
        rows.iter().filter_map(|r| self.from_record(r)).collect()
    }

    fn validate(&self, c: &Category) -> CoreResult<()> {
        if c.name.trim().is_empty() {
            return Err(CoreError::validation("category name must not be empty"));
        }
        if c.max_members < 1 {
            return Err(CoreError::validation("max members per team must be at least 1"));
        }
        let taken = self
            .list_by_course(c.course_id)?
            .into_iter()
            .any(|other| other.id != c.id && other.name.trim().eq_ignore_ascii_case(c.name.trim()));
        if taken {
            return Err(CoreError::validation(format!(
                "a category named '{}' already exists in this course",
                c.name.trim()
            )));
        }
        Ok(())
    }

    pub fn create(&self, c: &Category) -> CoreResult<i64> {
        let fresh = Category { id: 0, ..c.clone() };
        self.validate(&fresh)?;
        create_mapped(self.store, self.ids, CATEGORIES, Self::to_record(&fresh))
    }

    pub fn list_all(&self) -> CoreResult<Vec<Category>> {
        let rows = self.store.read(CATEGORIES, &[])?;
        let out = self.translate(rows);
        self.ids.mark_indexed();
        Ok(out)
    }

    pub fn list_by_course(&self, course_id: i64) -> CoreResult<Vec<Category>> {
        let rows = self
            .store
            .read(CATEGORIES, &[Filter::any_of(COURSE_ID, course_id)])?;
        Ok(self.translate(rows))
    }

    pub fn get_by_id(&self, id: i64) -> CoreResult<Option<Category>> {
        let Some(remote) = resolve_for_read(self.ids, id, || self.list_all().map(|_| ()))? else {
            return Ok(None);
        };
        match self.store.get_by_id(CATEGORIES, &remote)? {
            Some(r) => Ok(self.from_record(&r)),
            None => {
                self.ids.unregister(id);
                Ok(None)
            }
        }
    }

    pub fn get_by_remote_id(&self, remote_id: &str) -> CoreResult<Option<Category>> {
        Ok(self
            .store
            .get_by_id(CATEGORIES, remote_id)?
            .and_then(|r| self.from_record(&r)))
    }

    pub fn update(&self, c: &Category) -> CoreResult<()> {
        let remote = require_remote(self.ids, c.id)?;
        self.validate(c)?;
        self.store
            .update(CATEGORIES, &remote, Self::to_record(c))?;
        Ok(())
    }

    /// Record the teams produced by team generation.
    pub fn mark_teams_generated(&self, id: i64, team_ids: &[i64]) -> CoreResult<()> {
        let remote = require_remote(self.ids, id)?;
        let mut patch = Record::new();
        patch.insert(TEAM_IDS[0].into(), json!(team_ids));
        patch.insert(TEAMS_GENERATED[0].into(), Value::Bool(true));
        self.store.update(CATEGORIES, &remote, patch)?;
        Ok(())
    }

    /// Delete the category record only. Use the cascade to remove its teams first.
    pub fn delete_record(&self, id: i64) -> CoreResult<()> {
        let remote = require_remote(self.ids, id)?;
        self.store.delete(CATEGORIES, &remote)?;
        self.ids.unregister(id);
        Ok(())
    }

    pub fn exists(&self, id: i64) -> CoreResult<bool> {
        Ok(self.get_by_id(id)?.is_some())
    }
}
