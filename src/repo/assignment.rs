use super::{create_record, Backend};
use crate::dto::{self, datetime_field, f64_field, i64_field, str_field};
use crate::error::{CoreError, CoreResult};
use crate::model::{Assignment, AssignmentStatus};
use crate::store::{Filter, Record, RecordStore, ASSIGNMENTS};
use serde_json::{json, Value};

const TEAM_ID: &[&str] = &["team_id", "teamId", "equipo_id"];
const ACTIVITY_ID: &[&str] = &["activity_id", "activityId", "actividad_id"];
const DUE_DATE: &[&str] = &["due_date", "dueDate", "fecha_entrega"];
const COMMENT: &[&str] = &["professor_comment", "professorComment", "comment"];
const ASSIGNED_AT: &[&str] = &["assigned_at", "assignedAt", "created_at"];

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 5.0;

pub fn validate_grade(grade: f64) -> CoreResult<()> {
    if !grade.is_finite() || !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
        return Err(CoreError::validation(format!(
            "grade must be between {MIN_GRADE} and {MAX_GRADE}"
        )));
    }
    Ok(())
}

/// Assignments keep their remote id as identity; there is no numeric mapping.
pub struct AssignmentRepo<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> AssignmentRepo<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self {
            store: backend.store.as_ref(),
        }
    }

    fn from_record(r: &Record) -> Option<Assignment> {
        Some(Assignment {
            remote_id: dto::remote_id(r)?,
            team_id: i64_field(r, TEAM_ID)?,
            activity_id: i64_field(r, ACTIVITY_ID)?,
            status: str_field(r, &["status"])
                .and_then(|s| AssignmentStatus::parse(&s))
                .unwrap_or_default(),
            due_date: datetime_field(r, DUE_DATE),
            grade: f64_field(r, &["grade"]),
            professor_comment: str_field(r, COMMENT).filter(|s| !s.trim().is_empty()),
            assigned_at: datetime_field(r, ASSIGNED_AT),
        })
    }

    fn to_record(a: &Assignment) -> Record {
        let mut r = Record::new();
        r.insert("team_id".into(), json!(a.team_id));
        r.insert("activity_id".into(), json!(a.activity_id));
        r.insert("status".into(), json!(a.status.as_str()));
        r.insert("due_date".into(), dto::datetime_value(a.due_date.as_ref()));
        r.insert("grade".into(), a.grade.map(|g| json!(g)).unwrap_or(Value::Null));
        r.insert(
            "professor_comment".into(),
            a.professor_comment
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        r.insert("assigned_at".into(), dto::datetime_value(a.assigned_at.as_ref()));
        r
    }

    fn translate(rows: Vec<Record>) -> Vec<Assignment> {
        rows.iter().filter_map(Self::from_record).collect()
    }

    fn validate(a: &Assignment) -> CoreResult<()> {
        if let Some(g) = a.grade {
            validate_grade(g)?;
        }
        Ok(())
    }

    pub fn create(&self, a: &Assignment) -> CoreResult<String> {
        Self::validate(a)?;
        create_record(self.store, ASSIGNMENTS, Self::to_record(a))
    }

    pub fn get(&self, remote_id: &str) -> CoreResult<Option<Assignment>> {
        Ok(self
            .store
            .get_by_id(ASSIGNMENTS, remote_id)?
            .and_then(|r| Self::from_record(&r)))
    }

    pub fn list_all(&self) -> CoreResult<Vec<Assignment>> {
        Ok(Self::translate(self.store.read(ASSIGNMENTS, &[])?))
    }

    pub fn list_by_team(&self, team_id: i64) -> CoreResult<Vec<Assignment>> {
        let rows = self
            .store
            .read(ASSIGNMENTS, &[Filter::any_of(TEAM_ID, team_id)])?;
        Ok(Self::translate(rows))
    }

    pub fn list_by_activity(&self, activity_id: i64) -> CoreResult<Vec<Assignment>> {
        let rows = self
            .store
            .read(ASSIGNMENTS, &[Filter::any_of(ACTIVITY_ID, activity_id)])?;
        Ok(Self::translate(rows))
    }

    pub fn update(&self, a: &Assignment) -> CoreResult<()> {
        if a.remote_id.trim().is_empty() {
            return Err(CoreError::validation("assignment has no remote id"));
        }
        Self::validate(a)?;
        self.store
            .update(ASSIGNMENTS, &a.remote_id, Self::to_record(a))?;
        Ok(())
    }

    pub fn delete(&self, remote_id: &str) -> CoreResult<()> {
        self.store.delete(ASSIGNMENTS, remote_id)?;
        Ok(())
    }
}
