//! Dependent deletions.
//!
//! The record store has no multi-record transactions, so every path deletes children one
//! at a time, in order, before the parent. A failed child is recorded and the walk goes on.
//! A team or activity whose assignments could not all be removed is kept, so an assignment
//! never outlives the record it references. The category record is removed regardless.
//! A parent record that the store refuses to delete is reported like any other failed step.

use crate::error::{CoreError, CoreResult};
use crate::registry::EntityKind;
use crate::repo::Backend;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CascadeFailure {
    pub item: String,
    pub error: CoreError,
}

#[derive(Debug, Clone, Default)]
pub struct CascadeReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<CascadeFailure>,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn ok(&mut self, item: String) {
        self.succeeded.push(item);
    }

    fn fail(&mut self, item: String, error: CoreError) {
        warn!(%item, error = %error, "cascade step failed; continuing");
        self.failed.push(CascadeFailure { item, error });
    }

    fn failed_since(&self, mark: usize) -> usize {
        self.failed.len() - mark
    }
}

pub fn team_item(id: i64) -> String {
    format!("team:{id}")
}

pub fn category_item(id: i64) -> String {
    format!("category:{id}")
}

pub fn activity_item(id: i64) -> String {
    format!("activity:{id}")
}

pub fn assignment_item(remote_id: &str) -> String {
    format!("assignment:{remote_id}")
}

pub struct Cascade<'a> {
    backend: &'a Backend,
}

impl<'a> Cascade<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Teams (and their assignments) first, then the category record.
    ///
    /// Fails outright only when the category is unmapped or its teams cannot be listed.
    pub fn delete_category(&self, category_id: i64) -> CoreResult<CascadeReport> {
        let categories = self.backend.categories();
        if self.backend.ids.categories.resolve_remote(category_id).is_none() {
            return Err(CoreError::Resolution {
                kind: EntityKind::Category,
                local_id: category_id,
            });
        }

        let mut report = CascadeReport::default();
        let teams = self.backend.teams().list_by_category(category_id)?;
        for team in &teams {
            let mark = report.failed.len();
            if let Err(e) = self.team_path(team.id, &mut report) {
                report.fail(team_item(team.id), e);
            } else if report.failed_since(mark) > 0 {
                warn!(team_id = team.id, "team kept: some assignments could not be deleted");
            }
        }

        match categories.delete_record(category_id) {
            Ok(()) => report.ok(category_item(category_id)),
            Err(e) => report.fail(category_item(category_id), e),
        }
        info!(
            category_id,
            teams = teams.len(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "category cascade finished"
        );
        Ok(report)
    }

    /// Assignments first, then the team record.
    pub fn delete_team(&self, team_id: i64) -> CoreResult<CascadeReport> {
        let mut report = CascadeReport::default();
        self.team_path(team_id, &mut report)?;
        info!(
            team_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "team cascade finished"
        );
        Ok(report)
    }

    // Records assignment and team delete failures in `report`; returns Err only if the
    // team could not be resolved or its assignments could not be listed.
    fn team_path(&self, team_id: i64, report: &mut CascadeReport) -> CoreResult<()> {
        let teams = self.backend.teams();
        if self.backend.ids.teams.resolve_remote(team_id).is_none() {
            return Err(CoreError::Resolution {
                kind: EntityKind::Team,
                local_id: team_id,
            });
        }
        let assignments = self.backend.assignments();
        let mark = report.failed.len();
        for a in assignments.list_by_team(team_id)? {
            match assignments.delete(&a.remote_id) {
                Ok(()) => report.ok(assignment_item(&a.remote_id)),
                Err(e) => report.fail(assignment_item(&a.remote_id), e),
            }
        }
        if report.failed_since(mark) > 0 {
            return Ok(());
        }
        match teams.delete_record(team_id) {
            Ok(()) => report.ok(team_item(team_id)),
            Err(e) => report.fail(team_item(team_id), e),
        }
        Ok(())
    }

    pub fn delete_assignments_by_activity(&self, activity_id: i64) -> CoreResult<CascadeReport> {
        let mut report = CascadeReport::default();
        self.activity_assignments(activity_id, &mut report)?;
        Ok(report)
    }

    fn activity_assignments(&self, activity_id: i64, report: &mut CascadeReport) -> CoreResult<()> {
        let assignments = self.backend.assignments();
        for a in assignments.list_by_activity(activity_id)? {
            match assignments.delete(&a.remote_id) {
                Ok(()) => report.ok(assignment_item(&a.remote_id)),
                Err(e) => report.fail(assignment_item(&a.remote_id), e),
            }
        }
        Ok(())
    }

    /// Assignments for the activity first, then the activity record.
    pub fn delete_activity(&self, activity_id: i64) -> CoreResult<CascadeReport> {
        if self.backend.ids.activities.resolve_remote(activity_id).is_none() {
            return Err(CoreError::Resolution {
                kind: EntityKind::Activity,
                local_id: activity_id,
            });
        }
        let mut report = CascadeReport::default();
        self.activity_assignments(activity_id, &mut report)?;
        if report.is_complete() {
            match self.backend.activities().delete_record(activity_id) {
                Ok(()) => report.ok(activity_item(activity_id)),
                Err(e) => report.fail(activity_item(activity_id), e),
            }
        } else {
            warn!(activity_id, "activity kept: some assignments could not be deleted");
        }
        Ok(report)
    }
}
