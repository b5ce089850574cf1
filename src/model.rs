use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    #[default]
    Manual,
    Random,
}

impl AssignmentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentMode::Manual => "manual",
            AssignmentMode::Random => "random",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(AssignmentMode::Manual),
            "random" | "aleatorio" => Some(AssignmentMode::Random),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Overdue => "overdue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(AssignmentStatus::Pending),
            "in_progress" | "inprogress" | "in-progress" => Some(AssignmentStatus::InProgress),
            "completed" | "done" => Some(AssignmentStatus::Completed),
            "overdue" => Some(AssignmentStatus::Overdue),
            _ => None,
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Professor,
    #[default]
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Professor => "professor",
            Role::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professor" | "profesor" | "teacher" => Some(Role::Professor),
            "student" | "estudiante" => Some(Role::Student),
            _ => None,
        }
    }
}

/// A grouping of teams inside a course. Unsaved values carry `id == 0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub remote_id: String,
    pub name: String,
    pub course_id: i64,
    pub mode: AssignmentMode,
    pub max_members: i64,
    pub generated_team_ids: Vec<i64>,
    pub teams_generated: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
    pub remote_id: String,
    pub category_id: i64,
    pub name: String,
    pub member_ids: BTreeSet<i64>,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// Work assigned to one team for one activity. Identified by its remote id only.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub remote_id: String,
    pub team_id: i64,
    pub activity_id: i64,
    pub status: AssignmentStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub grade: Option<f64>,
    pub professor_comment: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date.map(|d| d < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub remote_id: String,
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl Activity {
    /// Started (or has no start date) and not yet due.
    pub fn is_in_progress(&self, now: DateTime<Utc>) -> bool {
        if self.deleted {
            return false;
        }
        let started = self.start_date.map(|s| s <= now).unwrap_or(true);
        let not_due = self.due_date.map(|d| now <= d).unwrap_or(false);
        started && not_due
    }

    /// Overlaps the closed window `[from, to]`.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        let Some(due) = self.due_date else {
            return false;
        };
        let start = self.start_date.unwrap_or(due);
        start <= to && due >= from
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub remote_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
