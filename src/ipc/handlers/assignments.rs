use crate::cascade::Cascade;
use crate::error::CoreError;
use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{
    backend, opt_datetime, opt_str, report_json, required_f64, required_i64, required_str, to_json,
};
use crate::ipc::types::{AppState, Request};
use crate::model::AssignmentStatus;
use crate::usecases::Courses;
use serde_json::json;

fn handle_assignments_list_by_team(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let team_id = match required_i64(req, "teamId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.assignments().list_by_team(team_id) {
        Ok(list) => ok(&req.id, json!({ "assignments": to_json(&list) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_list_by_activity(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let activity_id = match required_i64(req, "activityId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.assignments().list_by_activity(activity_id) {
        Ok(list) => ok(&req.id, json!({ "assignments": to_json(&list) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let assignment_id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.assignments().get(&assignment_id) {
        Ok(a) => ok(&req.id, json!({ "assignment": to_json(&a) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_assign(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let activity_id = match required_i64(req, "activityId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match Courses::new(b).assign_to_category_teams(activity_id) {
        Ok(out) => ok(
            &req.id,
            json!({
                "created": out.created,
                "skippedTeamIds": out.skipped_team_ids,
            }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let assignment_id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let due_date = match opt_datetime(req, "dueDate") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let repo = b.assignments();
    let mut a = match repo.get(&assignment_id) {
        Ok(Some(a)) => a,
        Ok(None) => {
            return core_err(
                &req.id,
                &CoreError::not_found(format!("assignment {assignment_id}")),
            )
        }
        Err(e) => return core_err(&req.id, &e),
    };
    if due_date.is_some() {
        a.due_date = due_date;
    }
    if let Some(c) = opt_str(req, "comment") {
        a.professor_comment = Some(c).filter(|s| !s.trim().is_empty());
    }
    match repo.update(&a) {
        Ok(()) => ok(&req.id, json!({ "assignment": to_json(&a) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let assignment_id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let raw = match required_str(req, "status") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(status) = AssignmentStatus::parse(&raw) else {
        return err(&req.id, "bad_params", format!("unknown status: {raw}"), None);
    };
    match Courses::new(b).set_status(&assignment_id, status) {
        Ok(a) => ok(&req.id, json!({ "assignment": to_json(&a) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_grade(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let assignment_id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade = match required_f64(req, "grade") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let comment = opt_str(req, "comment");
    match Courses::new(b).grade(&assignment_id, grade, comment) {
        Ok(a) => ok(&req.id, json!({ "assignment": to_json(&a) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let assignment_id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.assignments().delete(&assignment_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_delete_by_activity(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let activity_id = match required_i64(req, "activityId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match Cascade::new(b).delete_assignments_by_activity(activity_id) {
        Ok(report) => ok(&req.id, report_json(&report)),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_assignments_refresh_overdue(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    match Courses::new(b).refresh_overdue() {
        Ok(ids) => ok(&req.id, json!({ "overdue": ids })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.listByTeam" => Some(handle_assignments_list_by_team(state, req)),
        "assignments.listByActivity" => Some(handle_assignments_list_by_activity(state, req)),
        "assignments.get" => Some(handle_assignments_get(state, req)),
        "assignments.assignToCategoryTeams" => Some(handle_assignments_assign(state, req)),
        "assignments.update" => Some(handle_assignments_update(state, req)),
        "assignments.setStatus" => Some(handle_assignments_set_status(state, req)),
        "assignments.grade" => Some(handle_assignments_grade(state, req)),
        "assignments.delete" => Some(handle_assignments_delete(state, req)),
        "assignments.deleteByActivity" => Some(handle_assignments_delete_by_activity(state, req)),
        "assignments.refreshOverdue" => Some(handle_assignments_refresh_overdue(state, req)),
        _ => None,
    }
}
