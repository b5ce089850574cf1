use crate::ipc::error::{core_err, ok};
use crate::ipc::helpers::{
    backend, missing, opt_bool, opt_datetime, opt_str, report_json, required_datetime,
    required_i64, required_str, to_json,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Activity;
use crate::usecases::Courses;
use serde_json::json;

fn handle_activities_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let include_deleted = opt_bool(req, "includeDeleted");
    match b.activities().list_by_category(category_id, include_deleted) {
        Ok(list) => ok(&req.id, json!({ "activities": to_json(&list) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_activities_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let activity_id = match required_i64(req, "activityId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.activities().get_by_id(activity_id) {
        Ok(a) => ok(&req.id, json!({ "activity": to_json(&a) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_activities_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let start_date = match opt_datetime(req, "startDate") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let due_date = match required_datetime(req, "dueDate") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let activity = Activity {
        category_id,
        name,
        description: opt_str(req, "description").unwrap_or_default(),
        start_date,
        due_date: Some(due_date),
        ..Activity::default()
    };
    match b.activities().create(&activity) {
        Ok(id) => ok(&req.id, json!({ "activityId": id })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_activities_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let activity_id = match required_i64(req, "activityId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let repo = b.activities();
    let mut activity = match repo.get_by_id(activity_id) {
        Ok(Some(a)) => a,
        Ok(None) => return core_err(&req.id, &missing(&b.ids.activities, activity_id)),
        Err(e) => return core_err(&req.id, &e),
    };
    if let Some(name) = opt_str(req, "name") {
        activity.name = name;
    }
    if let Some(d) = opt_str(req, "description") {
        activity.description = d;
    }
    match opt_datetime(req, "startDate") {
        Ok(Some(v)) => activity.start_date = Some(v),
        Ok(None) => {}
        Err(e) => return e,
    }
    match opt_datetime(req, "dueDate") {
        Ok(Some(v)) => activity.due_date = Some(v),
        Ok(None) => {}
        Err(e) => return e,
    }
    match repo.update(&activity) {
        Ok(()) => ok(&req.id, json!({ "activity": to_json(&activity) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_activities_archive(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let activity_id = match required_i64(req, "activityId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.activities().archive(activity_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_activities_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let activity_id = match required_i64(req, "activityId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match Courses::new(b).delete_activity(activity_id) {
        Ok(report) => ok(&req.id, report_json(&report)),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_activities_in_progress(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.activities().list_in_progress(category_id) {
        Ok(list) => ok(&req.id, json!({ "activities": to_json(&list) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_activities_in_range(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let from = match required_datetime(req, "from") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let to = match required_datetime(req, "to") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.activities().list_in_range(category_id, from, to) {
        Ok(list) => ok(&req.id, json!({ "activities": to_json(&list) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_activities_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let query = opt_str(req, "query").unwrap_or_default();
    match b.activities().search(category_id, &query) {
        Ok(list) => ok(&req.id, json!({ "activities": to_json(&list) })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "activities.list" => Some(handle_activities_list(state, req)),
        "activities.get" => Some(handle_activities_get(state, req)),
        "activities.create" => Some(handle_activities_create(state, req)),
        "activities.update" => Some(handle_activities_update(state, req)),
        "activities.archive" => Some(handle_activities_archive(state, req)),
        "activities.delete" => Some(handle_activities_delete(state, req)),
        "activities.inProgress" => Some(handle_activities_in_progress(state, req)),
        "activities.inRange" => Some(handle_activities_in_range(state, req)),
        "activities.search" => Some(handle_activities_search(state, req)),
        _ => None,
    }
}
