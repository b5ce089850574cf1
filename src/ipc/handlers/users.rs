use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{backend, missing, opt_str, required_i64, required_str, to_json};
use crate::ipc::types::{AppState, Request};
use crate::model::{Role, User};
use serde_json::json;

fn role_param(req: &Request) -> Result<Option<Role>, serde_json::Value> {
    match opt_str(req, "role") {
        None => Ok(None),
        Some(s) => Role::parse(&s).map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("role must be professor or student, got {s}"),
                None,
            )
        }),
    }
}

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let role = match role_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.users().list(role) {
        Ok(users) => ok(&req.id, json!({ "users": to_json(&users) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_users_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let user_id = match required_i64(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.users().get_by_id(user_id) {
        Ok(u) => ok(&req.id, json!({ "user": to_json(&u) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_users_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let role = match role_param(req) {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };
    let user = User {
        name,
        email,
        role,
        ..User::default()
    };
    match b.users().create(&user) {
        Ok(id) => ok(&req.id, json!({ "userId": id })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_users_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let user_id = match required_i64(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let role = match role_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let repo = b.users();
    let mut user = match repo.get_by_id(user_id) {
        Ok(Some(u)) => u,
        Ok(None) => return core_err(&req.id, &missing(&b.ids.users, user_id)),
        Err(e) => return core_err(&req.id, &e),
    };
    if let Some(name) = opt_str(req, "name") {
        user.name = name;
    }
    if let Some(r) = role {
        user.role = r;
    }
    match repo.update(&user) {
        Ok(()) => ok(&req.id, json!({ "user": to_json(&user) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_users_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let user_id = match required_i64(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.users().delete(user_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => core_err(&req.id, &e),
    }
}

/// Unknown emails still get a stable provisional id so callers can refer to the person.
fn handle_users_find_by_email(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let repo = b.users();
    match repo.find_by_email(&email) {
        Ok(Some(u)) => ok(&req.id, json!({ "user": to_json(&u), "provisionalId": null })),
        Ok(None) => ok(
            &req.id,
            json!({ "user": null, "provisionalId": repo.provisional_id(&email) }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_users_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let query = opt_str(req, "query").unwrap_or_default();
    match b.users().search(&query) {
        Ok(users) => ok(&req.id, json!({ "users": to_json(&users) })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(handle_users_list(state, req)),
        "users.get" => Some(handle_users_get(state, req)),
        "users.create" => Some(handle_users_create(state, req)),
        "users.update" => Some(handle_users_update(state, req)),
        "users.delete" => Some(handle_users_delete(state, req)),
        "users.findByEmail" => Some(handle_users_find_by_email(state, req)),
        "users.search" => Some(handle_users_search(state, req)),
        _ => None,
    }
}
