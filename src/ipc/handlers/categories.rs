use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{
    backend, id_list, missing, opt_i64, opt_str, report_json, required_i64, required_str, to_json,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AssignmentMode, Category};
use crate::usecases::Courses;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

fn mode_param(req: &Request) -> Result<Option<AssignmentMode>, serde_json::Value> {
    match opt_str(req, "mode") {
        None => Ok(None),
        Some(s) => AssignmentMode::parse(&s).map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("mode must be manual or random, got {s}"),
                None,
            )
        }),
    }
}

fn handle_categories_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let course_id = match required_i64(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let categories = state.listings.categories_for_course(b, course_id);
    ok(&req.id, json!({ "categories": to_json(&categories) }))
}

fn handle_categories_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    if let Some(remote) = opt_str(req, "remoteId") {
        return match b.categories().get_by_remote_id(&remote) {
            Ok(c) => ok(&req.id, json!({ "category": to_json(&c) })),
            Err(e) => core_err(&req.id, &e),
        };
    }
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.categories().get_by_id(category_id) {
        Ok(c) => ok(&req.id, json!({ "category": to_json(&c) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let course_id = match required_i64(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mode = match mode_param(req) {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };
    let max_members = match opt_i64(req, "maxMembers") {
        Ok(v) => v.unwrap_or(1),
        Err(e) => return e,
    };

    let category = Category {
        name,
        course_id,
        mode,
        max_members,
        ..Category::default()
    };
    match b.categories().create(&category) {
        Ok(id) => {
            state.listings.invalidate_all();
            ok(&req.id, json!({ "categoryId": id }))
        }
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let repo = b.categories();
    let mut category = match repo.get_by_id(category_id) {
        Ok(Some(c)) => c,
        Ok(None) => return core_err(&req.id, &missing(&b.ids.categories, category_id)),
        Err(e) => return core_err(&req.id, &e),
    };

    if let Some(name) = opt_str(req, "name") {
        category.name = name;
    }
    match mode_param(req) {
        Ok(Some(mode)) => category.mode = mode,
        Ok(None) => {}
        Err(e) => return e,
    }
    match opt_i64(req, "maxMembers") {
        Ok(Some(max)) => category.max_members = max,
        Ok(None) => {}
        Err(e) => return e,
    }

    match repo.update(&category) {
        Ok(()) => {
            state.listings.invalidate_all();
            ok(&req.id, json!({ "category": to_json(&category) }))
        }
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = Courses::new(b).delete_category(category_id);
    state.listings.invalidate_all();
    match res {
        Ok(report) => ok(&req.id, report_json(&report)),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_categories_generate_teams(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_ids = id_list(req, "studentIds");
    let seed = match opt_i64(req, "seed") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let courses = Courses::new(b);
    let res = match seed {
        Some(s) => courses.generate_teams(category_id, &student_ids, &mut StdRng::seed_from_u64(s as u64)),
        None => courses.generate_teams(category_id, &student_ids, &mut rand::rng()),
    };
    state.listings.invalidate_all();
    match res {
        Ok(team_ids) => ok(&req.id, json!({ "teamIds": team_ids })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.list" => Some(handle_categories_list(state, req)),
        "categories.get" => Some(handle_categories_get(state, req)),
        "categories.create" => Some(handle_categories_create(state, req)),
        "categories.update" => Some(handle_categories_update(state, req)),
        "categories.delete" => Some(handle_categories_delete(state, req)),
        "categories.generateTeams" => Some(handle_categories_generate_teams(state, req)),
        _ => None,
    }
}
