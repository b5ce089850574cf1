use crate::ipc::error::{core_err, ok};
use crate::ipc::helpers::{
    backend, id_list, missing, opt_i64, opt_str, report_json, required_i64, required_str, to_json,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Team;
use crate::usecases::Courses;
use serde_json::json;

fn handle_teams_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let teams = state.listings.teams_for_category(b, category_id);
    ok(&req.id, json!({ "teams": to_json(&teams) }))
}

fn handle_teams_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let team_id = match required_i64(req, "teamId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.teams().get_by_id(team_id) {
        Ok(t) => ok(&req.id, json!({ "team": to_json(&t) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_teams_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let team = Team {
        category_id,
        name,
        member_ids: id_list(req, "memberIds").into_iter().collect(),
        description: opt_str(req, "description"),
        color: opt_str(req, "color"),
        ..Team::default()
    };
    match b.teams().create(&team) {
        Ok(id) => {
            state.listings.invalidate_all();
            ok(&req.id, json!({ "teamId": id }))
        }
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_teams_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let team_id = match required_i64(req, "teamId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let repo = b.teams();
    let mut team = match repo.get_by_id(team_id) {
        Ok(Some(t)) => t,
        Ok(None) => return core_err(&req.id, &missing(&b.ids.teams, team_id)),
        Err(e) => return core_err(&req.id, &e),
    };
    if let Some(name) = opt_str(req, "name") {
        team.name = name;
    }
    if let Some(d) = opt_str(req, "description") {
        team.description = Some(d).filter(|s| !s.trim().is_empty());
    }
    if let Some(c) = opt_str(req, "color") {
        team.color = Some(c).filter(|s| !s.trim().is_empty());
    }
    match repo.update(&team) {
        Ok(()) => {
            state.listings.invalidate_all();
            ok(&req.id, json!({ "team": to_json(&team) }))
        }
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_teams_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let team_id = match required_i64(req, "teamId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = Courses::new(b).delete_team(team_id);
    state.listings.invalidate_all();
    match res {
        Ok(report) => ok(&req.id, report_json(&report)),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_teams_for_member(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let user_id = match required_i64(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let category_id = match opt_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match b.teams().list_for_member(user_id, category_id) {
        Ok(teams) => ok(&req.id, json!({ "teams": to_json(&teams) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_teams_membership(state: &mut AppState, req: &Request, add: bool) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let team_id = match required_i64(req, "teamId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let user_id = match required_i64(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let courses = Courses::new(b);
    let res = if add {
        courses.add_member(team_id, user_id)
    } else {
        courses.remove_member(team_id, user_id)
    };
    match res {
        Ok(team) => {
            state.listings.invalidate_all();
            ok(&req.id, json!({ "team": to_json(&team) }))
        }
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_teams_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let category_id = match required_i64(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let query = opt_str(req, "query").unwrap_or_default();
    match b.teams().search(category_id, &query) {
        Ok(teams) => ok(&req.id, json!({ "teams": to_json(&teams) })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teams.list" => Some(handle_teams_list(state, req)),
        "teams.get" => Some(handle_teams_get(state, req)),
        "teams.create" => Some(handle_teams_create(state, req)),
        "teams.update" => Some(handle_teams_update(state, req)),
        "teams.delete" => Some(handle_teams_delete(state, req)),
        "teams.forMember" => Some(handle_teams_for_member(state, req)),
        "teams.addMember" => Some(handle_teams_membership(state, req, true)),
        "teams.removeMember" => Some(handle_teams_membership(state, req, false)),
        "teams.search" => Some(handle_teams_search(state, req)),
        _ => None,
    }
}
