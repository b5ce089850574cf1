use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend, opt_bool, opt_str, param};
use crate::ipc::types::{AppState, Request};
use crate::registry::EntityKind;
use crate::repo::Backend;
use crate::store::{CreateShape, MemoryRecordStore, SqliteRecordStore};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "inMemory": state.workspace.is_none() && state.backend.is_some(),
            "cacheTtlSecs": state.config.cache_ttl.num_seconds(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    if opt_bool(req, "inMemory") {
        let shape = match opt_str(req, "createShape") {
            None => CreateShape::default(),
            Some(s) => match CreateShape::parse(&s) {
                Some(shape) => shape,
                None => return err(&req.id, "bad_params", format!("unknown createShape: {s}"), None),
            },
        };
        state.workspace = None;
        state.backend = Some(Backend::new(Box::new(MemoryRecordStore::with_create_shape(shape))));
        state.listings.invalidate_all();
        info!(?shape, "opened in-memory workspace");
        return ok(&req.id, json!({ "workspacePath": null, "inMemory": true }));
    }

    let p = param(req, "path").and_then(|v| v.as_str()).map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match SqliteRecordStore::open(&path) {
        Ok(store) => {
            state.workspace = Some(path.clone());
            state.backend = Some(Backend::new(Box::new(store)));
            state.listings.invalidate_all();
            info!(workspace = %path.to_string_lossy(), "opened workspace");
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_cache_invalidate(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.listings.invalidate_all();
    if let Some(b) = state.backend.as_ref() {
        b.ids.invalidate_indexes();
    }
    ok(&req.id, json!({}))
}

/// Report what the registry currently maps for a kind. Never touches the store.
fn handle_ids_resolve(state: &mut AppState, req: &Request) -> serde_json::Value {
    let b = match backend(&state.backend, req) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let Some(kind) = opt_str(req, "kind").and_then(|k| EntityKind::parse(&k)) else {
        return err(
            &req.id,
            "bad_params",
            "kind must be one of category, team, activity, user",
            None,
        );
    };
    let ids = b.ids.for_kind(kind);

    if let Some(remote) = opt_str(req, "remoteId") {
        return ok(
            &req.id,
            json!({
                "kind": kind.as_str(),
                "remoteId": remote,
                "localId": ids.resolve_local(&remote),
            }),
        );
    }
    let local = match param(req, "localId").and_then(crate::dto::coerce_i64) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing localId or remoteId", None),
    };
    ok(
        &req.id,
        json!({
            "kind": kind.as_str(),
            "localId": local,
            "remoteId": ids.resolve_remote(local),
            "indexed": ids.is_indexed(),
            "mapped": ids.mapped(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "cache.invalidate" => Some(handle_cache_invalidate(state, req)),
        "ids.resolve" => Some(handle_ids_resolve(state, req)),
        _ => None,
    }
}
