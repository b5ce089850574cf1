//! Parameter extraction shared by the handler families.
//!
//! Every helper returns the ready-made error response on failure so handlers can bail
//! out with a single `match`.

use crate::cascade::CascadeReport;
use crate::dto;
use crate::error::CoreError;
use crate::ipc::error::err;
use crate::ipc::types::Request;
use crate::registry::IdRegistry;
use crate::repo::Backend;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

pub fn backend<'a>(slot: &'a Option<Backend>, req: &Request) -> Result<&'a Backend, Value> {
    slot.as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn param<'a>(req: &'a Request, key: &str) -> Option<&'a Value> {
    req.params.get(key).filter(|v| !v.is_null())
}

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    param(req, key)
        .and_then(dto::coerce_string)
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, Value> {
    match param(req, key) {
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
        Some(v) => dto::coerce_i64(v).ok_or_else(|| {
            err(&req.id, "bad_params", format!("{} must be an integer", key), None)
        }),
    }
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, Value> {
    match param(req, key) {
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
        Some(v) => dto::coerce_f64(v)
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be a number", key), None)),
    }
}

pub fn opt_str(req: &Request, key: &str) -> Option<String> {
    param(req, key).and_then(dto::coerce_string)
}

pub fn opt_i64(req: &Request, key: &str) -> Result<Option<i64>, Value> {
    match param(req, key) {
        None => Ok(None),
        Some(v) => dto::coerce_i64(v).map(Some).ok_or_else(|| {
            err(&req.id, "bad_params", format!("{} must be an integer", key), None)
        }),
    }
}

pub fn opt_bool(req: &Request, key: &str) -> bool {
    param(req, key).and_then(dto::coerce_bool).unwrap_or(false)
}

/// Absent is `None`; present but unreadable is a `bad_params` error.
pub fn opt_datetime(req: &Request, key: &str) -> Result<Option<DateTime<Utc>>, Value> {
    match param(req, key) {
        None => Ok(None),
        Some(v) => dto::coerce_datetime(v).map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} is not a recognised date", key),
                None,
            )
        }),
    }
}

pub fn required_datetime(req: &Request, key: &str) -> Result<DateTime<Utc>, Value> {
    opt_datetime(req, key)?
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn id_list(req: &Request, key: &str) -> Vec<i64> {
    param(req, key).map(dto::coerce_id_list).unwrap_or_default()
}

pub fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn report_json(report: &CascadeReport) -> Value {
    let failed: Vec<Value> = report
        .failed
        .iter()
        .map(|f| {
            json!({
                "item": f.item,
                "code": f.error.code(),
                "message": f.error.to_string(),
            })
        })
        .collect();
    json!({
        "complete": report.is_complete(),
        "succeeded": report.succeeded,
        "failed": failed,
    })
}

/// Error for a local id that did not load: unmapped ids are resolution failures,
/// mapped ones point at a record that no longer exists.
pub fn missing(ids: &IdRegistry, local_id: i64) -> CoreError {
    if ids.resolve_remote(local_id).is_none() {
        CoreError::Resolution {
            kind: ids.kind(),
            local_id,
        }
    } else {
        CoreError::not_found(format!("{} {}", ids.kind(), local_id))
    }
}
