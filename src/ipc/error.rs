use crate::error::CoreError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn core_err(id: &str, e: &CoreError) -> serde_json::Value {
    let details = match e {
        CoreError::Resolution { kind, local_id } => {
            Some(json!({ "kind": kind.as_str(), "localId": local_id }))
        }
        CoreError::Creation { collection } => Some(json!({ "collection": collection })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
