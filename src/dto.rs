//! Wire-shape helpers shared by every entity mapping.
//!
//! Remote records use snake_case field names, but older clients wrote camelCase and
//! scalar types drift (numbers arrive as strings, booleans as `"true"` or `1`). Readers
//! here accept all of those; writers always emit the canonical snake_case shape.

use crate::store::{Record, ID_FIELD};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Look a field up by its canonical name, then by any alias.
pub fn field<'a>(r: &'a Record, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|n| r.get(*n))
        .find(|v| !v.is_null())
}

pub fn remote_id(r: &Record) -> Option<String> {
    field(r, &[ID_FIELD, "id"]).and_then(coerce_string)
}

pub fn coerce_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn coerce_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let t = s.trim();
            t.parse::<i64>().ok().or_else(|| {
                t.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub fn coerce_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

pub fn coerce_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts a JSON array, or a comma-separated string, of integer ids.
pub fn coerce_id_list(v: &Value) -> Vec<i64> {
    match v {
        Value::Array(items) => items.iter().filter_map(coerce_i64).collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|p| p.trim().parse::<i64>().ok())
            .collect(),
        other => coerce_i64(other).into_iter().collect(),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD[ HH:MM:SS]`, or epoch milliseconds.
pub fn coerce_datetime(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

pub fn str_field(r: &Record, names: &[&str]) -> Option<String> {
    field(r, names).and_then(coerce_string)
}

pub fn i64_field(r: &Record, names: &[&str]) -> Option<i64> {
    field(r, names).and_then(coerce_i64)
}

pub fn f64_field(r: &Record, names: &[&str]) -> Option<f64> {
    field(r, names).and_then(coerce_f64)
}

pub fn bool_field(r: &Record, names: &[&str]) -> Option<bool> {
    field(r, names).and_then(coerce_bool)
}

pub fn datetime_field(r: &Record, names: &[&str]) -> Option<DateTime<Utc>> {
    field(r, names).and_then(coerce_datetime)
}

pub fn datetime_value(dt: Option<&DateTime<Utc>>) -> Value {
    dt.map(|d| Value::String(d.to_rfc3339()))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn field_prefers_canonical_name_then_alias() {
        let r = rec(json!({ "categoryId": "12", "category_id": null }));
        assert_eq!(i64_field(&r, &["category_id", "categoryId"]), Some(12));
        let r = rec(json!({ "category_id": 3, "categoryId": 9 }));
        assert_eq!(i64_field(&r, &["category_id", "categoryId"]), Some(3));
    }

    #[test]
    fn scalars_coerce_across_types() {
        assert_eq!(coerce_i64(&json!("4")), Some(4));
        assert_eq!(coerce_i64(&json!(4.0)), Some(4));
        assert_eq!(coerce_i64(&json!("4.5")), None);
        assert_eq!(coerce_f64(&json!("4.5")), Some(4.5));
        assert_eq!(coerce_bool(&json!("TRUE")), Some(true));
        assert_eq!(coerce_bool(&json!(0)), Some(false));
        assert_eq!(coerce_bool(&json!("maybe")), None);
        assert_eq!(coerce_string(&json!(17)).as_deref(), Some("17"));
    }

    #[test]
    fn id_lists_accept_arrays_and_csv() {
        assert_eq!(coerce_id_list(&json!([1, "2", 3.0])), vec![1, 2, 3]);
        assert_eq!(coerce_id_list(&json!("5, 6,x")), vec![5, 6]);
        assert_eq!(coerce_id_list(&json!(9)), vec![9]);
        assert!(coerce_id_list(&Value::Null).is_empty());
    }

    #[test]
    fn datetimes_accept_common_forms() {
        let a = parse_datetime("2026-03-01T10:00:00Z").expect("rfc3339");
        let b = parse_datetime("2026-03-01 10:00:00").expect("sql form");
        assert_eq!(a, b);
        let d = parse_datetime("2026-03-01").expect("date");
        assert_eq!(d.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        let ms = coerce_datetime(&json!(a.timestamp_millis())).expect("millis");
        assert_eq!(ms, a);
        assert_eq!(parse_datetime("soon"), None);
    }
}
