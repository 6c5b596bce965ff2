use crate::domain::ChoiceStatus;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, JsonValue> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Ids arrive either as JSON numbers or as numeric strings (form fields).
fn id_value(v: &JsonValue) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        .filter(|id| *id > 0)
}

fn is_blank(v: &JsonValue) -> bool {
    v.is_null() || v.as_str().map(|s| s.trim().is_empty()).unwrap_or(false)
}

pub fn required_id(req: &Request, key: &str) -> Result<i64, JsonValue> {
    match req.params.get(key) {
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
        Some(v) if is_blank(v) => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
        Some(v) => id_value(v).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a positive integer id", key),
                None,
            )
        }),
    }
}

/// Missing, null and empty-string values all read as "no id".
pub fn optional_id(v: Option<&JsonValue>) -> Result<Option<i64>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if is_blank(v) => Ok(None),
        Some(v) => id_value(v).map(Some).ok_or("must be a positive integer id"),
    }
}

pub fn required_str(req: &Request, key: &str) -> Result<String, JsonValue> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Reads a list of ids given as a JSON array, or as a string holding a JSON
/// array. An unparseable string yields an empty list.
pub fn parse_id_list(v: Option<&JsonValue>) -> Result<Vec<i64>, &'static str> {
    let decoded;
    let arr = match v {
        None => return Ok(Vec::new()),
        Some(v) if v.is_null() => return Ok(Vec::new()),
        Some(JsonValue::String(raw)) => {
            decoded = serde_json::from_str::<JsonValue>(raw).unwrap_or(JsonValue::Null);
            match decoded.as_array() {
                Some(a) => a,
                None => return Ok(Vec::new()),
            }
        }
        Some(v) => v.as_array().ok_or("must be an array of ids")?,
    };
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        out.push(id_value(item).ok_or("must be an array of ids")?);
    }
    Ok(out)
}

pub fn parse_status_list(v: Option<&JsonValue>) -> Result<Vec<ChoiceStatus>, String> {
    match v {
        None => Ok(Vec::new()),
        Some(v) if v.is_null() => Ok(Vec::new()),
        Some(v) => {
            let arr = v
                .as_array()
                .ok_or_else(|| "must be an array of statuses".to_string())?;
            let mut out = Vec::with_capacity(arr.len());
            for item in arr {
                let s = item
                    .as_str()
                    .ok_or_else(|| "must be an array of statuses".to_string())?;
                let status = s.parse::<ChoiceStatus>()?;
                if !out.contains(&status) {
                    out.push(status);
                }
            }
            Ok(out)
        }
    }
}

pub fn parse_opt_i64(v: Option<&JsonValue>) -> Result<Option<i64>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or("must be integer or null"),
    }
}

/// Deserializes `params[key]` into a typed input record.
pub fn parse_input<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, JsonValue> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid {}: {}", key, e), None))
}

pub fn require_name(req: &Request, key: &str, name: &str) -> Result<String, JsonValue> {
    let name = name.trim();
    if name.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{}.name must not be empty", key),
            None,
        ));
    }
    Ok(name.to_string())
}
