use crate::gateway::GatewayError;
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

/// Database failures report `db_code`; lookups and validation keep their own
/// codes.
pub fn gateway_err(id: &str, e: &GatewayError, db_code: &str) -> serde_json::Value {
    match e {
        GatewayError::Db(inner) => err(id, db_code, inner.to_string(), None),
        other => err(id, other.code(), other.to_string(), None),
    }
}
