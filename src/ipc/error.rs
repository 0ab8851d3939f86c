use crate::store::StoreError;
use serde::Serialize;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

/// `{ key: value }` as the result, or an `internal` error if `value` does not
/// serialize.
pub fn ok_entry<T: Serialize>(id: &str, key: &str, value: &T) -> serde_json::Value {
    match serde_json::to_value(value) {
        Ok(v) => {
            let mut result = serde_json::Map::new();
            result.insert(key.to_string(), v);
            ok(id, serde_json::Value::Object(result))
        }
        Err(e) => err(id, "internal", e.to_string(), None),
    }
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

pub fn store_err(id: &str, e: &StoreError) -> serde_json::Value {
    match e {
        StoreError::ValidationFailed {
            constraint,
            message,
        } => err(
            id,
            "validation_failed",
            message.clone(),
            Some(json!({ "constraint": constraint })),
        ),
        StoreError::NotFound { kind, id: missing } => err(
            id,
            "not_found",
            e.to_string(),
            Some(json!({ "kind": kind, "id": missing })),
        ),
        StoreError::Db(db) => err(id, "db_query_failed", db.to_string(), None),
    }
}

pub fn no_workspace(id: &str) -> serde_json::Value {
    err(id, "no_workspace", "select a workspace first", None)
}
