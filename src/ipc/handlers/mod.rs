pub mod core;
pub mod courses;
pub mod enrolments;
pub mod exams;
pub mod students;

use crate::ipc::error::err;
use crate::ipc::types::Request;
use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// `params` as an object. A missing `params` reads as `{}`.
fn params_object(req: &Request) -> Result<Object, Value> {
    match &req.params {
        Value::Null => Ok(Map::new()),
        Value::Object(m) => Ok(m.clone()),
        _ => Err(err(&req.id, "bad_params", "params must be an object", None)),
    }
}

fn id_param(req: &Request) -> Result<String, Value> {
    match req.params.get("id").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(err(&req.id, "bad_params", "missing params.id", None)),
    }
}

/// `{ id, patch }` for the `*.update` methods.
fn update_params(req: &Request) -> Result<(String, Object), Value> {
    let id = id_param(req)?;
    match req.params.get("patch") {
        Some(Value::Object(m)) => Ok((id, m.clone())),
        Some(_) => Err(err(&req.id, "bad_params", "params.patch must be an object", None)),
        None => Err(err(&req.id, "bad_params", "missing params.patch", None)),
    }
}

/// The optional `filter` object of the `*.list` methods.
fn filter_param(req: &Request) -> Result<Object, Value> {
    match req.params.get("filter") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(m)) => Ok(m.clone()),
        Some(_) => Err(err(&req.id, "bad_params", "params.filter must be an object", None)),
    }
}
