use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use tracing::{debug, warn};

type Handler = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: &[Handler] = &[
    handlers::core::try_handle,
    handlers::students::try_handle,
    handlers::courses::try_handle,
    handlers::enrolments::try_handle,
    handlers::exams::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    debug!(id = %req.id, method = %req.method, "request");
    let resp = HANDLERS
        .iter()
        .find_map(|h| h(state, &req))
        .unwrap_or_else(|| {
            err(
                &req.id,
                "not_implemented",
                format!("unknown method: {}", req.method),
                None,
            )
        });

    if resp.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        warn!(
            id = %req.id,
            method = %req.method,
            code = resp["error"]["code"].as_str().unwrap_or(""),
            "request failed"
        );
    }
    resp
}
