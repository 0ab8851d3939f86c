use super::{filter_param, id_param, params_object, update_params};
use crate::ipc::error::{no_workspace, ok, ok_entry, store_err};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::model::Enrolment;
use crate::store::enrolments;
use serde::Serialize;
use serde_json::json;

/// An enrolment plus its derived timeliness, as sent over the wire.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrolmentView<'a> {
    #[serde(flatten)]
    enrolment: &'a Enrolment,
    extra_time: Option<i64>,
    extra_time_label: String,
}

impl<'a> From<&'a Enrolment> for EnrolmentView<'a> {
    fn from(e: &'a Enrolment) -> Self {
        EnrolmentView {
            enrolment: e,
            extra_time: e.extra_time(),
            extra_time_label: e.timeliness().to_string(),
        }
    }
}

fn handle_enrolments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let params = match params_object(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match helpers::new_enrolment(&params).and_then(|new| enrolments::create(conn, new)) {
        Ok(e) => ok_entry(&req.id, "enrolment", &EnrolmentView::from(&e)),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_enrolments_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let (id, patch) = match update_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match helpers::enrolment_patch(&patch).and_then(|p| enrolments::update(conn, &id, p)) {
        Ok(e) => ok_entry(&req.id, "enrolment", &EnrolmentView::from(&e)),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_enrolments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match enrolments::delete(conn, &id) {
        Ok(report) => ok_entry(&req.id, "deleted", &report),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_enrolments_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match enrolments::get(conn, &id) {
        Ok(e) => ok_entry(&req.id, "enrolment", &EnrolmentView::from(&e)),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_enrolments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "enrolments": [] }));
    };
    let filter = match filter_param(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    match helpers::enrolment_filter(&filter).and_then(|f| enrolments::list(conn, &f)) {
        Ok(rows) => {
            let views: Vec<EnrolmentView> = rows.iter().map(EnrolmentView::from).collect();
            ok_entry(&req.id, "enrolments", &views)
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "enrolments.create" => Some(handle_enrolments_create(state, req)),
        "enrolments.update" => Some(handle_enrolments_update(state, req)),
        "enrolments.delete" => Some(handle_enrolments_delete(state, req)),
        "enrolments.get" => Some(handle_enrolments_get(state, req)),
        "enrolments.list" => Some(handle_enrolments_list(state, req)),
        _ => None,
    }
}
