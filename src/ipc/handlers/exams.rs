use super::{filter_param, id_param, params_object, update_params};
use crate::ipc::error::{no_workspace, ok, ok_entry, store_err};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::model::Exam;
use crate::store::exams;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExamView<'a> {
    #[serde(flatten)]
    exam: &'a Exam,
    result_in_percentage: f64,
    result_display: String,
}

impl<'a> From<&'a Exam> for ExamView<'a> {
    fn from(x: &'a Exam) -> Self {
        ExamView {
            exam: x,
            result_in_percentage: x.result_in_percentage(),
            result_display: x.result_display(),
        }
    }
}

fn handle_exams_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let params = match params_object(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match helpers::new_exam(&params).and_then(|new| exams::create(conn, new)) {
        Ok(x) => ok_entry(&req.id, "exam", &ExamView::from(&x)),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_exams_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let (id, patch) = match update_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match helpers::exam_patch(&patch).and_then(|p| exams::update(conn, &id, p)) {
        Ok(x) => ok_entry(&req.id, "exam", &ExamView::from(&x)),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_exams_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match exams::delete(conn, &id) {
        Ok(report) => ok_entry(&req.id, "deleted", &report),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_exams_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match exams::get(conn, &id) {
        Ok(x) => ok_entry(&req.id, "exam", &ExamView::from(&x)),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_exams_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "exams": [] }));
    };
    let filter = match filter_param(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    match helpers::exam_filter(&filter).and_then(|f| exams::list(conn, &f)) {
        Ok(rows) => {
            let views: Vec<ExamView> = rows.iter().map(ExamView::from).collect();
            ok_entry(&req.id, "exams", &views)
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.create" => Some(handle_exams_create(state, req)),
        "exams.update" => Some(handle_exams_update(state, req)),
        "exams.delete" => Some(handle_exams_delete(state, req)),
        "exams.get" => Some(handle_exams_get(state, req)),
        "exams.list" => Some(handle_exams_list(state, req)),
        _ => None,
    }
}
