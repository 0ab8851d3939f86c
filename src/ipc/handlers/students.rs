use super::{filter_param, id_param, params_object, update_params};
use crate::ipc::error::{no_workspace, ok, ok_entry, store_err};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::store::students;
use serde_json::json;

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let params = match params_object(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let result = helpers::new_student(&params).and_then(|new| students::create(conn, new));
    match result {
        Ok(s) => ok_entry(&req.id, "student", &s),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let (id, patch) = match update_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = helpers::student_patch(&patch).and_then(|p| students::update(conn, &id, p));
    match result {
        Ok(s) => ok_entry(&req.id, "student", &s),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match students::delete(conn, &id) {
        Ok(report) => ok_entry(&req.id, "deleted", &report),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match students::get(conn, &id) {
        Ok(s) => ok_entry(&req.id, "student", &s),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    let filter = match filter_param(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let result = helpers::student_filter(&filter).and_then(|f| students::list(conn, &f));
    match result {
        Ok(rows) => ok_entry(&req.id, "students", &rows),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        _ => None,
    }
}
