use super::{filter_param, id_param, params_object, update_params};
use crate::ipc::error::{no_workspace, ok, ok_entry, store_err};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::store::courses;
use serde_json::json;

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let params = match params_object(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match helpers::new_course(&params).and_then(|new| courses::create(conn, new)) {
        Ok(c) => ok_entry(&req.id, "course", &c),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let (id, patch) = match update_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match helpers::course_patch(&patch).and_then(|p| courses::update(conn, &id, p)) {
        Ok(c) => ok_entry(&req.id, "course", &c),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match courses::delete(conn, &id) {
        Ok(report) => ok_entry(&req.id, "deleted", &report),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_courses_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match courses::get(conn, &id) {
        Ok(c) => ok_entry(&req.id, "course", &c),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "courses": [] }));
    };
    let filter = match filter_param(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    match helpers::course_filter(&filter).and_then(|f| courses::list(conn, &f)) {
        Ok(rows) => ok_entry(&req.id, "courses", &rows),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.update" => Some(handle_courses_update(state, req)),
        "courses.delete" => Some(handle_courses_delete(state, req)),
        "courses.get" => Some(handle_courses_get(state, req)),
        "courses.list" => Some(handle_courses_list(state, req)),
        _ => None,
    }
}
