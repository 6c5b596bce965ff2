use crate::domain::BlockInput;
use crate::gateway::blocks;
use crate::ipc::error::{err, gateway_err, ok};
use crate::ipc::helpers::{db_conn, parse_input, require_name, required_id};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn handle_blocks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "blocks": [] }));
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match blocks::select_blocks_by_school_year(conn, school_year_id) {
        Ok(rows) => ok(&req.id, json!({ "blocks": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_blocks_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let block = match blocks::select_block(conn, block_id) {
        Ok(Some(b)) => b,
        Ok(None) => return err(&req.id, "not_found", "block not found", None),
        Err(e) => return gateway_err(&req.id, &e, "db_query_failed"),
    };
    match blocks::select_courses_by_block(conn, block_id) {
        Ok(courses) => ok(&req.id, json!({ "block": block, "courses": courses })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_blocks_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mut input: BlockInput = match parse_input(req, "input") {
        Ok(v) => v,
        Err(e) => return e,
    };
    input.name = match require_name(req, "input", &input.name) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match blocks::insert_block(conn, &input) {
        Ok(id) => {
            info!(block_id = id, school_year_id = input.school_year_id, "block created");
            ok(&req.id, json!({ "blockId": id }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_blocks_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut input: BlockInput = match parse_input(req, "input") {
        Ok(v) => v,
        Err(e) => return e,
    };
    input.name = match require_name(req, "input", &input.name) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match blocks::update_block(conn, block_id, &input) {
        Ok(0) => err(&req.id, "not_found", "block not found", None),
        Ok(_) => {
            info!(block_id, "block updated");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_update_failed"),
    }
}

fn handle_blocks_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match blocks::delete_block(conn, block_id) {
        Ok(()) => {
            info!(block_id, "block deleted");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_delete_failed"),
    }
}

fn handle_block_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match blocks::select_courses_by_block(conn, block_id) {
        Ok(rows) => ok(&req.id, json!({ "courses": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_block_courses_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_id = match required_id(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match blocks::insert_block_course(conn, block_id, course_id) {
        Ok(created) => {
            info!(block_id, course_id, created, "course added to block");
            ok(&req.id, json!({ "created": created }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_block_courses_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_id = match required_id(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match blocks::delete_block_course(conn, block_id, course_id) {
        Ok(0) => err(&req.id, "not_found", "course is not part of this block", None),
        Ok(_) => {
            info!(block_id, course_id, "course removed from block");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_delete_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "blocks.list" => Some(handle_blocks_list(state, req)),
        "blocks.open" => Some(handle_blocks_open(state, req)),
        "blocks.create" => Some(handle_blocks_create(state, req)),
        "blocks.update" => Some(handle_blocks_update(state, req)),
        "blocks.delete" => Some(handle_blocks_delete(state, req)),
        "blocks.courses.list" => Some(handle_block_courses_list(state, req)),
        "blocks.courses.add" => Some(handle_block_courses_add(state, req)),
        "blocks.courses.remove" => Some(handle_block_courses_remove(state, req)),
        _ => None,
    }
}
