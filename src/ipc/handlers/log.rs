use crate::config;
use crate::domain::LogInput;
use crate::gateway::selections;
use crate::ipc::error::{err, gateway_err, ok};
use crate::ipc::helpers::{db_conn, parse_input, parse_opt_i64};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn handle_log_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let page = match parse_opt_i64(req.params.get("page")) {
        Ok(v) => v.unwrap_or(1),
        Err(m) => return err(&req.id, "bad_params", format!("page {}", m), None),
    };
    let limit = match parse_opt_i64(req.params.get("limit")) {
        Ok(Some(v)) if v > 0 && v <= config::MAX_LOG_PAGE_SIZE => v,
        Ok(Some(_)) => {
            return err(
                &req.id,
                "bad_params",
                format!("limit must be between 1 and {}", config::MAX_LOG_PAGE_SIZE),
                None,
            )
        }
        Ok(None) => config::load_selection_setup(conn).log_page_size,
        Err(m) => return err(&req.id, "bad_params", format!("limit {}", m), None),
    };
    match selections::select_all_logs(conn, page, limit) {
        Ok(rows) => ok(
            &req.id,
            json!({ "page": page.max(1), "limit": limit, "entries": rows }),
        ),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_log_append(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let input: LogInput = match parse_input(req, "input") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if input.action.trim().is_empty() {
        return err(&req.id, "bad_params", "input.action must not be empty", None);
    }
    match selections::insert_log(conn, &input) {
        Ok(id) => {
            info!(
                log_id = id,
                student_id = input.student_id,
                action = %input.action,
                "selection log appended"
            );
            ok(&req.id, json!({ "logId": id }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "log.list" => Some(handle_log_list(state, req)),
        "log.append" => Some(handle_log_append(state, req)),
        _ => None,
    }
}
