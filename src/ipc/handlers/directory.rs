use crate::gateway::directory;
use crate::ipc::error::{err, gateway_err, ok};
use crate::ipc::helpers::{db_conn, parse_opt_i64, required_id, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn handle_school_years_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let sequence_number = match parse_opt_i64(req.params.get("sequenceNumber")) {
        Ok(v) => v.unwrap_or(0),
        Err(m) => return err(&req.id, "bad_params", format!("sequenceNumber {}", m), None),
    };
    match directory::insert_school_year(conn, &name, sequence_number) {
        Ok(id) => {
            info!(school_year_id = id, "school year created");
            ok(&req.id, json!({ "schoolYearId": id }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_school_years_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "schoolYears": [] }));
    };
    match directory::select_school_years(conn) {
        Ok(rows) => ok(&req.id, json!({ "schoolYears": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_people_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let surname = match required_str(req, "surname") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let preferred_name = match required_str(req, "preferredName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match directory::insert_person(conn, &surname, &preferred_name) {
        Ok(id) => ok(&req.id, json!({ "personId": id })),
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name_short = match required_str(req, "nameShort") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match directory::insert_course(conn, school_year_id, &name, &name_short) {
        Ok(id) => ok(&req.id, json!({ "courseId": id })),
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match directory::select_courses_by_school_year(conn, school_year_id) {
        Ok(rows) => ok(&req.id, json!({ "courses": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_enrolments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let person_id = match required_id(req, "personId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match directory::insert_enrolment(conn, person_id, school_year_id) {
        Ok(id) => ok(&req.id, json!({ "enrolmentId": id })),
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schoolYears.create" => Some(handle_school_years_create(state, req)),
        "schoolYears.list" => Some(handle_school_years_list(state, req)),
        "people.create" => Some(handle_people_create(state, req)),
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.list" => Some(handle_courses_list(state, req)),
        "enrolments.create" => Some(handle_enrolments_create(state, req)),
        _ => None,
    }
}
