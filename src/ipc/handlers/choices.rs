use crate::config;
use crate::domain::{ChoiceInput, ChoiceOffering, ChoiceStatus};
use crate::gateway::selections;
use crate::ipc::error::{err, gateway_err, ok};
use crate::ipc::helpers::{
    db_conn, optional_id, parse_id_list, parse_input, parse_status_list, required_id,
};
use crate::ipc::types::{AppState, Request};
use crate::selection::{self, ChosenCourse, Decision, Submission};
use serde_json::json;
use tracing::info;

fn handle_choices_by_block_and_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::select_choices_by_block_and_person(conn, block_id, student_id) {
        Ok(rows) => ok(&req.id, json!({ "choices": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_choices_by_course(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let course_id = match required_id(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exclude = match parse_status_list(req.params.get("excludeStatuses")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("excludeStatuses {}", m), None),
    };
    match selections::select_choices_by_course(conn, course_id, &exclude) {
        Ok(rows) => ok(&req.id, json!({ "choices": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_choices_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let course_id = match required_id(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::select_choice_by_course_and_person(conn, course_id, student_id) {
        Ok(choice) => ok(&req.id, json!({ "choice": choice })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_choices_unoffered(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let offering_id = match required_id(req, "offeringId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::select_unoffered_choices_by_person(conn, offering_id, student_id) {
        Ok(rows) => ok(&req.id, json!({ "choices": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_choices_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let input: ChoiceInput = match parse_input(req, "input") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::insert_choice(conn, &input) {
        Ok(id) => {
            info!(
                choice_id = id,
                student_id = input.student_id,
                course_id = input.course_id,
                status = %input.status,
                "choice created"
            );
            ok(&req.id, json!({ "choiceId": id }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_choices_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let input: ChoiceInput = match parse_input(req, "input") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::update_choice(conn, &input) {
        Ok(0) => err(&req.id, "not_found", "choice not found", None),
        Ok(_) => {
            info!(
                student_id = input.student_id,
                course_id = input.course_id,
                status = %input.status,
                "choice updated"
            );
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_update_failed"),
    }
}

fn handle_choices_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let choice_id = match required_id(req, "choiceId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::delete_choice(conn, choice_id) {
        Ok(0) => err(&req.id, "not_found", "choice not found", None),
        Ok(_) => {
            info!(choice_id, "choice deleted");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_delete_failed"),
    }
}

fn handle_choices_remove_unselected(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let keep = match parse_id_list(req.params.get("keepCourseIds")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("keepCourseIds {}", m), None),
    };
    match selections::update_unselected_choices_by_school_year_and_person(
        conn,
        school_year_id,
        student_id,
        &keep,
    ) {
        Ok(n) => {
            info!(school_year_id, student_id, removed = n, "unselected choices removed");
            ok(&req.id, json!({ "removed": n }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_update_failed"),
    }
}

fn parse_chosen_courses(req: &Request) -> Result<Vec<ChosenCourse>, serde_json::Value> {
    let Some(arr) = req.params.get("courses").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing/invalid courses", None));
    };
    let mut out = Vec::with_capacity(arr.len());
    for (i, item) in arr.iter().enumerate() {
        let course_id = match optional_id(item.get("courseId")) {
            Ok(Some(v)) => v,
            Ok(None) | Err(_) => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("courses[{}].courseId must be a positive integer id", i),
                    None,
                ))
            }
        };
        let block_id = optional_id(item.get("blockId")).map_err(|m| {
            err(
                &req.id,
                "bad_params",
                format!("courses[{}].blockId {}", i, m),
                None,
            )
        })?;
        out.push(ChosenCourse {
            course_id,
            block_id,
        });
    }
    Ok(out)
}

fn handle_choices_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let offering_id = match required_id(req, "offeringId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed_by_id = match required_id(req, "changedById") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let courses = match parse_chosen_courses(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status = match req.params.get("status").and_then(|v| v.as_str()) {
        Some(s) => match s.parse::<ChoiceStatus>() {
            Ok(v) => v,
            Err(m) => return err(&req.id, "bad_params", format!("status: {}", m), None),
        },
        None => config::load_selection_setup(conn).default_submit_status,
    };

    let submission = Submission {
        school_year_id,
        student_id,
        offering_id,
        changed_by_id,
        status,
        courses,
    };
    match selection::submit_choices(conn, &submission) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "inserted": summary.inserted,
                "updated": summary.updated,
                "removed": summary.removed,
                "logId": summary.log_id,
            }),
        ),
        Err(e) => gateway_err(&req.id, &e, "db_update_failed"),
    }
}

fn handle_choices_decide(state: &mut AppState, req: &Request, decision: Decision) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_id = match required_id(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let changed_by_id = match required_id(req, "changedById") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selection::decide_choice(conn, student_id, course_id, changed_by_id, decision) {
        Ok(choice) => ok(&req.id, json!({ "choice": choice })),
        Err(e) => gateway_err(&req.id, &e, "db_update_failed"),
    }
}

fn handle_choice_offerings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::select_choice_offering(conn, school_year_id, student_id) {
        Ok(mapping) => ok(&req.id, json!({ "choiceOffering": mapping })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_choice_offerings_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mapping = ChoiceOffering {
        school_year_id: match required_id(req, "schoolYearId") {
            Ok(v) => v,
            Err(e) => return e,
        },
        student_id: match required_id(req, "studentId") {
            Ok(v) => v,
            Err(e) => return e,
        },
        offering_id: match required_id(req, "offeringId") {
            Ok(v) => v,
            Err(e) => return e,
        },
    };
    match selections::insert_choice_offering(conn, &mapping) {
        Ok(()) => {
            info!(
                school_year_id = mapping.school_year_id,
                student_id = mapping.student_id,
                offering_id = mapping.offering_id,
                "choice offering set"
            );
            ok(&req.id, json!({ "choiceOffering": mapping }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_choice_offerings_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::delete_choice_offering(conn, school_year_id, student_id) {
        Ok(n) => {
            info!(school_year_id, student_id, deleted = n, "choice offering cleared");
            ok(&req.id, json!({ "deleted": n }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_delete_failed"),
    }
}

fn handle_students_details(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_id(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match selections::select_student_details(conn, student_id) {
        Ok(Some(details)) => ok(&req.id, json!({ "student": details })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "choices.byBlockAndStudent" => Some(handle_choices_by_block_and_student(state, req)),
        "choices.byCourse" => Some(handle_choices_by_course(state, req)),
        "choices.open" => Some(handle_choices_open(state, req)),
        "choices.unoffered" => Some(handle_choices_unoffered(state, req)),
        "choices.create" => Some(handle_choices_create(state, req)),
        "choices.update" => Some(handle_choices_update(state, req)),
        "choices.delete" => Some(handle_choices_delete(state, req)),
        "choices.removeUnselected" => Some(handle_choices_remove_unselected(state, req)),
        "choices.submit" => Some(handle_choices_submit(state, req)),
        "choices.approve" => Some(handle_choices_decide(state, req, Decision::Approve)),
        "choices.reject" => Some(handle_choices_decide(state, req, Decision::Reject)),
        "choiceOfferings.get" => Some(handle_choice_offerings_get(state, req)),
        "choiceOfferings.set" => Some(handle_choice_offerings_set(state, req)),
        "choiceOfferings.clear" => Some(handle_choice_offerings_clear(state, req)),
        "students.details" => Some(handle_students_details(state, req)),
        _ => None,
    }
}
