//! Multi-step choice workflows built on the selection gateways: a student
//! submitting their courses for an offering, and staff approving or rejecting
//! a single choice.

use crate::domain::{now_timestamp, Choice, ChoiceInput, ChoiceOffering, ChoiceStatus, LogInput};
use crate::gateway::{offerings, selections, GatewayError, GatewayResult};
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::info;

pub const ACTION_SUBMIT: &str = "Submit";
pub const ACTION_APPROVE: &str = "Approve";
pub const ACTION_REJECT: &str = "Reject";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChosenCourse {
    pub course_id: i64,
    pub block_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub school_year_id: i64,
    pub student_id: i64,
    pub offering_id: i64,
    pub changed_by_id: i64,
    pub status: ChoiceStatus,
    pub courses: Vec<ChosenCourse>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitSummary {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub log_id: i64,
}

/// Records a student's full set of choices for an offering. Courses already
/// approved stay approved; active choices not in the submission are removed.
pub fn submit_choices(conn: &Connection, sub: &Submission) -> GatewayResult<SubmitSummary> {
    if !sub.status.is_active() {
        return Err(GatewayError::Invalid(
            "submitted choices cannot use status Removed".into(),
        ));
    }
    let offering = offerings::select_offering(conn, sub.offering_id)?
        .ok_or(GatewayError::NotFound("offering"))?;
    if offering.school_year_id != sub.school_year_id {
        return Err(GatewayError::Invalid(format!(
            "offering {} does not belong to school year {}",
            sub.offering_id, sub.school_year_id
        )));
    }

    let tx = conn.unchecked_transaction()?;
    selections::insert_choice_offering(
        &tx,
        &ChoiceOffering {
            school_year_id: sub.school_year_id,
            student_id: sub.student_id,
            offering_id: sub.offering_id,
        },
    )?;

    let ts = now_timestamp();
    let mut summary = SubmitSummary::default();
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(sub.courses.len());
    for course in &sub.courses {
        if !seen.insert(course.course_id) {
            continue;
        }
        kept.push(course.course_id);
        let existing = selections::select_choice_by_course_and_person(&tx, course.course_id, sub.student_id)?;
        let status = match &existing {
            Some(c) if c.status == ChoiceStatus::Approved => ChoiceStatus::Approved,
            _ => sub.status,
        };
        let input = ChoiceInput {
            school_year_id: sub.school_year_id,
            student_id: sub.student_id,
            course_id: course.course_id,
            block_id: course.block_id,
            status,
            selected_by_id: sub.changed_by_id,
            timestamp_selected: Some(ts.clone()),
            notes: existing.as_ref().map(|c| c.notes.clone()).unwrap_or_default(),
        };
        if existing.is_some() {
            summary.updated += selections::update_choice(&tx, &input)?;
        } else {
            selections::insert_choice(&tx, &input)?;
            summary.inserted += 1;
        }
    }

    summary.removed = selections::update_unselected_choices_by_school_year_and_person(
        &tx,
        sub.school_year_id,
        sub.student_id,
        &kept,
    )?;
    summary.log_id = selections::insert_log(
        &tx,
        &LogInput {
            school_year_id: sub.school_year_id,
            offering_id: sub.offering_id,
            student_id: sub.student_id,
            changed_by_id: sub.changed_by_id,
            timestamp_changed: Some(ts),
            action: ACTION_SUBMIT.to_string(),
        },
    )?;
    tx.commit()?;

    info!(
        student_id = sub.student_id,
        offering_id = sub.offering_id,
        inserted = summary.inserted,
        updated = summary.updated,
        removed = summary.removed,
        "choices submitted"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn status(self) -> ChoiceStatus {
        match self {
            Decision::Approve => ChoiceStatus::Approved,
            Decision::Reject => ChoiceStatus::Removed,
        }
    }

    fn action(self) -> &'static str {
        match self {
            Decision::Approve => ACTION_APPROVE,
            Decision::Reject => ACTION_REJECT,
        }
    }
}

/// Applies a staff decision to one live choice. A log entry is written when
/// the student is mapped to an offering for the choice's school year.
pub fn decide_choice(
    conn: &Connection,
    student_id: i64,
    course_id: i64,
    changed_by_id: i64,
    decision: Decision,
) -> GatewayResult<Choice> {
    let existing = selections::select_choice_by_course_and_person(conn, course_id, student_id)?
        .ok_or(GatewayError::NotFound("choice"))?;
    if !existing.status.is_active() {
        return Err(GatewayError::Invalid("choice has been removed".into()));
    }

    let ts = now_timestamp();
    let tx = conn.unchecked_transaction()?;
    selections::update_choice(
        &tx,
        &ChoiceInput {
            school_year_id: existing.school_year_id,
            student_id,
            course_id,
            block_id: existing.block_id,
            status: decision.status(),
            selected_by_id: changed_by_id,
            timestamp_selected: Some(ts.clone()),
            notes: existing.notes.clone(),
        },
    )?;
    if let Some(mapping) = selections::select_choice_offering(&tx, existing.school_year_id, student_id)? {
        selections::insert_log(
            &tx,
            &LogInput {
                school_year_id: mapping.school_year_id,
                offering_id: mapping.offering_id,
                student_id,
                changed_by_id,
                timestamp_changed: Some(ts),
                action: decision.action().to_string(),
            },
        )?;
    }
    tx.commit()?;

    info!(student_id, course_id, decision = decision.action(), "choice decided");
    selections::select_choice_by_course_and_person(conn, course_id, student_id)?
        .ok_or(GatewayError::NotFound("choice"))
}
