mod test_support;

use serde_json::json;
use test_support::{error_code, id_of, open_seeded_workspace, request, request_ok, spawn_sidecar};

fn statuses(result: &serde_json::Value) -> Vec<(i64, String)> {
    result
        .get("choices")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            (
                c.get("courseId").and_then(|v| v.as_i64()).unwrap_or(0),
                c.get("status").and_then(|v| v.as_str()).unwrap_or("?").to_string(),
            )
        })
        .collect()
}

#[test]
fn submit_approve_and_review_choices_for_an_offering() {
    let mut sidecar = spawn_sidecar();
    let seeded = open_seeded_workspace(&mut sidecar, "courseseld-choices");
    let (math, art, music) = (seeded.course_ids[0], seeded.course_ids[1], seeded.course_ids[2]);

    let offering = request_ok(
        &mut sidecar,
        "o",
        "offerings.create",
        json!({ "input": { "schoolYearId": seeded.year_id, "name": "Grade 12" } }),
    );
    let offering_id = id_of(&offering, "offeringId");
    let block = request_ok(
        &mut sidecar,
        "b",
        "blocks.create",
        json!({ "input": { "schoolYearId": seeded.year_id, "name": "Core", "minSelect": 1, "maxSelect": 2 } }),
    );
    let block_id = id_of(&block, "blockId");
    for (i, course_id) in [math, art].iter().enumerate() {
        let _ = request_ok(
            &mut sidecar,
            &format!("bc{}", i),
            "blocks.courses.add",
            json!({ "blockId": block_id, "courseId": course_id }),
        );
    }
    let _ = request_ok(
        &mut sidecar,
        "ob",
        "offerings.blocks.add",
        json!({ "offeringId": offering_id, "blockId": block_id }),
    );

    let submitted = request_ok(
        &mut sidecar,
        "submit1",
        "choices.submit",
        json!({
            "schoolYearId": seeded.year_id,
            "studentId": seeded.student_id,
            "offeringId": offering_id,
            "changedById": seeded.student_id,
            "courses": [
                { "courseId": math, "blockId": block_id },
                { "courseId": music }
            ]
        }),
    );
    assert_eq!(submitted.get("inserted").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(submitted.get("removed").and_then(|v| v.as_i64()), Some(0));

    let in_block = request_ok(
        &mut sidecar,
        "blk",
        "choices.byBlockAndStudent",
        json!({ "blockId": block_id, "studentId": seeded.student_id }),
    );
    assert_eq!(statuses(&in_block), vec![(math, "Selected".to_string())]);

    let unoffered = request_ok(
        &mut sidecar,
        "unoff",
        "choices.unoffered",
        json!({ "offeringId": offering_id, "studentId": seeded.student_id }),
    );
    assert_eq!(statuses(&unoffered), vec![(music, "Selected".to_string())]);
    assert_eq!(
        unoffered["choices"][0].get("courseNameShort").and_then(|v| v.as_str()),
        Some("MUS")
    );

    let approved = request_ok(
        &mut sidecar,
        "approve",
        "choices.approve",
        json!({ "studentId": seeded.student_id, "courseId": math, "changedById": seeded.staff_id }),
    );
    assert_eq!(
        approved["choice"].get("status").and_then(|v| v.as_str()),
        Some("Approved")
    );

    // Dropping music and adding art keeps the approved maths choice.
    let resubmitted = request_ok(
        &mut sidecar,
        "submit2",
        "choices.submit",
        json!({
            "schoolYearId": seeded.year_id,
            "studentId": seeded.student_id,
            "offeringId": offering_id,
            "changedById": seeded.student_id,
            "courses": [ { "courseId": math }, { "courseId": art } ]
        }),
    );
    assert_eq!(resubmitted.get("inserted").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(resubmitted.get("updated").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(resubmitted.get("removed").and_then(|v| v.as_i64()), Some(1));

    let roster = request_ok(
        &mut sidecar,
        "roster",
        "choices.byCourse",
        json!({ "courseId": math, "excludeStatuses": ["Removed", "Requested"] }),
    );
    let rows = roster.get("choices").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("status").and_then(|v| v.as_str()), Some("Approved"));
    assert_eq!(rows[0].get("surname").and_then(|v| v.as_str()), Some("Lovelace"));
    assert_eq!(rows[0].get("offeringId").and_then(|v| v.as_i64()), Some(offering_id));

    let music_roster = request_ok(
        &mut sidecar,
        "roster2",
        "choices.byCourse",
        json!({ "courseId": music, "excludeStatuses": ["Removed"] }),
    );
    assert_eq!(music_roster.get("choices"), Some(&json!([])));

    let rejected = request_ok(
        &mut sidecar,
        "reject",
        "choices.reject",
        json!({ "studentId": seeded.student_id, "courseId": art, "changedById": seeded.staff_id }),
    );
    assert_eq!(
        rejected["choice"].get("status").and_then(|v| v.as_str()),
        Some("Removed")
    );
    let twice = request(
        &mut sidecar,
        "reject2",
        "choices.reject",
        json!({ "studentId": seeded.student_id, "courseId": art, "changedById": seeded.staff_id }),
    );
    assert_eq!(error_code(&twice), Some("bad_params"));

    let log = request_ok(&mut sidecar, "log", "log.list", json!({ "page": 1, "limit": 10 }));
    let actions: Vec<String> = log
        .get("entries")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|e| e.get("action").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .collect();
    assert_eq!(actions.len(), 4);
    for expected in ["Submit", "Approve", "Reject"] {
        assert!(actions.iter().any(|a| a == expected), "missing {} in {:?}", expected, actions);
    }
    assert_eq!(
        log["entries"][0].get("offeringName").and_then(|v| v.as_str()),
        Some("Grade 12")
    );
}

#[test]
fn choice_rows_and_offering_mappings_support_direct_edits() {
    let mut sidecar = spawn_sidecar();
    let seeded = open_seeded_workspace(&mut sidecar, "courseseld-choice-crud");
    let (math, art) = (seeded.course_ids[0], seeded.course_ids[1]);

    let input = |course_id: i64, status: &str| {
        json!({
            "schoolYearId": seeded.year_id,
            "studentId": seeded.student_id,
            "courseId": course_id,
            "status": status,
            "selectedById": seeded.staff_id,
            "timestampSelected": "2026-05-01 10:00:00",
            "notes": "entered by office"
        })
    };

    let created = request_ok(&mut sidecar, "c1", "choices.create", json!({ "input": input(math, "Requested") }));
    let math_choice_id = id_of(&created, "choiceId");
    let _ = request_ok(&mut sidecar, "c2", "choices.create", json!({ "input": input(art, "") }));

    let dup = request(&mut sidecar, "c3", "choices.create", json!({ "input": input(math, "Selected") }));
    assert_eq!(error_code(&dup), Some("db_insert_failed"));
    let bad_status = request(&mut sidecar, "c4", "choices.create", json!({ "input": input(math, "Pending") }));
    assert_eq!(error_code(&bad_status), Some("bad_params"));

    let _ = request_ok(&mut sidecar, "u1", "choices.update", json!({ "input": input(math, "Approved") }));
    let opened = request_ok(
        &mut sidecar,
        "open",
        "choices.open",
        json!({ "courseId": math, "studentId": seeded.student_id }),
    );
    assert_eq!(opened["choice"].get("status").and_then(|v| v.as_str()), Some("Approved"));
    assert_eq!(
        opened["choice"].get("notes").and_then(|v| v.as_str()),
        Some("entered by office")
    );

    let removed = request_ok(
        &mut sidecar,
        "rm",
        "choices.removeUnselected",
        json!({ "schoolYearId": seeded.year_id, "studentId": seeded.student_id, "keepCourseIds": [math] }),
    );
    assert_eq!(removed.get("removed").and_then(|v| v.as_i64()), Some(1));

    let _ = request_ok(&mut sidecar, "del", "choices.delete", json!({ "choiceId": math_choice_id }));
    let gone = request_ok(
        &mut sidecar,
        "open2",
        "choices.open",
        json!({ "courseId": math, "studentId": seeded.student_id }),
    );
    assert!(gone.get("choice").map(|v| v.is_null()).unwrap_or(false));
    let del_again = request(&mut sidecar, "del2", "choices.delete", json!({ "choiceId": math_choice_id }));
    assert_eq!(error_code(&del_again), Some("not_found"));

    let mut offering_ids = Vec::new();
    for name in ["Stream A", "Stream B"] {
        let o = request_ok(
            &mut sidecar,
            name,
            "offerings.create",
            json!({ "input": { "schoolYearId": seeded.year_id, "name": name } }),
        );
        offering_ids.push(id_of(&o, "offeringId"));
    }
    for (i, offering_id) in offering_ids.iter().enumerate() {
        let _ = request_ok(
            &mut sidecar,
            &format!("set{}", i),
            "choiceOfferings.set",
            json!({ "schoolYearId": seeded.year_id, "studentId": seeded.student_id, "offeringId": offering_id }),
        );
    }
    let mapping = request_ok(
        &mut sidecar,
        "get",
        "choiceOfferings.get",
        json!({ "schoolYearId": seeded.year_id, "studentId": seeded.student_id }),
    );
    assert_eq!(
        mapping["choiceOffering"].get("offeringId").and_then(|v| v.as_i64()),
        Some(offering_ids[1])
    );
    let cleared = request_ok(
        &mut sidecar,
        "clear",
        "choiceOfferings.clear",
        json!({ "schoolYearId": seeded.year_id, "studentId": seeded.student_id }),
    );
    assert_eq!(cleared.get("deleted").and_then(|v| v.as_i64()), Some(1));

    let details = request_ok(
        &mut sidecar,
        "details",
        "students.details",
        json!({ "studentId": seeded.student_id }),
    );
    assert_eq!(
        details["student"].get("preferredName").and_then(|v| v.as_str()),
        Some("Ada")
    );
    let staff = request(
        &mut sidecar,
        "details2",
        "students.details",
        json!({ "studentId": seeded.staff_id }),
    );
    assert_eq!(error_code(&staff), Some("not_found"));
}
