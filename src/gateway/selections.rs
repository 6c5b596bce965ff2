//! Choices, the selection log, student offering mappings and student lookup.

use super::{placeholders, GatewayResult};
use crate::domain::{
    now_timestamp, page_offset, Choice, ChoiceInput, ChoiceOffering, ChoiceStatus, CourseChoice,
    LogEntry, LogInput, StudentDetails, UnofferedChoice,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const CHOICE_COLUMNS: &str = "c.id, c.school_year_id, c.student_id, c.course_id, c.block_id, c.status, c.selected_by_id, c.timestamp_selected, c.notes";

fn choice_from_row(r: &Row<'_>) -> rusqlite::Result<Choice> {
    Ok(Choice {
        id: r.get(0)?,
        school_year_id: r.get(1)?,
        student_id: r.get(2)?,
        course_id: r.get(3)?,
        block_id: r.get(4)?,
        status: r.get(5)?,
        selected_by_id: r.get(6)?,
        timestamp_selected: r.get(7)?,
        notes: r.get(8)?,
    })
}

// CHOICES

/// The student's live choices for courses in a block. The block must be part
/// of at least one offering, and a choice recorded against another block is
/// skipped.
pub fn select_choices_by_block_and_person(
    conn: &Connection,
    block_id: i64,
    student_id: i64,
) -> GatewayResult<Vec<Choice>> {
    let sql = format!(
        "SELECT {CHOICE_COLUMNS}
         FROM choices c
         JOIN block_courses bc ON bc.course_id = c.course_id
         WHERE bc.block_id = ?1
           AND EXISTS (SELECT 1 FROM offering_blocks ob WHERE ob.block_id = bc.block_id)
           AND c.student_id = ?2
           AND c.status <> 'Removed'
           AND (c.block_id = bc.block_id OR c.block_id IS NULL)
         ORDER BY c.status, c.course_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![block_id, student_id], choice_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Roster of students holding a choice for the course, minus any status in
/// `exclude`.
pub fn select_choices_by_course(
    conn: &Connection,
    course_id: i64,
    exclude: &[ChoiceStatus],
) -> GatewayResult<Vec<CourseChoice>> {
    let exclude_clause = if exclude.is_empty() {
        String::new()
    } else {
        format!("AND c.status NOT IN ({})", placeholders(exclude.len()))
    };
    let sql = format!(
        "SELECT p.id, p.surname, p.preferred_name, c.status, c.selected_by_id, c.timestamp_selected,
                sp.surname, sp.preferred_name, co.offering_id
         FROM choices c
         JOIN people p ON p.id = c.student_id
         JOIN courses crs ON crs.id = c.course_id
         LEFT JOIN choice_offerings co ON (
             co.school_year_id = crs.school_year_id
             AND co.student_id = p.id
         )
         JOIN people sp ON sp.id = c.selected_by_id
         WHERE c.course_id = ?
         {exclude_clause}
         ORDER BY p.surname, p.preferred_name, p.id"
    );
    let mut values: Vec<Value> = Vec::with_capacity(exclude.len() + 1);
    values.push(Value::Integer(course_id));
    values.extend(exclude.iter().map(|s| Value::Text(s.as_str().to_string())));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), |r| {
            Ok(CourseChoice {
                student_id: r.get(0)?,
                surname: r.get(1)?,
                preferred_name: r.get(2)?,
                status: r.get(3)?,
                selected_by_id: r.get(4)?,
                timestamp_selected: r.get(5)?,
                selected_surname: r.get(6)?,
                selected_preferred_name: r.get(7)?,
                offering_id: r.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn select_choice_by_course_and_person(
    conn: &Connection,
    course_id: i64,
    student_id: i64,
) -> GatewayResult<Option<Choice>> {
    let sql = format!("SELECT {CHOICE_COLUMNS} FROM choices c WHERE c.course_id = ? AND c.student_id = ?");
    let row = conn
        .query_row(&sql, params![course_id, student_id], choice_from_row)
        .optional()?;
    Ok(row)
}

/// Live choices whose course sits in none of the offering's blocks.
pub fn select_unoffered_choices_by_person(
    conn: &Connection,
    offering_id: i64,
    student_id: i64,
) -> GatewayResult<Vec<UnofferedChoice>> {
    let sql = format!(
        "SELECT {CHOICE_COLUMNS}, crs.name, crs.name_short
         FROM choices c
         JOIN courses crs ON crs.id = c.course_id
         WHERE c.student_id = ?2
           AND c.status <> 'Removed'
           AND NOT EXISTS (
               SELECT 1
               FROM block_courses bc
               JOIN offering_blocks ob ON ob.block_id = bc.block_id
               WHERE bc.course_id = crs.id AND ob.offering_id = ?1
           )
         ORDER BY crs.name_short, crs.name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![offering_id, student_id], |r| {
            Ok(UnofferedChoice {
                choice: choice_from_row(r)?,
                course_name: r.get(9)?,
                course_name_short: r.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_choice(conn: &Connection, input: &ChoiceInput) -> GatewayResult<i64> {
    conn.execute(
        "INSERT INTO choices(school_year_id, student_id, course_id, block_id, status, selected_by_id, timestamp_selected, notes)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            input.school_year_id,
            input.student_id,
            input.course_id,
            input.block_id,
            input.status,
            input.selected_by_id,
            input.timestamp_selected,
            input.notes
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Updates the choice identified by student and course.
pub fn update_choice(conn: &Connection, input: &ChoiceInput) -> GatewayResult<usize> {
    let n = conn.execute(
        "UPDATE choices
         SET school_year_id = ?, status = ?, selected_by_id = ?, timestamp_selected = ?, block_id = ?, notes = ?
         WHERE student_id = ? AND course_id = ?",
        params![
            input.school_year_id,
            input.status,
            input.selected_by_id,
            input.timestamp_selected,
            input.block_id,
            input.notes,
            input.student_id,
            input.course_id
        ],
    )?;
    Ok(n)
}

pub fn delete_choice(conn: &Connection, choice_id: i64) -> GatewayResult<usize> {
    let n = conn.execute("DELETE FROM choices WHERE id = ?", [choice_id])?;
    Ok(n)
}

/// Marks the student's active choices for the year as removed, except those
/// for courses in `keep_course_ids`.
pub fn update_unselected_choices_by_school_year_and_person(
    conn: &Connection,
    school_year_id: i64,
    student_id: i64,
    keep_course_ids: &[i64],
) -> GatewayResult<usize> {
    let mut values: Vec<Value> = vec![Value::Integer(school_year_id), Value::Integer(student_id)];
    let keep_clause = if keep_course_ids.is_empty() {
        String::new()
    } else {
        values.extend(keep_course_ids.iter().map(|id| Value::Integer(*id)));
        format!("AND course_id NOT IN ({})", placeholders(keep_course_ids.len()))
    };
    values.extend(
        ChoiceStatus::ACTIVE
            .iter()
            .map(|s| Value::Text(s.as_str().to_string())),
    );
    let sql = format!(
        "UPDATE choices SET status = 'Removed'
         WHERE school_year_id = ?
           AND student_id = ?
           {keep_clause}
           AND status IN ({})",
        placeholders(ChoiceStatus::ACTIVE.len())
    );
    let n = conn.execute(&sql, params_from_iter(values))?;
    Ok(n)
}

// LOG

pub fn select_all_logs(conn: &Connection, page: i64, limit: i64) -> GatewayResult<Vec<LogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.school_year_id, l.offering_id, l.student_id, l.changed_by_id, l.timestamp_changed, l.action,
                sy.name, o.name, ps.surname, ps.preferred_name, pc.surname, pc.preferred_name
         FROM selection_log l
         JOIN offerings o ON o.id = l.offering_id
         JOIN school_years sy ON sy.id = l.school_year_id
         JOIN people ps ON ps.id = l.student_id
         JOIN people pc ON pc.id = l.changed_by_id
         ORDER BY l.timestamp_changed DESC, l.id DESC
         LIMIT ? OFFSET ?",
    )?;
    let rows = stmt
        .query_map(params![limit, page_offset(page, limit)], |r| {
            Ok(LogEntry {
                id: r.get(0)?,
                school_year_id: r.get(1)?,
                offering_id: r.get(2)?,
                student_id: r.get(3)?,
                changed_by_id: r.get(4)?,
                timestamp_changed: r.get(5)?,
                action: r.get(6)?,
                school_year_name: r.get(7)?,
                offering_name: r.get(8)?,
                student_surname: r.get(9)?,
                student_preferred_name: r.get(10)?,
                changed_surname: r.get(11)?,
                changed_preferred_name: r.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_log(conn: &Connection, input: &LogInput) -> GatewayResult<i64> {
    let ts = input.timestamp_changed.clone().unwrap_or_else(now_timestamp);
    conn.execute(
        "INSERT INTO selection_log(school_year_id, offering_id, student_id, changed_by_id, timestamp_changed, action)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![
            input.school_year_id,
            input.offering_id,
            input.student_id,
            input.changed_by_id,
            ts,
            input.action
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// OFFERINGS

pub fn select_choice_offering(
    conn: &Connection,
    school_year_id: i64,
    student_id: i64,
) -> GatewayResult<Option<ChoiceOffering>> {
    let row = conn
        .query_row(
            "SELECT school_year_id, student_id, offering_id
             FROM choice_offerings
             WHERE school_year_id = ? AND student_id = ?",
            params![school_year_id, student_id],
            |r| {
                Ok(ChoiceOffering {
                    school_year_id: r.get(0)?,
                    student_id: r.get(1)?,
                    offering_id: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Inserts the mapping, or points an existing one at the new offering.
pub fn insert_choice_offering(conn: &Connection, input: &ChoiceOffering) -> GatewayResult<()> {
    conn.execute(
        "INSERT INTO choice_offerings(school_year_id, student_id, offering_id) VALUES(?, ?, ?)
         ON CONFLICT(school_year_id, student_id) DO UPDATE SET offering_id = excluded.offering_id",
        params![input.school_year_id, input.student_id, input.offering_id],
    )?;
    Ok(())
}

pub fn delete_choice_offering(
    conn: &Connection,
    school_year_id: i64,
    student_id: i64,
) -> GatewayResult<usize> {
    let n = conn.execute(
        "DELETE FROM choice_offerings WHERE school_year_id = ? AND student_id = ?",
        params![school_year_id, student_id],
    )?;
    Ok(n)
}

// MISC

/// Names of an enrolled student, read through their latest enrolment.
pub fn select_student_details(conn: &Connection, student_id: i64) -> GatewayResult<Option<StudentDetails>> {
    let row = conn
        .query_row(
            "SELECT p.surname, p.preferred_name
             FROM people p
             JOIN student_enrolments se ON se.person_id = p.id
             WHERE p.id = ?
             ORDER BY se.school_year_id DESC
             LIMIT 1",
            [student_id],
            |r| {
                Ok(StudentDetails {
                    surname: r.get(0)?,
                    preferred_name: r.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::domain::{BlockInput, OfferingInput};
    use crate::gateway::fixtures::{self, Seed};
    use crate::gateway::{blocks, directory, offerings};

    fn choice(seed: &Seed, course_id: i64, status: ChoiceStatus) -> ChoiceInput {
        ChoiceInput {
            school_year_id: seed.year_id,
            student_id: seed.student_id,
            course_id,
            block_id: None,
            status,
            selected_by_id: seed.staff_id,
            timestamp_selected: Some("2026-05-01 09:00:00".into()),
            notes: String::new(),
        }
    }

    fn offering_with_block(conn: &Connection, seed: &Seed, course_ids: &[i64]) -> (i64, i64) {
        let offering_id = offerings::insert_offering(
            conn,
            &OfferingInput {
                school_year_id: seed.year_id,
                name: "Grade 11".into(),
                description: String::new(),
                min_select: 0,
                max_select: 0,
                sequence_number: 1,
            },
        )
        .expect("offering");
        let block_id = blocks::insert_block(
            conn,
            &BlockInput {
                school_year_id: seed.year_id,
                name: "Core".into(),
                description: String::new(),
                min_select: 1,
                max_select: 2,
            },
        )
        .expect("block");
        for id in course_ids {
            blocks::insert_block_course(conn, block_id, *id).expect("block course");
        }
        offerings::insert_offering_block(conn, offering_id, block_id).expect("offering block");
        (offering_id, block_id)
    }

    #[test]
    fn unselected_choices_are_removed_except_kept_courses() {
        let conn = db::open_in_memory().expect("db");
        let seed = fixtures::seed(&conn);
        insert_choice(&conn, &choice(&seed, seed.math_id, ChoiceStatus::Approved)).expect("math");
        insert_choice(&conn, &choice(&seed, seed.art_id, ChoiceStatus::Unset)).expect("art");
        insert_choice(&conn, &choice(&seed, seed.music_id, ChoiceStatus::Removed)).expect("music");

        let n = update_unselected_choices_by_school_year_and_person(
            &conn,
            seed.year_id,
            seed.student_id,
            &[seed.math_id],
        )
        .expect("remove");
        assert_eq!(n, 1, "only the unset art choice changes");

        let math = select_choice_by_course_and_person(&conn, seed.math_id, seed.student_id)
            .expect("select")
            .expect("math row");
        assert_eq!(math.status, ChoiceStatus::Approved);
        let art = select_choice_by_course_and_person(&conn, seed.art_id, seed.student_id)
            .expect("select")
            .expect("art row");
        assert_eq!(art.status, ChoiceStatus::Removed);

        let n = update_unselected_choices_by_school_year_and_person(&conn, seed.year_id, seed.student_id, &[])
            .expect("remove all");
        assert_eq!(n, 1);
    }

    #[test]
    fn choices_by_course_excludes_every_listed_status() {
        let conn = db::open_in_memory().expect("db");
        let seed = fixtures::seed(&conn);
        let other = directory::insert_person(&conn, "Babbage", "Charles").expect("person");
        let third = directory::insert_person(&conn, "Turing", "Alan").expect("person");
        insert_choice(&conn, &choice(&seed, seed.math_id, ChoiceStatus::Requested)).expect("a");
        let mut b = choice(&seed, seed.math_id, ChoiceStatus::Removed);
        b.student_id = other;
        insert_choice(&conn, &b).expect("b");
        let mut c = choice(&seed, seed.math_id, ChoiceStatus::Approved);
        c.student_id = third;
        insert_choice(&conn, &c).expect("c");

        let all = select_choices_by_course(&conn, seed.math_id, &[]).expect("all");
        let surnames: Vec<&str> = all.iter().map(|c| c.surname.as_str()).collect();
        assert_eq!(surnames, vec!["Babbage", "Lovelace", "Turing"]);

        let some = select_choices_by_course(
            &conn,
            seed.math_id,
            &[ChoiceStatus::Removed, ChoiceStatus::Approved],
        )
        .expect("filtered");
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].student_id, seed.student_id);
        assert_eq!(some[0].selected_surname, "Hopper");
        assert_eq!(some[0].offering_id, None);
    }

    #[test]
    fn block_and_unoffered_queries_split_choices_by_offering() {
        let conn = db::open_in_memory().expect("db");
        let seed = fixtures::seed(&conn);
        let (offering_id, block_id) = offering_with_block(&conn, &seed, &[seed.math_id, seed.art_id]);
        insert_choice(&conn, &choice(&seed, seed.math_id, ChoiceStatus::Selected)).expect("math");
        insert_choice(&conn, &choice(&seed, seed.art_id, ChoiceStatus::Removed)).expect("art");
        insert_choice(&conn, &choice(&seed, seed.music_id, ChoiceStatus::Requested)).expect("music");

        let in_block = select_choices_by_block_and_person(&conn, block_id, seed.student_id).expect("block");
        assert_eq!(in_block.len(), 1);
        assert_eq!(in_block[0].course_id, seed.math_id);

        let unoffered =
            select_unoffered_choices_by_person(&conn, offering_id, seed.student_id).expect("unoffered");
        assert_eq!(unoffered.len(), 1);
        assert_eq!(unoffered[0].choice.course_id, seed.music_id);
        assert_eq!(unoffered[0].course_name_short, "MUS");
    }

    #[test]
    fn choice_offering_insert_is_an_upsert() {
        let conn = db::open_in_memory().expect("db");
        let seed = fixtures::seed(&conn);
        let (first, _) = offering_with_block(&conn, &seed, &[seed.math_id]);
        let (second, _) = offering_with_block(&conn, &seed, &[seed.art_id]);
        let mut mapping = ChoiceOffering {
            school_year_id: seed.year_id,
            student_id: seed.student_id,
            offering_id: first,
        };
        insert_choice_offering(&conn, &mapping).expect("insert");
        mapping.offering_id = second;
        insert_choice_offering(&conn, &mapping).expect("upsert");
        assert_eq!(
            select_choice_offering(&conn, seed.year_id, seed.student_id).expect("select"),
            Some(mapping)
        );
        assert_eq!(delete_choice_offering(&conn, seed.year_id, seed.student_id).expect("delete"), 1);
        assert!(select_choice_offering(&conn, seed.year_id, seed.student_id)
            .expect("select")
            .is_none());
    }

    #[test]
    fn logs_page_newest_first() {
        let conn = db::open_in_memory().expect("db");
        let seed = fixtures::seed(&conn);
        let (offering_id, _) = offering_with_block(&conn, &seed, &[seed.math_id]);
        for (i, ts) in ["2026-05-01 09:00:00", "2026-05-02 09:00:00", "2026-05-03 09:00:00"]
            .iter()
            .enumerate()
        {
            insert_log(
                &conn,
                &LogInput {
                    school_year_id: seed.year_id,
                    offering_id,
                    student_id: seed.student_id,
                    changed_by_id: seed.staff_id,
                    timestamp_changed: Some(ts.to_string()),
                    action: format!("Update {}", i),
                },
            )
            .expect("log");
        }
        let first = select_all_logs(&conn, 1, 2).expect("page 1");
        assert_eq!(
            first.iter().map(|l| l.action.as_str()).collect::<Vec<_>>(),
            vec!["Update 2", "Update 1"]
        );
        assert_eq!(first[0].offering_name, "Grade 11");
        assert_eq!(first[0].changed_surname, "Hopper");
        let second = select_all_logs(&conn, 2, 2).expect("page 2");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].action, "Update 0");
    }

    #[test]
    fn student_details_need_an_enrolment() {
        let conn = db::open_in_memory().expect("db");
        let seed = fixtures::seed(&conn);
        let details = select_student_details(&conn, seed.student_id)
            .expect("select")
            .expect("enrolled student");
        assert_eq!(details.preferred_name, "Ada");
        assert!(select_student_details(&conn, seed.staff_id).expect("select").is_none());
    }
}
