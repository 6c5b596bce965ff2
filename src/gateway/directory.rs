//! School years, people, courses and enrolments. These belong to the wider
//! school application; only what course selection reads is kept here.

use super::GatewayResult;
use crate::domain::{Course, SchoolYear};
use rusqlite::{params, Connection};

pub fn insert_school_year(conn: &Connection, name: &str, sequence_number: i64) -> GatewayResult<i64> {
    conn.execute(
        "INSERT INTO school_years(name, sequence_number) VALUES(?, ?)",
        params![name, sequence_number],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn select_school_years(conn: &Connection) -> GatewayResult<Vec<SchoolYear>> {
    let mut stmt =
        conn.prepare("SELECT id, name, sequence_number FROM school_years ORDER BY sequence_number, id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(SchoolYear {
                id: r.get(0)?,
                name: r.get(1)?,
                sequence_number: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_person(conn: &Connection, surname: &str, preferred_name: &str) -> GatewayResult<i64> {
    conn.execute(
        "INSERT INTO people(surname, preferred_name) VALUES(?, ?)",
        params![surname, preferred_name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_course(
    conn: &Connection,
    school_year_id: i64,
    name: &str,
    name_short: &str,
) -> GatewayResult<i64> {
    conn.execute(
        "INSERT INTO courses(school_year_id, name, name_short) VALUES(?, ?, ?)",
        params![school_year_id, name, name_short],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn select_courses_by_school_year(conn: &Connection, school_year_id: i64) -> GatewayResult<Vec<Course>> {
    let mut stmt = conn.prepare(
        "SELECT id, school_year_id, name, name_short
         FROM courses
         WHERE school_year_id = ?
         ORDER BY name_short, name",
    )?;
    let rows = stmt
        .query_map([school_year_id], |r| {
            Ok(Course {
                id: r.get(0)?,
                school_year_id: r.get(1)?,
                name: r.get(2)?,
                name_short: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_enrolment(conn: &Connection, person_id: i64, school_year_id: i64) -> GatewayResult<i64> {
    conn.execute(
        "INSERT INTO student_enrolments(person_id, school_year_id) VALUES(?, ?)
         ON CONFLICT(person_id, school_year_id) DO NOTHING",
        params![person_id, school_year_id],
    )?;
    let id = conn.query_row(
        "SELECT id FROM student_enrolments WHERE person_id = ? AND school_year_id = ?",
        params![person_id, school_year_id],
        |r| r.get(0),
    )?;
    Ok(id)
}
