use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "courseselection.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace directory {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // Tables owned by the wider school application. Only the columns the
    // course selection queries join on are kept.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS school_years(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sequence_number INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS people(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            surname TEXT NOT NULL,
            preferred_name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            school_year_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            name_short TEXT NOT NULL,
            FOREIGN KEY(school_year_id) REFERENCES school_years(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_school_year ON courses(school_year_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_enrolments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id INTEGER NOT NULL,
            school_year_id INTEGER NOT NULL,
            FOREIGN KEY(person_id) REFERENCES people(id),
            FOREIGN KEY(school_year_id) REFERENCES school_years(id),
            UNIQUE(person_id, school_year_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS offerings(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            school_year_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            min_select INTEGER NOT NULL DEFAULT 0,
            max_select INTEGER NOT NULL DEFAULT 0,
            sequence_number INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(school_year_id) REFERENCES school_years(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_offerings_school_year ON offerings(school_year_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS blocks(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            school_year_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            min_select INTEGER NOT NULL DEFAULT 0,
            max_select INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(school_year_id) REFERENCES school_years(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_blocks_school_year ON blocks(school_year_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS offering_blocks(
            offering_id INTEGER NOT NULL,
            block_id INTEGER NOT NULL,
            sequence_number INTEGER NOT NULL,
            PRIMARY KEY(offering_id, block_id),
            FOREIGN KEY(offering_id) REFERENCES offerings(id),
            FOREIGN KEY(block_id) REFERENCES blocks(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_offering_blocks_block ON offering_blocks(block_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS block_courses(
            block_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            PRIMARY KEY(block_id, course_id),
            FOREIGN KEY(block_id) REFERENCES blocks(id),
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_block_courses_course ON block_courses(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS choices(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            school_year_id INTEGER NOT NULL,
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            block_id INTEGER,
            status TEXT NOT NULL DEFAULT '',
            selected_by_id INTEGER NOT NULL,
            timestamp_selected TEXT,
            notes TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(school_year_id) REFERENCES school_years(id),
            FOREIGN KEY(student_id) REFERENCES people(id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(block_id) REFERENCES blocks(id),
            FOREIGN KEY(selected_by_id) REFERENCES people(id),
            UNIQUE(student_id, course_id)
        )",
        [],
    )?;
    ensure_choices_notes(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_choices_course ON choices(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_choices_year_student ON choices(school_year_id, student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS choice_offerings(
            school_year_id INTEGER NOT NULL,
            student_id INTEGER NOT NULL,
            offering_id INTEGER NOT NULL,
            PRIMARY KEY(school_year_id, student_id),
            FOREIGN KEY(school_year_id) REFERENCES school_years(id),
            FOREIGN KEY(student_id) REFERENCES people(id),
            FOREIGN KEY(offering_id) REFERENCES offerings(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_choice_offerings_offering ON choice_offerings(offering_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS selection_log(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            school_year_id INTEGER NOT NULL,
            offering_id INTEGER NOT NULL,
            student_id INTEGER NOT NULL,
            changed_by_id INTEGER NOT NULL,
            timestamp_changed TEXT NOT NULL,
            action TEXT NOT NULL,
            FOREIGN KEY(school_year_id) REFERENCES school_years(id),
            FOREIGN KEY(offering_id) REFERENCES offerings(id),
            FOREIGN KEY(student_id) REFERENCES people(id),
            FOREIGN KEY(changed_by_id) REFERENCES people(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_selection_log_changed ON selection_log(timestamp_changed)",
        [],
    )?;

    Ok(())
}

// Workspaces created before choice notes existed lack the column.
fn ensure_choices_notes(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "choices", "notes")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE choices ADD COLUMN notes TEXT NOT NULL DEFAULT ''",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("invalid json in setting {key}"))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}
