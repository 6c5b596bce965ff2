use super::{GatewayError, GatewayResult};
use crate::domain::{Block, BlockCourse, BlockInput};
use rusqlite::{params, Connection, OptionalExtension, Row};

const BLOCK_COLUMNS: &str = "b.id, b.school_year_id, b.name, b.description, b.min_select, b.max_select,
    (SELECT COUNT(*) FROM block_courses bc WHERE bc.block_id = b.id) AS course_count";

fn block_from_row(r: &Row<'_>) -> rusqlite::Result<Block> {
    Ok(Block {
        id: r.get(0)?,
        school_year_id: r.get(1)?,
        name: r.get(2)?,
        description: r.get(3)?,
        min_select: r.get(4)?,
        max_select: r.get(5)?,
        course_count: r.get(6)?,
    })
}

pub fn select_blocks_by_school_year(conn: &Connection, school_year_id: i64) -> GatewayResult<Vec<Block>> {
    let sql = format!(
        "SELECT {BLOCK_COLUMNS} FROM blocks b WHERE b.school_year_id = ? ORDER BY b.name, b.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([school_year_id], block_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn select_block(conn: &Connection, block_id: i64) -> GatewayResult<Option<Block>> {
    let sql = format!("SELECT {BLOCK_COLUMNS} FROM blocks b WHERE b.id = ?");
    let row = conn.query_row(&sql, [block_id], block_from_row).optional()?;
    Ok(row)
}

pub fn insert_block(conn: &Connection, input: &BlockInput) -> GatewayResult<i64> {
    conn.execute(
        "INSERT INTO blocks(school_year_id, name, description, min_select, max_select)
         VALUES(?, ?, ?, ?, ?)",
        params![
            input.school_year_id,
            input.name,
            input.description,
            input.min_select,
            input.max_select
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_block(conn: &Connection, block_id: i64, input: &BlockInput) -> GatewayResult<usize> {
    let n = conn.execute(
        "UPDATE blocks SET school_year_id = ?, name = ?, description = ?, min_select = ?, max_select = ?
         WHERE id = ?",
        params![
            input.school_year_id,
            input.name,
            input.description,
            input.min_select,
            input.max_select,
            block_id
        ],
    )?;
    Ok(n)
}

/// Removes the block from every offering and drops its course links first.
/// Choices that recorded this block fall back to no block.
pub fn delete_block(conn: &Connection, block_id: i64) -> GatewayResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM offering_blocks WHERE block_id = ?", [block_id])?;
    tx.execute("DELETE FROM block_courses WHERE block_id = ?", [block_id])?;
    tx.execute(
        "UPDATE choices SET block_id = NULL WHERE block_id = ?",
        [block_id],
    )?;
    let n = tx.execute("DELETE FROM blocks WHERE id = ?", [block_id])?;
    if n == 0 {
        return Err(GatewayError::NotFound("block"));
    }
    tx.commit()?;
    Ok(())
}

pub fn select_courses_by_block(conn: &Connection, block_id: i64) -> GatewayResult<Vec<BlockCourse>> {
    let mut stmt = conn.prepare(
        "SELECT bc.block_id, c.id, c.name, c.name_short
         FROM block_courses bc
         JOIN courses c ON c.id = bc.course_id
         WHERE bc.block_id = ?
         ORDER BY c.name_short, c.name",
    )?;
    let rows = stmt
        .query_map([block_id], |r| {
            Ok(BlockCourse {
                block_id: r.get(0)?,
                course_id: r.get(1)?,
                name: r.get(2)?,
                name_short: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns true when a new link was created.
pub fn insert_block_course(conn: &Connection, block_id: i64, course_id: i64) -> GatewayResult<bool> {
    let n = conn.execute(
        "INSERT INTO block_courses(block_id, course_id) VALUES(?, ?)
         ON CONFLICT(block_id, course_id) DO NOTHING",
        params![block_id, course_id],
    )?;
    Ok(n > 0)
}

pub fn delete_block_course(conn: &Connection, block_id: i64, course_id: i64) -> GatewayResult<usize> {
    let n = conn.execute(
        "DELETE FROM block_courses WHERE block_id = ? AND course_id = ?",
        params![block_id, course_id],
    )?;
    Ok(n)
}
