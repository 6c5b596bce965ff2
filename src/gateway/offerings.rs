use super::{GatewayError, GatewayResult};
use crate::domain::{Offering, OfferingBlock, OfferingInput};
use rusqlite::{params, Connection, OptionalExtension, Row};

fn offering_from_row(r: &Row<'_>) -> rusqlite::Result<Offering> {
    Ok(Offering {
        id: r.get(0)?,
        school_year_id: r.get(1)?,
        name: r.get(2)?,
        description: r.get(3)?,
        min_select: r.get(4)?,
        max_select: r.get(5)?,
        sequence_number: r.get(6)?,
    })
}

pub fn select_offerings_by_school_year(
    conn: &Connection,
    school_year_id: i64,
) -> GatewayResult<Vec<Offering>> {
    let mut stmt = conn.prepare(
        "SELECT id, school_year_id, name, description, min_select, max_select, sequence_number
         FROM offerings
         WHERE school_year_id = ?
         ORDER BY sequence_number, name",
    )?;
    let rows = stmt
        .query_map([school_year_id], offering_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn select_offering(conn: &Connection, offering_id: i64) -> GatewayResult<Option<Offering>> {
    let row = conn
        .query_row(
            "SELECT id, school_year_id, name, description, min_select, max_select, sequence_number
             FROM offerings
             WHERE id = ?",
            [offering_id],
            offering_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn insert_offering(conn: &Connection, input: &OfferingInput) -> GatewayResult<i64> {
    conn.execute(
        "INSERT INTO offerings(school_year_id, name, description, min_select, max_select, sequence_number)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![
            input.school_year_id,
            input.name,
            input.description,
            input.min_select,
            input.max_select,
            input.sequence_number
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_offering(conn: &Connection, offering_id: i64, input: &OfferingInput) -> GatewayResult<usize> {
    let n = conn.execute(
        "UPDATE offerings
         SET school_year_id = ?, name = ?, description = ?, min_select = ?, max_select = ?, sequence_number = ?
         WHERE id = ?",
        params![
            input.school_year_id,
            input.name,
            input.description,
            input.min_select,
            input.max_select,
            input.sequence_number,
            offering_id
        ],
    )?;
    Ok(n)
}

/// Deletes the offering along with its block links, the student mappings
/// that point at it and its selection log rows.
pub fn delete_offering(conn: &Connection, offering_id: i64) -> GatewayResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM offering_blocks WHERE offering_id = ?", [offering_id])?;
    tx.execute("DELETE FROM choice_offerings WHERE offering_id = ?", [offering_id])?;
    tx.execute("DELETE FROM selection_log WHERE offering_id = ?", [offering_id])?;
    let n = tx.execute("DELETE FROM offerings WHERE id = ?", [offering_id])?;
    if n == 0 {
        return Err(GatewayError::NotFound("offering"));
    }
    tx.commit()?;
    Ok(())
}

pub fn select_blocks_by_offering(conn: &Connection, offering_id: i64) -> GatewayResult<Vec<OfferingBlock>> {
    let mut stmt = conn.prepare(
        "SELECT ob.offering_id, b.id, b.name, b.description, b.min_select, b.max_select, ob.sequence_number
         FROM offering_blocks ob
         JOIN blocks b ON b.id = ob.block_id
         WHERE ob.offering_id = ?
         ORDER BY ob.sequence_number, b.name",
    )?;
    let rows = stmt
        .query_map([offering_id], |r| {
            Ok(OfferingBlock {
                offering_id: r.get(0)?,
                block_id: r.get(1)?,
                name: r.get(2)?,
                description: r.get(3)?,
                min_select: r.get(4)?,
                max_select: r.get(5)?,
                sequence_number: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Links a block to an offering at the end of its sequence. Returns the
/// sequence number the block holds afterwards.
pub fn insert_offering_block(conn: &Connection, offering_id: i64, block_id: i64) -> GatewayResult<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT sequence_number FROM offering_blocks WHERE offering_id = ? AND block_id = ?",
            params![offering_id, block_id],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(seq) = existing {
        return Ok(seq);
    }
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM offering_blocks WHERE offering_id = ?",
        [offering_id],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO offering_blocks(offering_id, block_id, sequence_number) VALUES(?, ?, ?)",
        params![offering_id, block_id, next],
    )?;
    Ok(next)
}

pub fn delete_offering_block(conn: &Connection, offering_id: i64, block_id: i64) -> GatewayResult<usize> {
    let n = conn.execute(
        "DELETE FROM offering_blocks WHERE offering_id = ? AND block_id = ?",
        params![offering_id, block_id],
    )?;
    Ok(n)
}

pub fn update_block_order(
    conn: &Connection,
    offering_id: i64,
    block_id: i64,
    sequence_number: i64,
) -> GatewayResult<usize> {
    let n = conn.execute(
        "UPDATE offering_blocks SET sequence_number = ? WHERE offering_id = ? AND block_id = ?",
        params![sequence_number, offering_id, block_id],
    )?;
    Ok(n)
}
