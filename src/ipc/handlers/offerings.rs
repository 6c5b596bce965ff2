use crate::domain::{assign_sequence_numbers, OfferingInput};
use crate::gateway::offerings;
use crate::ipc::error::{err, gateway_err, ok};
use crate::ipc::helpers::{db_conn, optional_id, parse_id_list, parse_input, require_name, required_id};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::{debug, info};

fn handle_offerings_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "offerings": [] }));
    };
    let school_year_id = match required_id(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match offerings::select_offerings_by_school_year(conn, school_year_id) {
        Ok(rows) => ok(&req.id, json!({ "offerings": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_offerings_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let offering_id = match required_id(req, "offeringId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let offering = match offerings::select_offering(conn, offering_id) {
        Ok(Some(o)) => o,
        Ok(None) => return err(&req.id, "not_found", "offering not found", None),
        Err(e) => return gateway_err(&req.id, &e, "db_query_failed"),
    };
    match offerings::select_blocks_by_offering(conn, offering_id) {
        Ok(blocks) => ok(&req.id, json!({ "offering": offering, "blocks": blocks })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_offerings_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mut input: OfferingInput = match parse_input(req, "input") {
        Ok(v) => v,
        Err(e) => return e,
    };
    input.name = match require_name(req, "input", &input.name) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match offerings::insert_offering(conn, &input) {
        Ok(id) => {
            info!(offering_id = id, school_year_id = input.school_year_id, "offering created");
            ok(&req.id, json!({ "offeringId": id }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_offerings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let offering_id = match required_id(req, "offeringId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut input: OfferingInput = match parse_input(req, "input") {
        Ok(v) => v,
        Err(e) => return e,
    };
    input.name = match require_name(req, "input", &input.name) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match offerings::update_offering(conn, offering_id, &input) {
        Ok(0) => err(&req.id, "not_found", "offering not found", None),
        Ok(_) => {
            info!(offering_id, "offering updated");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_update_failed"),
    }
}

fn handle_offerings_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let offering_id = match required_id(req, "offeringId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match offerings::delete_offering(conn, offering_id) {
        Ok(()) => {
            info!(offering_id, "offering deleted");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_delete_failed"),
    }
}

fn handle_offering_blocks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let offering_id = match required_id(req, "offeringId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match offerings::select_blocks_by_offering(conn, offering_id) {
        Ok(rows) => ok(&req.id, json!({ "blocks": rows })),
        Err(e) => gateway_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_offering_blocks_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let offering_id = match required_id(req, "offeringId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match offerings::insert_offering_block(conn, offering_id, block_id) {
        Ok(seq) => {
            info!(offering_id, block_id, sequence_number = seq, "block added to offering");
            ok(&req.id, json!({ "sequenceNumber": seq }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_offering_blocks_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let offering_id = match required_id(req, "offeringId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let block_id = match required_id(req, "blockId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match offerings::delete_offering_block(conn, offering_id, block_id) {
        Ok(0) => err(&req.id, "not_found", "block is not part of this offering", None),
        Ok(_) => {
            info!(offering_id, block_id, "block removed from offering");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => gateway_err(&req.id, &e, "db_delete_failed"),
    }
}

/// A zero id counts as absent, as it does for form posts.
fn is_zero_id(v: &serde_json::Value) -> bool {
    v.as_i64() == Some(0) || v.as_str().map(|s| s.trim() == "0").unwrap_or(false)
}

/// Writes sequence numbers 1..n for the blocks in the order given. A missing
/// offering id or an empty block list is a silent no-op.
fn handle_offering_blocks_reorder(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let raw_offering = req.params.get("offeringId").filter(|v| !is_zero_id(v));
    let offering_id = match optional_id(raw_offering) {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!("block reorder skipped: no offering id");
            return ok(&req.id, json!({ "updated": 0 }));
        }
        Err(m) => return err(&req.id, "bad_params", format!("offeringId {}", m), None),
    };
    let raw_list = req
        .params
        .get("blockIds")
        .or_else(|| req.params.get("blocklist"));
    let block_ids = match parse_id_list(raw_list) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("blockIds {}", m), None),
    };

    if block_ids.is_empty() {
        debug!(offering_id, "block reorder skipped: empty block list");
        return ok(&req.id, json!({ "updated": 0 }));
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    let order = assign_sequence_numbers(&block_ids);
    let mut updated = 0usize;
    for (block_id, seq) in &order {
        match offerings::update_block_order(&tx, offering_id, *block_id, *seq) {
            Ok(n) => updated += n,
            Err(e) => {
                let _ = tx.rollback();
                return gateway_err(&req.id, &e, "db_update_failed");
            }
        }
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    info!(offering_id, blocks = order.len(), updated, "offering blocks reordered");
    let order: Vec<serde_json::Value> = order
        .into_iter()
        .map(|(block_id, seq)| json!({ "blockId": block_id, "sequenceNumber": seq }))
        .collect();
    ok(&req.id, json!({ "updated": updated, "order": order }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "offerings.list" => Some(handle_offerings_list(state, req)),
        "offerings.open" => Some(handle_offerings_open(state, req)),
        "offerings.create" => Some(handle_offerings_create(state, req)),
        "offerings.update" => Some(handle_offerings_update(state, req)),
        "offerings.delete" => Some(handle_offerings_delete(state, req)),
        "offerings.blocks.list" => Some(handle_offering_blocks_list(state, req)),
        "offerings.blocks.add" => Some(handle_offering_blocks_add(state, req)),
        "offerings.blocks.remove" => Some(handle_offering_blocks_remove(state, req)),
        "offerings.blocks.reorder" => Some(handle_offering_blocks_reorder(state, req)),
        _ => None,
    }
}
