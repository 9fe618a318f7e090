use crate::forms::store;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, entity_param, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_records_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match entity_param(req) {
        Ok(k) => k,
        Err(e) => return e,
    };
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "entity": kind.as_str(), "records": [] }));
    };
    match store::list_records(conn, kind) {
        Ok(records) => ok(
            &req.id,
            json!({ "entity": kind.as_str(), "records": records }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_records_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let kind = match entity_param(req) {
        Ok(k) => k,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::fetch_record(conn, kind, &id) {
        Ok(Some(record)) => ok(&req.id, json!({ "record": record })),
        Ok(None) => err(
            &req.id,
            "not_found",
            format!("{} not found", kind.as_str()),
            None,
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.list" => Some(handle_records_list(state, req)),
        "records.get" => Some(handle_records_get(state, req)),
        _ => None,
    }
}
