use crate::forms::reference;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn list_param(req: &Request) -> Result<String, serde_json::Value> {
    let list = required_str(req, "list")?;
    if !reference::is_known_list(&list) {
        return Err(err(
            &req.id,
            "bad_params",
            format!(
                "list must be one of: {}",
                reference::KNOWN_LISTS.join(", ")
            ),
            None,
        ));
    }
    Ok(list)
}

// Ids may arrive as numbers (exam and assignment ids usually do).
fn id_param(req: &Request) -> Result<Option<String>, serde_json::Value> {
    match req.params.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            "id must be a string or a number",
            None,
        )),
    }
}

fn handle_reference_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let list = match list_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // No workspace means no options, not an error.
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "list": list, "options": [] }));
    };
    match reference::list_options(conn, &list) {
        Ok(options) => ok(&req.id, json!({ "list": list, "options": options })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_reference_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let list = match list_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let label = match required_str(req, "label") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match id_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match reference::upsert_option(conn, &list, id.as_deref(), &label) {
        Ok(id) => ok(&req.id, json!({ "list": list, "id": id, "label": label })),
        Err(e) => err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "reference_options" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reference.list" => Some(handle_reference_list(state, req)),
        "reference.upsert" => Some(handle_reference_upsert(state, req)),
        _ => None,
    }
}
