use rusqlite::Connection;

use crate::forms::EntityKind;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn entity_param(req: &Request) -> Result<EntityKind, serde_json::Value> {
    let raw = required_str(req, "entity")?;
    EntityKind::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "entity must be one of: announcement, event, lesson, result",
            None,
        )
    })
}
