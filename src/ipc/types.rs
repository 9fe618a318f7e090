use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use rusqlite::Connection;
use serde::Deserialize;

use crate::forms::{FormInstance, OutcomeNotice};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Notices raised by form hooks, tagged with the form id, waiting to be
/// returned to the shell.
pub type Outbox = Rc<RefCell<Vec<(String, OutcomeNotice)>>>;

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub forms: HashMap<String, FormInstance>,
    pub outbox: Outbox,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            forms: HashMap::new(),
            outbox: Rc::new(RefCell::new(Vec::new())),
        }
    }
}
