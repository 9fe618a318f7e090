use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::model::EntityKind;

pub const KNOWN_LISTS: [&str; 6] = [
    "classes",
    "subjects",
    "teachers",
    "students",
    "exams",
    "assignments",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefOption {
    pub id: String,
    pub label: String,
}

/// Option lists keyed by list name. A list that was never supplied reads as
/// empty, so a form without it shows no choices instead of failing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceData {
    lists: BTreeMap<String, Vec<RefOption>>,
}

impl ReferenceData {
    pub fn insert(&mut self, list: impl Into<String>, options: Vec<RefOption>) {
        self.lists.insert(list.into(), options);
    }

    pub fn options(&self, list: &str) -> &[RefOption] {
        self.lists.get(list).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parse `{ "classes": [{ "id": 1, "name": "1A" }, ...], ... }`.
    ///
    /// Ids may be strings or numbers. The label comes from `label`, `title`,
    /// or `name` (+ `surname`), in that order.
    pub fn from_json(v: &Value) -> Result<Self, String> {
        let mut out = Self::default();
        if v.is_null() {
            return Ok(out);
        }
        let obj = v
            .as_object()
            .ok_or_else(|| "referenceData must be an object".to_string())?;
        for (list, items) in obj {
            if items.is_null() {
                continue;
            }
            let arr = items
                .as_array()
                .ok_or_else(|| format!("referenceData.{} must be an array", list))?;
            let mut options = Vec::with_capacity(arr.len());
            for item in arr {
                options.push(
                    option_from_json(item)
                        .ok_or_else(|| format!("referenceData.{} has an entry without id", list))?,
                );
            }
            out.insert(list.clone(), options);
        }
        Ok(out)
    }
}

fn option_from_json(item: &Value) -> Option<RefOption> {
    let id = match item.get("id")? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let str_field = |k: &str| {
        item.get(k)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let label = if let Some(l) = str_field("label").or_else(|| str_field("title")) {
        l.to_string()
    } else {
        match (str_field("name"), str_field("surname")) {
            (Some(n), Some(s)) => format!("{} {}", n, s),
            (Some(n), None) => n.to_string(),
            _ => id.clone(),
        }
    };
    Some(RefOption { id, label })
}

pub fn is_known_list(list: &str) -> bool {
    KNOWN_LISTS.contains(&list)
}

pub fn list_options(conn: &Connection, list: &str) -> anyhow::Result<Vec<RefOption>> {
    let mut stmt = conn.prepare(
        "SELECT id, label FROM reference_options
         WHERE list = ?
         ORDER BY sort_order, label",
    )?;
    let rows = stmt
        .query_map([list], |row| {
            Ok(RefOption {
                id: row.get(0)?,
                label: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Insert or relabel one option. New options go to the end of their list.
pub fn upsert_option(
    conn: &Connection,
    list: &str,
    id: Option<&str>,
    label: &str,
) -> anyhow::Result<String> {
    let id = id
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let existing: Option<i64> = conn
        .query_row(
            "SELECT sort_order FROM reference_options WHERE list = ? AND id = ?",
            (list, &id),
            |r| r.get(0),
        )
        .optional()?;
    if existing.is_some() {
        conn.execute(
            "UPDATE reference_options SET label = ? WHERE list = ? AND id = ?",
            (label, list, &id),
        )?;
        return Ok(id);
    }
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM reference_options WHERE list = ?",
        [list],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO reference_options(list, id, label, sort_order) VALUES(?, ?, ?, ?)",
        (list, &id, label, next),
    )?;
    Ok(id)
}

/// The lists a form of `kind` needs, read from the workspace.
pub fn load(conn: &Connection, kind: EntityKind) -> anyhow::Result<ReferenceData> {
    let mut out = ReferenceData::default();
    for list in kind.reference_lists() {
        out.insert(*list, list_options(conn, list)?);
    }
    Ok(out)
}
