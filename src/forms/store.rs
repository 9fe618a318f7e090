use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::datetime;
use super::gateway::{MutationGateway, MutationResult};
use super::model::{EntityKind, NormalizedEntity};

/// (column, wire key) for every persisted field except `id`.
pub fn columns(kind: EntityKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        EntityKind::Announcement => &[
            ("title", "title"),
            ("description", "description"),
            ("date", "date"),
            ("class_id", "classId"),
        ],
        EntityKind::Event => &[
            ("title", "title"),
            ("description", "description"),
            ("start_time", "startTime"),
            ("end_time", "endTime"),
            ("class_id", "classId"),
        ],
        EntityKind::Lesson => &[
            ("name", "name"),
            ("day", "day"),
            ("start_time", "startTime"),
            ("end_time", "endTime"),
            ("subject_id", "subjectId"),
            ("class_id", "classId"),
            ("teacher_id", "teacherId"),
        ],
        EntityKind::Result => &[
            ("score", "score"),
            ("student_id", "studentId"),
            ("exam_id", "examId"),
            ("assignment_id", "assignmentId"),
        ],
    }
}

fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

fn opt_text(s: Option<&str>) -> SqlValue {
    s.map(text).unwrap_or(SqlValue::Null)
}

// Same order as `columns`.
fn row_values(entity: &NormalizedEntity) -> Vec<SqlValue> {
    match entity {
        NormalizedEntity::Announcement(e) => vec![
            text(&e.title),
            text(&e.description),
            SqlValue::Text(datetime::to_wire(&e.date)),
            opt_text(e.class_id.as_deref()),
        ],
        NormalizedEntity::Event(e) => vec![
            text(&e.title),
            text(&e.description),
            SqlValue::Text(datetime::to_wire(&e.start_time)),
            SqlValue::Text(datetime::to_wire(&e.end_time)),
            opt_text(e.class_id.as_deref()),
        ],
        NormalizedEntity::Lesson(e) => vec![
            text(&e.name),
            text(e.day.as_str()),
            SqlValue::Text(datetime::to_wire(&e.start_time)),
            SqlValue::Text(datetime::to_wire(&e.end_time)),
            text(&e.subject_id),
            text(&e.class_id),
            text(&e.teacher_id),
        ],
        NormalizedEntity::Result(e) => vec![
            SqlValue::Real(e.score),
            text(&e.student_id),
            opt_text(e.association.exam_id()),
            opt_text(e.association.assignment_id()),
        ],
    }
}

/// Gateway persisting into the workspace database.
pub struct SqliteGateway<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteGateway<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn insert(&self, entity: &NormalizedEntity) -> anyhow::Result<String> {
        let kind = entity.kind();
        let cols = columns(kind);
        let id = Uuid::new_v4().to_string();
        let names = cols.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", ");
        let marks = vec!["?"; cols.len() + 1].join(", ");
        let sql = format!(
            "INSERT INTO {}(id, {}) VALUES({})",
            kind.table(),
            names,
            marks
        );
        let mut values = vec![SqlValue::Text(id.clone())];
        values.extend(row_values(entity));
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(id)
    }

    fn overwrite(&self, entity: &NormalizedEntity, id: &str) -> anyhow::Result<bool> {
        let kind = entity.kind();
        let sets = columns(kind)
            .iter()
            .map(|(c, _)| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {} WHERE id = ?", kind.table(), sets);
        let mut values = row_values(entity);
        values.push(SqlValue::Text(id.to_string()));
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(changed > 0)
    }
}

impl MutationGateway for SqliteGateway<'_> {
    fn create(&mut self, entity: &NormalizedEntity) -> MutationResult {
        match self.insert(entity) {
            Ok(id) => {
                debug!(entity = entity.kind().as_str(), %id, payload = %entity.to_wire(), "record created");
                MutationResult::ok()
            }
            Err(e) => {
                warn!(entity = entity.kind().as_str(), error = %e, "create failed");
                MutationResult::failed()
            }
        }
    }

    fn update(&mut self, entity: &NormalizedEntity) -> MutationResult {
        let Some(id) = entity.id() else {
            warn!(entity = entity.kind().as_str(), "update without id");
            return MutationResult::failed();
        };
        match self.overwrite(entity, id) {
            Ok(true) => {
                debug!(entity = entity.kind().as_str(), %id, "record updated");
                MutationResult::ok()
            }
            Ok(false) => {
                warn!(entity = entity.kind().as_str(), %id, "update target not found");
                MutationResult::failed()
            }
            Err(e) => {
                warn!(entity = entity.kind().as_str(), %id, error = %e, "update failed");
                MutationResult::failed()
            }
        }
    }
}

fn sql_to_json(v: SqlValue) -> Value {
    match v {
        SqlValue::Null | SqlValue::Blob(_) => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => Value::from(f),
        SqlValue::Text(s) => Value::String(s),
    }
}

fn select_sql(kind: EntityKind) -> String {
    let names = columns(kind)
        .iter()
        .map(|(c, _)| *c)
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT id, {} FROM {}", names, kind.table())
}

fn read_row(kind: EntityKind, row: &rusqlite::Row<'_>) -> rusqlite::Result<Map<String, Value>> {
    let mut out = Map::new();
    let id: String = row.get(0)?;
    out.insert("id".into(), Value::String(id));
    for (i, (_, key)) in columns(kind).iter().enumerate() {
        let v: SqlValue = row.get(i + 1)?;
        out.insert((*key).to_string(), sql_to_json(v));
    }
    Ok(out)
}

/// Stored record in wire shape, or `None` when the id is unknown.
pub fn fetch_record(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
) -> anyhow::Result<Option<Map<String, Value>>> {
    let sql = format!("{} WHERE id = ?", select_sql(kind));
    let rec = conn
        .query_row(&sql, [id], |row| read_row(kind, row))
        .optional()?;
    Ok(rec)
}

pub fn list_records(conn: &Connection, kind: EntityKind) -> anyhow::Result<Vec<Map<String, Value>>> {
    let sql = format!("{} ORDER BY rowid", select_sql(kind));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| read_row(kind, row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
