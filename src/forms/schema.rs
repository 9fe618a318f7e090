//! Per-entity field descriptors and the validator that turns raw control
//! values into a [`NormalizedEntity`].
//!
//! Validation is descriptor driven: each entity kind lists its fields once,
//! every field is parsed by the same routine, and only the cross-field rules
//! (time windows, the Result association) and the final assembly differ by
//! kind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::association::AssessmentType;
use super::datetime;
use super::error::FieldErrors;
use super::model::{
    Announcement, Association, EntityKind, Event, FormMode, Lesson, NormalizedEntity,
    ResultEntry, Weekday,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    Date,
    DateTime,
    Weekday,
    Score,
    /// Foreign key chosen from the named reference list.
    Reference(&'static str),
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::LongText => "textarea",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Weekday => "weekday",
            Self::Score => "number",
            Self::Reference(_) => "select",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Label of the empty choice on a selector.
    pub placeholder: Option<&'static str>,
}

const fn input(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        required: true,
        placeholder: None,
    }
}

const fn select(
    name: &'static str,
    label: &'static str,
    list: &'static str,
    required: bool,
    placeholder: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind: FieldKind::Reference(list),
        required,
        placeholder: Some(placeholder),
    }
}

const ANNOUNCEMENT_FIELDS: [FieldSpec; 4] = [
    input("title", "Title", FieldKind::Text),
    input("description", "Description", FieldKind::LongText),
    input("date", "Date", FieldKind::Date),
    select("classId", "Class", "classes", false, "All Classes (School-wide)"),
];

const EVENT_FIELDS: [FieldSpec; 5] = [
    input("title", "Event Title", FieldKind::Text),
    input("description", "Description", FieldKind::LongText),
    input("startTime", "Start Time", FieldKind::DateTime),
    input("endTime", "End Time", FieldKind::DateTime),
    select("classId", "Class", "classes", false, "All Classes (School-wide)"),
];

const LESSON_FIELDS: [FieldSpec; 7] = [
    input("name", "Lesson Name", FieldKind::Text),
    input("day", "Day", FieldKind::Weekday),
    input("startTime", "Start Time", FieldKind::DateTime),
    input("endTime", "End Time", FieldKind::DateTime),
    select("subjectId", "Subject", "subjects", true, "Select Subject"),
    select("classId", "Class", "classes", true, "Select Class"),
    select("teacherId", "Teacher", "teachers", true, "Select Teacher"),
];

// examId/assignmentId are individually optional; the association rule below
// requires exactly one of them.
const RESULT_FIELDS: [FieldSpec; 4] = [
    input("score", "Score", FieldKind::Score),
    select("studentId", "Student", "students", true, "Select Student"),
    select("examId", "Exam", "exams", false, "Select Exam"),
    select("assignmentId", "Assignment", "assignments", false, "Select Assignment"),
];

pub fn fields(kind: EntityKind) -> &'static [FieldSpec] {
    match kind {
        EntityKind::Announcement => &ANNOUNCEMENT_FIELDS,
        EntityKind::Event => &EVENT_FIELDS,
        EntityKind::Lesson => &LESSON_FIELDS,
        EntityKind::Result => &RESULT_FIELDS,
    }
}

pub fn field_spec(kind: EntityKind, name: &str) -> Option<&'static FieldSpec> {
    fields(kind).iter().find(|f| f.name == name)
}

/// (start, end) pair that must not run backwards.
fn time_window(kind: EntityKind) -> Option<(&'static str, &'static str)> {
    match kind {
        EntityKind::Event | EntityKind::Lesson => Some(("startTime", "endTime")),
        EntityKind::Announcement | EntityKind::Result => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchemaRules {
    /// Upper bound of the Result score scale; the lower bound is 0.
    pub max_score: f64,
}

impl Default for SchemaRules {
    fn default() -> Self {
        Self { max_score: 100.0 }
    }
}

#[derive(Debug)]
enum Parsed {
    Text(String),
    Instant(DateTime<Utc>),
    Day(Weekday),
    Number(f64),
    Ref(Option<String>),
}

/// Trimmed text of a control value. `Ok(None)` for missing, null or blank.
pub fn raw_text(value: Option<&Value>) -> Result<Option<String>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(s.to_string()))
            }
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(()),
    }
}

fn parse_field(
    spec: &FieldSpec,
    value: Option<&Value>,
    rules: &SchemaRules,
) -> Result<Option<Parsed>, String> {
    let text = raw_text(value).map_err(|_| format!("{} has an unsupported value", spec.label))?;
    let Some(text) = text else {
        if spec.required {
            return Err(format!("{} is required!", spec.label));
        }
        return Ok(match spec.kind {
            FieldKind::Reference(_) => Some(Parsed::Ref(None)),
            _ => None,
        });
    };

    let parsed = match spec.kind {
        FieldKind::Text | FieldKind::LongText => Parsed::Text(text),
        FieldKind::Date => datetime::parse_date(&text)
            .map(Parsed::Instant)
            .ok_or_else(|| format!("{} must be a valid date", spec.label))?,
        FieldKind::DateTime => datetime::parse_datetime(&text)
            .map(Parsed::Instant)
            .ok_or_else(|| format!("{} must be a valid date and time", spec.label))?,
        FieldKind::Weekday => Weekday::parse(&text).map(Parsed::Day).ok_or_else(|| {
            format!(
                "{} must be one of {}",
                spec.label,
                Weekday::ALL.map(|d| d.as_str()).join(", ")
            )
        })?,
        FieldKind::Score => {
            let n = text
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| format!("{} must be a number", spec.label))?;
            if !(0.0..=rules.max_score).contains(&n) {
                return Err(format!(
                    "{} must be between 0 and {}",
                    spec.label, rules.max_score
                ));
            }
            Parsed::Number(n)
        }
        FieldKind::Reference(_) => Parsed::Ref(Some(text)),
    };
    Ok(Some(parsed))
}

fn check_id(mode: FormMode, value: Option<&Value>, errors: &mut FieldErrors) -> Option<String> {
    let id = match raw_text(value) {
        Ok(v) => v,
        Err(_) => {
            errors.insert("id".into(), "Id has an unsupported value".into());
            return None;
        }
    };
    match (mode, id) {
        (FormMode::Update, Some(id)) => Some(id),
        (FormMode::Update, None) => {
            errors.insert("id".into(), "Id is required when updating".into());
            None
        }
        (FormMode::Create, Some(_)) => {
            errors.insert("id".into(), "Id must not be set when creating".into());
            None
        }
        (FormMode::Create, None) => None,
    }
}

fn check_time_window(
    parsed: &BTreeMap<&'static str, Parsed>,
    (start, end): (&'static str, &'static str),
    errors: &mut FieldErrors,
) {
    if let (Some(Parsed::Instant(s)), Some(Parsed::Instant(e))) = (parsed.get(start), parsed.get(end))
    {
        if e < s {
            errors.insert(
                end.to_string(),
                "End time must not be before start time".into(),
            );
        }
    }
}

fn selected_ref(parsed: &BTreeMap<&'static str, Parsed>, name: &str) -> Option<String> {
    match parsed.get(name) {
        Some(Parsed::Ref(Some(id))) => Some(id.clone()),
        _ => None,
    }
}

// Checked against the payload itself, whatever the selector showed.
fn resolve_association(
    raw: &Map<String, Value>,
    parsed: &BTreeMap<&'static str, Parsed>,
    errors: &mut FieldErrors,
) -> Option<Association> {
    if errors.contains_key("examId") || errors.contains_key("assignmentId") {
        return None;
    }
    let exam = selected_ref(parsed, "examId");
    let assignment = selected_ref(parsed, "assignmentId");
    match (exam, assignment) {
        (Some(id), None) => Some(Association::Exam(id)),
        (None, Some(id)) => Some(Association::Assignment(id)),
        (Some(_), Some(_)) => {
            let msg = "Choose either an exam or an assignment, not both";
            errors.insert("examId".into(), msg.into());
            errors.insert("assignmentId".into(), msg.into());
            None
        }
        (None, None) => {
            let hint = raw
                .get("assessmentType")
                .and_then(|v| v.as_str())
                .and_then(AssessmentType::parse);
            match hint {
                Some(AssessmentType::Exam) => {
                    errors.insert("examId".into(), "Exam is required!".into());
                }
                Some(AssessmentType::Assignment) => {
                    errors.insert("assignmentId".into(), "Assignment is required!".into());
                }
                None => {
                    let msg = "Select an exam or an assignment";
                    errors.insert("examId".into(), msg.into());
                    errors.insert("assignmentId".into(), msg.into());
                }
            }
            None
        }
    }
}

fn take_text(parsed: &mut BTreeMap<&'static str, Parsed>, name: &str) -> Option<String> {
    match parsed.remove(name)? {
        Parsed::Text(s) => Some(s),
        _ => None,
    }
}

fn take_instant(parsed: &mut BTreeMap<&'static str, Parsed>, name: &str) -> Option<DateTime<Utc>> {
    match parsed.remove(name)? {
        Parsed::Instant(dt) => Some(dt),
        _ => None,
    }
}

fn take_ref(parsed: &mut BTreeMap<&'static str, Parsed>, name: &str) -> Option<Option<String>> {
    match parsed.remove(name)? {
        Parsed::Ref(id) => Some(id),
        _ => None,
    }
}

fn assemble(
    kind: EntityKind,
    id: Option<String>,
    mut parsed: BTreeMap<&'static str, Parsed>,
    association: Option<Association>,
) -> Option<NormalizedEntity> {
    let p = &mut parsed;
    let entity = match kind {
        EntityKind::Announcement => NormalizedEntity::Announcement(Announcement {
            id,
            title: take_text(p, "title")?,
            description: take_text(p, "description")?,
            date: take_instant(p, "date")?,
            class_id: take_ref(p, "classId")?,
        }),
        EntityKind::Event => NormalizedEntity::Event(Event {
            id,
            title: take_text(p, "title")?,
            description: take_text(p, "description")?,
            start_time: take_instant(p, "startTime")?,
            end_time: take_instant(p, "endTime")?,
            class_id: take_ref(p, "classId")?,
        }),
        EntityKind::Lesson => {
            let day = match p.remove("day")? {
                Parsed::Day(d) => d,
                _ => return None,
            };
            NormalizedEntity::Lesson(Lesson {
                id,
                name: take_text(p, "name")?,
                day,
                start_time: take_instant(p, "startTime")?,
                end_time: take_instant(p, "endTime")?,
                subject_id: take_ref(p, "subjectId")??,
                class_id: take_ref(p, "classId")??,
                teacher_id: take_ref(p, "teacherId")??,
            })
        }
        EntityKind::Result => {
            let score = match p.remove("score")? {
                Parsed::Number(n) => n,
                _ => return None,
            };
            NormalizedEntity::Result(ResultEntry {
                id,
                score,
                student_id: take_ref(p, "studentId")??,
                association: association?,
            })
        }
    };
    Some(entity)
}

/// Validate raw control values for `kind` submitted in `mode`.
///
/// Pure. On failure every offending field is reported, not just the first.
/// Blank optional foreign keys come back as explicit `None`.
pub fn validate(
    kind: EntityKind,
    mode: FormMode,
    raw: &Map<String, Value>,
    rules: &SchemaRules,
) -> Result<NormalizedEntity, FieldErrors> {
    let mut errors = FieldErrors::new();
    let id = check_id(mode, raw.get("id"), &mut errors);

    let mut parsed: BTreeMap<&'static str, Parsed> = BTreeMap::new();
    for spec in fields(kind) {
        match parse_field(spec, raw.get(spec.name), rules) {
            Ok(Some(v)) => {
                parsed.insert(spec.name, v);
            }
            Ok(None) => {}
            Err(msg) => {
                errors.insert(spec.name.to_string(), msg);
            }
        }
    }

    if let Some(window) = time_window(kind) {
        check_time_window(&parsed, window, &mut errors);
    }
    let association = match kind {
        EntityKind::Result => resolve_association(raw, &parsed, &mut errors),
        _ => None,
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    match assemble(kind, id, parsed, association) {
        Some(entity) => Ok(entity),
        None => {
            errors.insert("form".into(), "Submission is incomplete".into());
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    fn lesson_input() -> Value {
        json!({
            "name": "Algebra",
            "day": "MONDAY",
            "startTime": "2024-05-06T09:00",
            "endTime": "2024-05-06T10:00",
            "subjectId": "sub1",
            "classId": "c1",
            "teacherId": "t1"
        })
    }

    #[test]
    fn announcement_without_class_is_school_wide() {
        let input = raw(json!({
            "title": "Sports Day",
            "description": "Annual event",
            "date": "2024-05-01",
            "classId": ""
        }));
        let entity = validate(
            EntityKind::Announcement,
            FormMode::Create,
            &input,
            &SchemaRules::default(),
        )
        .expect("valid");
        let wire = entity.to_wire();
        assert_eq!(wire["classId"], Value::Null);
        assert_eq!(wire["date"], json!("2024-05-01T00:00:00Z"));
        assert_eq!(wire["id"], Value::Null);
    }

    #[test]
    fn every_missing_required_field_is_reported() {
        for kind in [
            EntityKind::Announcement,
            EntityKind::Event,
            EntityKind::Lesson,
            EntityKind::Result,
        ] {
            let errors = validate(kind, FormMode::Create, &Map::new(), &SchemaRules::default())
                .expect_err("empty input must fail");
            for spec in fields(kind).iter().filter(|f| f.required) {
                assert!(
                    errors.contains_key(spec.name),
                    "{:?} should report {}",
                    kind,
                    spec.name
                );
            }
        }
    }

    #[test]
    fn blank_required_text_names_the_field() {
        let mut input = raw(lesson_input());
        input.insert("name".into(), json!("   "));
        let errors = validate(
            EntityKind::Lesson,
            FormMode::Create,
            &input,
            &SchemaRules::default(),
        )
        .expect_err("blank name");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["name"], "Lesson Name is required!");
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut input = raw(lesson_input());
        input.insert("endTime".into(), json!("2024-05-06T08:59"));
        let errors = validate(
            EntityKind::Lesson,
            FormMode::Create,
            &input,
            &SchemaRules::default(),
        )
        .expect_err("backwards window");
        assert!(errors.contains_key("endTime"));

        let event = raw(json!({
            "title": "Fair",
            "description": "Science fair",
            "startTime": "2024-05-06T12:00:00Z",
            "endTime": "2024-05-06T11:00:00Z"
        }));
        let errors = validate(
            EntityKind::Event,
            FormMode::Create,
            &event,
            &SchemaRules::default(),
        )
        .expect_err("backwards window");
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["endTime"]);
    }

    #[test]
    fn equal_start_and_end_are_allowed() {
        let event = raw(json!({
            "title": "Fair",
            "description": "Science fair",
            "startTime": "2024-05-06T12:00",
            "endTime": "2024-05-06T12:00"
        }));
        assert!(validate(
            EntityKind::Event,
            FormMode::Create,
            &event,
            &SchemaRules::default()
        )
        .is_ok());
    }

    #[test]
    fn weekend_day_is_rejected_on_update() {
        let mut input = raw(lesson_input());
        input.insert("id".into(), json!("l1"));
        input.insert("day".into(), json!("SATURDAY"));
        let errors = validate(
            EntityKind::Lesson,
            FormMode::Update,
            &input,
            &SchemaRules::default(),
        )
        .expect_err("saturday");
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["day"]);
    }

    #[test]
    fn lesson_day_is_canonicalized() {
        let mut input = raw(lesson_input());
        input.insert("day".into(), json!("wednesday"));
        let entity = validate(
            EntityKind::Lesson,
            FormMode::Create,
            &input,
            &SchemaRules::default(),
        )
        .expect("valid");
        assert_eq!(entity.to_wire()["day"], json!("WEDNESDAY"));
    }

    #[test]
    fn update_requires_id_and_create_forbids_it() {
        let errors = validate(
            EntityKind::Lesson,
            FormMode::Update,
            &raw(lesson_input()),
            &SchemaRules::default(),
        )
        .expect_err("missing id");
        assert!(errors.contains_key("id"));

        let mut input = raw(lesson_input());
        input.insert("id".into(), json!("l1"));
        let errors = validate(
            EntityKind::Lesson,
            FormMode::Create,
            &input,
            &SchemaRules::default(),
        )
        .expect_err("id on create");
        assert!(errors.contains_key("id"));

        let entity = validate(
            EntityKind::Lesson,
            FormMode::Update,
            &input,
            &SchemaRules::default(),
        )
        .expect("valid update");
        assert_eq!(entity.id(), Some("l1"));
    }

    #[test]
    fn score_accepts_numeric_strings_within_scale() {
        let input = raw(json!({ "score": "85", "studentId": "s1", "examId": "e1" }));
        let entity = validate(
            EntityKind::Result,
            FormMode::Create,
            &input,
            &SchemaRules::default(),
        )
        .expect("valid");
        assert_eq!(entity.to_wire()["score"], json!(85.0));

        for bad in [json!("abc"), json!(-1), json!(101)] {
            let input = raw(json!({ "score": bad, "studentId": "s1", "examId": "e1" }));
            let errors = validate(
                EntityKind::Result,
                FormMode::Create,
                &input,
                &SchemaRules::default(),
            )
            .expect_err("bad score");
            assert!(errors.contains_key("score"));
        }

        let input = raw(json!({ "score": 150, "studentId": "s1", "examId": "e1" }));
        assert!(validate(
            EntityKind::Result,
            FormMode::Create,
            &input,
            &SchemaRules { max_score: 200.0 }
        )
        .is_ok());
    }

    #[test]
    fn result_association_requires_exactly_one_reference() {
        let rules = SchemaRules::default();

        let both = raw(json!({
            "score": 70, "studentId": "s1", "examId": "e1", "assignmentId": "a1"
        }));
        let errors = validate(EntityKind::Result, FormMode::Create, &both, &rules)
            .expect_err("both set");
        assert!(errors.contains_key("examId"));
        assert!(errors.contains_key("assignmentId"));

        let neither = raw(json!({ "score": 70, "studentId": "s1" }));
        let errors = validate(EntityKind::Result, FormMode::Create, &neither, &rules)
            .expect_err("neither set");
        assert!(errors.contains_key("examId"));
        assert!(errors.contains_key("assignmentId"));

        let one = raw(json!({ "score": 70, "studentId": "s1", "assignmentId": "a1" }));
        let entity = validate(EntityKind::Result, FormMode::Create, &one, &rules)
            .expect("exactly one");
        assert_eq!(entity.to_wire()["assignmentId"], json!("a1"));
        assert_eq!(entity.to_wire()["examId"], Value::Null);
    }

    #[test]
    fn blank_exam_in_exam_mode_is_reported_on_exam() {
        let input = raw(json!({
            "score": 85,
            "studentId": "s1",
            "assessmentType": "exam",
            "examId": ""
        }));
        let errors = validate(
            EntityKind::Result,
            FormMode::Create,
            &input,
            &SchemaRules::default(),
        )
        .expect_err("blank exam");
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["examId"]);
        assert_eq!(errors["examId"], "Exam is required!");
    }

    #[test]
    fn structured_values_are_rejected_not_coerced() {
        let input = raw(json!({
            "title": ["x"],
            "description": "d",
            "date": "2024-05-01"
        }));
        let errors = validate(
            EntityKind::Announcement,
            FormMode::Create,
            &input,
            &SchemaRules::default(),
        )
        .expect_err("array title");
        assert_eq!(errors["title"], "Title has an unsupported value");
    }
}
