use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::datetime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Announcement,
    Event,
    Lesson,
    Result,
}

impl EntityKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "announcement" => Some(Self::Announcement),
            "event" => Some(Self::Event),
            "lesson" => Some(Self::Lesson),
            "result" => Some(Self::Result),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Announcement => "announcement",
            Self::Event => "event",
            Self::Lesson => "lesson",
            Self::Result => "result",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Announcement => "Announcement",
            Self::Event => "Event",
            Self::Lesson => "Lesson",
            Self::Result => "Result",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::Announcement => "announcements",
            Self::Event => "events",
            Self::Lesson => "lessons",
            Self::Result => "results",
        }
    }

    /// Option lists a form of this kind renders selectors from.
    pub fn reference_lists(self) -> &'static [&'static str] {
        match self {
            Self::Announcement | Self::Event => &["classes"],
            Self::Lesson => &["subjects", "classes", "teachers"],
            Self::Result => &["students", "exams", "assignments"],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update,
}

impl FormMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }

    pub fn action_label(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MONDAY" => Some(Self::Monday),
            "TUESDAY" => Some(Self::Tuesday),
            "WEDNESDAY" => Some(Self::Wednesday),
            "THURSDAY" => Some(Self::Thursday),
            "FRIDAY" => Some(Self::Friday),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "MONDAY",
            Self::Tuesday => "TUESDAY",
            Self::Wednesday => "WEDNESDAY",
            Self::Thursday => "THURSDAY",
            Self::Friday => "FRIDAY",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
        }
    }
}

/// What a Result is graded against. Exactly one side exists by construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Association {
    Exam(String),
    Assignment(String),
}

impl Association {
    pub fn exam_id(&self) -> Option<&str> {
        match self {
            Self::Exam(id) => Some(id),
            Self::Assignment(_) => None,
        }
    }

    pub fn assignment_id(&self) -> Option<&str> {
        match self {
            Self::Exam(_) => None,
            Self::Assignment(id) => Some(id),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Announcement {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    /// `None` means school-wide.
    pub class_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub class_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lesson {
    pub id: Option<String>,
    pub name: String,
    pub day: Weekday,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub subject_id: String,
    pub class_id: String,
    pub teacher_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultEntry {
    pub id: Option<String>,
    pub score: f64,
    pub student_id: String,
    pub association: Association,
}

/// A validated form submission, ready for the mutation gateway.
#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedEntity {
    Announcement(Announcement),
    Event(Event),
    Lesson(Lesson),
    Result(ResultEntry),
}

impl NormalizedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Announcement(_) => EntityKind::Announcement,
            Self::Event(_) => EntityKind::Event,
            Self::Lesson(_) => EntityKind::Lesson,
            Self::Result(_) => EntityKind::Result,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Announcement(e) => e.id.as_deref(),
            Self::Event(e) => e.id.as_deref(),
            Self::Lesson(e) => e.id.as_deref(),
            Self::Result(e) => e.id.as_deref(),
        }
    }

    /// Wire shape: camelCase keys, canonical ISO-8601 instants, explicit nulls
    /// for absent relations.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Announcement(e) => json!({
                "id": e.id,
                "title": e.title,
                "description": e.description,
                "date": datetime::to_wire(&e.date),
                "classId": e.class_id,
            }),
            Self::Event(e) => json!({
                "id": e.id,
                "title": e.title,
                "description": e.description,
                "startTime": datetime::to_wire(&e.start_time),
                "endTime": datetime::to_wire(&e.end_time),
                "classId": e.class_id,
            }),
            Self::Lesson(e) => json!({
                "id": e.id,
                "name": e.name,
                "day": e.day.as_str(),
                "startTime": datetime::to_wire(&e.start_time),
                "endTime": datetime::to_wire(&e.end_time),
                "subjectId": e.subject_id,
                "classId": e.class_id,
                "teacherId": e.teacher_id,
            }),
            Self::Result(e) => json!({
                "id": e.id,
                "score": e.score,
                "studentId": e.student_id,
                "examId": e.association.exam_id(),
                "assignmentId": e.association.assignment_id(),
            }),
        }
    }
}
