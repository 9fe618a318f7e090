use serde_json::{Map, Value};

use super::error::FormError;
use super::schema::raw_text;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssessmentType {
    Exam,
    Assignment,
}

impl AssessmentType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exam" => Some(Self::Exam),
            "assignment" => Some(Self::Assignment),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exam => "exam",
            Self::Assignment => "assignment",
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            Self::Exam => "examId",
            Self::Assignment => "assignmentId",
        }
    }

    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "examId" => Some(Self::Exam),
            "assignmentId" => Some(Self::Assignment),
            _ => None,
        }
    }
}

/// Exam-or-assignment choice on a Result form.
///
/// Only the reference for the active mode is kept. Leaving a mode drops its
/// value, and coming back does not bring it back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationshipSelector {
    mode: AssessmentType,
    selected: Option<String>,
}

impl RelationshipSelector {
    pub fn new(mode: AssessmentType) -> Self {
        Self {
            mode,
            selected: None,
        }
    }

    /// Exam mode when the record carries an exam, otherwise assignment.
    pub fn seeded(existing: &Map<String, Value>) -> Self {
        let exam = raw_text(existing.get("examId")).ok().flatten();
        match exam {
            Some(id) => Self {
                mode: AssessmentType::Exam,
                selected: Some(id),
            },
            None => Self {
                mode: AssessmentType::Assignment,
                selected: raw_text(existing.get("assignmentId")).ok().flatten(),
            },
        }
    }

    pub fn mode(&self) -> AssessmentType {
        self.mode
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_mode(&mut self, mode: AssessmentType) {
        if mode != self.mode {
            self.mode = mode;
            self.selected = None;
        }
    }

    /// Set the visible reference. The hidden one cannot be written.
    pub fn set_reference(
        &mut self,
        field: AssessmentType,
        id: Option<String>,
    ) -> Result<(), FormError> {
        if field != self.mode {
            return Err(FormError::HiddenField(field.field().to_string()));
        }
        self.selected = id;
        Ok(())
    }

    /// Write the association into a raw payload: the visible field carries the
    /// selection (or null), the hidden field is always null.
    pub fn apply(&self, raw: &mut Map<String, Value>) {
        let (visible, hidden) = match self.mode {
            AssessmentType::Exam => ("examId", "assignmentId"),
            AssessmentType::Assignment => ("assignmentId", "examId"),
        };
        raw.insert(
            visible.to_string(),
            self.selected
                .as_ref()
                .map(|s| Value::String(s.clone()))
                .unwrap_or(Value::Null),
        );
        raw.insert(hidden.to_string(), Value::Null);
        raw.insert(
            "assessmentType".to_string(),
            Value::String(self.mode.as_str().to_string()),
        );
    }
}
