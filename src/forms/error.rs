use std::collections::BTreeMap;

use thiserror::Error;

/// Field name to human-readable message. Every failing field is reported.
pub type FieldErrors = BTreeMap<String, String>;

/// Rejections of a form operation itself, as opposed to bad field input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("form is closed")]
    Closed,

    #[error("a submission is already in flight")]
    SubmitInFlight,

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("field cannot be edited: {0}")]
    ImmutableField(String),

    #[error("unsupported value for field: {0}")]
    UnsupportedValue(String),

    #[error("field is not presented in the current mode: {0}")]
    HiddenField(String),

    #[error("{0} forms have no exam/assignment association")]
    NoAssociation(&'static str),

    #[error("no submission matches ticket {0}")]
    StaleTicket(u64),
}

impl FormError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Closed => "form_closed",
            Self::SubmitInFlight => "submit_in_flight",
            Self::UnknownField(_)
            | Self::ImmutableField(_)
            | Self::UnsupportedValue(_)
            | Self::HiddenField(_)
            | Self::NoAssociation(_) => "bad_params",
            Self::StaleTicket(_) => "stale_ticket",
        }
    }
}
