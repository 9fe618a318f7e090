//! Entity form submission engine: schema validation, the exam/assignment
//! selector, the submission state machine and the gateway seam.

pub mod association;
pub mod controller;
pub mod datetime;
pub mod error;
pub mod form;
pub mod gateway;
pub mod model;
pub mod reference;
pub mod schema;
pub mod store;

pub use association::AssessmentType;
pub use error::FormError;
pub use form::{render_form, FormInstance, FormSettings, OutcomeNotice};
pub use model::{EntityKind, FormMode};
pub use reference::ReferenceData;
pub use store::SqliteGateway;
