use serde::{Deserialize, Serialize};

use super::model::{FormMode, NormalizedEntity};

/// What a persistence call reports back. No field-level detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    pub success: bool,
    pub error: bool,
}

impl MutationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            error: true,
        }
    }

    /// A report claiming both success and error is treated as a failure.
    pub fn is_success(&self) -> bool {
        self.success && !self.error
    }
}

/// Create/update entry points for persisted entities. `update` relies on
/// `entity.id()`; existence of the target is for the implementation to check.
pub trait MutationGateway {
    fn create(&mut self, entity: &NormalizedEntity) -> MutationResult;
    fn update(&mut self, entity: &NormalizedEntity) -> MutationResult;
}

pub fn dispatch(
    gateway: &mut dyn MutationGateway,
    mode: FormMode,
    entity: &NormalizedEntity,
) -> MutationResult {
    match mode {
        FormMode::Create => gateway.create(entity),
        FormMode::Update => gateway.update(entity),
    }
}
