use super::error::FormError;
use super::gateway::MutationResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    /// Ready to submit. `failed` is set after a rejected mutation and drives
    /// the error banner until the next dispatch.
    Idle { failed: bool },
    Pending { ticket: u64 },
    Succeeded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Pending,
    Success,
    Failure,
}

impl SubmissionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Emitted once per transition out of `Pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionEvent {
    Saved,
    Failed,
}

#[derive(Debug)]
pub struct SubmissionController {
    state: SubmissionState,
    last_ticket: u64,
}

impl Default for SubmissionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionController {
    pub fn new() -> Self {
        Self {
            state: SubmissionState::Idle { failed: false },
            last_ticket: 0,
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.state, SubmissionState::Idle { .. })
    }

    pub fn outcome(&self) -> Option<SubmissionOutcome> {
        match self.state {
            SubmissionState::Idle { failed: false } => None,
            SubmissionState::Idle { failed: true } => Some(SubmissionOutcome::Failure),
            SubmissionState::Pending { .. } => Some(SubmissionOutcome::Pending),
            SubmissionState::Succeeded => Some(SubmissionOutcome::Success),
        }
    }

    /// Idle -> Pending. Returns the ticket the completion must carry.
    pub fn begin(&mut self) -> Result<u64, FormError> {
        match self.state {
            SubmissionState::Idle { .. } => {
                self.last_ticket += 1;
                self.state = SubmissionState::Pending {
                    ticket: self.last_ticket,
                };
                Ok(self.last_ticket)
            }
            SubmissionState::Pending { .. } => Err(FormError::SubmitInFlight),
            SubmissionState::Succeeded => Err(FormError::Closed),
        }
    }

    /// Pending -> Succeeded | Idle{failed}. Only the in-flight ticket is
    /// accepted, so a completion can never fire its event twice.
    pub fn complete(
        &mut self,
        ticket: u64,
        result: MutationResult,
    ) -> Result<SubmissionEvent, FormError> {
        match self.state {
            SubmissionState::Pending { ticket: current } if current == ticket => {
                if result.is_success() {
                    self.state = SubmissionState::Succeeded;
                    Ok(SubmissionEvent::Saved)
                } else {
                    self.state = SubmissionState::Idle { failed: true };
                    Ok(SubmissionEvent::Failed)
                }
            }
            _ => Err(FormError::StaleTicket(ticket)),
        }
    }
}
