//! Loop error types and how the loop recovers from each.
//!
//! Nothing here is fatal: every error either skips to the next poll or
//! backs off for longer before the next iteration.

use smol_computer_control::ControlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// A capability the iteration needs is not there right now: no active
    /// window, or no usable planner credentials.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("UI capture failed: {0}")]
    Capture(ControlError),

    #[error("verification failed: {0}")]
    Verification(String),
}

impl From<ControlError> for AgentError {
    fn from(error: ControlError) -> Self {
        match error {
            ControlError::NoActiveWindow => {
                AgentError::CapabilityUnavailable("no active window".to_string())
            }
            other => AgentError::Capture(other),
        }
    }
}

/// How long the loop waits after a failed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Wait the normal poll interval.
    Skip,
    /// Wait the longer error backoff.
    Backoff,
}

pub fn classify(error: &AgentError) -> Recovery {
    match error {
        AgentError::CapabilityUnavailable(_) => Recovery::Skip,
        AgentError::Capture(_) | AgentError::Verification(_) => Recovery::Backoff,
    }
}
