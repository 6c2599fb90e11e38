use async_trait::async_trait;
use smol_computer_control::{Action, UiSnapshot};

use crate::error_handling::AgentError;

/// Post-execution check run once per iteration.
///
/// `before` is the snapshot the planner saw; `executed` holds the actions
/// that were attempted this iteration, in order. An error makes the loop
/// back off before its next iteration.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, before: &UiSnapshot, executed: &[Action]) -> Result<(), AgentError>;
}

/// Accepts every iteration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopVerifier;

#[async_trait]
impl Verifier for NoopVerifier {
    async fn verify(&self, _before: &UiSnapshot, _executed: &[Action]) -> Result<(), AgentError> {
        Ok(())
    }
}
