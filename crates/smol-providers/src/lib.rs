//! Planner client abstractions for SmolAgent.
//!
//! A planner receives the current UI projection together with the user's
//! goal and answers with the next batch of actions. Failures never reach the
//! agent loop as errors: a planner that cannot be reached or answers with
//! something unparsable simply yields an empty batch for that iteration.

mod error;
mod http;
pub mod mock;
mod wire;

pub use error::PlannerError;
pub use http::{HttpPlanner, DEFAULT_TIMEOUT};
pub use mock::MockPlanner;
pub use wire::parse_actions;

use serde::{Deserialize, Serialize};
use smol_computer_control::ActionBatch;
use std::fmt;

/// Trait for planner backends
#[async_trait::async_trait]
pub trait Planner: Send + Sync {
    /// Ask for the next actions. Transport and parse failures are logged
    /// and yield an empty batch.
    async fn plan(&self, credentials: &PlannerCredentials, request: &PlanRequest) -> ActionBatch;

    /// Report progress to the status endpoint. Fire-and-forget: must return
    /// without waiting on the network.
    async fn sync_status(&self, update: StatusUpdate);

    /// Get the planner name
    fn name(&self) -> &str;
}

/// Endpoint and bearer token, resolved from the vault per iteration.
#[derive(Clone, PartialEq, Eq)]
pub struct PlannerCredentials {
    pub endpoint: String,
    pub api_key: String,
}

impl fmt::Debug for PlannerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannerCredentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Which JSON body shape the planner endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFormat {
    /// `{ "ui_tree": ..., "user_command": ... }`
    #[default]
    UserCommand,
    /// `{ "goal": ..., "ui_tree": ... }`
    Goal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub goal: String,
    /// Rendered projection of the current snapshot.
    pub ui_tree: String,
}

impl PlanRequest {
    pub fn new(goal: impl Into<String>, ui_tree: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ui_tree: ui_tree.into(),
        }
    }

    pub fn to_body(&self, format: RequestFormat) -> serde_json::Value {
        match format {
            RequestFormat::UserCommand => serde_json::json!({
                "ui_tree": self.ui_tree,
                "user_command": self.goal,
            }),
            RequestFormat::Goal => serde_json::json!({
                "goal": self.goal,
                "ui_tree": self.ui_tree,
            }),
        }
    }
}

/// Body of the status sync POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub screenshot: Option<String>,
    pub ui_tree: String,
    pub status: String,
    pub last_action: Option<String>,
}
