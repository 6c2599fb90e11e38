//! Mock Planner for Testing
//!
//! Replays a scripted sequence of responses and records every request and
//! status update it receives.
//!
//! # Example
//!
//! ```rust,ignore
//! use smol_providers::MockPlanner;
//! use smol_computer_control::Action;
//!
//! let planner = MockPlanner::new()
//!     .with_actions(vec![Action::Tap { x: 10.0, y: 20.0 }])
//!     .with_raw_response(r#"{ "actions": [ { "type": "BOGUS" } ] }"#)
//!     .with_actions(vec![Action::Finish]);
//! ```

use async_trait::async_trait;
use smol_computer_control::{Action, ActionBatch};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::wire::parse_actions;
use crate::{PlanRequest, Planner, PlannerCredentials, StatusUpdate};

/// A scripted planner answer.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Actions(ActionBatch),
    /// A raw body, run through the real response parser.
    Raw(String),
}

#[derive(Default)]
struct Recorded {
    responses: VecDeque<MockResponse>,
    requests: Vec<PlanRequest>,
    endpoints: Vec<String>,
    status_updates: Vec<StatusUpdate>,
}

/// Once the script runs out every call returns an empty batch.
#[derive(Default)]
pub struct MockPlanner {
    inner: Mutex<Recorded>,
}

impl MockPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actions(self, actions: Vec<Action>) -> Self {
        self.lock().responses.push_back(MockResponse::Actions(actions));
        self
    }

    pub fn with_raw_response(self, body: &str) -> Self {
        self.lock()
            .responses
            .push_back(MockResponse::Raw(body.to_string()));
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<PlanRequest> {
        self.lock().requests.clone()
    }

    /// Endpoints the requests were addressed to.
    pub fn endpoints(&self) -> Vec<String> {
        self.lock().endpoints.clone()
    }

    pub fn status_updates(&self) -> Vec<StatusUpdate> {
        self.lock().status_updates.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Planner for MockPlanner {
    async fn plan(&self, credentials: &PlannerCredentials, request: &PlanRequest) -> ActionBatch {
        let mut inner = self.lock();
        inner.requests.push(request.clone());
        inner.endpoints.push(credentials.endpoint.clone());

        match inner.responses.pop_front() {
            Some(MockResponse::Actions(actions)) => actions,
            Some(MockResponse::Raw(body)) => parse_actions(&body).unwrap_or_else(|e| {
                warn!("Mock planner response rejected: {}", e);
                ActionBatch::new()
            }),
            None => ActionBatch::new(),
        }
    }

    async fn sync_status(&self, update: StatusUpdate) {
        self.lock().status_updates.push(update);
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> PlannerCredentials {
        PlannerCredentials {
            endpoint: "mock://planner".to_string(),
            api_key: "key".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let planner = MockPlanner::new()
            .with_actions(vec![Action::ScrollForward])
            .with_raw_response(r#"{ "actions": [ { "type": "NOPE" } ] }"#)
            .with_raw_response(r#"{ "actions": [ { "type": "FINISH" } ] }"#);
        let request = PlanRequest::new("goal", "tree");

        assert_eq!(
            planner.plan(&credentials(), &request).await,
            vec![Action::ScrollForward]
        );
        assert!(planner.plan(&credentials(), &request).await.is_empty());
        assert_eq!(
            planner.plan(&credentials(), &request).await,
            vec![Action::Finish]
        );
        assert!(planner.plan(&credentials(), &request).await.is_empty());

        assert_eq!(planner.requests().len(), 4);
        assert_eq!(planner.endpoints()[0], "mock://planner");
    }
}
