use async_trait::async_trait;
use reqwest::Client;
use smol_computer_control::ActionBatch;
use std::time::Duration;
use tracing::{debug, warn};

use crate::wire::parse_actions;
use crate::{
    PlanRequest, Planner, PlannerCredentials, PlannerError, RequestFormat, StatusUpdate,
};

/// Connect and read timeout for planner calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Planner reached over HTTP with a bearer token.
///
/// Requests are not retried here; the agent loop simply asks again on its
/// next iteration.
#[derive(Clone)]
pub struct HttpPlanner {
    client: Client,
    format: RequestFormat,
    sync_url: Option<String>,
}

impl HttpPlanner {
    pub fn new(
        timeout: Duration,
        format: RequestFormat,
        sync_url: Option<String>,
    ) -> Result<Self, PlannerError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            format,
            sync_url,
        })
    }

    /// Send one planning request and parse the answer, surfacing every
    /// failure. [`Planner::plan`] is the forgiving wrapper.
    pub async fn request_actions(
        &self,
        credentials: &PlannerCredentials,
        request: &PlanRequest,
    ) -> Result<ActionBatch, PlannerError> {
        debug!(
            "Sending plan request to {} ({} chars of UI tree)",
            endpoint_host(&credentials.endpoint),
            request.ui_tree.len()
        );

        let response = self
            .client
            .post(&credentials.endpoint)
            .header("Authorization", format!("Bearer {}", credentials.api_key))
            .json(&request.to_body(self.format))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PlannerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let actions = parse_actions(&body)?;
        debug!(
            "Planner returned {} action(s): [{}]",
            actions.len(),
            actions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(actions)
    }
}

/// Host part of the endpoint; the full URL stays out of logs.
fn endpoint_host(endpoint: &str) -> String {
    reqwest::Url::parse(endpoint)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "<invalid endpoint>".to_string())
}

#[async_trait]
impl Planner for HttpPlanner {
    async fn plan(&self, credentials: &PlannerCredentials, request: &PlanRequest) -> ActionBatch {
        match self.request_actions(credentials, request).await {
            Ok(actions) => actions,
            Err(e) => {
                warn!("Planner call failed, continuing with no actions: {}", e);
                ActionBatch::new()
            }
        }
    }

    async fn sync_status(&self, update: StatusUpdate) {
        let Some(url) = self.sync_url.clone() else {
            return;
        };
        let client = self.client.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&update).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Status synced: {}", response.status())
                }
                Ok(response) => warn!("Status sync rejected: {}", response.status()),
                Err(e) => warn!("Failed to sync status: {}", e),
            }
        });
    }

    fn name(&self) -> &str {
        "http"
    }
}
