use smol_providers::PlannerCredentials;
use smol_vault::{CredentialStore, VaultError, API_KEY_ALIAS, ENDPOINT_ALIAS};
use tracing::debug;

use crate::error_handling::AgentError;

/// Supplies planner credentials at the start of each iteration.
pub trait CredentialSource: Send + Sync {
    fn resolve(&self) -> Result<PlannerCredentials, AgentError>;
}

/// Reads the endpoint and API key from the encrypted credential store.
///
/// Values are decrypted on every call so a credential saved while the loop
/// is running is picked up on the next iteration.
pub struct VaultCredentials {
    store: CredentialStore,
}

impl VaultCredentials {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }
}

impl CredentialSource for VaultCredentials {
    fn resolve(&self) -> Result<PlannerCredentials, AgentError> {
        let unavailable = |e: VaultError| {
            AgentError::CapabilityUnavailable(format!("planner credentials: {}", e))
        };

        let endpoint = self.store.require(ENDPOINT_ALIAS).map_err(unavailable)?;
        let api_key = self.store.require(API_KEY_ALIAS).map_err(unavailable)?;

        if endpoint.trim().is_empty() {
            return Err(AgentError::CapabilityUnavailable(
                "planner endpoint is empty".to_string(),
            ));
        }

        debug!("Resolved planner credentials from {}", self.store.path().display());
        Ok(PlannerCredentials { endpoint, api_key })
    }
}

/// Fixed credentials, for tests and embedding.
pub struct StaticCredentials(pub PlannerCredentials);

impl CredentialSource for StaticCredentials {
    fn resolve(&self) -> Result<PlannerCredentials, AgentError> {
        Ok(self.0.clone())
    }
}
