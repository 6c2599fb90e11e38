use anyhow::Result;
use smol_vault::{CredentialStore, API_KEY_ALIAS, ENDPOINT_ALIAS};
use tracing::info;

use crate::cli_args::Cli;

/// Apply the credential management flags, returning the lines to print.
pub fn manage_credentials(cli: &Cli, store: &CredentialStore) -> Result<Vec<String>> {
    let mut output = Vec::new();

    if let Some(endpoint) = &cli.set_endpoint {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            anyhow::bail!("Planner endpoint must be an http(s) URL");
        }
        store.put(ENDPOINT_ALIAS, endpoint)?;
        info!("Stored planner endpoint in {}", store.path().display());
        output.push("Planner endpoint saved.".to_string());
    }

    if let Some(api_key) = &cli.set_api_key {
        if api_key.trim().is_empty() {
            anyhow::bail!("API key must not be empty");
        }
        store.put(API_KEY_ALIAS, api_key.trim())?;
        info!("Stored planner API key in {}", store.path().display());
        output.push("API key saved.".to_string());
    }

    if cli.show_endpoint {
        match store.get(ENDPOINT_ALIAS)? {
            Some(endpoint) => output.push(endpoint),
            None => output.push("No planner endpoint configured.".to_string()),
        }
    }

    Ok(output)
}
