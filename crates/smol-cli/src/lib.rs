//! SmolAgent CLI - command-line entry point for the agent loop.

mod cli_args;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info};

use smol_computer_control::{ActionExecutor, Device, RetryConfig, SimulatedDevice};
use smol_config::{Config, Overrides};
use smol_core::{AgentLoop, CredentialSource, LoopSettings, RunSummary, VaultCredentials};
use smol_providers::{HttpPlanner, Planner};
use smol_vault::{CredentialStore, FileKeyStore, Vault};

pub use cli_args::Cli;
pub use commands::manage_credentials;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(cli.verbose)?;

    let config = load_config_with_cli_overrides(&cli)?;
    let store = open_credential_store(&config)?;

    if cli.manages_credentials() {
        for line in manage_credentials(&cli, &store)? {
            println!("{}", line);
        }
        return Ok(());
    }

    let Some(goal) = cli.goal.clone() else {
        anyhow::bail!("No goal given. Run `smolagent --help` for usage.");
    };
    let Some(screen) = &cli.screen else {
        anyhow::bail!("No host UI available on this platform; pass --screen <fixture.json>");
    };

    let device = SimulatedDevice::from_fixture(screen)
        .with_context(|| format!("Failed to load screen fixture {}", screen.display()))?;
    let planner = HttpPlanner::new(
        config.planner.timeout(),
        config.planner.request_format,
        config.planner.sync_url.clone(),
    )?;

    let agent = build_agent(
        &config,
        Device::from_host(Arc::new(device)),
        Arc::new(planner),
        Arc::new(VaultCredentials::new(store)),
    );

    let handle = agent.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });

    let summary = agent.run(&goal).await;
    print_summary(&summary);
    Ok(())
}

/// Wire the loop's timings and retry policy from `config`.
pub fn build_agent(
    config: &Config,
    device: Device,
    planner: Arc<dyn Planner>,
    credentials: Arc<dyn CredentialSource>,
) -> AgentLoop {
    let agent_config = &config.agent;

    let executor = ActionExecutor::new(device.clone())
        .with_swipe_duration_ms(agent_config.swipe_duration_ms)
        .with_scroll_search(agent_config.max_scroll_attempts, agent_config.scroll_settle());

    let settings = LoopSettings {
        poll_interval: agent_config.poll_interval(),
        error_backoff: agent_config.error_backoff(),
        retry: RetryConfig::default()
            .with_max_retries(agent_config.max_retries)
            .with_delay(agent_config.retry_delay()),
        sync_status: agent_config.sync_status && config.planner.sync_url.is_some(),
    };
    debug!("Loop settings: {:?}", settings);

    AgentLoop::new(device, planner, credentials)
        .with_executor(executor)
        .with_settings(settings)
}

fn load_config_with_cli_overrides(cli: &Cli) -> Result<Config> {
    Config::load_with_overrides(
        cli.config.as_deref(),
        Overrides {
            sync_url: cli.sync_url.clone(),
            request_format: cli.request_format,
            poll_interval_ms: cli.poll_interval_ms,
        },
    )
}

fn open_credential_store(config: &Config) -> Result<CredentialStore> {
    let keys = FileKeyStore::new(config.vault.key_path());
    let vault = Vault::open(&keys)
        .with_context(|| format!("Failed to open vault key {}", keys.path().display()))?;
    Ok(CredentialStore::new(config.vault.credentials_path(), vault))
}

fn print_summary(summary: &RunSummary) {
    info!("Run complete: {:?}", summary);
    let outcome = if summary.finished { "finished" } else { "stopped" };
    println!(
        "Agent {} after {} iterations: {} actions executed, {} abandoned",
        outcome, summary.iterations, summary.actions_executed, summary.actions_abandoned
    );
}

fn initialize_logging(verbose: bool) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for krate in [
        "smol_cli",
        "smolagent",
        "smol_core",
        "smol_providers",
        "smol_computer_control",
        "smol_vault",
        "smol_config",
    ] {
        filter = filter.add_directive(format!("{}={}", krate, level).parse()?);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
    Ok(())
}
