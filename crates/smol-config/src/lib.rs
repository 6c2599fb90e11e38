use anyhow::Result;
use serde::{Deserialize, Serialize};
use smol_providers::RequestFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Locations searched when no explicit config path is given, in order.
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "./smolagent.toml",
    "~/.config/smolagent/config.toml",
    "~/.smolagent.toml",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub planner: PlannerConfig,
    pub agent: AgentConfig,
    pub vault: VaultConfig,
}

/// Where and how the remote planner is called.
///
/// The planner endpoint itself is a secret and lives in the vault, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub request_format: RequestFormat,
    /// Status sync endpoint; sync is off when unset
    pub sync_url: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_scroll_attempts: u32,
    pub scroll_settle_ms: u64,
    pub swipe_duration_ms: u64,
    pub sync_status: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Directory holding `vault.key` and `credentials.json`
    pub dir: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            request_format: RequestFormat::UserCommand,
            sync_url: None,
            timeout_seconds: 30,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            error_backoff_ms: 5000,
            max_retries: 5,
            retry_delay_ms: 1000,
            max_scroll_attempts: 10,
            scroll_settle_ms: 300,
            swipe_duration_ms: 300,
            sync_status: true,
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            dir: "~/.config/smolagent".to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

impl VaultConfig {
    pub fn dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).as_ref())
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir().join("vault.key")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.dir().join("credentials.json")
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// With an explicit path, that file is read (and created with defaults if
    /// it does not exist yet). Without one, the default locations are searched
    /// and a default config is written to `~/.config/smolagent/config.toml`
    /// when none of them exists.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path_to_load = match config_path {
            Some(path) => {
                let expanded = shellexpand::tilde(path).to_string();
                Path::new(&expanded).exists().then_some(expanded)
            }
            None => DEFAULT_CONFIG_PATHS.iter().find_map(|path| {
                let expanded_path = shellexpand::tilde(path);
                if Path::new(expanded_path.as_ref()).exists() {
                    Some(expanded_path.to_string())
                } else {
                    None
                }
            }),
        };

        let Some(path) = path_to_load else {
            let default_config = Self::default();
            let config_file = match config_path {
                Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
                None => Self::default_config_file(),
            };

            if let Some(parent) = config_file.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            match default_config.save(&config_file) {
                Ok(()) => info!(
                    "Created default configuration at: {}",
                    config_file.display()
                ),
                Err(e) => warn!("Could not save default config: {}", e),
            }

            return Ok(default_config);
        };

        let config_content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&config_content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path, e))?;
        config.validate()?;

        Ok(config)
    }

    fn default_config_file() -> PathBuf {
        dirs::home_dir()
            .map(|mut path| {
                path.push(".config");
                path.push("smolagent");
                path
            })
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent.max_retries == 0 {
            anyhow::bail!("agent.max_retries must be at least 1");
        }
        if self.planner.timeout_seconds == 0 {
            anyhow::bail!("planner.timeout_seconds must be greater than zero");
        }
        if let Some(url) = &self.planner.sync_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("planner.sync_url must be an http(s) URL, got '{}'", url);
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn load_with_overrides(
        config_path: Option<&str>,
        overrides: Overrides,
    ) -> Result<Self> {
        let mut config = Self::load(config_path)?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(sync_url) = overrides.sync_url {
            self.planner.sync_url = Some(sync_url);
        }
        if let Some(format) = overrides.request_format {
            self.planner.request_format = format;
        }
        if let Some(poll_interval_ms) = overrides.poll_interval_ms {
            self.agent.poll_interval_ms = poll_interval_ms;
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub sync_url: Option<String>,
    pub request_format: Option<RequestFormat>,
    pub poll_interval_ms: Option<u64>,
}
