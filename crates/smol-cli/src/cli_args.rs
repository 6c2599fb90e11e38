//! CLI argument parsing for SmolAgent.

use clap::Parser;
use smol_providers::RequestFormat;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(name = "smolagent")]
#[command(about = "An autonomous agent that drives a UI through its accessibility tree")]
#[command(version)]
pub struct Cli {
    /// Goal for the agent, in plain language
    pub goal: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// JSON screen fixture to drive instead of a live host
    #[arg(long, value_name = "FILE")]
    pub screen: Option<PathBuf>,

    /// Encrypt and store the planner endpoint, then exit
    #[arg(long, value_name = "URL")]
    pub set_endpoint: Option<String>,

    /// Encrypt and store the planner API key, then exit
    #[arg(long, value_name = "KEY")]
    pub set_api_key: Option<String>,

    /// Print the stored planner endpoint and exit
    #[arg(long)]
    pub show_endpoint: bool,

    /// Override the status sync URL
    #[arg(long, value_name = "URL")]
    pub sync_url: Option<String>,

    /// Override the planner request body shape (user_command or goal)
    #[arg(long, value_name = "FORMAT", value_parser = parse_request_format)]
    pub request_format: Option<RequestFormat>,

    /// Override the pause between loop iterations
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,
}

impl Cli {
    /// Whether any credential management flag was given.
    pub fn manages_credentials(&self) -> bool {
        self.set_endpoint.is_some() || self.set_api_key.is_some() || self.show_endpoint
    }
}

fn parse_request_format(value: &str) -> Result<RequestFormat, String> {
    match value {
        "user_command" => Ok(RequestFormat::UserCommand),
        "goal" => Ok(RequestFormat::Goal),
        other => Err(format!(
            "unknown request format '{}', expected 'user_command' or 'goal'",
            other
        )),
    }
}
