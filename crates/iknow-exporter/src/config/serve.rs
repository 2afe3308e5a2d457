use std::time::Duration;

use clap::{Args, Parser};

use crate::client::DEFAULT_API_BASE_URL;
use crate::exporter::ExporterOptions;

/// Upstream API access shared by every command
#[derive(Args, Clone)]
pub struct ApiArgs {
    #[arg(
        long,
        env = "IKNOW_API_TOKEN",
        hide_env_values = true,
        help = "Bearer token for the iKnow API"
    )]
    pub api_token: String,

    #[arg(
        long,
        env = "IKNOW_API_BASE_URL",
        default_value = DEFAULT_API_BASE_URL,
        help = "Root URL of the iKnow API, endpoint paths are appended to it"
    )]
    pub api_base_url: String,

    #[arg(
        long,
        help = "Collect per-goal stats from the aggregate endpoint",
        default_value_t = true,
        env = "IKNOW_ENABLE_AGGREGATE",
        action = clap::ArgAction::Set
    )]
    pub enable_aggregate: bool,

    #[arg(
        long,
        help = "Collect per cue-language grouping stats from the aggregate endpoint",
        default_value_t = true,
        env = "IKNOW_ENABLE_GROUPINGS",
        action = clap::ArgAction::Set
    )]
    pub enable_groupings: bool,
}

impl ApiArgs {
    pub fn exporter_options(&self) -> ExporterOptions {
        ExporterOptions {
            enable_aggregate: self.enable_aggregate,
            enable_groupings: self.enable_groupings,
        }
    }
}

#[derive(Parser, Clone)]
pub struct ServeArgs {
    #[arg(
        long,
        env = "LISTEN_ADDRESS",
        default_value = ":8080",
        value_parser = parse_listen_address,
        help = "The address to listen on for HTTP requests, e.g. :8080 or 127.0.0.1:9100"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "IKNOW_UPDATE_INTERVAL_SECS",
        default_value = "600",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between two refreshes of the iKnow stats"
    )]
    pub update_interval_secs: u64,

    #[command(flatten)]
    pub api: ApiArgs,
}

impl ServeArgs {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

/// Accept Go-style `:port` addresses by binding all interfaces
fn parse_listen_address(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("listen address must not be empty".to_string());
    }
    if s.starts_with(':') {
        return Ok(format!("0.0.0.0{s}"));
    }
    Ok(s.to_string())
}
