use clap::{Parser, Subcommand};
use utils::version;

use crate::config::serve::{ApiArgs, ServeArgs};

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve /metrics and refresh iKnow stats periodically
    Serve(Box<ServeArgs>),
    /// Fetch iKnow stats once and print the metrics exposition
    Once(ApiArgs),
}
