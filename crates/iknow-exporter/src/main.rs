use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use iknow_exporter::cmd::once::run_once;
use iknow_exporter::cmd::serve::run_serve;
use iknow_exporter::config::Cli;
use iknow_exporter::config::Commands;
use utils::logging;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    let log_path = std::env::var_os(logging::LOG_PATH_ENV_VAR).map(PathBuf::from);
    let _guard = logging::init(log_path.as_deref());

    match cli.command {
        Commands::Serve(serve_args) => run_serve(*serve_args).await,
        Commands::Once(api_args) => run_once(api_args, &mut std::io::stdout().lock()).await,
    }
}
