use anyhow::Result;
use utils::version;

use crate::app::ApplicationBuilder;
use crate::config::ServeArgs;

pub async fn run_serve(serve_args: ServeArgs) -> Result<()> {
    tracing::info!("Starting iKnow exporter {}", &**version::VERSION);
    tracing::info!(
        listen_address = %serve_args.listen_address,
        update_interval_secs = serve_args.update_interval_secs,
        "Serve configuration"
    );

    let app = ApplicationBuilder::new(serve_args).build().await?;

    app.run().await?;

    tracing::info!("iKnow exporter stopped");
    Ok(())
}
