use std::sync::Arc;

use anyhow::Result;

use crate::api::MetricsServer;
use crate::app::core::Application;
use crate::app::services::ApplicationServices;
use crate::client::IknowClient;
use crate::config::ApiArgs;
use crate::config::ServeArgs;
use crate::exporter::Exporter;
use crate::metrics::IknowMetrics;
use crate::scheduler::Scheduler;

/// Application builder
pub struct ApplicationBuilder {
    serve_args: ServeArgs,
}

impl ApplicationBuilder {
    /// Create new application builder
    pub fn new(serve_args: ServeArgs) -> Self {
        Self { serve_args }
    }

    /// Build complete application
    ///
    /// Binds the listen address, so a busy or invalid address fails here.
    pub async fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let metrics = create_metrics()?;
        let exporter = create_exporter(&self.serve_args.api, metrics.clone())?;
        let scheduler = Arc::new(Scheduler::new(
            exporter.clone(),
            self.serve_args.update_interval(),
        ));

        let metrics_server = MetricsServer::bind(&self.serve_args.listen_address, metrics.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start metrics server: {e:?}"))?;

        let services = ApplicationServices {
            metrics,
            exporter,
            scheduler,
        };

        Ok(Application::new(services, metrics_server, self.serve_args))
    }
}

/// Create the shared gauge registry
pub fn create_metrics() -> Result<Arc<IknowMetrics>> {
    let metrics = IknowMetrics::new()
        .map_err(|e| anyhow::anyhow!("Failed to create metrics registry: {e:?}"))?;
    Ok(Arc::new(metrics))
}

/// Create an exporter publishing into `metrics`
pub fn create_exporter(api_args: &ApiArgs, metrics: Arc<IknowMetrics>) -> Result<Arc<Exporter>> {
    if api_args.api_token.trim().is_empty() {
        tracing::warn!("iKnow API token is empty, upstream requests will likely be rejected");
    }

    let client = IknowClient::new(&api_args.api_token, &api_args.api_base_url)
        .map_err(|e| anyhow::anyhow!("Failed to create iKnow API client: {e:?}"))?;

    tracing::info!(
        base_url = %client.base_url(),
        enable_aggregate = api_args.enable_aggregate,
        enable_groupings = api_args.enable_groupings,
        "Created iKnow exporter"
    );

    Ok(Arc::new(Exporter::new(
        client,
        metrics,
        api_args.exporter_options(),
    )))
}
