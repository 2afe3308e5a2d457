use std::net::SocketAddr;

use anyhow::Result;

use crate::api::MetricsServer;
use crate::app::services::ApplicationServices;
use crate::app::tasks::Tasks;
use crate::config::ServeArgs;

/// Application core structure with explicit dependencies
pub struct Application {
    services: ApplicationServices,
    metrics_server: MetricsServer,
    serve_args: ServeArgs,
}

impl Application {
    /// Create new application with explicit service dependencies
    pub fn new(
        services: ApplicationServices,
        metrics_server: MetricsServer,
        serve_args: ServeArgs,
    ) -> Self {
        Self {
            services,
            metrics_server,
            serve_args,
        }
    }

    /// Get access to services
    pub fn services(&self) -> &ApplicationServices {
        &self.services
    }

    /// Get serve arguments
    pub fn serve_args(&self) -> &ServeArgs {
        &self.serve_args
    }

    /// Address the metrics server is bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.metrics_server.local_addr()
    }

    /// Start all background tasks without waiting for them
    pub fn spawn(self) -> Tasks {
        tracing::info!("Starting all application tasks...");

        let mut tasks = Tasks::new();
        tasks.spawn_all_tasks(&self.services, self.metrics_server);
        tasks
    }

    /// Run application, start all tasks and wait for completion
    pub async fn run(self) -> Result<()> {
        let mut tasks = self.spawn();

        // Wait for tasks to complete or receive shutdown signal
        if let Err(e) = tasks.wait_for_completion().await {
            tracing::error!("Error during task execution: {}", e);
            return Err(e);
        }

        tracing::info!("Application run completed");
        Ok(())
    }
}
