use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::MetricsServer;
use crate::app::services::ApplicationServices;

/// Upper bound for tasks to finish after cancellation
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Task manager, responsible for starting and managing all background tasks
pub struct Tasks {
    pub tasks: Vec<JoinHandle<()>>,
    cancellation_token: CancellationToken,
}

impl Default for Tasks {
    fn default() -> Self {
        Self::new()
    }
}

enum Exit {
    Signal,
    TaskFinished {
        index: usize,
        result: Result<(), JoinError>,
    },
}

impl Tasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Start all background tasks
    pub fn spawn_all_tasks(&mut self, services: &ApplicationServices, metrics_server: MetricsServer) {
        // Start stats scheduler task
        let scheduler_task = self.spawn_scheduler_task(services);
        self.tasks.push(scheduler_task);

        // Start metrics server task
        let metrics_server_task = self.spawn_metrics_server_task(metrics_server);
        self.tasks.push(metrics_server_task);
    }

    /// wait for tasks to complete or receive shutdown signal
    ///
    /// Neither task ends on its own, so one finishing early is treated as a
    /// failure and the remaining ones are shut down as well.
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        if self.tasks.is_empty() {
            return Ok(());
        }

        // Set up signal handling for graceful shutdown
        let mut signal_handler = shutdown_signal()?;

        self.wait_for_exit(&mut signal_handler).await
    }

    /// Wait until `signal_handler` finishes or a task exits, then shut down
    ///
    /// The signal listener is aborted when a task exits first.
    async fn wait_for_exit(&mut self, signal_handler: &mut JoinHandle<()>) -> Result<()> {
        let exit = tokio::select! {
            // Wait for shutdown signal
            _ = &mut *signal_handler => Exit::Signal,
            // Wait for any task to complete unexpectedly
            (result, index, _) = futures::future::select_all(self.tasks.iter_mut()) => {
                Exit::TaskFinished { index, result }
            }
        };

        match exit {
            Exit::Signal => {
                tracing::info!("Shutdown signal received, cancelling all tasks");
                self.shutdown(SHUTDOWN_TIMEOUT).await;
                Ok(())
            }
            Exit::TaskFinished { index, result } => {
                signal_handler.abort();
                // a finished handle must not be polled again
                self.tasks.remove(index);
                self.shutdown(SHUTDOWN_TIMEOUT).await;

                if let Err(e) = result {
                    tracing::error!("Task completed with error: {e}");
                    return Err(e.into());
                }
                tracing::warn!("Task completed unexpectedly");
                Err(anyhow::anyhow!("Background task stopped unexpectedly"))
            }
        }
    }

    /// Cancel every task and wait at most `timeout` for them to finish
    pub async fn shutdown(&mut self, timeout: Duration) {
        self.cancellation_token.cancel();
        self.wait_for_tasks_with_timeout(timeout).await;
    }

    async fn wait_for_tasks_with_timeout(&mut self, timeout: Duration) {
        tokio::time::timeout(timeout, async {
            for task in self.tasks.drain(..) {
                if let Err(e) = task.await {
                    tracing::error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            tracing::warn!("Task shutdown timed out after {:?}", timeout);
        });
    }

    fn spawn_scheduler_task(&self, services: &ApplicationServices) -> JoinHandle<()> {
        let scheduler = services.scheduler.clone();
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tracing::info!(
                interval_secs = scheduler.interval().as_secs(),
                "Starting iKnow stats scheduler task"
            );
            let cycles = scheduler.run(token).await;
            tracing::info!(cycles, "iKnow stats scheduler task completed");
        })
    }

    fn spawn_metrics_server_task(&self, metrics_server: MetricsServer) -> JoinHandle<()> {
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tracing::info!("Starting metrics server task");
            if let Err(e) = metrics_server.run(token).await {
                tracing::error!("Metrics server error: {e:?}");
            }
            tracing::info!("Metrics server task completed");
        })
    }
}

fn shutdown_signal() -> Result<JoinHandle<()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }))
    }
    #[cfg(not(unix))]
    {
        Ok(tokio::spawn(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
                Err(e) => tracing::error!("Failed to listen for Ctrl+C: {e}"),
            }
        }))
    }
}
