use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::exporter::Exporter;
use crate::exporter::UpdateReport;
use crate::exporter::UpdateStatus;

/// Default refresh cadence of the iKnow statistics
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Drives [`Exporter::update`] at a fixed interval
///
/// Each cycle is update-then-sleep, so a slow update pushes the next cycle
/// back instead of skipping it. Failures are logged and never end the loop.
#[derive(Debug)]
pub struct Scheduler {
    exporter: Arc<Exporter>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(exporter: Arc<Exporter>, interval: Duration) -> Self {
        Self { exporter, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single update and log its outcome.
    pub async fn run_once(&self) -> UpdateReport {
        let report = self.exporter.update().await;
        log_report(&report);
        report
    }

    /// Update immediately, then every `interval` until cancelled.
    ///
    /// Cancellation interrupts the sleep; an in-flight update always runs to
    /// completion first. Returns the number of completed cycles.
    pub async fn run(&self, cancellation_token: CancellationToken) -> u64 {
        let mut cycles = 0;

        loop {
            if cancellation_token.is_cancelled() {
                tracing::info!("Scheduler shutdown requested");
                break;
            }

            self.run_once().await;
            cycles += 1;

            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    tracing::info!("Scheduler shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        cycles
    }
}

fn log_report(report: &UpdateReport) {
    match report.status() {
        UpdateStatus::Succeeded => {
            tracing::info!(
                series = report.series_applied(),
                "Updated iKnow stats"
            );
        }
        UpdateStatus::BothFailed => {
            tracing::error!("Error updating iKnow stats: {}", UpdateStatus::BothFailed);
        }
        status => {
            tracing::warn!(
                series = report.series_applied(),
                "Partially updated iKnow stats: {status}"
            );
        }
    }
}
