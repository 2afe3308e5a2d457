//! Maps fetched iKnow statistics onto the gauge registry
//!
//! One [`Exporter::update`] fetches both statistics sources and applies each
//! one independently: a failed fetch is logged and leaves the gauges of that
//! source exactly as the last successful cycle set them. Series for domains,
//! goals or groupings missing from a later response are never removed.

use std::sync::Arc;

use derive_more::Display;

use crate::client::IknowClient;
use crate::metrics::IknowMetrics;

/// Gauges set per content domain of the cumulative response
pub const CUMULATIVE_SERIES_PER_DOMAIN: usize = 6;
/// Gauges set per goal or grouping of the aggregate response
pub const ITEM_SERIES_PER_ENTRY: usize = 3;

/// Which statistics sources the exporter collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExporterOptions {
    /// Fetch `goals/enrolled/memories/aggregate`
    pub enable_aggregate: bool,
    /// Apply the grouping entries of the aggregate response
    pub enable_groupings: bool,
}

impl Default for ExporterOptions {
    fn default() -> Self {
        Self {
            enable_aggregate: true,
            enable_groupings: true,
        }
    }
}

/// Result of one statistics source within an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Fetched and applied, `series` gauges were set
    Applied { series: usize },
    /// Fetch failed, gauges of this source were left untouched
    Failed { reason: String },
    /// Collection of this source is turned off
    Disabled,
}

impl SourceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed { .. })
    }
}

/// Condensed outcome of an update, a disabled source counts as not failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UpdateStatus {
    #[display("succeeded")]
    Succeeded,
    #[display("cumulative stats failed")]
    CumulativeFailed,
    #[display("aggregate stats failed")]
    AggregateFailed,
    #[display("cumulative and aggregate stats failed")]
    BothFailed,
}

/// Per-source outcome of one [`Exporter::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub cumulative: SourceOutcome,
    pub aggregate: SourceOutcome,
}

impl UpdateReport {
    pub fn status(&self) -> UpdateStatus {
        match (self.cumulative.is_failed(), self.aggregate.is_failed()) {
            (false, false) => UpdateStatus::Succeeded,
            (true, false) => UpdateStatus::CumulativeFailed,
            (false, true) => UpdateStatus::AggregateFailed,
            (true, true) => UpdateStatus::BothFailed,
        }
    }

    /// Total number of gauges set in this update
    pub fn series_applied(&self) -> usize {
        [&self.cumulative, &self.aggregate]
            .into_iter()
            .map(|outcome| match outcome {
                SourceOutcome::Applied { series } => *series,
                _ => 0,
            })
            .sum()
    }
}

/// Owns the API client and publishes into the shared registry
#[derive(Debug)]
pub struct Exporter {
    client: IknowClient,
    metrics: Arc<IknowMetrics>,
    options: ExporterOptions,
}

impl Exporter {
    pub fn new(client: IknowClient, metrics: Arc<IknowMetrics>, options: ExporterOptions) -> Self {
        Self {
            client,
            metrics,
            options,
        }
    }

    pub fn metrics(&self) -> &Arc<IknowMetrics> {
        &self.metrics
    }

    pub fn options(&self) -> ExporterOptions {
        self.options
    }

    /// Fetch every enabled source and apply it to the registry.
    ///
    /// Never fails: fetch errors are logged and reported per source. The
    /// cumulative source is always applied before the aggregate one.
    pub async fn update(&self) -> UpdateReport {
        let cumulative = self.update_cumulative().await;

        let aggregate = if self.options.enable_aggregate {
            self.update_aggregate().await
        } else {
            SourceOutcome::Disabled
        };

        UpdateReport {
            cumulative,
            aggregate,
        }
    }

    async fn update_cumulative(&self) -> SourceOutcome {
        let stats = match self.client.cumulative_stats().await {
            Ok(stats) => stats,
            Err(report) => {
                tracing::warn!("Failed to fetch cumulative stats: {report:?}");
                return SourceOutcome::Failed {
                    reason: format!("{report:#}"),
                };
            }
        };

        for (content_domain, counters) in &stats {
            self.metrics.set_cumulative(content_domain, counters);
        }

        let series = stats.len() * CUMULATIVE_SERIES_PER_DOMAIN;
        tracing::debug!(
            content_domains = stats.len(),
            series,
            "Applied cumulative stats"
        );
        SourceOutcome::Applied { series }
    }

    async fn update_aggregate(&self) -> SourceOutcome {
        let stats = match self.client.aggregate_stats().await {
            Ok(stats) => stats,
            Err(report) => {
                tracing::warn!("Failed to fetch aggregate stats: {report:?}");
                return SourceOutcome::Failed {
                    reason: format!("{report:#}"),
                };
            }
        };

        for goal in &stats.goals {
            self.metrics.set_goal(goal);
        }
        let mut entries = stats.goals.len();

        if self.options.enable_groupings {
            for grouping in &stats.groupings {
                self.metrics.set_grouping(grouping);
            }
            entries += stats.groupings.len();
        }

        let series = entries * ITEM_SERIES_PER_ENTRY;
        tracing::debug!(
            goals = stats.goals.len(),
            groupings = stats.groupings.len(),
            series,
            "Applied aggregate stats"
        );
        SourceOutcome::Applied { series }
    }
}
