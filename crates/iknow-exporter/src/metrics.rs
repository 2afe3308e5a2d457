//! Prometheus gauges for iKnow statistics
//!
//! [`IknowMetrics`] owns its own [`Registry`] instead of the process-wide default
//! one, so the exporter and the scrape handler share exactly one instance and
//! tests can build as many isolated registries as they need. `GaugeVec` is
//! internally synchronized; callers never lock around `set_*` or `encode`.

use core::error::Error;
use core::fmt;

use api_types::CumulativeCounters;
use api_types::GoalStats;
use api_types::GroupingStats;
use api_types::ItemStats;
use derive_more::Display;
use error_stack::Report;
use error_stack::ResultExt;
use prometheus::proto::MetricFamily;
use prometheus::Encoder as _;
use prometheus::GaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;

pub const CONTENT_DOMAIN_LABEL: &str = "content_domain";
pub const GOAL_ID_LABEL: &str = "goal";
pub const CUE_LANGUAGE_LABEL: &str = "cue_language";

/// Content domain label value of every goal and grouping series
pub const ITEMS_CONTENT_DOMAIN: &str = "items";

/// Metrics registry errors
#[derive(Debug, Display)]
pub enum MetricsError {
    #[display("Failed to register metric {name}")]
    Registration { name: String },
    #[display("Failed to encode metrics")]
    Encoding,
}

impl Error for MetricsError {}

/// The three item-count gauges shared by goals and groupings
struct ItemGauges {
    eligible: GaugeVec,
    studied: GaugeVec,
    skipped: GaugeVec,
}

impl ItemGauges {
    fn register(
        registry: &Registry,
        prefix: &str,
        labels: &[&str],
    ) -> Result<Self, Report<MetricsError>> {
        Ok(Self {
            eligible: register_gauge(
                registry,
                &format!("{prefix}_eligible_items_count"),
                "Items that are current eligible for study",
                labels,
            )?,
            studied: register_gauge(
                registry,
                &format!("{prefix}_studied_items_count"),
                "Items that have been studied",
                labels,
            )?,
            skipped: register_gauge(
                registry,
                &format!("{prefix}_skipped_items_count"),
                "Items that have been skipped",
                labels,
            )?,
        })
    }

    fn set(&self, label_values: &[&str], items: &ItemStats) {
        self.eligible
            .with_label_values(label_values)
            .set(items.eligible as f64);
        self.studied
            .with_label_values(label_values)
            .set(items.studied as f64);
        self.skipped
            .with_label_values(label_values)
            .set(items.skipped as f64);
    }
}

/// Gauge registry exposed on `/metrics`
pub struct IknowMetrics {
    registry: Registry,
    started: GaugeVec,
    study_time: GaugeVec,
    log_halflife_millis: GaugeVec,
    checkpoint_1: GaugeVec,
    checkpoint_2: GaugeVec,
    checkpoint_3: GaugeVec,
    goals: ItemGauges,
    groupings: ItemGauges,
}

impl fmt::Debug for IknowMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IknowMetrics")
            .field("series", &self.series_count())
            .finish_non_exhaustive()
    }
}

impl IknowMetrics {
    /// Create a registry with every iKnow gauge registered and no series set.
    ///
    /// # Errors
    ///
    /// - [`MetricsError::Registration`] if a gauge cannot be created or registered
    pub fn new() -> Result<Self, Report<MetricsError>> {
        let registry = Registry::new();
        let domain = &[CONTENT_DOMAIN_LABEL];

        Ok(Self {
            started: register_gauge(
                &registry,
                "iknow_cumulative_items_started",
                "Cumulative started items",
                domain,
            )?,
            study_time: register_gauge(
                &registry,
                "iknow_cumulative_items_study_time_millis",
                "Cumulative study time",
                domain,
            )?,
            log_halflife_millis: register_gauge(
                &registry,
                "iknow_cumulative_total_log_halflife_millis",
                "Cumulative total log halflife milliseconds",
                domain,
            )?,
            checkpoint_1: register_gauge(
                &registry,
                "iknow_cumulative_items_reached_checkpoint_1",
                "Cumulative items that have reached checkpoint 1",
                domain,
            )?,
            checkpoint_2: register_gauge(
                &registry,
                "iknow_cumulative_items_reached_checkpoint_2",
                "Cumulative items that have reached checkpoint 2",
                domain,
            )?,
            checkpoint_3: register_gauge(
                &registry,
                "iknow_cumulative_items_reached_checkpoint_3",
                "Cumulative items that have reached checkpoint 3",
                domain,
            )?,
            goals: ItemGauges::register(
                &registry,
                "iknow_goal",
                &[CONTENT_DOMAIN_LABEL, GOAL_ID_LABEL],
            )?,
            groupings: ItemGauges::register(
                &registry,
                "iknow_grouping",
                &[CONTENT_DOMAIN_LABEL, CUE_LANGUAGE_LABEL],
            )?,
            registry,
        })
    }

    /// Set the six cumulative gauges of `content_domain`.
    pub fn set_cumulative(&self, content_domain: &str, counters: &CumulativeCounters) {
        let labels = &[content_domain];
        self.started
            .with_label_values(labels)
            .set(counters.started as f64);
        self.study_time
            .with_label_values(labels)
            .set(counters.study_time_millis as f64);
        self.log_halflife_millis
            .with_label_values(labels)
            .set(counters.total_log_halflife_millis as f64);
        self.checkpoint_1
            .with_label_values(labels)
            .set(counters.checkpoint_1 as f64);
        self.checkpoint_2
            .with_label_values(labels)
            .set(counters.checkpoint_2 as f64);
        self.checkpoint_3
            .with_label_values(labels)
            .set(counters.checkpoint_3 as f64);
    }

    /// Set the three goal gauges, labeled by the decimal goal id.
    pub fn set_goal(&self, goal: &GoalStats) {
        let goal_id = goal.goal_id.to_string();
        self.goals
            .set(&[ITEMS_CONTENT_DOMAIN, goal_id.as_str()], &goal.items);
    }

    /// Set the three grouping gauges, labeled by cue language.
    pub fn set_grouping(&self, grouping: &GroupingStats) {
        self.groupings
            .set(&[ITEMS_CONTENT_DOMAIN, grouping.cue_language()], &grouping.items);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Snapshot of every series set so far.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Current value of one series, `None` if it has never been set.
    ///
    /// Unlike `GaugeVec::with_label_values` this never creates the series.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let family = self
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)?;

        family
            .get_metric()
            .iter()
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && labels.iter().all(|(label, expected)| {
                        pairs
                            .iter()
                            .any(|pair| pair.get_name() == *label && pair.get_value() == *expected)
                    })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Number of series currently set across all gauges.
    pub fn series_count(&self) -> usize {
        self.gather()
            .iter()
            .map(|family| family.get_metric().len())
            .sum()
    }

    /// Encode all series in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// - [`MetricsError::Encoding`] if the encoder fails or produces invalid UTF-8
    pub fn encode(&self) -> Result<String, Report<MetricsError>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.gather(), &mut buffer)
            .change_context(MetricsError::Encoding)?;
        String::from_utf8(buffer).change_context(MetricsError::Encoding)
    }

    /// Content type of [`IknowMetrics::encode`] output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

fn register_gauge(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<GaugeVec, Report<MetricsError>> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)
        .change_context_lazy(|| MetricsError::Registration { name: name.into() })?;
    registry
        .register(Box::new(gauge.clone()))
        .change_context_lazy(|| MetricsError::Registration { name: name.into() })?;
    Ok(gauge)
}
