//! Shared API type definitions
//!
//! This crate contains the response shapes of the iKnow statistics API used by
//! the exporter: cumulative learning-engine counters keyed by content domain,
//! and aggregate item counts per enrolled goal and per cue-language grouping.
//!
//! All values are snapshots decoded from a single response. Counters are
//! unsigned, so a negative value in the payload fails decoding. A `null`
//! counter or list decodes like a missing one.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

/// Decode `null` as `T::default()`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Content domain identifier, e.g. `"items"`
pub type ContentDomainKey = String;

/// Cumulative learning-engine counters for one content domain
///
/// Counters missing from the payload or set to `null` decode as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CumulativeCounters {
    /// Items ever started
    #[serde(rename = "cumulative_items_started", deserialize_with = "null_as_default")]
    pub started: u64,
    /// Total study time in milliseconds
    #[serde(rename = "cumulative_items_study_time_millis", deserialize_with = "null_as_default")]
    pub study_time_millis: u64,
    /// Sum of log half-lives in milliseconds
    #[serde(rename = "cumulative_total_log_halflife_millis", deserialize_with = "null_as_default")]
    pub total_log_halflife_millis: u64,
    #[serde(rename = "cumulative_items_reached_checkpoint_1", deserialize_with = "null_as_default")]
    pub checkpoint_1: u64,
    #[serde(rename = "cumulative_items_reached_checkpoint_2", deserialize_with = "null_as_default")]
    pub checkpoint_2: u64,
    #[serde(rename = "cumulative_items_reached_checkpoint_3", deserialize_with = "null_as_default")]
    pub checkpoint_3: u64,
}

/// Response of `statistics/learning_engine/cumulative`, keyed by content domain
pub type CumulativeStats = HashMap<ContentDomainKey, CumulativeCounters>;

/// Eligible/studied/skipped item counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemStats {
    #[serde(rename = "eligible_items_count", deserialize_with = "null_as_default")]
    pub eligible: u64,
    #[serde(rename = "studied_items_count", deserialize_with = "null_as_default")]
    pub studied: u64,
    #[serde(rename = "skipped_items_count", deserialize_with = "null_as_default")]
    pub skipped: u64,
}

/// Item counts of one enrolled goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStats {
    pub goal_id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: ItemStats,
}

/// Grouping key of an aggregate grouping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub cue_language_code: String,
}

/// Item counts of one cue-language grouping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingStats {
    pub grouping: Grouping,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: ItemStats,
}

impl GroupingStats {
    pub fn cue_language(&self) -> &str {
        &self.grouping.cue_language_code
    }
}

/// Response of `goals/enrolled/memories/aggregate`
///
/// `groupings` is optional in the payload and decodes to an empty list when
/// absent or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub goals: Vec<GoalStats>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub groupings: Vec<GroupingStats>,
}
