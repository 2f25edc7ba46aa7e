use std::collections::HashMap;

use crate::entities::audience::TreeNode;

/// Lifecycle status of an experiment as declared in the datafile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentStatus {
    Running,
    Paused,
    NotStarted,
    Archived,
    Launched,
}

impl ExperimentStatus {
    pub fn is_active(self) -> bool {
        matches!(self, ExperimentStatus::Running | ExperimentStatus::Launched)
    }
}

/// One leaf of an experiment: a bucketable outcome with its own feature-flag
/// toggle and per-variable overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variation {
    pub id: String,
    pub key: String,
    pub feature_enabled: bool,
    /// Variable id -> serialized value, as stored in the datafile.
    pub variables_by_id: HashMap<String, String>,
}

/// One entry of an ordered, cumulative traffic allocation. `end_of_range` is
/// exclusive-from-the-previous-entry, inclusive-here: a bucket value belongs
/// to the first range whose `end_of_range` exceeds it.
///
/// Reused both for an experiment's variation allocation (`id` is a variation
/// id) and for a mutually-exclusive group's experiment allocation (`id` is
/// an experiment id) -- the resolution algorithm in the bucketer is
/// identical in both cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficAllocation {
    pub end_of_range: u32,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub id: String,
    pub key: String,
    pub status: ExperimentStatus,
    pub layer_id: Option<String>,
    pub variations: Vec<Variation>,
    pub traffic_allocation: Vec<TrafficAllocation>,
    pub audience_ids: Vec<String>,
    pub audience_conditions: Option<TreeNode>,
    /// Datafile-embedded per-user forced variations (the "whitelist"),
    /// keyed by user id, valued by variation key.
    pub forced_variations: HashMap<String, String>,
    pub group_id: Option<String>,
}

impl Experiment {
    pub fn variation_by_id(&self, id: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.id == id)
    }

    pub fn variation_by_key(&self, key: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.key == key)
    }
}
