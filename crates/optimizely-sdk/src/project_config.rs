//! The indexed, immutable project-configuration snapshot (§3). Built once
//! by [`crate::datafile::parse_datafile`] and never mutated afterward --
//! published snapshots are plain `Arc<ProjectConfig>` values handed out by
//! the [`crate::config_manager::PollingConfigManager`].

use std::collections::HashMap;

use optimizely_sdk_types::{
    Audience,
    Experiment,
    Feature,
    Group,
    Rollout,
};

/// A fully-indexed, immutable project configuration. Every id referenced
/// anywhere in the snapshot resolves inside the snapshot -- dangling
/// references are rejected at parse time (see
/// [`optimizely_sdk_types::ConfigurationError::DanglingReference`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectConfig {
    pub revision: String,
    pub account_id: String,
    pub project_id: String,
    pub anonymize_ip: bool,
    pub bot_filtering_enabled: bool,
    pub sdk_key: String,

    pub experiment_by_id: HashMap<String, Experiment>,
    /// key -> id, so both lookup directions share the single owned copy in
    /// `experiment_by_id`.
    experiment_key_to_id: HashMap<String, String>,
    pub feature_by_key: HashMap<String, Feature>,
    pub audience_by_id: HashMap<String, Audience>,
    pub group_by_id: HashMap<String, Group>,
    pub rollout_by_id: HashMap<String, Rollout>,
    pub attribute_key_to_id: HashMap<String, String>,
    pub event_key_to_id: HashMap<String, String>,
}

impl ProjectConfig {
    /// The pre-first-load sentinel: empty maps everywhere, `revision ==
    /// ""`. Callers distinguish "no config loaded yet" from a real (if
    /// minimal) config via [`ProjectConfig::is_loaded`].
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        !self.revision.is_empty()
    }

    pub fn experiment_by_key(&self, key: &str) -> Option<&Experiment> {
        let id = self.experiment_key_to_id.get(key)?;
        self.experiment_by_id.get(id)
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.group_by_id.get(id)
    }

    pub fn feature(&self, key: &str) -> Option<&Feature> {
        self.feature_by_key.get(key)
    }

    pub(crate) fn insert_experiment(&mut self, experiment: Experiment) {
        self.experiment_key_to_id.insert(experiment.key.clone(), experiment.id.clone());
        self.experiment_by_id.insert(experiment.id.clone(), experiment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_has_empty_revision_and_maps() {
        let config = ProjectConfig::empty();
        assert!(!config.is_loaded());
        assert_eq!(config.revision, "");
        assert!(config.experiment_by_id.is_empty());
        assert!(config.experiment_by_key("anything").is_none());
    }
}
