//! The forced-variation service (§4.5, §9): application-set runtime
//! overrides keyed by `(experiment_key, user_id)`. Conceptually mutable
//! global state, encapsulated behind an explicit handle so tests (and
//! multiple client instances) can each own a private one.

use std::collections::HashMap;

use optimizely_sdk_types::{
    DecisionReasons,
    Experiment,
    Options,
    UserContext,
};
use parking_lot::RwLock;

use super::{
    ExperimentDecider,
    SubDecision,
};
use crate::project_config::ProjectConfig;

/// Many readers (every `decide` call), rare writers (`set_variation` /
/// `remove_variation`), each write a full replacement of one entry -- never
/// a partial mutation -- per the concurrency model in §5.
#[derive(Default)]
pub struct ForcedVariationService {
    overrides: RwLock<HashMap<(String, String), String>>,
}

impl ForcedVariationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_variation(&self, experiment_key: impl Into<String>, user_id: impl Into<String>, variation_key: impl Into<String>) {
        self.overrides.write().insert((experiment_key.into(), user_id.into()), variation_key.into());
    }

    pub fn remove_variation(&self, experiment_key: &str, user_id: &str) {
        self.overrides.write().remove(&(experiment_key.to_owned(), user_id.to_owned()));
    }

    pub fn get_variation_key(&self, experiment_key: &str, user_id: &str) -> Option<String> {
        self.overrides.read().get(&(experiment_key.to_owned(), user_id.to_owned())).cloned()
    }
}

impl ExperimentDecider for ForcedVariationService {
    fn decide(&self, _project_config: &ProjectConfig, experiment: &Experiment, user: &UserContext, _options: &Options, reasons: &mut DecisionReasons) -> SubDecision {
        let Some(variation_key) = self.get_variation_key(&experiment.key, &user.user_id) else {
            return SubDecision::not_made();
        };
        match experiment.variation_by_key(&variation_key) {
            Some(variation) => {
                reasons.append_info(format!("user \"{}\" is forced in variation \"{variation_key}\" of experiment \"{}\" by a runtime override", user.user_id, experiment.key));
                SubDecision::made(Some(variation.clone()))
            },
            None => {
                reasons.append_error(format!("forced variation \"{variation_key}\" is not in the datafile for experiment \"{}\"", experiment.key));
                SubDecision::not_made()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use optimizely_sdk_types::{
        ExperimentStatus,
        Variation,
    };

    use super::*;

    fn sample_experiment() -> Experiment {
        Experiment {
            id: "e1".to_owned(),
            key: "exp".to_owned(),
            status: ExperimentStatus::Running,
            layer_id: None,
            variations: vec![Variation {
                id: "v1".to_owned(),
                key: "on".to_owned(),
                feature_enabled: true,
                variables_by_id: Default::default(),
            }],
            traffic_allocation: vec![],
            audience_ids: vec![],
            audience_conditions: None,
            forced_variations: Default::default(),
            group_id: None,
        }
    }

    #[test]
    fn override_resolves_to_variation() {
        let service = ForcedVariationService::new();
        service.set_variation("exp", "u1", "on");
        let experiment = sample_experiment();
        let user = UserContext::new("u1");
        let config = ProjectConfig::empty();
        let mut reasons = DecisionReasons::new(&Options::default());
        let decision = service.decide(&config, &experiment, &user, &Options::default(), &mut reasons);
        assert!(decision.decision_made);
        assert_eq!(decision.variation.unwrap().key, "on");
    }

    #[test]
    fn no_override_defers() {
        let service = ForcedVariationService::new();
        let experiment = sample_experiment();
        let user = UserContext::new("u1");
        let config = ProjectConfig::empty();
        let mut reasons = DecisionReasons::new(&Options::default());
        let decision = service.decide(&config, &experiment, &user, &Options::default(), &mut reasons);
        assert!(!decision.decision_made);
    }

    #[test]
    fn removed_override_defers_again() {
        let service = ForcedVariationService::new();
        service.set_variation("exp", "u1", "on");
        service.remove_variation("exp", "u1");
        assert_eq!(service.get_variation_key("exp", "u1"), None);
    }
}
