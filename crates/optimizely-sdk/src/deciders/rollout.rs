//! The rollout service (§4.5): an ordered chain of audience-gated "layers"
//! used for feature-flag delivery outside of experiments. Each layer has
//! exactly the shape of an experiment (one audience gate, one traffic
//! allocation); the last layer conventionally has an always-true audience
//! ("everyone else").

use optimizely_sdk_types::{
    Decision,
    DecisionReasons,
    DecisionSource,
    Options,
    Rollout,
    UserContext,
};

use super::targeting::targeting_passes;
use crate::{
    bucketer::bucket_experiment,
    project_config::ProjectConfig,
};

/// Walks `rollout.experiments` in order. For each layer: if its audience
/// doesn't pass, move on; if it passes but bucketing lands the user in the
/// layer's holdback, also move on (the layer wasn't a match). The first
/// layer where bucketing actually resolves a variation wins.
pub(crate) fn decide_rollout(project_config: &ProjectConfig, rollout: &Rollout, user: &UserContext, _options: &Options, reasons: &mut DecisionReasons) -> Decision {
    for layer in &rollout.experiments {
        if !targeting_passes(layer.audience_conditions.as_ref(), user, reasons) {
            continue;
        }
        let bucketing_decision = bucket_experiment(project_config, layer, user.bucketing_id(), reasons);
        if let Some(variation_id) = bucketing_decision.variation_id {
            if let Some(variation) = layer.variation_by_id(&variation_id) {
                return Decision {
                    variation: Some(variation.clone()),
                    source: DecisionSource::Rollout,
                    reasons: reasons.to_report(),
                };
            }
        }
    }
    Decision {
        variation: None,
        source: DecisionSource::Rollout,
        reasons: reasons.to_report(),
    }
}

#[cfg(test)]
mod tests {
    use optimizely_sdk_types::{
        Experiment,
        ExperimentStatus,
        TrafficAllocation,
        Variation,
    };

    use super::*;

    fn layer(id: &str, key: &str, allocation_end: u32) -> Experiment {
        Experiment {
            id: id.to_owned(),
            key: key.to_owned(),
            status: ExperimentStatus::Running,
            layer_id: None,
            variations: vec![Variation {
                id: "on".to_owned(),
                key: "on".to_owned(),
                feature_enabled: true,
                variables_by_id: Default::default(),
            }],
            traffic_allocation: vec![TrafficAllocation {
                end_of_range: allocation_end,
                id: "on".to_owned(),
            }],
            audience_ids: vec![],
            audience_conditions: None,
            forced_variations: Default::default(),
            group_id: None,
        }
    }

    #[test]
    fn everyone_else_layer_always_resolves() {
        let rollout = Rollout {
            id: "r1".to_owned(),
            experiments: vec![layer("l1", "layer_1", 10_000)],
        };
        let config = ProjectConfig::empty();
        let user = UserContext::new("u1");
        let mut reasons = DecisionReasons::new(&Options::default());
        let decision = decide_rollout(&config, &rollout, &user, &Options::default(), &mut reasons);
        assert_eq!(decision.source, DecisionSource::Rollout);
        assert!(decision.variation.is_some());
    }

    #[test]
    fn holdback_layer_falls_through_to_next() {
        let rollout = Rollout {
            id: "r1".to_owned(),
            experiments: vec![layer("l1", "layer_1", 0), layer("l2", "layer_2", 10_000)],
        };
        let config = ProjectConfig::empty();
        let user = UserContext::new("u1");
        let mut reasons = DecisionReasons::new(&Options::default());
        let decision = decide_rollout(&config, &rollout, &user, &Options::default(), &mut reasons);
        assert!(decision.variation.is_some());
        assert_eq!(decision.variation.unwrap().id, "on");
    }

    #[test]
    fn empty_rollout_yields_no_variation() {
        let rollout = Rollout {
            id: "r1".to_owned(),
            experiments: vec![],
        };
        let config = ProjectConfig::empty();
        let user = UserContext::new("u1");
        let mut reasons = DecisionReasons::new(&Options::default());
        let decision = decide_rollout(&config, &rollout, &user, &Options::default(), &mut reasons);
        assert!(decision.variation.is_none());
        assert_eq!(decision.source, DecisionSource::Rollout);
    }
}
