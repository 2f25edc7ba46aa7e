//! The composed decision pipelines (§4.5): a fixed, ordered chain of
//! sub-deciders per entity kind, each one the first to claim authority.

use std::sync::Arc;

use optimizely_sdk_types::{
    Decision,
    DecisionReasons,
    DecisionSource,
    Experiment,
    Feature,
    Options,
    UserContext,
};

use crate::{
    deciders::{
        decide_rollout,
        BucketerService,
        ExperimentDecider,
        ForcedVariationService,
        TargetingService,
        WhitelistService,
    },
    project_config::ProjectConfig,
};

/// The plain-experiment pipeline: runtime override, datafile whitelist,
/// audience targeting, then bucketing. The first stage to report
/// `decision_made` wins, whether or not it resolved a variation.
pub struct CompositeExperimentService {
    forced: Arc<ForcedVariationService>,
}

impl CompositeExperimentService {
    pub fn new(forced: Arc<ForcedVariationService>) -> Self {
        Self { forced }
    }

    pub fn decide(&self, project_config: &ProjectConfig, experiment: &Experiment, user: &UserContext, options: &Options, reasons: &mut DecisionReasons) -> Decision {
        let deciders: [&dyn ExperimentDecider; 4] = [self.forced.as_ref(), &WhitelistService, &TargetingService, &BucketerService];
        for decider in deciders {
            let sub = decider.decide(project_config, experiment, user, options, reasons);
            if sub.decision_made {
                return Decision {
                    variation: sub.variation,
                    source: DecisionSource::Experiment,
                    reasons: reasons.to_report(),
                };
            }
        }
        Decision {
            variation: None,
            source: DecisionSource::Experiment,
            reasons: reasons.to_report(),
        }
    }
}

/// The feature-flag pipeline (§4.6): a forced-variation check across *all*
/// of the feature's experiments first (an override should win regardless of
/// which of the feature's experiments it names), then each experiment's own
/// whitelist/targeting/bucket chain in datafile order, then the feature's
/// rollout as the fallback. This mirrors the original SDK's
/// `getVariationForFeatureExperiment` loop, which keeps trying experiments
/// until one yields a variation before falling through to the rollout.
pub struct CompositeFeatureService {
    forced: Arc<ForcedVariationService>,
}

impl CompositeFeatureService {
    pub fn new(forced: Arc<ForcedVariationService>) -> Self {
        Self { forced }
    }

    pub fn decide(&self, project_config: &ProjectConfig, feature: &Feature, user: &UserContext, options: &Options, reasons: &mut DecisionReasons) -> Decision {
        for experiment_id in &feature.experiment_ids {
            let Some(experiment) = project_config.experiment_by_id.get(experiment_id) else {
                continue;
            };
            let Some(variation_key) = self.forced.get_variation_key(&experiment.key, &user.user_id) else {
                continue;
            };
            match experiment.variation_by_key(&variation_key) {
                Some(variation) => {
                    reasons.append_info(format!("user \"{}\" is forced in variation \"{variation_key}\" of experiment \"{}\" by a runtime override", user.user_id, experiment.key));
                    return Decision {
                        variation: Some(variation.clone()),
                        source: DecisionSource::FeatureTest,
                        reasons: reasons.to_report(),
                    };
                },
                None => {
                    reasons.append_error(format!("forced variation \"{variation_key}\" is not in the datafile for experiment \"{}\"", experiment.key));
                },
            }
        }

        for experiment_id in &feature.experiment_ids {
            let Some(experiment) = project_config.experiment_by_id.get(experiment_id) else {
                continue;
            };
            let deciders: [&dyn ExperimentDecider; 3] = [&WhitelistService, &TargetingService, &BucketerService];
            for decider in deciders {
                let sub = decider.decide(project_config, experiment, user, options, reasons);
                if sub.decision_made {
                    if let Some(variation) = sub.variation {
                        return Decision {
                            variation: Some(variation),
                            source: DecisionSource::FeatureTest,
                            reasons: reasons.to_report(),
                        };
                    }
                    break;
                }
            }
        }

        if let Some(rollout) = feature.rollout_id.as_deref().and_then(|id| project_config.rollout_by_id.get(id)) {
            return decide_rollout(project_config, rollout, user, options, reasons);
        }

        Decision {
            variation: None,
            source: DecisionSource::Rollout,
            reasons: reasons.to_report(),
        }
    }
}
