//! Sub-deciders (§4.5): each consults one authority in the composed
//! decision pipeline and reports whether it took authority at all
//! (`decision_made`), independent of whether it found a variation.

mod forced;
mod rollout;
mod targeting;

pub use forced::ForcedVariationService;
pub(crate) use rollout::decide_rollout;
pub(crate) use targeting::targeting_passes;

use optimizely_sdk_types::{
    DecisionReasons,
    Experiment,
    Options,
    UserContext,
    Variation,
};

use crate::{
    bucketer::bucket_experiment,
    project_config::ProjectConfig,
};

/// The outcome of a single sub-decider: `decision_made` signals that this
/// decider is authoritative and the composite pipeline should stop,
/// regardless of whether `variation` is populated.
#[derive(Debug, Clone)]
pub struct SubDecision {
    pub decision_made: bool,
    pub variation: Option<Variation>,
}

impl SubDecision {
    fn not_made() -> Self {
        Self {
            decision_made: false,
            variation: None,
        }
    }

    fn made(variation: Option<Variation>) -> Self {
        Self {
            decision_made: true,
            variation,
        }
    }
}

/// A decider over a single experiment: forced-variation, whitelist,
/// targeting, or bucket.
pub trait ExperimentDecider {
    fn decide(&self, project_config: &ProjectConfig, experiment: &Experiment, user: &UserContext, options: &Options, reasons: &mut DecisionReasons) -> SubDecision;
}

/// The whitelist service (§4.5): consults the snapshot's *embedded*
/// `forced_variations` on the experiment itself (as opposed to
/// [`ForcedVariationService`]'s runtime, application-set overrides).
pub struct WhitelistService;

impl ExperimentDecider for WhitelistService {
    fn decide(&self, _project_config: &ProjectConfig, experiment: &Experiment, user: &UserContext, _options: &Options, reasons: &mut DecisionReasons) -> SubDecision {
        let Some(variation_key) = experiment.forced_variations.get(&user.user_id) else {
            return SubDecision::not_made();
        };
        match experiment.variation_by_key(variation_key) {
            Some(variation) => {
                reasons.append_info(format!("user \"{}\" is forced in variation \"{variation_key}\" of experiment \"{}\" by the datafile whitelist", user.user_id, experiment.key));
                SubDecision::made(Some(variation.clone()))
            },
            None => {
                reasons.append_error(format!("whitelisted variation \"{variation_key}\" is not in the datafile for experiment \"{}\"", experiment.key));
                SubDecision::not_made()
            },
        }
    }
}

/// The audience-targeting service (§4.5): a failed audience evaluation is
/// itself authoritative ("user not in experiment"); a pass defers to the
/// next decider in the pipeline.
pub struct TargetingService;

impl ExperimentDecider for TargetingService {
    fn decide(&self, _project_config: &ProjectConfig, experiment: &Experiment, user: &UserContext, _options: &Options, reasons: &mut DecisionReasons) -> SubDecision {
        if targeting_passes(experiment.audience_conditions.as_ref(), user, reasons) {
            SubDecision::not_made()
        } else {
            reasons.append_info(format!("user \"{}\" does not meet the audience conditions for experiment \"{}\"", user.user_id, experiment.key));
            SubDecision::made(None)
        }
    }
}

/// The experiment-bucketer service (§4.5): always authoritative, with or
/// without a resolved variation.
pub struct BucketerService;

impl ExperimentDecider for BucketerService {
    fn decide(&self, project_config: &ProjectConfig, experiment: &Experiment, user: &UserContext, _options: &Options, reasons: &mut DecisionReasons) -> SubDecision {
        let decision = bucket_experiment(project_config, experiment, user.bucketing_id(), reasons);
        let variation = decision.variation_id.and_then(|id| experiment.variation_by_id(&id)).cloned();
        SubDecision::made(variation)
    }
}
