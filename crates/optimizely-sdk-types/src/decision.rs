use crate::entities::Variation;

/// Which sub-decider ultimately produced a feature decision's variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// A feature's own experiment (forced, whitelisted, targeted, or
    /// bucketed) produced the variation.
    FeatureTest,
    /// No feature experiment made a decision; a rollout layer did.
    Rollout,
    /// A plain (non-feature) experiment decision.
    Experiment,
}

/// The outcome of a single `(experiment|feature, user)` decision. Always
/// returned by value -- there is no "decision not made" error, only a
/// `variation: None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub variation: Option<Variation>,
    pub source: DecisionSource,
    pub reasons: Vec<String>,
}

impl Decision {
    pub fn feature_enabled(&self) -> bool {
        self.variation.as_ref().is_some_and(|v| v.feature_enabled)
    }
}
