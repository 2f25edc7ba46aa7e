//! The decision engine facade (§7): wires the polling config manager, the
//! composite experiment/feature pipelines, and variable resolution into the
//! single handle an application holds.

use std::sync::Arc;

use optimizely_sdk_types::{
    ConfigurationError,
    Decision,
    DecideError,
    DecisionReasons,
    DecisionSource,
    Options,
    UserContext,
};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::{
    composite::{
        CompositeExperimentService,
        CompositeFeatureService,
    },
    config_manager::{
        ConfigManagerConfig,
        ConfigManagerError,
        ConfigUpdateNotification,
        PollingConfigManager,
    },
    deciders::ForcedVariationService,
    requester::{
        DatafileTransport,
        HttpRequester,
        RequesterConfig,
        RequesterError,
    },
    variables::{
        resolve_variable,
        VariableValue,
    },
};

/// Failures that can occur while constructing a [`DecisionEngine`], kept
/// distinct from the two `thiserror` enums they wrap so callers can match
/// on "bad requester config" vs. "bad embedded initial datafile" without
/// either one having to pretend to be the other's variant.
#[derive(Debug, Error)]
pub enum DecisionEngineError {
    #[error(transparent)]
    Requester(#[from] RequesterError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Construction knobs for a [`DecisionEngine`]: the SDK key (used to derive
/// the default datafile URL) plus the manager's and requester's tunables.
#[derive(Debug, Clone)]
pub struct DecisionEngineConfig {
    pub sdk_key: String,
    pub polling: ConfigManagerConfig,
    pub requester: RequesterConfig,
}

impl DecisionEngineConfig {
    pub fn new(sdk_key: impl Into<String>) -> Self {
        let sdk_key = sdk_key.into();
        Self {
            requester: RequesterConfig::for_sdk_key(&sdk_key),
            polling: ConfigManagerConfig::default(),
            sdk_key,
        }
    }
}

/// The application-facing handle: owns the config manager's background
/// polling task once started, the forced-variation override store, and the
/// composed experiment/feature decision pipelines.
pub struct DecisionEngine {
    manager: Arc<PollingConfigManager>,
    forced: Arc<ForcedVariationService>,
    experiment_service: CompositeExperimentService,
    feature_service: CompositeFeatureService,
}

impl DecisionEngine {
    /// Builds an engine backed by the production `HttpRequester`.
    pub fn new(config: DecisionEngineConfig) -> Result<Self, DecisionEngineError> {
        let transport: Arc<dyn DatafileTransport> = Arc::new(HttpRequester::new(config.requester)?);
        Ok(Self::with_transport(transport, config.polling)?)
    }

    /// Builds an engine over a caller-supplied transport, for tests or
    /// embedding a datafile fetched some other way.
    pub fn with_transport(transport: Arc<dyn DatafileTransport>, polling: ConfigManagerConfig) -> Result<Self, ConfigurationError> {
        let manager = Arc::new(PollingConfigManager::new(transport, polling)?);
        let forced = Arc::new(ForcedVariationService::new());
        Ok(Self {
            manager,
            experiment_service: CompositeExperimentService::new(Arc::clone(&forced)),
            feature_service: CompositeFeatureService::new(Arc::clone(&forced)),
            forced,
        })
    }

    pub async fn start(&self) -> Result<(), ConfigManagerError> {
        self.manager.start().await
    }

    pub async fn stop(&self) {
        self.manager.stop().await
    }

    pub fn forced_variations(&self) -> &ForcedVariationService {
        &self.forced
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigUpdateNotification> {
        self.manager.subscribe()
    }

    /// `Err(SdkNotReady)` until the manager has published its first
    /// snapshot; an unknown experiment key is not a caller-facing error --
    /// it's a `Decision{variation: None}` carrying an error reason, per §7's
    /// "decisions always return a Decision value" policy.
    pub fn decide_experiment(&self, experiment_key: &str, user: &UserContext, options: &Options) -> Result<Decision, DecideError> {
        let config = self.manager.get_config();
        if !config.is_loaded() {
            return Err(DecideError::SdkNotReady);
        }
        let mut reasons = DecisionReasons::new(options);
        let Some(experiment) = config.experiment_by_key(experiment_key) else {
            reasons.append_error(format!("experiment \"{experiment_key}\" was not found in the datafile"));
            return Ok(Decision {
                variation: None,
                source: DecisionSource::Experiment,
                reasons: reasons.to_report(),
            });
        };
        Ok(self.experiment_service.decide(&config, experiment, user, options, &mut reasons))
    }

    pub fn decide_feature(&self, feature_key: &str, user: &UserContext, options: &Options) -> Result<Decision, DecideError> {
        let config = self.manager.get_config();
        if !config.is_loaded() {
            return Err(DecideError::SdkNotReady);
        }
        let feature = config.feature(feature_key).ok_or_else(|| DecideError::FlagKeyInvalid(feature_key.to_owned()))?;
        let mut reasons = DecisionReasons::new(options);
        Ok(self.feature_service.decide(&config, feature, user, options, &mut reasons))
    }

    pub fn get_feature_variable(&self, feature_key: &str, variable_key: &str, user: &UserContext, options: &Options) -> Result<VariableValue, DecideError> {
        let config = self.manager.get_config();
        if !config.is_loaded() {
            return Err(DecideError::SdkNotReady);
        }
        let feature = config.feature(feature_key).ok_or_else(|| DecideError::FlagKeyInvalid(feature_key.to_owned()))?;
        let variable = feature.variable_by_key.get(variable_key).ok_or_else(|| DecideError::VariableValueInvalid(variable_key.to_owned()))?;
        let mut reasons = DecisionReasons::new(options);
        let decision = self.feature_service.decide(&config, feature, user, options, &mut reasons);
        Ok(resolve_variable(variable, &decision, &mut reasons))
    }
}
