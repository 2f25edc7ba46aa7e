//! Caller-facing error taxonomy.
//!
//! Modeled on the teacher's `errors` crate split between a stable,
//! string-matchable variant tag and a human-readable message: here a
//! `thiserror` enum plays both roles, since the exact `Display` text is
//! part of the cross-SDK contract (see `decide_errors.go` in the original
//! source) rather than an implementation detail.
//!
//! Evaluation errors never reach this type -- they're captured as reasons
//! (see [`crate::reasons::DecisionReasons`]) and the evaluator always
//! returns `Tri::Unknown` instead of propagating a `Result::Err`. Only the
//! two caller-facing cases from the decide API surface here.

use thiserror::Error;

/// Errors returned directly to the caller of the decide API, as opposed to
/// being captured as a reason string inside a `Decision`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecideError {
    /// No project configuration has been loaded yet (the `ConfigManager`'s
    /// snapshot still has `revision == ""`) and the caller demanded one.
    #[error("Optimizely SDK not configured properly yet")]
    SdkNotReady,

    /// The caller named a feature flag key absent from the project config.
    #[error("No flag was found for key \"{0}\".")]
    FlagKeyInvalid(String),

    /// A variable lookup found a value that didn't parse as the variable's
    /// declared type.
    #[error("Variable value for key \"{0}\" is invalid or wrong type.")]
    VariableValueInvalid(String),
}

/// Errors raised while turning a raw datafile into a [`crate::entities`]
/// snapshot. These never affect a manager's currently-published snapshot --
/// see `ConfigManager`'s refresh protocol -- they only prevent a *new* one
/// from replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("datafile is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("datafile version {0} is unsupported; this SDK understands version >= 4")]
    UnsupportedVersion(String),

    #[error("{entity} {id:?} references unknown {referenced_kind} id {referenced_id:?}")]
    DanglingReference {
        entity: &'static str,
        id: String,
        referenced_kind: &'static str,
        referenced_id: String,
    },

    #[error("experiment {experiment_key:?} traffic allocation is not ordered/non-decreasing")]
    MalformedTrafficAllocation { experiment_key: String },
}
