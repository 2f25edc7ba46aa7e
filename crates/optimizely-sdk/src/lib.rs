//! Polling datafile manager and decision engine for client-side feature
//! experimentation.
//!
//! This crate is the "core" described by the project's decision-engine
//! specification: it fetches a remotely-managed JSON datafile, indexes it
//! into an immutable [`ProjectConfig`] snapshot, and evaluates experiment
//! and feature-flag decisions for a [`UserContext`] against that snapshot.
//! The event-dispatch pipeline, notification-listener plumbing for
//! arbitrary event types, and the full convenience client surface
//! (`IsFeatureEnabled`, `GetVariation`, ...) are out of scope -- see
//! `SPEC_FULL.md` -- only the pieces load-bearing for decisions live here.

pub use optimizely_sdk_types as types;

mod bucketer;
mod client;
mod composite;
mod config_manager;
mod datafile;
mod deciders;
mod evaluator;
mod matchers;
mod project_config;
mod requester;
mod tri;
mod variables;

pub use bucketer::{
    bucket,
    BucketingDecision,
};
pub use client::{
    DecisionEngine,
    DecisionEngineConfig,
    DecisionEngineError,
};
pub use composite::{
    CompositeExperimentService,
    CompositeFeatureService,
};
pub use config_manager::{
    ConfigManagerConfig,
    ConfigManagerError,
    ConfigUpdateNotification,
    ManagerState,
    PollingConfigManager,
};
pub use datafile::parse_datafile;
pub use deciders::{
    ExperimentDecider,
    ForcedVariationService,
};
pub use evaluator::evaluate;
pub use project_config::ProjectConfig;
pub use requester::{
    DatafileTransport,
    FetchOutcome,
    HttpRequester,
    RequesterConfig,
    RequesterError,
};
pub use tri::Tri;
pub use variables::{
    resolve_variable,
    VariableValue,
};
