//! Immutable value types describing a project configuration.
//!
//! Every type here is `Clone` and carries no interior mutability: once a
//! [`crate::decision`] call borrows a snapshot built from these types, the
//! snapshot cannot change underneath it.

mod audience;
mod experiment;
mod feature;
mod group;

pub use audience::{
    Audience,
    Condition,
    Operator,
    TreeNode,
};
pub use experiment::{
    Experiment,
    ExperimentStatus,
    TrafficAllocation,
    Variation,
};
pub use feature::{
    Feature,
    Variable,
    VariableType,
};
pub use group::{
    Group,
    GroupPolicy,
};

/// A rollout is an ordered chain of audience-gated "layers". Each layer has
/// exactly the shape of an [`Experiment`] (audience targeting + traffic
/// allocation over a single variation each), so it is represented with the
/// same type rather than a parallel one.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    pub id: String,
    pub experiments: Vec<Experiment>,
}

/// A declared user or event attribute key, as carried in the datafile's
/// `attributes[]` / `events[]` arrays. The decision engine only ever
/// consults the derived `attribute_key_to_id` / `event_key_to_id` maps, but
/// the entity itself is kept for parity with the datafile schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: String,
    pub key: String,
}
