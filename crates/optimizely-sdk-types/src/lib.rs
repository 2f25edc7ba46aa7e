//! Entity, value, and error types shared between the datafile parser and the
//! decision engine in [`optimizely-sdk`](https://docs.rs/optimizely-sdk).
//!
//! This crate carries no I/O and no async runtime dependency; it exists so
//! that the pure data model can be depended on independently of the
//! networking / polling machinery, the same way `convex_sync_types` is split
//! out from `convex`.

pub mod decision;
pub mod entities;
pub mod error;
pub mod reasons;
pub mod user;

pub use decision::{
    Decision,
    DecisionSource,
};
pub use entities::{
    Attribute,
    Audience,
    Condition,
    Experiment,
    ExperimentStatus,
    Feature,
    Group,
    GroupPolicy,
    Operator,
    Rollout,
    TrafficAllocation,
    TreeNode,
    Variable,
    VariableType,
    Variation,
};
pub use error::{
    ConfigurationError,
    DecideError,
};
pub use reasons::{
    DecisionReasons,
    Options,
};
pub use user::{
    AttributeValue,
    UserContext,
};
