use crate::entities::experiment::TrafficAllocation;

/// A group's bucketing policy. Only `Random` groups are mutually exclusive
/// (bucketed against a single shared allocation); `Overlapping` groups exist
/// in the datafile schema for completeness but do not participate in the
/// exclusivity short-circuit in `§4.4` of the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPolicy {
    Random,
    Overlapping,
}

/// A set of mutually-exclusive experiments sharing one bucketing space.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub policy: GroupPolicy,
    pub experiment_ids: Vec<String>,
    /// Cumulative ranges over the group's own bucketing space; `id` is an
    /// experiment id (see [`TrafficAllocation`]'s doc comment).
    pub traffic_allocation: Vec<TrafficAllocation>,
}
