use std::collections::HashMap;

/// Declared type of a feature variable; governs how its `default_value` and
/// per-variation override strings are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    String,
    Boolean,
    Integer,
    Double,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: String,
    pub key: String,
    pub variable_type: VariableType,
    pub default_value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub key: String,
    pub rollout_id: Option<String>,
    pub experiment_ids: Vec<String>,
    pub variable_by_key: HashMap<String, Variable>,
}
