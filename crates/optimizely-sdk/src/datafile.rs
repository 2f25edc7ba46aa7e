//! Datafile parser & mapper (§6, L1): turns the raw Optimizely-format JSON
//! into an indexed [`ProjectConfig`] snapshot.
//!
//! Two audience representations are merged into one [`TreeNode`] shape:
//! legacy `audiences[]` carry their `conditions` as a JSON-encoded string,
//! while `typedAudiences[]` carry them as already-parsed JSON. On id
//! collision the typed form wins, since it is mapped in second.
//!
//! An experiment's `audienceConditions` (or, absent that, an implicit `or`
//! across `audienceIds`) is resolved into a single self-contained
//! [`TreeNode`] at parse time by inlining each referenced audience's own
//! condition tree -- the decision engine never has to re-resolve an
//! audience id at evaluation time.

use std::collections::HashMap;

use optimizely_sdk_types::{
    Audience,
    Condition,
    ConfigurationError,
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
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::project_config::ProjectConfig;

const MIN_SUPPORTED_VERSION: u32 = 4;

pub fn parse_datafile(bytes: &[u8]) -> Result<ProjectConfig, ConfigurationError> {
    let raw: RawDatafile = serde_json::from_slice(bytes).map_err(|e| ConfigurationError::InvalidJson(e.to_string()))?;

    let version: u32 = raw.version.parse().map_err(|_| ConfigurationError::UnsupportedVersion(raw.version.clone()))?;
    if version < MIN_SUPPORTED_VERSION {
        return Err(ConfigurationError::UnsupportedVersion(raw.version));
    }

    let mut audience_by_id = HashMap::new();
    for raw_audience in raw.audiences {
        let condition_tree = match &raw_audience.conditions {
            Some(s) if !s.is_empty() => {
                let value: JsonValue = serde_json::from_str(s).map_err(|e| ConfigurationError::InvalidJson(format!("audience {:?} conditions: {e}", raw_audience.id)))?;
                Some(parse_condition_tree(&value)?)
            },
            _ => None,
        };
        audience_by_id.insert(raw_audience.id.clone(), Audience {
            id: raw_audience.id,
            name: raw_audience.name,
            condition_tree,
        });
    }
    // typedAudiences take precedence on id collision: mapped second, so a
    // re-insert simply overwrites the legacy entry.
    for raw_audience in raw.typed_audiences {
        let condition_tree = match &raw_audience.conditions {
            Some(value) if !value.is_null() => Some(parse_condition_tree(value)?),
            _ => None,
        };
        audience_by_id.insert(raw_audience.id.clone(), Audience {
            id: raw_audience.id,
            name: raw_audience.name,
            condition_tree,
        });
    }

    let mut experiment_ids_by_group: HashMap<String, Vec<String>> = HashMap::new();
    let mut group_by_id = HashMap::new();
    let mut experiments: Vec<Experiment> = Vec::new();

    for raw_group in raw.groups {
        let policy = parse_group_policy(&raw_group.policy);
        let mut member_ids = Vec::new();
        for raw_experiment in raw_group.experiments {
            let mut experiment = map_experiment(raw_experiment, &audience_by_id)?;
            experiment.group_id = Some(raw_group.id.clone());
            member_ids.push(experiment.id.clone());
            experiments.push(experiment);
        }
        experiment_ids_by_group.insert(raw_group.id.clone(), member_ids.clone());
        group_by_id.insert(raw_group.id.clone(), Group {
            id: raw_group.id,
            policy,
            experiment_ids: member_ids,
            traffic_allocation: raw_group.traffic_allocation.into_iter().map(map_traffic_allocation).collect(),
        });
    }

    for raw_experiment in raw.experiments {
        experiments.push(map_experiment(raw_experiment, &audience_by_id)?);
    }

    for experiment in &experiments {
        validate_traffic_allocation(experiment)?;
    }

    let mut config = ProjectConfig::empty();
    config.revision = raw.revision;
    config.account_id = raw.account_id;
    config.project_id = raw.project_id;
    config.anonymize_ip = raw.anonymize_ip;
    config.bot_filtering_enabled = raw.bot_filtering;
    config.group_by_id = group_by_id;
    config.audience_by_id = audience_by_id;
    for experiment in experiments {
        config.insert_experiment(experiment);
    }

    let mut rollout_by_id = HashMap::new();
    for raw_rollout in raw.rollouts {
        let mut layers = Vec::with_capacity(raw_rollout.experiments.len());
        for raw_layer in raw_rollout.experiments {
            layers.push(map_experiment(raw_layer, &config.audience_by_id)?);
        }
        rollout_by_id.insert(raw_rollout.id.clone(), Rollout {
            id: raw_rollout.id,
            experiments: layers,
        });
    }
    config.rollout_by_id = rollout_by_id;

    let mut feature_by_key = HashMap::new();
    for raw_feature in raw.feature_flags {
        let rollout_id = if raw_feature.rollout_id.is_empty() { None } else { Some(raw_feature.rollout_id.clone()) };
        if let Some(id) = &rollout_id {
            if !config.rollout_by_id.contains_key(id) {
                return Err(ConfigurationError::DanglingReference {
                    entity: "feature",
                    id: raw_feature.key.clone(),
                    referenced_kind: "rollout",
                    referenced_id: id.clone(),
                });
            }
        }
        for experiment_id in &raw_feature.experiment_ids {
            if !config.experiment_by_id.contains_key(experiment_id) {
                return Err(ConfigurationError::DanglingReference {
                    entity: "feature",
                    id: raw_feature.key.clone(),
                    referenced_kind: "experiment",
                    referenced_id: experiment_id.clone(),
                });
            }
        }
        let variable_by_key = raw_feature
            .variables
            .into_iter()
            .map(|v| {
                let variable_type = parse_variable_type(&v.variable_type);
                (v.key.clone(), Variable {
                    id: v.id,
                    key: v.key,
                    variable_type,
                    default_value: v.default_value,
                })
            })
            .collect();
        feature_by_key.insert(raw_feature.key.clone(), Feature {
            id: raw_feature.id,
            key: raw_feature.key,
            rollout_id,
            experiment_ids: raw_feature.experiment_ids,
            variable_by_key,
        });
    }
    config.feature_by_key = feature_by_key;

    config.attribute_key_to_id = raw.attributes.into_iter().map(|a| (a.key, a.id)).collect();
    config.event_key_to_id = raw.events.into_iter().map(|e| (e.key, e.id)).collect();

    Ok(config)
}

fn map_experiment(raw: RawExperiment, audience_by_id: &HashMap<String, Audience>) -> Result<Experiment, ConfigurationError> {
    let audience_conditions = build_audience_conditions(&raw, audience_by_id)?;
    Ok(Experiment {
        id: raw.id,
        key: raw.key,
        status: parse_experiment_status(&raw.status),
        layer_id: raw.layer_id,
        variations: raw.variations.into_iter().map(map_variation).collect(),
        traffic_allocation: raw.traffic_allocation.into_iter().map(map_traffic_allocation).collect(),
        audience_ids: raw.audience_ids,
        audience_conditions,
        forced_variations: raw.forced_variations,
        group_id: None,
    })
}

fn map_variation(raw: RawVariation) -> Variation {
    Variation {
        id: raw.id,
        key: raw.key,
        feature_enabled: raw.feature_enabled,
        variables_by_id: raw.variables.into_iter().map(|v| (v.id, v.value)).collect(),
    }
}

fn map_traffic_allocation(raw: RawTrafficAllocation) -> TrafficAllocation {
    TrafficAllocation {
        end_of_range: raw.end_of_range,
        id: raw.entity_id,
    }
}

fn validate_traffic_allocation(experiment: &Experiment) -> Result<(), ConfigurationError> {
    let mut last = 0u32;
    for range in &experiment.traffic_allocation {
        if range.end_of_range > 10_000 || range.end_of_range < last {
            return Err(ConfigurationError::MalformedTrafficAllocation {
                experiment_key: experiment.key.clone(),
            });
        }
        last = range.end_of_range;
    }
    Ok(())
}

/// Builds the fully-resolved audience tree for an experiment: the explicit
/// `audienceConditions` tree if present (with each audience-id leaf
/// substituted by that audience's own condition tree), otherwise an
/// implicit `or` across `audienceIds`. `None` means "no audience
/// restriction", which the targeting decider treats as an automatic pass.
fn build_audience_conditions(raw: &RawExperiment, audience_by_id: &HashMap<String, Audience>) -> Result<Option<TreeNode>, ConfigurationError> {
    if let Some(value) = &raw.audience_conditions {
        if !value.is_null() {
            return Ok(Some(parse_audience_conditions(value, audience_by_id, &raw.key)?));
        }
    }
    if raw.audience_ids.is_empty() {
        return Ok(None);
    }
    let children = raw
        .audience_ids
        .iter()
        .map(|id| resolve_audience(id, audience_by_id, &raw.key))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(TreeNode::Op {
        operator: Operator::Or,
        children,
    }))
}

fn resolve_audience(id: &str, audience_by_id: &HashMap<String, Audience>, experiment_key: &str) -> Result<TreeNode, ConfigurationError> {
    let audience = audience_by_id.get(id).ok_or_else(|| ConfigurationError::DanglingReference {
        entity: "experiment",
        id: experiment_key.to_owned(),
        referenced_kind: "audience",
        referenced_id: id.to_owned(),
    })?;
    Ok(audience.condition_tree.clone().unwrap_or(TreeNode::Op {
        operator: Operator::And,
        children: vec![],
    }))
}

/// Parses a legacy/typed audience's own `conditions`: a nested JSON array
/// whose leaves are condition objects, e.g.
/// `["and", ["or", {"name": "s_foo", ...}]]`.
fn parse_condition_tree(value: &JsonValue) -> Result<TreeNode, ConfigurationError> {
    parse_tree(value, &|leaf| {
        let condition: RawCondition = serde_json::from_value(leaf.clone()).map_err(|e| ConfigurationError::InvalidJson(format!("condition leaf: {e}")))?;
        Ok(TreeNode::Leaf(Condition {
            name: condition.name,
            condition_type: condition.condition_type,
            match_type: condition.match_type,
            value: condition.value,
        }))
    })
}

/// Parses an experiment's `audienceConditions`: the same nested-array
/// shape, but leaves are audience-id references that get inlined
/// immediately as that audience's own condition tree.
fn parse_audience_conditions(value: &JsonValue, audience_by_id: &HashMap<String, Audience>, experiment_key: &str) -> Result<TreeNode, ConfigurationError> {
    parse_tree(value, &|leaf| match leaf {
        JsonValue::String(id) => resolve_audience(id, audience_by_id, experiment_key),
        JsonValue::Number(n) => resolve_audience(&n.to_string(), audience_by_id, experiment_key),
        other => Err(ConfigurationError::InvalidJson(format!("unexpected audienceConditions leaf: {other}"))),
    })
}

/// Shared recursive descent over Optimizely's nested-array condition tree
/// format: an array's first element is an operator string (`"and"`,
/// `"or"`, `"not"`); any other value for the first element means there is
/// no explicit operator, and the whole array is treated as an implicit
/// `or` over its elements (a single bare leaf also falls into this case).
fn parse_tree(value: &JsonValue, leaf: &impl Fn(&JsonValue) -> Result<TreeNode, ConfigurationError>) -> Result<TreeNode, ConfigurationError> {
    match value {
        JsonValue::Array(items) => {
            let (operator, rest): (Operator, &[JsonValue]) = match items.first() {
                Some(JsonValue::String(s)) if matches!(s.as_str(), "and" | "or" | "not") => (parse_operator(s), &items[1..]),
                _ => (Operator::Or, &items[..]),
            };
            let children = rest.iter().map(|child| parse_tree(child, leaf)).collect::<Result<Vec<_>, _>>()?;
            Ok(TreeNode::Op { operator, children })
        },
        other => leaf(other),
    }
}

fn parse_operator(s: &str) -> Operator {
    match s {
        "and" => Operator::And,
        "not" => Operator::Not,
        _ => Operator::Or,
    }
}

fn parse_experiment_status(s: &str) -> ExperimentStatus {
    match s {
        "Running" => ExperimentStatus::Running,
        "Paused" => ExperimentStatus::Paused,
        "Archived" => ExperimentStatus::Archived,
        "Launched" => ExperimentStatus::Launched,
        _ => ExperimentStatus::NotStarted,
    }
}

fn parse_group_policy(s: &str) -> GroupPolicy {
    match s {
        "random" => GroupPolicy::Random,
        _ => GroupPolicy::Overlapping,
    }
}

fn parse_variable_type(s: &str) -> VariableType {
    match s {
        "boolean" => VariableType::Boolean,
        "integer" => VariableType::Integer,
        "double" => VariableType::Double,
        "json" => VariableType::Json,
        _ => VariableType::String,
    }
}

#[derive(Debug, Deserialize)]
struct RawDatafile {
    version: String,
    revision: String,
    #[serde(rename = "accountId", default)]
    account_id: String,
    #[serde(rename = "projectId", default)]
    project_id: String,
    #[serde(rename = "anonymizeIP", default)]
    anonymize_ip: bool,
    #[serde(rename = "botFiltering", default)]
    bot_filtering: bool,
    #[serde(default)]
    experiments: Vec<RawExperiment>,
    #[serde(rename = "featureFlags", default)]
    feature_flags: Vec<RawFeatureFlag>,
    #[serde(default)]
    audiences: Vec<RawLegacyAudience>,
    #[serde(rename = "typedAudiences", default)]
    typed_audiences: Vec<RawTypedAudience>,
    #[serde(default)]
    groups: Vec<RawGroup>,
    #[serde(default)]
    rollouts: Vec<RawRollout>,
    #[serde(default)]
    attributes: Vec<RawKeyedId>,
    #[serde(default)]
    events: Vec<RawKeyedId>,
}

#[derive(Debug, Deserialize)]
struct RawExperiment {
    id: String,
    key: String,
    #[serde(default = "default_status")]
    status: String,
    #[serde(rename = "layerId", default)]
    layer_id: Option<String>,
    #[serde(default)]
    variations: Vec<RawVariation>,
    #[serde(rename = "trafficAllocation", default)]
    traffic_allocation: Vec<RawTrafficAllocation>,
    #[serde(rename = "audienceIds", default)]
    audience_ids: Vec<String>,
    #[serde(rename = "audienceConditions", default)]
    audience_conditions: Option<JsonValue>,
    #[serde(rename = "forcedVariations", default)]
    forced_variations: HashMap<String, String>,
}

fn default_status() -> String {
    "Running".to_owned()
}

#[derive(Debug, Deserialize)]
struct RawVariation {
    id: String,
    key: String,
    #[serde(rename = "featureEnabled", default)]
    feature_enabled: bool,
    #[serde(default)]
    variables: Vec<RawVariableValue>,
}

#[derive(Debug, Deserialize)]
struct RawVariableValue {
    id: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawTrafficAllocation {
    #[serde(rename = "entityId")]
    entity_id: String,
    #[serde(rename = "endOfRange")]
    end_of_range: u32,
}

#[derive(Debug, Deserialize)]
struct RawFeatureFlag {
    id: String,
    key: String,
    #[serde(rename = "rolloutId", default)]
    rollout_id: String,
    #[serde(rename = "experimentIds", default)]
    experiment_ids: Vec<String>,
    #[serde(default)]
    variables: Vec<RawVariableDef>,
}

#[derive(Debug, Deserialize)]
struct RawVariableDef {
    id: String,
    key: String,
    #[serde(rename = "type")]
    variable_type: String,
    #[serde(rename = "defaultValue", default)]
    default_value: String,
}

#[derive(Debug, Deserialize)]
struct RawLegacyAudience {
    id: String,
    #[serde(default)]
    name: String,
    conditions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTypedAudience {
    id: String,
    #[serde(default)]
    name: String,
    conditions: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    name: String,
    #[serde(rename = "type", default = "default_condition_type")]
    condition_type: String,
    #[serde(rename = "match", default)]
    match_type: Option<String>,
    value: JsonValue,
}

fn default_condition_type() -> String {
    "custom_attribute".to_owned()
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    id: String,
    #[serde(default)]
    policy: String,
    #[serde(default)]
    experiments: Vec<RawExperiment>,
    #[serde(rename = "trafficAllocation", default)]
    traffic_allocation: Vec<RawTrafficAllocation>,
}

#[derive(Debug, Deserialize)]
struct RawRollout {
    id: String,
    #[serde(default)]
    experiments: Vec<RawExperiment>,
}

#[derive(Debug, Deserialize)]
struct RawKeyedId {
    id: String,
    key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_datafile() -> serde_json::Value {
        serde_json::json!({
            "version": "4",
            "revision": "101",
            "accountId": "acct",
            "projectId": "proj",
            "anonymizeIP": true,
            "botFiltering": true,
            "audiences": [
                {
                    "id": "aud1",
                    "name": "foo audience",
                    "conditions": "[\"and\", [\"or\", {\"name\": \"s_foo\", \"type\": \"custom_attribute\", \"match\": \"exact\", \"value\": \"foo\"}]]"
                }
            ],
            "typedAudiences": [],
            "experiments": [
                {
                    "id": "exp1",
                    "key": "test_experiment",
                    "status": "Running",
                    "layerId": "layer1",
                    "variations": [
                        {"id": "v1", "key": "control", "featureEnabled": false, "variables": []},
                        {"id": "v2", "key": "treatment", "featureEnabled": true, "variables": []}
                    ],
                    "trafficAllocation": [
                        {"entityId": "v1", "endOfRange": 5000},
                        {"entityId": "v2", "endOfRange": 10000}
                    ],
                    "audienceIds": ["aud1"],
                    "forcedVariations": {"vip_user": "treatment"}
                }
            ],
            "featureFlags": [
                {
                    "id": "feat1",
                    "key": "test_feature",
                    "rolloutId": "",
                    "experimentIds": ["exp1"],
                    "variables": [
                        {"id": "var1", "key": "greeting", "type": "string", "defaultValue": "hello"}
                    ]
                }
            ],
            "groups": [],
            "rollouts": [],
            "attributes": [{"id": "attr1", "key": "s_foo"}],
            "events": []
        })
    }

    #[test]
    fn parses_sample_datafile_end_to_end() {
        let bytes = serde_json::to_vec(&sample_datafile()).unwrap();
        let config = parse_datafile(&bytes).unwrap();
        assert_eq!(config.revision, "101");
        assert!(config.is_loaded());
        let experiment = config.experiment_by_key("test_experiment").unwrap();
        assert_eq!(experiment.variations.len(), 2);
        assert_eq!(experiment.forced_variations.get("vip_user"), Some(&"treatment".to_owned()));
        assert!(experiment.audience_conditions.is_some());

        let feature = config.feature("test_feature").unwrap();
        assert_eq!(feature.variable_by_key.get("greeting").unwrap().default_value, "hello");
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut df = sample_datafile();
        df["version"] = serde_json::json!("2");
        let bytes = serde_json::to_vec(&df).unwrap();
        assert!(matches!(parse_datafile(&bytes), Err(ConfigurationError::UnsupportedVersion(_))));
    }

    #[test]
    fn dangling_audience_reference_is_rejected() {
        let mut df = sample_datafile();
        df["experiments"][0]["audienceIds"] = serde_json::json!(["nonexistent"]);
        let bytes = serde_json::to_vec(&df).unwrap();
        assert!(matches!(parse_datafile(&bytes), Err(ConfigurationError::DanglingReference { .. })));
    }

    #[test]
    fn malformed_traffic_allocation_is_rejected() {
        let mut df = sample_datafile();
        df["experiments"][0]["trafficAllocation"] = serde_json::json!([
            {"entityId": "v1", "endOfRange": 6000},
            {"entityId": "v2", "endOfRange": 3000},
        ]);
        let bytes = serde_json::to_vec(&df).unwrap();
        assert!(matches!(parse_datafile(&bytes), Err(ConfigurationError::MalformedTrafficAllocation { .. })));
    }

    #[test]
    fn typed_audience_wins_on_id_collision() {
        let mut df = sample_datafile();
        df["typedAudiences"] = serde_json::json!([
            {
                "id": "aud1",
                "name": "foo audience (typed)",
                "conditions": ["and", ["or", {"name": "s_bar", "type": "custom_attribute", "match": "exact", "value": "bar"}]]
            }
        ]);
        let bytes = serde_json::to_vec(&df).unwrap();
        let config = parse_datafile(&bytes).unwrap();
        let audience = config.audience_by_id.get("aud1").unwrap();
        assert_eq!(audience.name, "foo audience (typed)");
    }

    #[test]
    fn empty_audience_set_has_no_restriction() {
        let mut df = sample_datafile();
        df["experiments"][0]["audienceIds"] = serde_json::json!([]);
        let bytes = serde_json::to_vec(&df).unwrap();
        let config = parse_datafile(&bytes).unwrap();
        let experiment = config.experiment_by_key("test_experiment").unwrap();
        assert!(experiment.audience_conditions.is_none());
    }
}
