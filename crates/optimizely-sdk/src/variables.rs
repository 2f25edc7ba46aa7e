//! Typed feature-variable resolution (§4.7): turns a feature decision's
//! serialized variable string into the caller's requested type, falling
//! back to the variable's declared default on any parse failure.

use optimizely_sdk_types::{
    Decision,
    DecisionReasons,
    Variable,
    VariableType,
};

/// A feature variable's resolved, typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Json(serde_json::Value),
}

fn parse_typed(raw: &str, variable_type: VariableType) -> Option<VariableValue> {
    match variable_type {
        VariableType::String => Some(VariableValue::String(raw.to_owned())),
        VariableType::Boolean => raw.parse::<bool>().ok().map(VariableValue::Boolean),
        VariableType::Integer => raw.parse::<i64>().ok().map(VariableValue::Integer),
        VariableType::Double => raw.parse::<f64>().ok().map(VariableValue::Double),
        VariableType::Json => serde_json::from_str(raw).ok().map(VariableValue::Json),
    }
}

fn zero_value(variable_type: VariableType) -> VariableValue {
    match variable_type {
        VariableType::String => VariableValue::String(String::new()),
        VariableType::Boolean => VariableValue::Boolean(false),
        VariableType::Integer => VariableValue::Integer(0),
        VariableType::Double => VariableValue::Double(0.0),
        VariableType::Json => VariableValue::Json(serde_json::Value::Null),
    }
}

/// Resolves `variable` against `decision`: a disabled variation (or one
/// with no override for this variable) falls back to the declared default.
/// A stored value that fails to parse as the variable's declared type
/// never propagates as an error -- it's recorded as a reason and the
/// default is returned instead.
pub fn resolve_variable(variable: &Variable, decision: &Decision, reasons: &mut DecisionReasons) -> VariableValue {
    let raw = if decision.feature_enabled() {
        decision.variation.as_ref().and_then(|v| v.variables_by_id.get(&variable.id)).cloned().unwrap_or_else(|| variable.default_value.clone())
    } else {
        variable.default_value.clone()
    };

    match parse_typed(&raw, variable.variable_type) {
        Some(value) => value,
        None => {
            reasons.append_error(format!("Variable value for key \"{}\" is invalid or wrong type.", variable.key));
            parse_typed(&variable.default_value, variable.variable_type).unwrap_or_else(|| zero_value(variable.variable_type))
        },
    }
}

#[cfg(test)]
mod tests {
    use optimizely_sdk_types::{
        DecisionSource,
        Options,
        Variation,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    fn variable(id: &str, key: &str, variable_type: VariableType, default_value: &str) -> Variable {
        Variable {
            id: id.to_owned(),
            key: key.to_owned(),
            variable_type,
            default_value: default_value.to_owned(),
        }
    }

    fn enabled_decision(variable_id: &str, value: &str) -> Decision {
        Decision {
            variation: Some(Variation {
                id: "v1".to_owned(),
                key: "on".to_owned(),
                feature_enabled: true,
                variables_by_id: [(variable_id.to_owned(), value.to_owned())].into_iter().collect(),
            }),
            source: DecisionSource::FeatureTest,
            reasons: vec![],
        }
    }

    #[test]
    fn override_parses_to_declared_type() {
        let variable = variable("var1", "max_items", VariableType::Integer, "10");
        let decision = enabled_decision("var1", "42");
        let mut reasons = DecisionReasons::new(&Options::default());
        assert_eq!(resolve_variable(&variable, &decision, &mut reasons), VariableValue::Integer(42));
        assert!(reasons.to_report().is_empty());
    }

    #[test]
    fn disabled_variation_falls_back_to_default() {
        let variable = variable("var1", "max_items", VariableType::Integer, "10");
        let mut decision = enabled_decision("var1", "42");
        decision.variation.as_mut().unwrap().feature_enabled = false;
        let mut reasons = DecisionReasons::new(&Options::default());
        assert_eq!(resolve_variable(&variable, &decision, &mut reasons), VariableValue::Integer(10));
    }

    #[test]
    fn malformed_override_falls_back_to_default_with_reason() {
        let variable = variable("var1", "max_items", VariableType::Integer, "10");
        let decision = enabled_decision("var1", "not-a-number");
        let mut reasons = DecisionReasons::new(&Options::default());
        assert_eq!(resolve_variable(&variable, &decision, &mut reasons), VariableValue::Integer(10));
        assert_eq!(reasons.to_report(), vec![r#"Variable value for key "max_items" is invalid or wrong type."#]);
    }

    #[test]
    fn no_decision_variation_uses_default() {
        let variable = variable("var1", "max_items", VariableType::Json, "{}");
        let decision = Decision {
            variation: None,
            source: DecisionSource::Rollout,
            reasons: vec![],
        };
        let mut reasons = DecisionReasons::new(&Options::default());
        assert_eq!(resolve_variable(&variable, &decision, &mut reasons), VariableValue::Json(serde_json::json!({})));
    }
}
