//! The `(condition_type, match_type) -> matcher fn` registry from Design
//! Note §9: a lookup table of pure functions, extensible without touching
//! the tree evaluator itself.

use optimizely_sdk_types::{
    Condition,
    UserContext,
};
use semver::{
    BuildMetadata,
    Prerelease,
    Version,
};

use crate::tri::Tri;

/// Outcome of a single leaf matcher: the three-valued result plus, when
/// inconclusive because of a genuinely malformed input (not just "attribute
/// absent"), the literal reason text required for cross-SDK parity.
pub struct MatchOutcome {
    pub result: Tri,
    pub error_reason: Option<String>,
}

impl MatchOutcome {
    fn ok(result: Tri) -> Self {
        Self {
            result,
            error_reason: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            result: Tri::Unknown,
            error_reason: Some(message),
        }
    }
}

/// Dispatches a leaf condition to its matcher. Unknown `condition_type` or
/// `match_type` both yield `Tri::Unknown` plus the exact literal reason
/// templates required by §6.
pub fn evaluate_condition(condition: &Condition, user: &UserContext) -> MatchOutcome {
    if condition.condition_type != "custom_attribute" {
        return MatchOutcome::error(format!(
            "unable to evaluate condition of type \"{}\"",
            condition.condition_type
        ));
    }

    match condition.match_type() {
        "exact" => exact(condition, user),
        "substring" => substring(condition, user),
        "exists" => exists(condition, user),
        "gt" => numeric(condition, user, |a, b| a > b),
        "ge" => numeric(condition, user, |a, b| a >= b),
        "lt" => numeric(condition, user, |a, b| a < b),
        "le" => numeric(condition, user, |a, b| a <= b),
        "semver_eq" => semver_cmp(condition, user, std::cmp::Ordering::is_eq),
        "semver_gt" => semver_cmp(condition, user, std::cmp::Ordering::is_gt),
        "semver_ge" => semver_cmp(condition, user, std::cmp::Ordering::is_ge),
        "semver_lt" => semver_cmp(condition, user, std::cmp::Ordering::is_lt),
        "semver_le" => semver_cmp(condition, user, std::cmp::Ordering::is_le),
        other => MatchOutcome::error(format!("invalid Condition matcher \"{other}\"")),
    }
}

fn exact(condition: &Condition, user: &UserContext) -> MatchOutcome {
    let Some(attribute) = user.attribute(&condition.name) else {
        return MatchOutcome::ok(Tri::Unknown);
    };

    use serde_json::Value as J;
    let result = match (&condition.value, attribute) {
        (J::String(cv), optimizely_sdk_types::AttributeValue::String(av)) => Tri::from_bool(cv == av),
        (J::Bool(cv), optimizely_sdk_types::AttributeValue::Bool(av)) => Tri::from_bool(cv == av),
        (J::Number(cv), _) => match (cv.as_f64(), attribute.as_finite_f64()) {
            (Some(cv), Some(av)) if cv.is_finite() => Tri::from_bool(cv == av),
            _ => Tri::Unknown,
        },
        _ => Tri::Unknown,
    };
    MatchOutcome::ok(result)
}

fn substring(condition: &Condition, user: &UserContext) -> MatchOutcome {
    let (Some(needle), Some(haystack)) = (condition.value.as_str(), user.attribute(&condition.name).and_then(optimizely_sdk_types::AttributeValue::as_str)) else {
        return MatchOutcome::ok(Tri::Unknown);
    };
    MatchOutcome::ok(Tri::from_bool(haystack.contains(needle)))
}

fn exists(condition: &Condition, user: &UserContext) -> MatchOutcome {
    MatchOutcome::ok(Tri::from_bool(user.attribute(&condition.name).is_some()))
}

fn numeric(condition: &Condition, user: &UserContext, cmp: impl Fn(f64, f64) -> bool) -> MatchOutcome {
    let condition_value = condition.value.as_f64().filter(|v| v.is_finite());
    let attribute_value = user.attribute(&condition.name).and_then(optimizely_sdk_types::AttributeValue::as_finite_f64);
    match (attribute_value, condition_value) {
        (Some(attr), Some(cond)) => MatchOutcome::ok(Tri::from_bool(cmp(attr, cond))),
        _ => MatchOutcome::ok(Tri::Unknown),
    }
}

fn semver_cmp(condition: &Condition, user: &UserContext, accept: impl Fn(std::cmp::Ordering) -> bool) -> MatchOutcome {
    let Some(condition_str) = condition.value.as_str() else {
        return MatchOutcome::ok(Tri::Unknown);
    };
    let Some(attribute_str) = user.attribute(&condition.name).and_then(optimizely_sdk_types::AttributeValue::as_str) else {
        return MatchOutcome::ok(Tri::Unknown);
    };

    let condition_version = match parse_loose_version(condition_str) {
        Some(v) => v,
        None => return MatchOutcome::error(format!("invalid Condition matcher \"semver\" for value \"{condition_str}\"")),
    };
    let attribute_version = match parse_loose_version(attribute_str) {
        Some(v) => v,
        None => return MatchOutcome::error(format!("invalid Condition matcher \"semver\" for value \"{attribute_str}\"")),
    };

    MatchOutcome::ok(Tri::from_bool(accept(attribute_version.cmp(&condition_version))))
}

/// Parses a loose, Optimizely-style version string: `MAJOR[.MINOR[.PATCH]]`
/// `[-PRERELEASE][+BUILD]`. Missing minor/patch components default to zero.
/// A version with more than three numeric dot-separated components (e.g.
/// `3.7.2.2`) is rejected, matching the original Go SDK's behavior.
///
/// Delegates ordering to [`semver::Version`]'s `Ord` impl once parsed, since
/// it already implements exactly the precedence rules this matcher needs:
/// numeric components compare first, prerelease-vs-release only breaks ties
/// on equal numeric components, and build metadata never affects ordering.
fn parse_loose_version(input: &str) -> Option<Version> {
    let mut rest = input;

    let build = match rest.find('+') {
        Some(idx) => {
            let build = &rest[idx + 1..];
            rest = &rest[..idx];
            Some(build)
        },
        None => None,
    };

    let prerelease = match rest.find('-') {
        Some(idx) => {
            let pre = &rest[idx + 1..];
            rest = &rest[..idx];
            Some(pre)
        },
        None => None,
    };

    let mut numeric_parts = rest.split('.');
    let major: u64 = numeric_parts.next()?.parse().ok()?;
    let minor: u64 = match numeric_parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    let patch: u64 = match numeric_parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if numeric_parts.next().is_some() {
        return None;
    }

    let pre = match prerelease {
        Some(p) => Prerelease::new(p).ok()?,
        None => Prerelease::EMPTY,
    };
    let build = match build {
        Some(b) => BuildMetadata::new(b).ok()?,
        None => BuildMetadata::EMPTY,
    };

    Some(Version {
        major,
        minor,
        patch,
        pre,
        build,
    })
}

#[cfg(test)]
mod tests {
    use optimizely_sdk_types::AttributeValue;
    use serde_json::json;

    use super::*;

    fn condition(match_type: &str, value: serde_json::Value) -> Condition {
        Condition {
            name: "attr".to_owned(),
            condition_type: "custom_attribute".to_owned(),
            match_type: Some(match_type.to_owned()),
            value,
        }
    }

    fn user(value: impl Into<AttributeValue>) -> UserContext {
        UserContext::new("u1").with_attribute("attr", value)
    }

    #[test]
    fn unknown_matcher_reports_exact_literal() {
        let c = condition("invalid", json!("foo"));
        let outcome = evaluate_condition(&c, &user("foo"));
        assert_eq!(outcome.result, Tri::Unknown);
        assert_eq!(outcome.error_reason.as_deref(), Some(r#"invalid Condition matcher "invalid""#));
    }

    #[test]
    fn unknown_condition_type_reports_exact_literal() {
        let mut c = condition("exact", json!("foo"));
        c.condition_type = "weird_type".to_owned();
        let outcome = evaluate_condition(&c, &user("foo"));
        assert_eq!(outcome.error_reason.as_deref(), Some(r#"unable to evaluate condition of type "weird_type""#));
    }

    #[test]
    fn exact_string_match() {
        let c = condition("exact", json!("foo"));
        assert_eq!(evaluate_condition(&c, &user("foo")).result, Tri::True);
        assert_eq!(evaluate_condition(&c, &user("not_foo")).result, Tri::False);
    }

    #[test]
    fn substring_is_case_sensitive() {
        let c = condition("substring", json!("Foo"));
        assert_eq!(evaluate_condition(&c, &user("xxFooyy")).result, Tri::True);
        assert_eq!(evaluate_condition(&c, &user("xxfooyy")).result, Tri::False);
    }

    #[test]
    fn exists_ignores_value() {
        let c = condition("exists", json!(null));
        assert_eq!(evaluate_condition(&c, &user("anything")).result, Tri::True);
        let nobody = UserContext::new("u1");
        assert_eq!(evaluate_condition(&c, &nobody).result, Tri::False);
    }

    #[test]
    fn ge_requires_finite_numbers() {
        let c = condition("ge", json!(21.0));
        assert_eq!(evaluate_condition(&c, &user(25i64)).result, Tri::True);
        assert_eq!(evaluate_condition(&c, &user(18i64)).result, Tri::False);
        assert_eq!(evaluate_condition(&c, &user(f64::NAN)).result, Tri::Unknown);
    }

    #[test]
    fn semver_ge_missing_patch_defaults_to_zero() {
        let c = condition("semver_ge", json!("2.9"));
        assert_eq!(evaluate_condition(&c, &user("2.9.1")).result, Tri::True);
    }

    #[test]
    fn semver_ge_prerelease_is_less_than_release() {
        let c = condition("semver_ge", json!("3.7.0"));
        assert_eq!(evaluate_condition(&c, &user("3.7.1-beta")).result, Tri::True);
    }

    #[test]
    fn semver_four_components_is_malformed() {
        let c = condition("semver_ge", json!("3.7.0"));
        let outcome = evaluate_condition(&c, &user("3.7.2.2"));
        assert_eq!(outcome.result, Tri::Unknown);
        assert!(outcome.error_reason.is_some());
    }
}
