use std::collections::HashMap;

/// The reserved attribute key that overrides the bucketing id used by the
/// bucketer, independent of `user_id`.
pub const OPT_BUCKETING_ID: &str = "$opt_bucketing_id";

/// A user attribute value. Deliberately narrower than `serde_json::Value`:
/// user-supplied attributes are one of these primitive kinds, and an
/// unspecified or `Null` attribute is semantically *absent*, not zero.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Coerces to `f64` for the numeric matchers (`gt`/`ge`/`lt`/`le`/`exact`
    /// on numbers); `None` for non-numeric or non-finite values.
    pub fn as_finite_f64(&self) -> Option<f64> {
        let value = match self {
            AttributeValue::Int(v) => *v as f64,
            AttributeValue::Float(v) => *v,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, AttributeValue::Null)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

/// The caller-owned identity and attribute bag passed into every decision
/// call. Cheap to construct per-request; the decision engine never mutates
/// or retains it past the call.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub user_id: String,
    pub attributes: HashMap<String, AttributeValue>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key).filter(|v| v.is_present())
    }

    /// The id the bucketer hashes against: `$opt_bucketing_id` if the caller
    /// set it to a string, otherwise `user_id`. Overriding this preserves
    /// stable re-bucketing across attribute churn since `user_id` itself
    /// never has to change.
    pub fn bucketing_id(&self) -> &str {
        match self.attribute(OPT_BUCKETING_ID).and_then(AttributeValue::as_str) {
            Some(override_id) => override_id,
            None => &self.user_id,
        }
    }
}
