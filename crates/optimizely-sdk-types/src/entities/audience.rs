use serde_json::Value as JsonValue;

/// Boolean combinator for an audience condition tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

/// A single typed leaf condition, e.g. `{name: "age", type: "custom_attribute",
/// match: "gt", value: 21}`.
///
/// `value` is kept as a `serde_json::Value` rather than a narrower Rust enum
/// because typed audience condition values are themselves arbitrary JSON
/// (numbers, strings, booleans) and the matcher registry is responsible for
/// coercing them -- narrowing here would just duplicate that logic.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub name: String,
    pub condition_type: String,
    /// Absent is equivalent to `"exact"`, per the datafile schema.
    pub match_type: Option<String>,
    pub value: JsonValue,
}

impl Condition {
    pub fn match_type(&self) -> &str {
        self.match_type.as_deref().unwrap_or("exact")
    }
}

/// A boolean expression tree over typed leaf conditions. Trees, never DAGs:
/// children are owned, so there is no risk of cycles and no need for arena
/// allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf(Condition),
    Op {
        operator: Operator,
        children: Vec<TreeNode>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Audience {
    pub id: String,
    pub name: String,
    pub condition_tree: Option<TreeNode>,
}
