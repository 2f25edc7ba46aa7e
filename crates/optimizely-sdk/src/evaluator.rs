//! Audience condition-tree evaluator (§4.3): a three-valued boolean
//! expression interpreter over [`TreeNode`], with reason accumulation.

use optimizely_sdk_types::{
    DecisionReasons,
    Operator,
    TreeNode,
    UserContext,
};

use crate::{
    matchers::evaluate_condition,
    tri::Tri,
};

/// Evaluates a condition tree against a user. `reasons` accumulates only
/// the error-grade diagnostics produced by malformed leaves (unknown
/// matcher, unknown condition type, malformed semver) -- see
/// [`DecisionReasons::append_error`], which always survives regardless of
/// `Options::include_reasons`.
pub fn evaluate(tree: &TreeNode, user: &UserContext, reasons: &mut DecisionReasons) -> Tri {
    match tree {
        TreeNode::Leaf(condition) => {
            let outcome = evaluate_condition(condition, user);
            if let Some(message) = outcome.error_reason {
                reasons.append_error(message);
            }
            outcome.result
        },
        TreeNode::Op { operator, children } => {
            let child_results: Vec<Tri> = children.iter().map(|child| evaluate(child, user, reasons)).collect();
            match operator {
                Operator::And => Tri::and_fold(child_results),
                Operator::Or => Tri::or_fold(child_results),
                Operator::Not => child_results.first().copied().unwrap_or(Tri::Unknown).not(),
            }
        },
    }
}

/// Whether an audience tree passes outright -- the root must resolve to
/// exactly [`Tri::True`]; `Unknown` and `False` both fail the audience.
pub fn passes(tree: &TreeNode, user: &UserContext, reasons: &mut DecisionReasons) -> bool {
    evaluate(tree, user, reasons).is_true()
}

#[cfg(test)]
mod tests {
    use optimizely_sdk_types::{
        Condition,
        Options,
    };
    use serde_json::json;

    use super::*;

    fn leaf(name: &str, value: serde_json::Value) -> TreeNode {
        TreeNode::Leaf(Condition {
            name: name.to_owned(),
            condition_type: "custom_attribute".to_owned(),
            match_type: Some("exact".to_owned()),
            value,
        })
    }

    #[test]
    fn s1_audience_exact_match_pass_and_fail() {
        let tree = leaf("s_foo", json!("foo"));
        let mut reasons = DecisionReasons::new(&Options::default());

        let passing_user = UserContext::new("u1").with_attribute("s_foo", "foo");
        assert!(passes(&tree, &passing_user, &mut reasons));

        let failing_user = UserContext::new("u1").with_attribute("s_foo", "not_foo");
        assert!(!passes(&tree, &failing_user, &mut reasons));
    }

    #[test]
    fn s2_unknown_matcher_reason_is_exact() {
        let tree = TreeNode::Leaf(Condition {
            name: "s_foo".to_owned(),
            condition_type: "custom_attribute".to_owned(),
            match_type: Some("invalid".to_owned()),
            value: json!("foo"),
        });
        let mut reasons = DecisionReasons::new(&Options::default());
        let user = UserContext::new("u1").with_attribute("s_foo", "foo");
        assert!(!passes(&tree, &user, &mut reasons));
        assert_eq!(reasons.to_report(), vec![r#"invalid Condition matcher "invalid""#]);
    }

    #[test]
    fn empty_and_is_vacuously_true_empty_or_is_false() {
        let and_tree = TreeNode::Op {
            operator: Operator::And,
            children: vec![],
        };
        let or_tree = TreeNode::Op {
            operator: Operator::Or,
            children: vec![],
        };
        let mut reasons = DecisionReasons::new(&Options::default());
        let user = UserContext::new("u1");
        assert!(passes(&and_tree, &user, &mut reasons));
        assert!(!passes(&or_tree, &user, &mut reasons));
    }

    #[test]
    fn kleene_and_not_over_real_tree() {
        let leaf = leaf("missing_attr", json!("x"));
        let tree = TreeNode::Op {
            operator: Operator::And,
            children: vec![leaf.clone(), TreeNode::Op {
                operator: Operator::Not,
                children: vec![leaf],
            }],
        };
        let mut reasons = DecisionReasons::new(&Options::default());
        let user = UserContext::new("u1");
        assert_eq!(evaluate(&tree, &user, &mut reasons), Tri::Unknown);
    }
}
