//! Shared audience-pass logic used by both the experiment targeting
//! service and the rollout service's per-layer gating.

use optimizely_sdk_types::{
    DecisionReasons,
    TreeNode,
    UserContext,
};

use crate::evaluator::passes;

/// `None` means "no audience restriction": an empty audience set passes
/// unconditionally, per §4.3.
pub fn targeting_passes(tree: Option<&TreeNode>, user: &UserContext, reasons: &mut DecisionReasons) -> bool {
    match tree {
        Some(tree) => passes(tree, user, reasons),
        None => true,
    }
}
