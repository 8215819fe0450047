//! Language union of bottom-up automata

use super::{AutomatonError, BuTreeAutomaton, StateSetUnion};
use tracing::info;

/// Union of two automata sharing one context.
///
/// State ids are already disjoint (both automata draw from the context's
/// allocator), so the result simply carries both state sets and both final
/// sets, and merges the transition tables entry-wise with the leaf-union
/// Apply.
///
/// The inputs are left untouched; the result shares their diagram nodes
/// structurally.
pub fn union(
    lhs: &BuTreeAutomaton,
    rhs: &BuTreeAutomaton,
) -> Result<BuTreeAutomaton, AutomatonError> {
    if !lhs.context().same_context(rhs.context()) {
        return Err(AutomatonError::ContextMismatch);
    }
    info!(
        lhs_states = lhs.states().len(),
        rhs_states = rhs.states().len(),
        "language union"
    );

    let mut result = lhs.clone();
    for &state in rhs.states() {
        result.adopt_state(state);
    }
    for &state in rhs.finals() {
        result.finals_mut().insert(state);
    }

    let entries = rhs.table().iter_non_bottom();
    for (lhs_vec, rhs_root) in entries {
        let current = result.table().get_root(&lhs_vec);
        let merged = {
            let mut mgr = result.context().bu_manager();
            let merged = mgr.apply2(current, rhs_root, &mut StateSetUnion)?;
            if current != result.table().bottom() {
                mgr.release_root(current);
            }
            merged
        };
        result.table_mut().set_root(&lhs_vec, merged);
    }

    Ok(result)
}
