//! Product intersection of bottom-up automata

use super::{AutomatonError, BuTreeAutomaton, Context};
use crate::leaves::{State, StateSet};
use crate::mtbdd::{BinaryApply, MtbddError, Root};
use hashbrown::HashMap;
use std::collections::VecDeque;
use tracing::info;

/// Leaf operator of the product construction.
///
/// For each pair of right-hand-side states it looks up or allocates the
/// product state, enqueues fresh ones for rule discovery, and emits the
/// translated set. The `{sink}` marker short-circuits: absence intersected
/// with anything is absence.
struct ProductOp<'a> {
    ctx: &'a Context,
    translation: &'a mut HashMap<(State, State), State>,
    queue: &'a mut VecDeque<((State, State), State)>,
    discovered: Vec<State>,
}

impl BinaryApply<StateSet> for ProductOp<'_> {
    fn combine(&mut self, lhs: &StateSet, rhs: &StateSet) -> Result<StateSet, MtbddError> {
        if lhs.is_sink() || rhs.is_sink() {
            return Ok(StateSet::sink());
        }

        let mut product = StateSet::new();
        for s1 in lhs.iter() {
            for s2 in rhs.iter() {
                let state = match self.translation.get(&(s1, s2)) {
                    Some(&state) => state,
                    None => {
                        let state = self.ctx.fresh_state();
                        self.translation.insert((s1, s2), state);
                        self.queue.push_back(((s1, s2), state));
                        self.discovered.push(state);
                        state
                    }
                };
                product.insert(state);
            }
        }
        Ok(product)
    }
}

/// Product intersection of two automata sharing one context.
///
/// Drives a worklist of product states: the arity-0 rules seed it, and each
/// dequeued product pair `(p, q)` pairs every left-hand side containing `p`
/// with every equal-arity left-hand side containing `q`. A pairing whose
/// positions are not all translated yet is skipped; it is revisited once
/// the missing product state is materialised by some other rule.
pub fn intersection(
    lhs: &BuTreeAutomaton,
    rhs: &BuTreeAutomaton,
) -> Result<BuTreeAutomaton, AutomatonError> {
    if !lhs.context().same_context(rhs.context()) {
        return Err(AutomatonError::ContextMismatch);
    }
    info!(
        lhs_states = lhs.states().len(),
        rhs_states = rhs.states().len(),
        "product intersection"
    );

    let ctx = lhs.context().clone();
    let mut result = BuTreeAutomaton::new(&ctx);
    let mut translation: HashMap<(State, State), State> = HashMap::new();
    let mut queue: VecDeque<((State, State), State)> = VecDeque::new();

    // Seed with the nullary rules.
    let seed = apply_product(
        &ctx,
        lhs.table().get_root(&[]),
        rhs.table().get_root(&[]),
        &mut translation,
        &mut queue,
        &mut result,
    )?;
    result.table_mut().set_root(&[], seed);

    while let Some(((p, q), product)) = queue.pop_front() {
        if lhs.is_final(p) && rhs.is_final(q) {
            result.finals_mut().insert(product);
        }

        let lhs_items = lhs.table().lhs_containing(p);
        let rhs_items = rhs.table().lhs_containing(q);
        for (u, u_root) in &lhs_items {
            for (v, v_root) in &rhs_items {
                if u.len() != v.len() {
                    continue;
                }
                let translated: Option<Vec<State>> = u
                    .iter()
                    .zip(v)
                    .map(|(&x, &y)| translation.get(&(x, y)).copied())
                    .collect();
                let Some(new_lhs) = translated else {
                    // Some position has no product state yet; the rule is
                    // revisited when it is materialised.
                    continue;
                };

                let root = apply_product(
                    &ctx,
                    *u_root,
                    *v_root,
                    &mut translation,
                    &mut queue,
                    &mut result,
                )?;
                let current = result.table().get_root(&new_lhs);
                if current != result.table().bottom() {
                    ctx.bu_manager().release_root(current);
                }
                result.table_mut().set_root(&new_lhs, root);
            }
        }
    }

    Ok(result)
}

/// Run one product Apply and register the states it discovered.
fn apply_product(
    ctx: &Context,
    lhs_root: Root,
    rhs_root: Root,
    translation: &mut HashMap<(State, State), State>,
    queue: &mut VecDeque<((State, State), State)>,
    result: &mut BuTreeAutomaton,
) -> Result<Root, AutomatonError> {
    let mut op = ProductOp {
        ctx,
        translation,
        queue,
        discovered: Vec::new(),
    };
    let root = {
        let mut mgr = ctx.bu_manager();
        let root = mgr.apply2(lhs_root, rhs_root, &mut op)?;
        if mgr.same_diagram(root, mgr.bottom_root()) {
            // Nothing but absence: keep the slot semantically empty.
            mgr.release_root(root);
            mgr.bottom_root()
        } else {
            root
        }
    };
    for state in op.discovered {
        result.adopt_state(state);
    }
    Ok(root)
}
