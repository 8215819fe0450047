//! Antichain-based language inclusion with simulation subsumption
//!
//! Decides `L(A) ⊆ L(B)` on the top-down views. A search configuration is
//! a pair `(q, S)`: a single state of the smaller automaton against a set
//! of states of the bigger one. Inclusion holds when every initial state
//! of `A` paired with the initial set of `B` is provable.
//!
//! The search prunes through three row caches (configurations being
//! expanded, that is the workset; configurations known to hold;
//! configurations known to fail), all compared with the forall-exists lift of the
//! downward simulation (`S ⊑ T` iff every element of `S` has a simulator
//! in `T`), and short-circuits a configuration whenever some element of
//! `S` already simulates `q` outright. The simulation is computed once on
//! the union automaton, so it relates states across the two operands.
//!
//! Expanding a configuration pairs each child tuple of `q` with the union
//! of the child tuples of `S` per symbol, then runs a proof search over
//! *choice functions*: assignments of the bigger tuples to child
//! positions. The or/and proof DAG is arena-allocated and processed
//! iteratively from a worklist; every or-node records its parents so
//! satisfaction propagates upward without stack recursion. A nullary move
//! of `q` that `S` cannot answer fails the configuration immediately.

use super::simulation::{downward_simulation, SimulationRelation};
use super::union::union;
use super::{AutomatonError, BuTreeAutomaton, Context, TdTreeAutomaton, TupleSetUnion};
use crate::leaves::{State, StateSet, TupleSet};
use crate::mtbdd::{BinaryApply, MtbddError};
use hashbrown::HashMap;
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

/// Decide `L(smaller) ⊆ L(bigger)`.
///
/// Both automata must come from the same context. Returns `Ok(true)` when
/// every tree accepted by `smaller` is accepted by `bigger`.
pub fn check_inclusion(
    smaller: &BuTreeAutomaton,
    bigger: &BuTreeAutomaton,
) -> Result<bool, AutomatonError> {
    if !smaller.context().same_context(bigger.context()) {
        return Err(AutomatonError::ContextMismatch);
    }
    info!(
        smaller_states = smaller.states().len(),
        bigger_states = bigger.states().len(),
        "checking language inclusion"
    );

    // One simulation over the union relates states across both automata:
    // its restriction to A x B powers the direct short-circuit, its
    // restriction to B x B powers subsumption.
    let merged = union(smaller, bigger)?;
    let sim = downward_simulation(&merged)?;

    let td_small = smaller.to_top_down()?;
    let td_big = bigger.to_top_down()?;

    let mut checker = InclusionChecker {
        ctx: smaller.context().clone(),
        td_small: &td_small,
        td_big: &td_big,
        bigger_states: bigger.states().clone(),
        sim: &sim,
        workset: HashMap::new(),
        included: HashMap::new(),
        nonincluded: HashMap::new(),
    };

    let initial_set: StateSet = td_big.initials().iter().copied().collect();
    for &q in td_small.initials() {
        if !checker.expand_subset(q, &initial_set)? {
            info!("inclusion does not hold");
            return Ok(false);
        }
    }
    info!("inclusion holds");
    Ok(true)
}

/// Collects the distinct leaf pairs of one binary Apply; the result
/// diagram itself is discarded.
struct PairCollector {
    pairs: Vec<(TupleSet, TupleSet)>,
}

impl BinaryApply<TupleSet> for PairCollector {
    fn combine(&mut self, lhs: &TupleSet, rhs: &TupleSet) -> Result<TupleSet, MtbddError> {
        if !lhs.is_empty() {
            self.pairs.push((lhs.clone(), rhs.clone()));
        }
        Ok(TupleSet::new())
    }
}

type ConfigRows = HashMap<State, Vec<StateSet>>;

struct InclusionChecker<'a> {
    ctx: Context,
    td_small: &'a TdTreeAutomaton,
    td_big: &'a TdTreeAutomaton,
    bigger_states: BTreeSet<State>,
    sim: &'a SimulationRelation,
    workset: ConfigRows,
    included: ConfigRows,
    nonincluded: ConfigRows,
}

impl InclusionChecker<'_> {
    /// `S ⊑ T` under the forall-exists lift: every element of `small` has
    /// a simulator in `big`.
    fn forall_exists(&self, small: &StateSet, big: &StateSet) -> bool {
        small.iter().all(|s| match self.sim.simulators_of(s) {
            Some(simulators) => big.iter().any(|t| simulators.contains(&t)),
            None => false,
        })
    }

    /// Decide one configuration `(q, S)` with caching and subsumption.
    fn expand_config(&mut self, q: State, set: &StateSet) -> Result<bool, AutomatonError> {
        // Some element of S simulates q outright.
        if set
            .iter()
            .any(|s| self.bigger_states.contains(&s) && self.sim.contains(q, s))
        {
            return Ok(true);
        }
        // A subsumed configuration is already being expanded: the cycle is
        // productive, treat the goal as held.
        if let Some(rows) = self.workset.get(&q) {
            if rows.iter().any(|prev| self.forall_exists(prev, set)) {
                return Ok(true);
            }
        }
        if let Some(rows) = self.included.get(&q) {
            if rows.iter().any(|prev| self.forall_exists(prev, set)) {
                return Ok(true);
            }
        }
        if let Some(rows) = self.nonincluded.get(&q) {
            if rows.iter().any(|prev| self.forall_exists(set, prev)) {
                return Ok(false);
            }
        }

        let holds = self.expand_subset(q, set)?;
        if holds {
            self.included.entry(q).or_default().push(set.clone());
        } else {
            self.nonincluded.entry(q).or_default().push(set.clone());
        }
        Ok(holds)
    }

    /// Expand `(q, S)` structurally: pair the child tuples of `q` with the
    /// united child tuples of `S`, symbol by symbol.
    fn expand_subset(&mut self, q: State, set: &StateSet) -> Result<bool, AutomatonError> {
        debug!(state = q, set = %set, "expanding configuration");

        let leaf_pairs = {
            let mut tdm = self.ctx.td_manager();
            let mut union_root = tdm.bottom_root();
            for s in set.iter() {
                let next = tdm.apply2(union_root, self.td_big.root_of(s), &mut TupleSetUnion)?;
                if union_root != tdm.bottom_root() {
                    tdm.release_root(union_root);
                }
                union_root = next;
            }

            let mut collector = PairCollector { pairs: Vec::new() };
            let probe = tdm.apply2(self.td_small.root_of(q), union_root, &mut collector);
            if union_root != tdm.bottom_root() {
                tdm.release_root(union_root);
            }
            let probe = probe?;
            tdm.release_root(probe);
            collector.pairs
        };

        self.workset.entry(q).or_default().push(set.clone());
        let holds = self.check_pairs(&leaf_pairs);
        let rows = self.workset.get_mut(&q).expect("workset row vanished");
        let position = rows
            .iter()
            .rposition(|prev| prev == set)
            .expect("workset entry vanished");
        rows.remove(position);

        holds
    }

    fn check_pairs(
        &mut self,
        leaf_pairs: &[(TupleSet, TupleSet)],
    ) -> Result<bool, AutomatonError> {
        for (small_leaf, big_leaf) in leaf_pairs {
            for tuple in small_leaf.iter() {
                if !self.check_tuple(tuple, big_leaf)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Prove that the single move `tuple` of the smaller state is covered
    /// by the moves `big` of the bigger set, via the choice-function DAG.
    fn check_tuple(&mut self, tuple: &[State], big: &TupleSet) -> Result<bool, AutomatonError> {
        let arity = tuple.len();
        if arity == 0 {
            // Nullary move: the bigger side must answer with one too.
            return Ok(big.contains_empty_tuple());
        }
        assert!(arity < u8::MAX as usize, "rule arity out of range");

        let choices: Vec<&Vec<State>> = big.iter().filter(|v| v.len() == arity).collect();

        let mut dag = ProofDag::new();
        let root_or = dag.new_or(true);
        let root_and = dag.new_and(root_or);
        dag.ands[root_and].entries.push(Entry {
            assignment: vec![0; choices.len()],
            position: 0,
            child: None,
        });

        let mut cache: HashMap<Vec<u8>, Option<usize>> = HashMap::new();
        let mut worklist: VecDeque<usize> = VecDeque::from([root_or]);

        while let Some(or_id) = worklist.pop_front() {
            if dag.ors[or_id].satisfied {
                continue;
            }
            if dag.ors[or_id].parents.is_empty() && !dag.ors[or_id].root {
                // Every parent was satisfied or discarded meanwhile.
                continue;
            }

            let and_ids = dag.ors[or_id].ands.clone();
            for and_id in and_ids {
                let mut index = 0;
                while index < dag.ands[and_id].entries.len() {
                    if dag.ands[and_id].entries[index].child.is_some() {
                        index += 1;
                        continue;
                    }
                    let assignment = dag.ands[and_id].entries[index].assignment.clone();
                    let position = dag.ands[and_id].entries[index].position;

                    // States the choice function routes to this position.
                    let subset: StateSet = assignment
                        .iter()
                        .enumerate()
                        .filter(|&(_, &c)| c as usize == position + 1)
                        .map(|(i, _)| choices[i][position])
                        .collect();

                    if self.expand_config(tuple[position], &subset)? {
                        dag.ands[and_id].entries.remove(index);
                        continue;
                    }

                    // The direct goal failed: refine the choice function.
                    match cache.get(&assignment) {
                        Some(&Some(child)) => {
                            if dag.ors[child].satisfied {
                                dag.ands[and_id].entries.remove(index);
                                continue;
                            }
                            dag.ands[and_id].entries[index].child = Some(child);
                            dag.ors[child].parents.push(and_id);
                        }
                        Some(&None) => {
                            // A fully assigned function that failed before;
                            // this entry can never be satisfied.
                        }
                        None => {
                            let unassigned: Vec<usize> = assignment
                                .iter()
                                .enumerate()
                                .filter(|&(_, &c)| c == 0)
                                .map(|(i, _)| i)
                                .collect();
                            if unassigned.is_empty() {
                                cache.insert(assignment, None);
                            } else {
                                let child = dag.new_or(false);
                                dag.ors[child].parents.push(and_id);
                                for i in unassigned {
                                    let and_child = dag.new_and(child);
                                    for p in 0..arity {
                                        let mut refined = assignment.clone();
                                        refined[i] = (p + 1) as u8;
                                        dag.ands[and_child].entries.push(Entry {
                                            assignment: refined,
                                            position: p,
                                            child: None,
                                        });
                                    }
                                }
                                cache.insert(assignment, Some(child));
                                dag.ands[and_id].entries[index].child = Some(child);
                                worklist.push_back(child);
                            }
                        }
                    }
                    index += 1;
                }

                if dag.ands[and_id].entries.is_empty() {
                    if dag.satisfy(or_id) {
                        return Ok(true);
                    }
                    break;
                }
            }
        }

        Ok(false)
    }
}

/// One conjunct of an and-node: a goal at `position` under a partial
/// choice function, optionally backed by a deeper or-node.
struct Entry {
    /// Choice function: `assignment[i] = p + 1` routes the i-th bigger
    /// tuple to position `p`; `0` leaves it unassigned.
    assignment: Vec<u8>,
    position: usize,
    child: Option<usize>,
}

struct OrNode {
    parents: Vec<usize>,
    ands: Vec<usize>,
    satisfied: bool,
    root: bool,
}

struct AndNode {
    parent: usize,
    entries: Vec<Entry>,
}

/// Arena-allocated or/and proof DAG with upward satisfaction propagation.
struct ProofDag {
    ors: Vec<OrNode>,
    ands: Vec<AndNode>,
}

impl ProofDag {
    fn new() -> Self {
        ProofDag {
            ors: Vec::new(),
            ands: Vec::new(),
        }
    }

    fn new_or(&mut self, root: bool) -> usize {
        self.ors.push(OrNode {
            parents: Vec::new(),
            ands: Vec::new(),
            satisfied: false,
            root,
        });
        self.ors.len() - 1
    }

    fn new_and(&mut self, parent: usize) -> usize {
        self.ands.push(AndNode {
            parent,
            entries: Vec::new(),
        });
        let and_id = self.ands.len() - 1;
        self.ors[parent].ands.push(and_id);
        and_id
    }

    /// Mark `or_id` satisfied and propagate upward: a parent and-node
    /// drops the satisfied conjunct, an and-node without conjuncts
    /// satisfies its own parent. Returns `true` when the root was
    /// satisfied.
    fn satisfy(&mut self, or_id: usize) -> bool {
        let mut stack = vec![or_id];
        let mut root_satisfied = false;
        while let Some(or_id) = stack.pop() {
            if self.ors[or_id].satisfied {
                continue;
            }
            self.ors[or_id].satisfied = true;
            if self.ors[or_id].root {
                root_satisfied = true;
                continue;
            }
            let parents = std::mem::take(&mut self.ors[or_id].parents);
            for and_id in parents {
                self.ands[and_id]
                    .entries
                    .retain(|entry| entry.child != Some(or_id));
                if self.ands[and_id].entries.is_empty() {
                    stack.push(self.ands[and_id].parent);
                }
            }
        }
        root_satisfied
    }
}
