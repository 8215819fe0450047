//! Maximal downward simulation preorder
//!
//! `p ≼ r` holds when `p` final implies `r` final, and for every symbol
//! `a` and child tuple `u` of `p` in the top-down view there is a tuple
//! `v` of `r` under `a` with `u[i] ≼ v[i]` at every position. The maximal
//! such relation is the greatest fixpoint of that condition; it always
//! contains the identity and refining only ever removes pairs.
//!
//! # Computation
//!
//! The relation starts from the final-state condition filtered by a
//! symbol-capability Apply (a pair dies immediately when the candidate
//! simulator lacks some symbol the simulatee moves under), with every
//! rejected pair seeding a removal queue.
//!
//! Refinement is counter driven. For each left-hand-side vector `u` of the
//! bottom-up table a counter diagram maps every symbol `a` to entries
//! `(r, c)`, where `c` counts the vectors `v` with `(v, a)` in the table,
//! `r` in its right-hand side, and `u ≼ v` still possible pointwise.
//! Counters start optimistically at the full tuple counts of the top-down
//! view. A per-vector-pair count of still-related positions detects the
//! first break of `u ≼ v`; the break fires one ternary Apply over
//! `(mirror(u), mirror(v), counters(u))` that decrements `(r, ·)` for
//! every `r` reachable from `v` and, on a counter reaching zero, removes
//! `(q, r)` for every `q` reachable from `u` and queues it for further
//! propagation.
//!
//! Every ordered state pair enters the removal queue at most once and
//! every vector pair fires at most one refinement, which bounds the loop;
//! a counter reaches zero exactly when the last pointwise-related witness
//! vector for `(u, a, r)` is gone, which is precisely when the simulation
//! condition fails for the right-hand-side states of `(u, a)`.

use super::{AutomatonError, BuTreeAutomaton};
use crate::assignment::VarAssignment;
use crate::leaves::{CounterSet, State, StateSet, TupleSet};
use crate::mtbdd::{BinaryApply, MtbddError, MtbddManager, Root, TernaryApply};
use hashbrown::HashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

/// A simulation relation over automaton states: a sparse Boolean matrix
/// stored as rows `state -> set of simulators`.
#[derive(Debug, Clone, Default)]
pub struct SimulationRelation {
    rows: BTreeMap<State, BTreeSet<State>>,
}

impl SimulationRelation {
    /// The empty relation.
    pub fn new() -> Self {
        SimulationRelation {
            rows: BTreeMap::new(),
        }
    }

    /// Add the pair `(p, q)`: `q` simulates `p`.
    pub fn insert(&mut self, p: State, q: State) {
        self.rows.entry(p).or_default().insert(q);
    }

    /// Remove the pair `(p, q)`; `true` when it was present.
    pub fn remove(&mut self, p: State, q: State) -> bool {
        self.rows.get_mut(&p).is_some_and(|row| row.remove(&q))
    }

    /// `true` when `q` simulates `p`.
    pub fn contains(&self, p: State, q: State) -> bool {
        self.rows.get(&p).is_some_and(|row| row.contains(&q))
    }

    /// The simulators of `p`, sorted.
    pub fn simulators_of(&self, p: State) -> Option<&BTreeSet<State>> {
        self.rows.get(&p)
    }

    /// All pairs `(p, q)` of the relation, sorted.
    pub fn pairs(&self) -> Vec<(State, State)> {
        self.rows
            .iter()
            .flat_map(|(&p, row)| row.iter().map(move |&q| (p, q)))
            .collect()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.rows.values().map(|row| row.len()).sum()
    }

    /// `true` when no pair is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Symbol-capability detector: fails the pair as soon as the simulatee
/// moves under a symbol the candidate simulator lacks.
struct CapabilityDetector {
    holds: bool,
}

impl BinaryApply<TupleSet> for CapabilityDetector {
    fn combine(&mut self, lhs: &TupleSet, rhs: &TupleSet) -> Result<TupleSet, MtbddError> {
        if !lhs.is_empty() && rhs.is_empty() {
            self.holds = false;
        }
        Ok(TupleSet::new())
    }
}

/// Merge operator accumulating the initial counters.
struct CounterMerge;

impl BinaryApply<CounterSet> for CounterMerge {
    fn combine(&mut self, lhs: &CounterSet, rhs: &CounterSet) -> Result<CounterSet, MtbddError> {
        if lhs.is_empty() {
            Ok(rhs.clone())
        } else if rhs.is_empty() {
            Ok(lhs.clone())
        } else {
            Ok(lhs.merge(rhs))
        }
    }
}

/// Refinement operator: retract one witness vector `v` from the counters
/// of `u`, removing pairs whose last witness disappeared.
struct RefineOp<'a> {
    sim: &'a mut SimulationRelation,
    queue: &'a mut VecDeque<(State, State)>,
}

impl TernaryApply<CounterSet> for RefineOp<'_> {
    fn combine(
        &mut self,
        of_u: &CounterSet,
        of_v: &CounterSet,
        counters: &CounterSet,
    ) -> Result<CounterSet, MtbddError> {
        // No rule of u or of v under this symbol: nothing to retract.
        if of_u.is_empty() || of_v.is_empty() {
            return Ok(counters.clone());
        }

        let mut updated = counters.clone();
        for (r, _) in of_v.iter() {
            let Some(current) = updated.get(r) else {
                continue;
            };
            if current == 0 {
                continue;
            }
            updated.set(r, current - 1);
            if current == 1 {
                for (q, _) in of_u.iter() {
                    if self.sim.remove(q, r) {
                        self.queue.push_back((q, r));
                    }
                }
            }
        }
        Ok(updated)
    }
}

/// Compute the maximal downward simulation preorder of an automaton.
///
/// The result contains the identity on the automaton's states and shrinks
/// monotonically during refinement; see the module docs for the algorithm.
pub fn downward_simulation(
    aut: &BuTreeAutomaton,
) -> Result<SimulationRelation, AutomatonError> {
    let td = aut.to_top_down()?;
    let states: Vec<State> = aut.states().iter().copied().collect();
    info!(states = states.len(), "computing downward simulation");

    let mut sim = SimulationRelation::new();
    let mut queue: VecDeque<(State, State)> = VecDeque::new();

    // Initial relation: final condition plus symbol capability. Every
    // rejected pair seeds the removal queue so the counters below are
    // driven down from their optimistic start.
    {
        let mut tdm = aut.context().td_manager();
        for &p in &states {
            for &r in &states {
                let mut keep = !aut.is_final(p) || aut.is_final(r);
                if keep {
                    let mut detector = CapabilityDetector { holds: true };
                    let probe = tdm.apply2(td.root_of(p), td.root_of(r), &mut detector)?;
                    tdm.release_root(probe);
                    keep = detector.holds;
                }
                if keep {
                    sim.insert(p, r);
                } else {
                    queue.push_back((p, r));
                }
            }
        }
    }
    debug!(initial_pairs = sim.len(), removals = queue.len(), "seeded");

    // Left-hand-side vectors and their explicit rule paths.
    let entries = aut.table().iter_non_bottom();
    let lhs_list: Vec<Vec<State>> = entries.iter().map(|(lhs, _)| lhs.clone()).collect();
    let bu_paths: Vec<Vec<(VarAssignment, StateSet)>> = {
        let mgr = aut.context().bu_manager();
        entries.iter().map(|(_, root)| mgr.paths(*root)).collect()
    };

    // Counter engine, private to this computation. Mirrors replay the
    // right-hand sides of the bottom-up table as counter leaves so the
    // ternary Apply below stays within one leaf type.
    let mut cm: MtbddManager<CounterSet> =
        MtbddManager::new(aut.context().symbol_bits(), CounterSet::new());

    let mut mirrors: Vec<Root> = Vec::with_capacity(lhs_list.len());
    for paths in &bu_paths {
        let root = cm.new_root();
        for (cube, targets) in paths {
            if targets.is_sink() {
                continue;
            }
            let mut leaf = CounterSet::new();
            for q in targets.iter() {
                leaf.set(q, 0);
            }
            cm.set_value(root, cube, leaf)?;
        }
        mirrors.push(root);
    }

    // Optimistic initial counters: for each state r and symbol, the number
    // of child tuples of r, i.e. every vector is assumed a witness.
    let td_paths: Vec<(State, Vec<(VarAssignment, TupleSet)>)> = {
        let tdm = aut.context().td_manager();
        states
            .iter()
            .map(|&r| (r, tdm.paths(td.root_of(r))))
            .collect()
    };
    let mut init = cm.new_root();
    for (r, paths) in &td_paths {
        for (cube, tuples) in paths {
            if tuples.is_empty() {
                continue;
            }
            let piece = cm.new_root();
            cm.set_value(piece, cube, CounterSet::singleton(*r, tuples.len() as u32))?;
            let merged = cm.apply2(init, piece, &mut CounterMerge)?;
            cm.release_root(piece);
            cm.release_root(init);
            init = merged;
        }
    }
    let mut counters: Vec<Root> = Vec::with_capacity(lhs_list.len());
    for _ in &lhs_list {
        counters.push(cm.clone_root(init));
    }
    cm.release_root(init);

    // Occurrence indexes: where does a state occur in the vectors?
    let mut occurrences: HashMap<State, Vec<(usize, usize)>> = HashMap::new();
    let mut at_position: HashMap<(usize, State), Vec<usize>> = HashMap::new();
    for (index, lhs) in lhs_list.iter().enumerate() {
        for (position, &state) in lhs.iter().enumerate() {
            occurrences.entry(state).or_default().push((index, position));
            at_position.entry((position, state)).or_default().push(index);
        }
    }

    // Per-vector-pair count of still-related positions; the first drop
    // below the arity fires the refinement.
    let mut related_positions: HashMap<(usize, usize), usize> = HashMap::new();

    while let Some((x, y)) = queue.pop_front() {
        debug!(simulatee = x, simulator = y, "pair removed");
        let Some(occs) = occurrences.get(&x) else {
            continue;
        };

        let mut breaks: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        for &(u_index, position) in occs {
            if let Some(v_indexes) = at_position.get(&(position, y)) {
                for &v_index in v_indexes {
                    if lhs_list[u_index].len() == lhs_list[v_index].len() {
                        *breaks.entry((u_index, v_index)).or_insert(0) += 1;
                    }
                }
            }
        }

        for ((u_index, v_index), broken) in breaks {
            let arity = lhs_list[u_index].len();
            let count = related_positions.entry((u_index, v_index)).or_insert(arity);
            let first_break = *count == arity;
            *count = count.saturating_sub(broken);
            if !first_break {
                continue;
            }

            let mut refine = RefineOp {
                sim: &mut sim,
                queue: &mut queue,
            };
            let updated = cm.apply3(
                mirrors[u_index],
                mirrors[v_index],
                counters[u_index],
                &mut refine,
            )?;
            cm.release_root(counters[u_index]);
            counters[u_index] = updated;
        }
    }

    info!(pairs = sim.len(), "simulation computed");
    Ok(sim)
}
