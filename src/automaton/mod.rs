//! Symbolic tree automata and their algebra
//!
//! A [`Context`] owns the shared MTBDD engines and the state allocator; any
//! number of automata register against one context and share interned
//! leaves and diagram nodes. The bottom-up view ([`BuTreeAutomaton`])
//! stores rules `f(q1, ..., qn) -> q` in an arity-specialised
//! [`TransitionTable`](crate::table::TransitionTable); the top-down view
//! ([`TdTreeAutomaton`]) keeps one diagram per state mapping each symbol to
//! the set of child tuples.
//!
//! Language operations live in this module: [`union`], [`intersection`],
//! the maximal [`downward_simulation`] preorder and antichain
//! [`check_inclusion`]. All of them require their operands to come from the
//! same context and fail with
//! [`AutomatonError::ContextMismatch`] otherwise.

pub mod error;

mod inclusion;
mod intersection;
mod simulation;
mod union;

pub use error::AutomatonError;
pub use inclusion::check_inclusion;
pub use intersection::intersection;
pub use simulation::{downward_simulation, SimulationRelation};
pub use union::union;

use crate::assignment::VarAssignment;
use crate::leaves::{State, StateSet, TupleSet, SINK_STATE};
use crate::mtbdd::{BinaryApply, MtbddError, MtbddManager, Root};
use crate::table::TransitionTable;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tracing::info;

/// Shared MTBDD context
///
/// Owns the bottom-up engine (state-set leaves), the top-down engine
/// (tuple-set leaves) and the monotonic state allocator. Cloning a context
/// is cheap and yields a handle to the same engines; automata are only
/// composable when their contexts are the same handle
/// ([`Context::same_context`]).
///
/// State `0` is the reserved sink state; allocation starts at `1`.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    bu: RwLock<MtbddManager<StateSet>>,
    td: RwLock<MtbddManager<TupleSet>>,
    next_state: AtomicU32,
    symbol_bits: u16,
}

impl Context {
    /// Create a context whose symbols are encoded over `symbol_bits`
    /// Boolean variables.
    pub fn new(symbol_bits: u16) -> Self {
        Context {
            inner: Arc::new(ContextInner {
                bu: RwLock::new(MtbddManager::new(symbol_bits, StateSet::sink())),
                td: RwLock::new(MtbddManager::new(symbol_bits, TupleSet::new())),
                next_state: AtomicU32::new(SINK_STATE + 1),
                symbol_bits,
            }),
        }
    }

    /// Width of the symbol encoding.
    pub fn symbol_bits(&self) -> u16 {
        self.inner.symbol_bits
    }

    /// `true` when both handles denote the same context.
    pub fn same_context(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Allocate a fresh state id, unique across every automaton of the
    /// context.
    pub(crate) fn fresh_state(&self) -> State {
        self.inner.next_state.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn bu_manager(&self) -> RwLockWriteGuard<'_, MtbddManager<StateSet>> {
        self.inner.bu.write().unwrap()
    }

    pub(crate) fn td_manager(&self) -> RwLockWriteGuard<'_, MtbddManager<TupleSet>> {
        self.inner.td.write().unwrap()
    }

    /// Live node count of the bottom-up engine (diagnostics).
    pub fn bu_live_nodes(&self) -> usize {
        self.bu_manager().live_node_count()
    }

    /// Live root count of the bottom-up engine (diagnostics).
    pub fn bu_live_roots(&self) -> usize {
        self.bu_manager().root_count()
    }

    /// Check the reference-count invariant of both engines: every node's
    /// count equals the references held by live roots and parent nodes.
    pub fn ref_invariants_hold(&self) -> bool {
        self.bu_manager().ref_invariant_holds() && self.td_manager().ref_invariant_holds()
    }
}

/// Leaf-union operator: set union with the `{sink}` marker as identity, so
/// absence stays distinguishable from the empty set.
pub(crate) struct StateSetUnion;

impl BinaryApply<StateSet> for StateSetUnion {
    fn combine(&mut self, lhs: &StateSet, rhs: &StateSet) -> Result<StateSet, MtbddError> {
        if lhs.is_sink() {
            Ok(rhs.clone())
        } else if rhs.is_sink() {
            Ok(lhs.clone())
        } else {
            Ok(lhs.union(rhs))
        }
    }
}

/// Tuple-set union; the top-down background is the empty set, which plain
/// union already treats as identity.
pub(crate) struct TupleSetUnion;

impl BinaryApply<TupleSet> for TupleSetUnion {
    fn combine(&mut self, lhs: &TupleSet, rhs: &TupleSet) -> Result<TupleSet, MtbddError> {
        if lhs.is_empty() {
            Ok(rhs.clone())
        } else if rhs.is_empty() {
            Ok(lhs.clone())
        } else {
            Ok(lhs.union(rhs))
        }
    }
}

/// One explicit bottom-up transition rule, produced by
/// [`BuTreeAutomaton::rules`].
///
/// `symbol` is a cube: don't-care positions stand for every concrete
/// symbol matching the determined ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Child states, one per symbol-arity position.
    pub lhs: Vec<State>,
    /// Symbol cube of the rule.
    pub symbol: VarAssignment,
    /// Right-hand-side states.
    pub targets: StateSet,
}

/// Nondeterministic bottom-up symbolic tree automaton
///
/// # Examples
///
/// ```
/// use symta::{BuTreeAutomaton, Context, VarAssignment};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = Context::new(4);
/// let mut aut = BuTreeAutomaton::new(&ctx);
///
/// let q0 = aut.add_state();
/// let q1 = aut.add_state();
/// aut.set_final(q1)?;
///
/// let a: VarAssignment = "0000".parse()?;
/// let c: VarAssignment = "0101".parse()?;
/// aut.add_transition(&[], &a, &[q0])?;
/// aut.add_transition(&[q0, q0], &c, &[q1])?;
///
/// assert_eq!(aut.get_transition(&[q0, q0], &c)?.states(), &[q1]);
/// assert!(aut.get_transition(&[q1, q1], &c)?.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct BuTreeAutomaton {
    ctx: Context,
    states: BTreeSet<State>,
    finals: BTreeSet<State>,
    table: TransitionTable,
}

impl std::fmt::Debug for BuTreeAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuTreeAutomaton")
            .field("states", &self.states)
            .field("finals", &self.finals)
            .finish_non_exhaustive()
    }
}

impl BuTreeAutomaton {
    /// Create an empty automaton registered against `ctx`.
    pub fn new(ctx: &Context) -> Self {
        let bottom = ctx.bu_manager().bottom_root();
        BuTreeAutomaton {
            ctx: ctx.clone(),
            states: BTreeSet::new(),
            finals: BTreeSet::new(),
            table: TransitionTable::new(bottom),
        }
    }

    /// The automaton's context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Allocate and register a fresh state.
    pub fn add_state(&mut self) -> State {
        let state = self.ctx.fresh_state();
        self.states.insert(state);
        self.table.grow(state as usize + 1);
        state
    }

    /// Register a state allocated elsewhere in the same context.
    pub(crate) fn adopt_state(&mut self, state: State) {
        self.states.insert(state);
        self.table.grow(state as usize + 1);
    }

    /// The registered states, sorted.
    pub fn states(&self) -> &BTreeSet<State> {
        &self.states
    }

    /// `true` when `state` is registered.
    pub fn has_state(&self, state: State) -> bool {
        self.states.contains(&state)
    }

    /// Mark `state` as final (accepting).
    pub fn set_final(&mut self, state: State) -> Result<(), AutomatonError> {
        if !self.states.contains(&state) {
            return Err(AutomatonError::UnknownState { state });
        }
        self.finals.insert(state);
        Ok(())
    }

    /// `true` when `state` is final.
    pub fn is_final(&self, state: State) -> bool {
        self.finals.contains(&state)
    }

    /// The final states, sorted.
    pub fn finals(&self) -> &BTreeSet<State> {
        &self.finals
    }

    /// Add the rule `symbol(lhs) -> rhs`.
    ///
    /// All states must have been added before; the rule accumulates into
    /// whatever the left-hand side already maps to, through the leaf-union
    /// Apply. `symbol` may contain don't cares, adding one rule per
    /// matching concrete symbol.
    pub fn add_transition(
        &mut self,
        lhs: &[State],
        symbol: &VarAssignment,
        rhs: &[State],
    ) -> Result<(), AutomatonError> {
        for &state in lhs.iter().chain(rhs) {
            if !self.states.contains(&state) {
                return Err(AutomatonError::UnknownState { state });
            }
        }
        if rhs.is_empty() {
            return Ok(());
        }

        let targets = StateSet::from_states(rhs);
        let mut mgr = self.ctx.bu_manager();
        let cube = mgr.new_root();
        if let Err(err) = mgr.set_value(cube, symbol, targets) {
            mgr.release_root(cube);
            return Err(err.into());
        }

        let current = self.table.get_root(lhs);
        let merged = match mgr.apply2(current, cube, &mut StateSetUnion) {
            Ok(root) => root,
            Err(err) => {
                mgr.release_root(cube);
                return Err(err.into());
            }
        };
        mgr.release_root(cube);
        if current != self.table.bottom() {
            mgr.release_root(current);
        }
        drop(mgr);

        self.table.set_root(lhs, merged);
        Ok(())
    }

    /// The successor set of `lhs` under `symbol`; empty when no rule
    /// exists.
    ///
    /// A symbolic `symbol` must agree across its concretions, otherwise
    /// the read is under-determined and fails with
    /// [`MtbddError::MultipleValues`].
    pub fn get_transition(
        &self,
        lhs: &[State],
        symbol: &VarAssignment,
    ) -> Result<StateSet, AutomatonError> {
        for &state in lhs {
            if !self.states.contains(&state) {
                return Err(AutomatonError::UnknownState { state });
            }
        }
        let value = self.ctx.bu_manager().get_value(self.table.get_root(lhs), symbol)?;
        if value.is_sink() {
            Ok(StateSet::new())
        } else {
            Ok(value)
        }
    }

    /// Enumerate every rule of the automaton explicitly, symbols as cubes.
    ///
    /// Deterministic: table order, then diagram path order.
    pub fn rules(&self) -> Vec<Rule> {
        let mgr = self.ctx.bu_manager();
        let mut rules = Vec::new();
        for (lhs, root) in self.table.iter_non_bottom() {
            for (symbol, targets) in mgr.paths(root) {
                if targets.is_sink() {
                    continue;
                }
                rules.push(Rule {
                    lhs: lhs.clone(),
                    symbol,
                    targets,
                });
            }
        }
        rules
    }

    pub(crate) fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut TransitionTable {
        &mut self.table
    }

    pub(crate) fn finals_mut(&mut self) -> &mut BTreeSet<State> {
        &mut self.finals
    }

    /// Build the top-down view: one diagram per state `q`, mapping each
    /// symbol to the set of child tuples `(q1, ..., qn)` with
    /// `symbol(q1, ..., qn) -> q'` in the table and `q` in `q'`. Final
    /// states become the initial states of the top-down automaton.
    pub fn to_top_down(&self) -> Result<TdTreeAutomaton, AutomatonError> {
        info!(states = self.states.len(), "building top-down view");

        let mut td = TdTreeAutomaton::new(&self.ctx);
        for &state in &self.states {
            td.adopt_state(state);
            if self.is_final(state) {
                td.set_initial(state)?;
            }
        }

        let rules = self.rules();
        let mut tdm = self.ctx.td_manager();
        for rule in rules {
            for q in rule.targets.iter() {
                if q == SINK_STATE {
                    continue;
                }
                let cube = tdm.new_root();
                if let Err(err) = tdm.set_value(cube, &rule.symbol, TupleSet::singleton(rule.lhs.clone())) {
                    tdm.release_root(cube);
                    return Err(err.into());
                }
                let current = td.root_of(q);
                let merged = match tdm.apply2(current, cube, &mut TupleSetUnion) {
                    Ok(root) => root,
                    Err(err) => {
                        tdm.release_root(cube);
                        return Err(err.into());
                    }
                };
                tdm.release_root(cube);
                if current != td.bottom {
                    tdm.release_root(current);
                }
                td.roots.insert(q, merged);
            }
        }
        Ok(td)
    }
}

impl Clone for BuTreeAutomaton {
    fn clone(&self) -> Self {
        let mut mgr = self.ctx.bu_manager();
        let mut table = TransitionTable::new(self.table.bottom());
        table.grow(self.states.iter().next_back().map_or(0, |&s| s as usize + 1));
        for (lhs, root) in self.table.iter_non_bottom() {
            table.set_root(&lhs, mgr.clone_root(root));
        }
        drop(mgr);
        BuTreeAutomaton {
            ctx: self.ctx.clone(),
            states: self.states.clone(),
            finals: self.finals.clone(),
            table,
        }
    }
}

impl Drop for BuTreeAutomaton {
    fn drop(&mut self) {
        if let Ok(mut mgr) = self.ctx.inner.bu.write() {
            for (_, root) in self.table.iter_non_bottom() {
                mgr.release_root(root);
            }
        }
    }
}

/// Nondeterministic top-down symbolic tree automaton
///
/// The dual view: per-state diagrams map each symbol to the
/// [`TupleSet`] of child tuples, and the accepting condition moves to the
/// initial states. Produced by [`BuTreeAutomaton::to_top_down`] and
/// consumed by the simulation and inclusion algorithms.
pub struct TdTreeAutomaton {
    ctx: Context,
    states: BTreeSet<State>,
    initials: BTreeSet<State>,
    roots: BTreeMap<State, Root>,
    bottom: Root,
}

impl TdTreeAutomaton {
    /// Create an empty top-down automaton registered against `ctx`.
    pub fn new(ctx: &Context) -> Self {
        let bottom = ctx.td_manager().bottom_root();
        TdTreeAutomaton {
            ctx: ctx.clone(),
            states: BTreeSet::new(),
            initials: BTreeSet::new(),
            roots: BTreeMap::new(),
            bottom,
        }
    }

    /// The automaton's context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Register a state allocated in the same context.
    pub fn adopt_state(&mut self, state: State) {
        self.states.insert(state);
    }

    /// The registered states, sorted.
    pub fn states(&self) -> &BTreeSet<State> {
        &self.states
    }

    /// Mark `state` as initial.
    pub fn set_initial(&mut self, state: State) -> Result<(), AutomatonError> {
        if !self.states.contains(&state) {
            return Err(AutomatonError::UnknownState { state });
        }
        self.initials.insert(state);
        Ok(())
    }

    /// `true` when `state` is initial.
    pub fn is_initial(&self, state: State) -> bool {
        self.initials.contains(&state)
    }

    /// The initial states, sorted.
    pub fn initials(&self) -> &BTreeSet<State> {
        &self.initials
    }

    /// The diagram of `state`; the shared bottom when the state has no
    /// rules.
    pub fn root_of(&self, state: State) -> Root {
        self.roots.get(&state).copied().unwrap_or(self.bottom)
    }

    /// The child tuples of `state` under `symbol`; empty when no rule
    /// exists.
    pub fn get_transition(
        &self,
        state: State,
        symbol: &VarAssignment,
    ) -> Result<TupleSet, AutomatonError> {
        Ok(self.ctx.td_manager().get_value(self.root_of(state), symbol)?)
    }
}

impl Clone for TdTreeAutomaton {
    fn clone(&self) -> Self {
        let mut mgr = self.ctx.td_manager();
        let roots = self
            .roots
            .iter()
            .map(|(&state, &root)| (state, mgr.clone_root(root)))
            .collect();
        drop(mgr);
        TdTreeAutomaton {
            ctx: self.ctx.clone(),
            states: self.states.clone(),
            initials: self.initials.clone(),
            roots,
            bottom: self.bottom,
        }
    }
}

impl Drop for TdTreeAutomaton {
    fn drop(&mut self) {
        if let Ok(mut mgr) = self.ctx.inner.td.write() {
            for (_, &root) in &self.roots {
                if root != self.bottom {
                    mgr.release_root(root);
                }
            }
        }
    }
}
