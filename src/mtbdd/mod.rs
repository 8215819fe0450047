//! Shared multi-terminal binary decision diagrams
//!
//! A shared MTBDD is a rooted acyclic DAG: internal nodes test a Boolean
//! variable and branch into a `low` (variable is 0) and a `high` (variable
//! is 1) child, terminal nodes carry an interned leaf value. One
//! [`MtbddManager`] owns every node of every diagram built against it, so
//! structurally equal sub-diagrams are physically shared.
//!
//! # Invariants
//!
//! - **Reduced**: no internal node has identical children, and a node's
//!   variable precedes its children's in the variable order (terminals
//!   compare greatest).
//! - **Canonical**: for any `(var, low, high)` there is exactly one internal
//!   node, for any leaf value exactly one terminal; two diagrams are equal
//!   iff their root nodes are the same node.
//! - **Shared**: sub-DAG lifetime is governed by reference counts summed
//!   over all owners; a node is freed the moment its count reaches zero,
//!   recursively releasing its children. The DAG is acyclic, so counting
//!   suffices.
//! - **Global bottom**: one designated background leaf is the value of
//!   every assignment a diagram does not constrain.
//!
//! # Root handles
//!
//! Diagrams are addressed through opaque [`Root`] handles, each owning
//! exactly one reference to its node. Handing a root to an operation never
//! consumes it; cloning a root ([`MtbddManager::clone_root`]) takes a new
//! reference, releasing one ([`MtbddManager::release_root`]) drops it.
//! Releasing a handle twice, or a handle of a different manager, is a
//! programming error and panics.
//!
//! # Apply
//!
//! The generic traversals [`MtbddManager::apply2`] (binary),
//! [`MtbddManager::apply3`] (ternary) and [`MtbddManager::apply1`]
//! (monadic) recurse over operand cofactors and evaluate a caller-supplied
//! functor on leaf tuples. Results are memoised in a per-manager cache
//! keyed by the operand nodes and a fresh per-invocation operation id; the
//! cache is pure memoisation and may be flushed at any time without
//! changing any result.

mod apply;
mod error;

pub use apply::{BinaryApply, MonadicApply, TernaryApply};
pub use error::MtbddError;

use crate::assignment::{VarAssignment, VarValue};
use crate::leaves::LeafValue;
use hashbrown::{HashMap, HashSet};
use std::fmt::Write as _;
use tracing::debug;

/// Handle to one reference of an MTBDD node.
///
/// Distinct roots may point at the same node. A root is only meaningful
/// together with the manager that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Root(u32);

type NodeId = usize;

/// Terminals sort after every proper variable level.
const TERMINAL_LEVEL: u32 = u32::MAX;

/// The apply caches are drained when they outgrow this many entries.
const CACHE_FLUSH_LIMIT: usize = 1 << 16;

enum NodeKind<L> {
    Terminal(L),
    Internal { var: u16, low: NodeId, high: NodeId },
}

struct Node<L> {
    kind: NodeKind<L>,
    refs: u32,
}

/// Shared MTBDD engine: node store, unique table, leaf interning, apply
/// caches and root table.
///
/// Generic over the leaf type; see [`crate::leaves`] for the leaf values
/// the automata use.
pub struct MtbddManager<L: LeafValue> {
    nodes: Vec<Option<Node<L>>>,
    free: Vec<NodeId>,
    /// Unique table: `(var, low, high)` -> node, the hash-consing map.
    unique: HashMap<(u16, NodeId, NodeId), NodeId>,
    /// Interning table: leaf value -> terminal node.
    terminals: HashMap<L, NodeId>,
    /// Live root handles.
    roots: HashMap<u32, NodeId>,
    next_root: u32,
    /// Variable order: position -> level; Apply splits on the least level.
    order: Vec<u16>,
    num_vars: u16,
    background_node: NodeId,
    bottom_root: Root,
    cache1: HashMap<(NodeId, u64), NodeId>,
    cache2: HashMap<(NodeId, NodeId, u64), NodeId>,
    cache3: HashMap<(NodeId, NodeId, NodeId, u64), NodeId>,
    next_op: u64,
}

impl<L: LeafValue> MtbddManager<L> {
    /// Create a manager over `num_vars` Boolean variables with the given
    /// background (bottom) value.
    pub fn new(num_vars: u16, background: L) -> Self {
        let mut manager = MtbddManager {
            nodes: Vec::new(),
            free: Vec::new(),
            unique: HashMap::new(),
            terminals: HashMap::new(),
            roots: HashMap::new(),
            next_root: 0,
            order: (0..num_vars).collect(),
            num_vars,
            background_node: 0,
            bottom_root: Root(0),
            cache1: HashMap::new(),
            cache2: HashMap::new(),
            cache3: HashMap::new(),
            next_op: 0,
        };
        manager.background_node = manager.intern_terminal(background);
        manager.bottom_root = manager.alloc_root(manager.background_node);
        manager
    }

    /// Number of Boolean variables.
    pub fn num_vars(&self) -> u16 {
        self.num_vars
    }

    /// The background value.
    pub fn background(&self) -> &L {
        self.terminal_value(self.background_node)
    }

    /// Replace the background value.
    ///
    /// Diagrams built earlier keep the previous background in the positions
    /// it already occupies; only call this before building diagrams.
    pub fn set_background(&mut self, value: L) {
        let node = self.intern_terminal(value);
        let old = self.roots[&self.bottom_root.0];
        self.roots.insert(self.bottom_root.0, node);
        self.background_node = node;
        self.dec_ref(old);
    }

    /// The root designating the background leaf; the canonical "absent"
    /// diagram. Shared; never release it.
    pub fn bottom_root(&self) -> Root {
        self.bottom_root
    }

    /// A fresh root at the background leaf.
    pub fn new_root(&mut self) -> Root {
        self.inc_ref(self.background_node);
        self.alloc_root(self.background_node)
    }

    /// Intern `value` and return a fresh root at its terminal. Equal values
    /// yield the same node.
    pub fn make_leaf(&mut self, value: L) -> Root {
        let node = self.intern_terminal(value);
        self.alloc_root(node)
    }

    /// Take an additional reference to the diagram under `root`, returned
    /// as a new handle.
    pub fn clone_root(&mut self, root: Root) -> Root {
        let node = self.node_of(root);
        self.inc_ref(node);
        self.alloc_root(node)
    }

    /// Release the reference owned by `root`. Nodes whose count reaches
    /// zero are freed, recursively releasing their children.
    ///
    /// # Panics
    ///
    /// Panics when `root` was already released or belongs to a different
    /// manager.
    pub fn release_root(&mut self, root: Root) {
        let node = self
            .roots
            .remove(&root.0)
            .expect("release of an unmanaged root handle");
        self.dec_ref(node);
    }

    /// `true` when both roots denote the same diagram. Canonicity makes
    /// this a pointer comparison.
    pub fn same_diagram(&self, lhs: Root, rhs: Root) -> bool {
        self.node_of(lhs) == self.node_of(rhs)
    }

    /// Install a variable order before any diagram is built.
    ///
    /// `order[i]` is the level of variable `i`; lower levels are tested
    /// closer to the root.
    pub fn set_variable_order(&mut self, order: Vec<u16>) {
        assert_eq!(order.len(), self.num_vars as usize, "order width mismatch");
        let mut seen = vec![false; order.len()];
        for &level in &order {
            assert!(
                (level as usize) < order.len() && !seen[level as usize],
                "variable order is not a permutation"
            );
            seen[level as usize] = true;
        }
        assert!(
            self.unique.is_empty(),
            "variable order must be installed before diagrams are built"
        );
        self.order = order;
    }

    /// The current variable order.
    pub fn variable_order(&self) -> &[u16] {
        &self.order
    }

    // ------------------------------------------------------------------
    // Apply traversals
    // ------------------------------------------------------------------

    /// Binary Apply: combine two diagrams leaf-wise through `op`.
    pub fn apply2<O: BinaryApply<L>>(
        &mut self,
        lhs: Root,
        rhs: Root,
        op: &mut O,
    ) -> Result<Root, MtbddError> {
        self.maybe_flush_caches();
        let op_id = self.fresh_op_id();
        let (a, b) = (self.node_of(lhs), self.node_of(rhs));
        debug!(lhs = a, rhs = b, "apply2");
        let result = self.apply2_node(a, b, op, op_id)?;
        Ok(self.alloc_root(result))
    }

    /// Ternary Apply: combine three diagrams leaf-wise through `op`.
    pub fn apply3<O: TernaryApply<L>>(
        &mut self,
        first: Root,
        second: Root,
        third: Root,
        op: &mut O,
    ) -> Result<Root, MtbddError> {
        self.maybe_flush_caches();
        let op_id = self.fresh_op_id();
        let (a, b, c) = (
            self.node_of(first),
            self.node_of(second),
            self.node_of(third),
        );
        debug!(first = a, second = b, third = c, "apply3");
        let result = self.apply3_node(a, b, c, op, op_id)?;
        Ok(self.alloc_root(result))
    }

    /// Monadic Apply: transform one diagram leaf-wise through `op`.
    pub fn apply1<O: MonadicApply<L>>(
        &mut self,
        root: Root,
        op: &mut O,
    ) -> Result<Root, MtbddError> {
        self.maybe_flush_caches();
        let op_id = self.fresh_op_id();
        let a = self.node_of(root);
        debug!(operand = a, "apply1");
        let result = self.apply1_node(a, op, op_id)?;
        Ok(self.alloc_root(result))
    }

    /// Drain the apply caches. Purely a memoisation reset; no observable
    /// result changes.
    pub fn flush_apply_cache(&mut self) {
        self.cache1.clear();
        self.cache2.clear();
        self.cache3.clear();
    }

    fn apply2_node<O: BinaryApply<L>>(
        &mut self,
        a: NodeId,
        b: NodeId,
        op: &mut O,
        op_id: u64,
    ) -> Result<NodeId, MtbddError> {
        if let Some(&hit) = self.cache2.get(&(a, b, op_id)) {
            self.inc_ref(hit);
            return Ok(hit);
        }

        let result = if self.is_terminal(a) && self.is_terminal(b) {
            let lhs = self.terminal_value(a).clone();
            let rhs = self.terminal_value(b).clone();
            let combined = op.combine(&lhs, &rhs)?;
            self.intern_terminal(combined)
        } else {
            let var = self.split_variable(&[a, b]);
            let (a0, a1) = self.cofactors(a, var);
            let (b0, b1) = self.cofactors(b, var);
            let low = self.apply2_node(a0, b0, op, op_id)?;
            let high = match self.apply2_node(a1, b1, op, op_id) {
                Ok(high) => high,
                Err(err) => {
                    self.dec_ref(low);
                    return Err(err);
                }
            };
            self.make_node(var, low, high)
        };

        self.cache2.insert((a, b, op_id), result);
        Ok(result)
    }

    fn apply3_node<O: TernaryApply<L>>(
        &mut self,
        a: NodeId,
        b: NodeId,
        c: NodeId,
        op: &mut O,
        op_id: u64,
    ) -> Result<NodeId, MtbddError> {
        if let Some(&hit) = self.cache3.get(&(a, b, c, op_id)) {
            self.inc_ref(hit);
            return Ok(hit);
        }

        let result = if self.is_terminal(a) && self.is_terminal(b) && self.is_terminal(c) {
            let first = self.terminal_value(a).clone();
            let second = self.terminal_value(b).clone();
            let third = self.terminal_value(c).clone();
            let combined = op.combine(&first, &second, &third)?;
            self.intern_terminal(combined)
        } else {
            let var = self.split_variable(&[a, b, c]);
            let (a0, a1) = self.cofactors(a, var);
            let (b0, b1) = self.cofactors(b, var);
            let (c0, c1) = self.cofactors(c, var);
            let low = self.apply3_node(a0, b0, c0, op, op_id)?;
            let high = match self.apply3_node(a1, b1, c1, op, op_id) {
                Ok(high) => high,
                Err(err) => {
                    self.dec_ref(low);
                    return Err(err);
                }
            };
            self.make_node(var, low, high)
        };

        self.cache3.insert((a, b, c, op_id), result);
        Ok(result)
    }

    fn apply1_node<O: MonadicApply<L>>(
        &mut self,
        a: NodeId,
        op: &mut O,
        op_id: u64,
    ) -> Result<NodeId, MtbddError> {
        if let Some(&hit) = self.cache1.get(&(a, op_id)) {
            self.inc_ref(hit);
            return Ok(hit);
        }

        let result = match self.node(a).kind {
            NodeKind::Terminal(_) => {
                let value = self.terminal_value(a).clone();
                let transformed = op.transform(&value)?;
                self.intern_terminal(transformed)
            }
            NodeKind::Internal { var, low, high } => {
                let new_low = self.apply1_node(low, op, op_id)?;
                let new_high = match self.apply1_node(high, op, op_id) {
                    Ok(high) => high,
                    Err(err) => {
                        self.dec_ref(new_low);
                        return Err(err);
                    }
                };
                self.make_node(var, new_low, new_high)
            }
        };

        self.cache1.insert((a, op_id), result);
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Point access
    // ------------------------------------------------------------------

    /// Rebind `root` so that `asgn` (don't cares allowed) maps to `value`,
    /// preserving every other position.
    ///
    /// The handle keeps its identity; the previous diagram under it is
    /// released after the new one is fully built, so a failing functor
    /// leaves the input untouched.
    pub fn set_value(
        &mut self,
        root: Root,
        asgn: &VarAssignment,
        value: L,
    ) -> Result<(), MtbddError> {
        assert_eq!(
            asgn.len(),
            self.num_vars as usize,
            "assignment width differs from manager width"
        );
        assert!(
            root != self.bottom_root,
            "set_value on the shared bottom root"
        );
        debug!(root = root.0, assignment = %asgn, value = %value, "set_value");

        let cube = self.cube_node(asgn, value);
        let background = self.background().clone();
        let mut overwrite = |lhs: &L, rhs: &L| -> Result<L, MtbddError> {
            if *rhs == background {
                Ok(lhs.clone())
            } else {
                Ok(rhs.clone())
            }
        };
        let op_id = self.fresh_op_id();
        let current = self.node_of(root);
        let result = match self.apply2_node(current, cube, &mut overwrite, op_id) {
            Ok(result) => result,
            Err(err) => {
                self.dec_ref(cube);
                return Err(err);
            }
        };
        self.dec_ref(cube);
        self.roots.insert(root.0, result);
        self.dec_ref(current);
        Ok(())
    }

    /// The unique leaf along the path `asgn`.
    ///
    /// A don't care in `asgn` must reach the same leaf on both branches;
    /// otherwise the assignment is under-determined and
    /// [`MtbddError::MultipleValues`] is raised.
    pub fn get_value(&self, root: Root, asgn: &VarAssignment) -> Result<L, MtbddError> {
        assert_eq!(
            asgn.len(),
            self.num_vars as usize,
            "assignment width differs from manager width"
        );
        let leaf = self.value_node(self.node_of(root), asgn)?;
        Ok(self.terminal_value(leaf).clone())
    }

    fn value_node(&self, node: NodeId, asgn: &VarAssignment) -> Result<NodeId, MtbddError> {
        match self.node(node).kind {
            NodeKind::Terminal(_) => Ok(node),
            NodeKind::Internal { var, low, high } => match asgn.get(var as usize) {
                VarValue::Zero => self.value_node(low, asgn),
                VarValue::One => self.value_node(high, asgn),
                VarValue::DontCare => {
                    let on_low = self.value_node(low, asgn)?;
                    let on_high = self.value_node(high, asgn)?;
                    if on_low != on_high {
                        Err(MtbddError::MultipleValues {
                            assignment: asgn.to_string(),
                        })
                    } else {
                        Ok(on_low)
                    }
                }
            },
        }
    }

    /// Rename variable `from` to `to` in the diagram under `root`,
    /// returning a fresh root.
    ///
    /// Equivalence is preserved when `from` and `to` never occur on one
    /// path and `to` respects the order between `from`'s neighbours;
    /// violating that is a programming error caught by debug assertions.
    pub fn change_index(&mut self, root: Root, from: u16, to: u16) -> Root {
        let mut memo = HashMap::new();
        let node = self.rename_node(self.node_of(root), from, to, &mut memo);
        self.alloc_root(node)
    }

    fn rename_node(
        &mut self,
        node: NodeId,
        from: u16,
        to: u16,
        memo: &mut HashMap<NodeId, NodeId>,
    ) -> NodeId {
        if let Some(&hit) = memo.get(&node) {
            self.inc_ref(hit);
            return hit;
        }

        let result = match self.node(node).kind {
            NodeKind::Terminal(_) => {
                self.inc_ref(node);
                node
            }
            NodeKind::Internal { var, low, high } => {
                let new_low = self.rename_node(low, from, to, memo);
                let new_high = self.rename_node(high, from, to, memo);
                let new_var = if var == from { to } else { var };
                self.make_node(new_var, new_low, new_high)
            }
        };

        memo.insert(node, result);
        result
    }

    // ------------------------------------------------------------------
    // Enumeration and diagnostics
    // ------------------------------------------------------------------

    /// Enumerate the reduced paths of the diagram: one `(cube, leaf)` pair
    /// per path from the root to a non-background terminal. Variables the
    /// path does not test stay don't care.
    ///
    /// The enumeration is deterministic: low branches before high branches.
    pub fn paths(&self, root: Root) -> Vec<(VarAssignment, L)> {
        let mut out = Vec::new();
        let mut carrier = VarAssignment::dont_care(self.num_vars as usize);
        self.collect_paths(self.node_of(root), &mut carrier, &mut out);
        out
    }

    fn collect_paths(
        &self,
        node: NodeId,
        carrier: &mut VarAssignment,
        out: &mut Vec<(VarAssignment, L)>,
    ) {
        match self.node(node).kind {
            NodeKind::Terminal(ref value) => {
                if node != self.background_node {
                    out.push((*carrier, value.clone()));
                }
            }
            NodeKind::Internal { var, low, high } => {
                carrier.set(var as usize, VarValue::Zero);
                self.collect_paths(low, carrier, out);
                carrier.set(var as usize, VarValue::One);
                self.collect_paths(high, carrier, out);
                carrier.set(var as usize, VarValue::DontCare);
            }
        }
    }

    /// Number of nodes (terminals included) reachable from `root`.
    pub fn size(&self, root: Root) -> usize {
        let mut seen = HashSet::new();
        let mut stack = vec![self.node_of(root)];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            if let NodeKind::Internal { low, high, .. } = self.node(node).kind {
                stack.push(low);
                stack.push(high);
            }
        }
        seen.len()
    }

    /// Render the diagrams under `roots` as a Graphviz digraph. Low edges
    /// are dashed, high edges solid.
    pub fn dump_dot(&self, roots: &[(Root, &str)]) -> String {
        let mut dot = String::from("digraph mtbdd {\n");
        let mut seen = HashSet::new();
        let mut stack = Vec::new();

        for (root, label) in roots {
            let node = self.node_of(*root);
            let _ = writeln!(dot, "  \"root_{}\" [shape=box, label=\"{}\"];", root.0, label);
            let _ = writeln!(dot, "  \"root_{}\" -> \"n{}\";", root.0, node);
            stack.push(node);
        }

        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            match self.node(node).kind {
                NodeKind::Terminal(ref value) => {
                    let _ = writeln!(dot, "  \"n{}\" [shape=ellipse, label=\"{}\"];", node, value);
                }
                NodeKind::Internal { var, low, high } => {
                    let _ = writeln!(dot, "  \"n{}\" [shape=circle, label=\"x{}\"];", node, var);
                    let _ = writeln!(dot, "  \"n{}\" -> \"n{}\" [style=dashed];", node, low);
                    let _ = writeln!(dot, "  \"n{}\" -> \"n{}\";", node, high);
                    stack.push(low);
                    stack.push(high);
                }
            }
        }

        dot.push_str("}\n");
        dot
    }

    /// Number of live nodes in the store.
    pub fn live_node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of live root handles.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Verify that every live node's reference count equals the number of
    /// references actually held by live roots and parent nodes.
    pub fn ref_invariant_holds(&self) -> bool {
        let mut counted: HashMap<NodeId, u32> = HashMap::new();
        for slot in self.nodes.iter().flatten() {
            if let NodeKind::Internal { low, high, .. } = slot.kind {
                *counted.entry(low).or_insert(0) += 1;
                *counted.entry(high).or_insert(0) += 1;
            }
        }
        for &node in self.roots.values() {
            *counted.entry(node).or_insert(0) += 1;
        }
        self.nodes.iter().enumerate().all(|(id, slot)| match slot {
            Some(node) => counted.get(&id).copied().unwrap_or(0) == node.refs,
            None => true,
        })
    }

    // ------------------------------------------------------------------
    // Node store
    // ------------------------------------------------------------------

    fn node(&self, id: NodeId) -> &Node<L> {
        self.nodes[id]
            .as_ref()
            .expect("access to a freed MTBDD node")
    }

    fn node_of(&self, root: Root) -> NodeId {
        *self
            .roots
            .get(&root.0)
            .expect("use of an unmanaged root handle")
    }

    fn alloc_root(&mut self, node: NodeId) -> Root {
        let id = self.next_root;
        self.next_root += 1;
        self.roots.insert(id, node);
        Root(id)
    }

    fn is_terminal(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Terminal(_))
    }

    fn terminal_value(&self, id: NodeId) -> &L {
        match self.node(id).kind {
            NodeKind::Terminal(ref value) => value,
            NodeKind::Internal { .. } => panic!("terminal access to an internal node"),
        }
    }

    fn level(&self, var: u16) -> u32 {
        self.order[var as usize] as u32
    }

    fn node_level(&self, id: NodeId) -> u32 {
        match self.node(id).kind {
            NodeKind::Terminal(_) => TERMINAL_LEVEL,
            NodeKind::Internal { var, .. } => self.level(var),
        }
    }

    /// The variable with the least level among the internal operands.
    fn split_variable(&self, operands: &[NodeId]) -> u16 {
        operands
            .iter()
            .filter_map(|&id| match self.node(id).kind {
                NodeKind::Internal { var, .. } => Some(var),
                NodeKind::Terminal(_) => None,
            })
            .min_by_key(|&var| self.level(var))
            .expect("split on terminal-only operands")
    }

    /// The `var`-cofactors of a node; nodes not testing `var` cofactor to
    /// themselves.
    fn cofactors(&self, id: NodeId, split: u16) -> (NodeId, NodeId) {
        match self.node(id).kind {
            NodeKind::Internal { var, low, high } if var == split => (low, high),
            _ => (id, id),
        }
    }

    fn intern_terminal(&mut self, value: L) -> NodeId {
        if let Some(&existing) = self.terminals.get(&value) {
            self.inc_ref(existing);
            return existing;
        }
        let id = self.alloc_node(Node {
            kind: NodeKind::Terminal(value.clone()),
            refs: 1,
        });
        self.terminals.insert(value, id);
        id
    }

    /// Hash-consed internal node constructor. Consumes one reference on
    /// each child and transfers one reference on the result.
    fn make_node(&mut self, var: u16, low: NodeId, high: NodeId) -> NodeId {
        if low == high {
            // Redundant test: both transferred references denote the same
            // node, hand one back and keep the other for the caller.
            self.dec_ref(high);
            return low;
        }

        debug_assert!(self.node_level(low) > self.level(var));
        debug_assert!(self.node_level(high) > self.level(var));

        if let Some(&existing) = self.unique.get(&(var, low, high)) {
            self.dec_ref(low);
            self.dec_ref(high);
            self.inc_ref(existing);
            return existing;
        }

        let id = self.alloc_node(Node {
            kind: NodeKind::Internal { var, low, high },
            refs: 1,
        });
        self.unique.insert((var, low, high), id);
        id
    }

    fn alloc_node(&mut self, node: Node<L>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn inc_ref(&mut self, id: NodeId) {
        let node = self.nodes[id]
            .as_mut()
            .expect("reference to a freed MTBDD node");
        node.refs += 1;
    }

    fn dec_ref(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.nodes[current]
                .as_mut()
                .expect("release of a freed MTBDD node");
            assert!(node.refs > 0, "release of an unreferenced MTBDD node");
            node.refs -= 1;
            if node.refs > 0 {
                continue;
            }
            let dead = self.nodes[current].take().expect("node vanished");
            match dead.kind {
                NodeKind::Terminal(value) => {
                    self.terminals.remove(&value);
                }
                NodeKind::Internal { var, low, high } => {
                    self.unique.remove(&(var, low, high));
                    stack.push(low);
                    stack.push(high);
                }
            }
            self.free.push(current);
        }
    }

    /// Build the cube diagram of `asgn`: `value` along the cube, background
    /// everywhere else. Transfers one reference on the result.
    fn cube_node(&mut self, asgn: &VarAssignment, value: L) -> NodeId {
        let mut current = self.intern_terminal(value);

        // Deepest level first, so every constructed node precedes its child
        // in the variable order.
        let mut positions: Vec<usize> = (0..asgn.len())
            .filter(|&i| asgn.get(i) != VarValue::DontCare)
            .collect();
        positions.sort_by_key(|&i| std::cmp::Reverse(self.level(i as u16)));

        for i in positions {
            self.inc_ref(self.background_node);
            let background = self.background_node;
            current = match asgn.get(i) {
                VarValue::One => self.make_node(i as u16, background, current),
                VarValue::Zero => self.make_node(i as u16, current, background),
                VarValue::DontCare => unreachable!(),
            };
        }
        current
    }

    fn fresh_op_id(&mut self) -> u64 {
        let id = self.next_op;
        self.next_op += 1;
        id
    }

    fn maybe_flush_caches(&mut self) {
        if self.cache1.len() + self.cache2.len() + self.cache3.len() > CACHE_FLUSH_LIMIT {
            self.flush_apply_cache();
        }
    }
}
