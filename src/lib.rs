//! # Symbolic Tree Automata
//!
//! This crate implements **nondeterministic finite tree automata** (NFTA) whose
//! transition relation is stored **symbolically** in a shared **multi-terminal
//! binary decision diagram** (MTBDD) over a Boolean-encoded ranked alphabet.
//!
//! ## Overview
//!
//! A bottom-up transition rule `f(q1, ..., qn) -> q` is stored by indexing an
//! MTBDD root with the left-hand-side state vector `(q1, ..., qn)`; the MTBDD
//! maps the Boolean encoding of `f` to the *ordered set* of right-hand-side
//! states. Rules over symbols with a shared encoding prefix share diagram
//! nodes, and automata registered against the same [`Context`] share leaves
//! and internal nodes through one interning table.
//!
//! On top of this representation the crate provides:
//!
//! - **Language union** and **product intersection** ([`union`],
//!   [`intersection`]),
//! - conversion between the bottom-up and top-down views of an automaton
//!   ([`BuTreeAutomaton::to_top_down`]),
//! - the **maximal downward simulation preorder**
//!   ([`downward_simulation`]), computed as a greatest fixpoint with
//!   counter MTBDDs,
//! - **antichain-based language inclusion** ([`check_inclusion`]),
//!   accelerated by simulation subsumption.
//!
//! ## Example
//!
//! ```
//! use symta::{Context, union, VarAssignment};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::new(4);
//!
//! // A accepts the single tree `a`, encoded as 0000.
//! let mut a = symta::BuTreeAutomaton::new(&ctx);
//! let q = a.add_state();
//! a.add_transition(&[], &"0000".parse::<VarAssignment>()?, &[q])?;
//! a.set_final(q)?;
//!
//! // B accepts the single tree `b`, encoded as 1111.
//! let mut b = symta::BuTreeAutomaton::new(&ctx);
//! let r = b.add_state();
//! b.add_transition(&[], &"1111".parse::<VarAssignment>()?, &[r])?;
//! b.set_final(r)?;
//!
//! // The union accepts both trees.
//! let u = union(&a, &b)?;
//! assert!(!u.get_transition(&[], &"0000".parse::<VarAssignment>()?)?.is_empty());
//! assert!(!u.get_transition(&[], &"1111".parse::<VarAssignment>()?)?.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Named automata and the Timbuk format
//!
//! The [`timbuk`] module provides [`NamedAutomaton`], a facade over the
//! integer-state core that maps human-readable state and symbol names to
//! internal indices, together with a reader and writer for the Timbuk
//! textual format:
//!
//! ```text
//! Ops a:0 f:2
//! Automaton example
//! States q0 q1
//! Final States q1
//! Transitions
//! a -> q0
//! f(q0, q0) -> q1
//! ```
//!
//! ## Sharing and lifetime
//!
//! The MTBDD engine is reference counted: every [`mtbdd::Root`] handle owns
//! exactly one reference to its node, automata own the roots stored in their
//! transition tables, and dropping an automaton releases them. The engine
//! frees a node as soon as its reference count reaches zero; the diagram is
//! acyclic by construction, so no tracing collector is involved.
//!
//! All operations are single-threaded and run to completion on the calling
//! thread. The `Arc<RwLock<...>>` sharing of the engine exists for ownership,
//! not parallelism.

// Public modules
pub mod assignment;
pub mod automaton;
pub mod leaves;
pub mod mtbdd;
pub mod names;
pub mod table;
pub mod timbuk;

// Re-export the high-level public API
pub use assignment::{VarAssignment, VarValue, MAX_VARIABLES};
pub use automaton::{
    check_inclusion, downward_simulation, intersection, union, AutomatonError, BuTreeAutomaton,
    Context, Rule, SimulationRelation, TdTreeAutomaton,
};
pub use leaves::{State, StateSet, TupleSet, SINK_STATE};
pub use mtbdd::{MtbddError, MtbddManager, Root};
pub use names::SymbolDictionary;
pub use timbuk::NamedAutomaton;
