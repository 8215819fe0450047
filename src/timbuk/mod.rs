//! Named automata and the Timbuk textual format
//!
//! The core automata work on integer states and bit-encoded symbols. This
//! module provides [`NamedAutomaton`], a facade with human-readable state
//! and symbol names, and reading/writing of the Timbuk textual format:
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
//! Automata that are meant to be combined must share both a
//! [`Context`](crate::Context) and a [`SymbolDictionary`]: the dictionary
//! assigns each name its bit encoding, so equal names only mean equal
//! symbols within one dictionary.
//!
//! # Example
//!
//! ```
//! use symta::{Context, NamedAutomaton, SymbolDictionary};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::new(8);
//! let dict = SymbolDictionary::new(8);
//!
//! let input = "\
//! Ops a:0 g:1
//! Automaton one
//! States q0 q1
//! Final States q1
//! Transitions
//! a -> q0
//! g(q0) -> q1
//! ";
//! let aut = NamedAutomaton::from_timbuk_string(&ctx, &dict, input)?;
//! assert_eq!(aut.state_names().len(), 2);
//!
//! // The writer emits the same grammar; a reparse prints identically.
//! let printed = aut.to_timbuk_string();
//! let reparsed = NamedAutomaton::from_timbuk_string(&ctx, &dict, &printed)?;
//! assert_eq!(printed, reparsed.to_timbuk_string());
//! # Ok(())
//! # }
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BuildError, ParseError};

use crate::automaton::{
    check_inclusion, downward_simulation, intersection, union, AutomatonError, BuTreeAutomaton,
    Context, SimulationRelation,
};
use crate::leaves::State;
use crate::names::SymbolDictionary;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A bottom-up tree automaton with named states and symbols
///
/// Wraps a [`BuTreeAutomaton`] together with the state-name maps and the
/// shared [`SymbolDictionary`]. States synthesized by operations (product
/// states of an intersection, for example) have no given name and print as
/// `q<id>`.
pub struct NamedAutomaton {
    name: String,
    ctx: Context,
    symbols: SymbolDictionary,
    aut: BuTreeAutomaton,
    states_by_name: BTreeMap<Arc<str>, State>,
    labels: BTreeMap<State, Arc<str>>,
}

impl std::fmt::Debug for NamedAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedAutomaton")
            .field("name", &self.name)
            .field("aut", &self.aut)
            .field("states_by_name", &self.states_by_name)
            .finish_non_exhaustive()
    }
}

impl NamedAutomaton {
    /// Create an empty named automaton.
    ///
    /// The dictionary width must match the context's symbol width.
    pub fn new(ctx: &Context, symbols: &SymbolDictionary, name: &str) -> Self {
        assert_eq!(
            ctx.symbol_bits(),
            symbols.symbol_bits(),
            "dictionary width differs from context width"
        );
        NamedAutomaton {
            name: name.to_string(),
            ctx: ctx.clone(),
            symbols: symbols.clone(),
            aut: BuTreeAutomaton::new(ctx),
            states_by_name: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    /// The automaton's name, as printed after `Automaton`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying integer-state automaton.
    pub fn automaton(&self) -> &BuTreeAutomaton {
        &self.aut
    }

    /// The shared symbol dictionary.
    pub fn symbols(&self) -> &SymbolDictionary {
        &self.symbols
    }

    /// The automaton's context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The name-to-state bindings, sorted by name.
    pub fn state_names(&self) -> &BTreeMap<Arc<str>, State> {
        &self.states_by_name
    }

    /// Declare a symbol with its arity (the `Ops` section).
    pub fn add_symbol(&self, name: &str, arity: usize) -> Result<(), BuildError> {
        self.symbols.intern(name, arity)?;
        Ok(())
    }

    /// Add a fresh state under `name`.
    pub fn add_state(&mut self, name: &str) -> Result<State, BuildError> {
        let key: Arc<str> = Arc::from(name);
        if self.states_by_name.contains_key(&key) {
            return Err(BuildError::DuplicateState(name.to_string()));
        }
        let state = self.aut.add_state();
        self.states_by_name.insert(Arc::clone(&key), state);
        self.labels.insert(state, key);
        Ok(state)
    }

    /// Mark the state bound to `name` as final.
    pub fn set_state_final(&mut self, name: &str) -> Result<(), BuildError> {
        let state = self.state_named(name)?;
        self.aut.set_final(state)?;
        Ok(())
    }

    /// Add the rule `symbol(lhs) -> rhs`, all by name.
    ///
    /// The symbol is interned on first use with the arity implied by the
    /// left-hand side; a conflicting arity is rejected.
    pub fn add_transition(
        &mut self,
        lhs: &[&str],
        symbol: &str,
        rhs: &str,
    ) -> Result<(), BuildError> {
        let encoding = self.symbols.intern(symbol, lhs.len())?;
        let lhs_states = lhs
            .iter()
            .map(|name| self.state_named(name))
            .collect::<Result<Vec<State>, BuildError>>()?;
        let rhs_state = self.state_named(rhs)?;
        self.aut
            .add_transition(&lhs_states, &encoding, &[rhs_state])?;
        Ok(())
    }

    /// The state bound to `name`.
    pub fn state_named(&self, name: &str) -> Result<State, BuildError> {
        let key: Arc<str> = Arc::from(name);
        self.states_by_name
            .get(&key)
            .copied()
            .ok_or_else(|| BuildError::UnknownStateName(name.to_string()))
    }

    /// The printable label of `state`: its given name, or `q<id>` for
    /// synthesized states.
    pub fn label_of(&self, state: State) -> String {
        match self.labels.get(&state) {
            Some(label) => label.to_string(),
            None => format!("q{}", state),
        }
    }

    /// Language union, lifting [`union`] to named automata.
    ///
    /// Requires a shared context and dictionary; clashing state names from
    /// the right operand are suffixed with their id.
    pub fn union(&self, other: &NamedAutomaton) -> Result<NamedAutomaton, AutomatonError> {
        if !self.symbols.same_dictionary(&other.symbols) {
            return Err(AutomatonError::ContextMismatch);
        }
        let aut = union(&self.aut, &other.aut)?;
        let mut result = NamedAutomaton {
            name: format!("{}+{}", self.name, other.name),
            ctx: self.ctx.clone(),
            symbols: self.symbols.clone(),
            aut,
            states_by_name: self.states_by_name.clone(),
            labels: self.labels.clone(),
        };
        for (name, &state) in &other.states_by_name {
            result.adopt_label(name, state);
        }
        Ok(result)
    }

    /// Product intersection, lifting [`intersection`] to named automata.
    ///
    /// Product states are synthesized and print as `q<id>`.
    pub fn intersection(&self, other: &NamedAutomaton) -> Result<NamedAutomaton, AutomatonError> {
        if !self.symbols.same_dictionary(&other.symbols) {
            return Err(AutomatonError::ContextMismatch);
        }
        let aut = intersection(&self.aut, &other.aut)?;
        Ok(NamedAutomaton {
            name: format!("{}&{}", self.name, other.name),
            ctx: self.ctx.clone(),
            symbols: self.symbols.clone(),
            aut,
            states_by_name: BTreeMap::new(),
            labels: BTreeMap::new(),
        })
    }

    /// Maximal downward simulation of the underlying automaton.
    pub fn downward_simulation(&self) -> Result<SimulationRelation, AutomatonError> {
        downward_simulation(&self.aut)
    }

    /// Language inclusion `L(self) ⊆ L(other)`.
    pub fn inclusion_in(&self, other: &NamedAutomaton) -> Result<bool, AutomatonError> {
        if !self.symbols.same_dictionary(&other.symbols) {
            return Err(AutomatonError::ContextMismatch);
        }
        check_inclusion(&self.aut, &other.aut)
    }

    /// Bind `name` to `state`, suffixing with the id when taken.
    fn adopt_label(&mut self, name: &Arc<str>, state: State) {
        let key = if self.states_by_name.contains_key(name) {
            Arc::from(format!("{}_{}", name, state).as_str())
        } else {
            Arc::clone(name)
        };
        self.states_by_name.insert(Arc::clone(&key), state);
        self.labels.insert(state, key);
    }
}

#[cfg(test)]
mod tests;
