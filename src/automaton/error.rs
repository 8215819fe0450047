//! Error types of the automaton layer

use crate::leaves::State;
use crate::mtbdd::MtbddError;
use std::fmt;

/// Errors surfaced by automaton operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    /// A transition or final-state marker referenced a state that was
    /// never added to the automaton.
    UnknownState {
        /// The offending state id.
        state: State,
    },
    /// Two automata from different [`Context`](crate::Context)s were
    /// combined. Automata only share leaves and nodes within one context.
    ContextMismatch,
    /// An MTBDD engine error propagated through the operation.
    Mtbdd(MtbddError),
}

impl fmt::Display for AutomatonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomatonError::UnknownState { state } => {
                write!(f, "state {} was not added to the automaton", state)
            }
            AutomatonError::ContextMismatch => {
                write!(f, "cannot combine automata from different MTBDD contexts")
            }
            AutomatonError::Mtbdd(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AutomatonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AutomatonError::Mtbdd(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MtbddError> for AutomatonError {
    fn from(err: MtbddError) -> Self {
        AutomatonError::Mtbdd(err)
    }
}
