//! Error type of the MTBDD engine

use std::fmt;

/// Errors surfaced by MTBDD operations
///
/// Misuse of the engine (releasing a foreign or already released root,
/// mixing assignment widths) is a programming error and panics instead;
/// running out of memory aborts the process. Everything else is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MtbddError {
    /// `get_value` was asked for the value along an under-determined path:
    /// a don't-care position leads to two distinct leaves.
    MultipleValues {
        /// Text form of the offending assignment.
        assignment: String,
    },
    /// A user-supplied Apply functor failed; intermediate diagram nodes
    /// have been released.
    Functor {
        /// The functor's error message.
        message: String,
    },
}

impl MtbddError {
    /// Convenience constructor for functor failures.
    pub fn functor(message: impl Into<String>) -> Self {
        MtbddError::Functor {
            message: message.into(),
        }
    }
}

impl fmt::Display for MtbddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MtbddError::MultipleValues { assignment } => write!(
                f,
                "assignment {} is under-determined: distinct leaves on both branches of a don't care",
                assignment
            ),
            MtbddError::Functor { message } => {
                write!(f, "apply functor failed: {}", message)
            }
        }
    }
}

impl std::error::Error for MtbddError {}
