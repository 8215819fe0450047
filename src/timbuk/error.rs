//! Error types of the Timbuk facade

use crate::automaton::AutomatonError;
use crate::names::NameError;
use std::fmt;
use std::io;

/// Errors raised while building a named automaton
#[derive(Debug)]
pub enum BuildError {
    /// `add_state` saw a name that is already bound.
    DuplicateState(String),
    /// A transition or final-state marker referenced an unknown state
    /// name.
    UnknownStateName(String),
    /// Symbol translation failed.
    Name(NameError),
    /// The underlying automaton rejected the operation.
    Automaton(AutomatonError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::DuplicateState(name) => {
                write!(f, "state '{}' was already added", name)
            }
            BuildError::UnknownStateName(name) => {
                write!(f, "unknown state '{}'", name)
            }
            BuildError::Name(err) => write!(f, "{}", err),
            BuildError::Automaton(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Name(err) => Some(err),
            BuildError::Automaton(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NameError> for BuildError {
    fn from(err: NameError) -> Self {
        BuildError::Name(err)
    }
}

impl From<AutomatonError> for BuildError {
    fn from(err: AutomatonError) -> Self {
        BuildError::Automaton(err)
    }
}

/// Errors raised while parsing the Timbuk textual format
#[derive(Debug)]
pub enum ParseError {
    /// Reading the input failed.
    Io(io::Error),
    /// A line did not match the grammar.
    Syntax {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// The line parsed but the declaration it carries was rejected.
    Build {
        /// 1-based line number.
        line: usize,
        /// The underlying rejection.
        source: BuildError,
    },
}

impl ParseError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn build(line: usize, source: impl Into<BuildError>) -> Self {
        ParseError::Build {
            line,
            source: source.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(err) => write!(f, "{}", err),
            ParseError::Syntax { line, message } => {
                write!(f, "line {}: {}", line, message)
            }
            ParseError::Build { line, source } => {
                write!(f, "line {}: {}", line, source)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(err) => Some(err),
            ParseError::Build { source, .. } => Some(source),
            ParseError::Syntax { .. } => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        ParseError::Io(err)
    }
}
