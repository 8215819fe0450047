//! Reading the Timbuk textual format
//!
//! The format is line oriented: section keywords (`Ops`, `Automaton`,
//! `States`, `Final States`, `Transitions`) followed by their payload,
//! then one transition per line. Blank lines, `#` comments and flexible
//! whitespace around the punctuation are tolerated.

use super::error::ParseError;
use super::NamedAutomaton;
use crate::automaton::Context;
use crate::names::SymbolDictionary;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

impl NamedAutomaton {
    /// Parse a Timbuk automaton from any buffered reader.
    ///
    /// New symbols are interned into `symbols`, so automata parsed through
    /// one dictionary agree on their encodings.
    pub fn from_timbuk_reader<R: BufRead>(
        ctx: &Context,
        symbols: &SymbolDictionary,
        reader: R,
    ) -> Result<Self, ParseError> {
        let mut automaton = NamedAutomaton::new(ctx, symbols, "aut");
        let mut reading_transitions = false;

        for (index, line) in reader.lines().enumerate() {
            let number = index + 1;
            let line = line?;
            let line = match line.find('#') {
                Some(position) => &line[..position],
                None => &line[..],
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();

            if reading_transitions {
                parse_transition(&mut automaton, line, number)?;
            } else if tokens[0] == "Ops" {
                for token in &tokens[1..] {
                    let (name, arity) = split_arity(token, number)?;
                    let arity = arity.ok_or_else(|| {
                        ParseError::syntax(number, format!("missing arity in '{}'", token))
                    })?;
                    automaton
                        .add_symbol(name, arity)
                        .map_err(|err| ParseError::build(number, err))?;
                }
            } else if tokens[0] == "Automaton" {
                if let Some(name) = tokens.get(1) {
                    automaton.name = (*name).to_string();
                }
            } else if tokens.len() >= 2 && tokens[0] == "Final" && tokens[1] == "States" {
                for name in &tokens[2..] {
                    automaton
                        .set_state_final(name)
                        .map_err(|err| ParseError::build(number, err))?;
                }
            } else if tokens[0] == "States" {
                for token in &tokens[1..] {
                    let (name, _) = split_arity(token, number)?;
                    automaton
                        .add_state(name)
                        .map_err(|err| ParseError::build(number, err))?;
                }
            } else if tokens[0] == "Transitions" {
                reading_transitions = true;
            } else {
                return Err(ParseError::syntax(
                    number,
                    format!("unrecognised section '{}'", tokens[0]),
                ));
            }
        }

        Ok(automaton)
    }

    /// Parse a Timbuk automaton from a string.
    pub fn from_timbuk_string(
        ctx: &Context,
        symbols: &SymbolDictionary,
        input: &str,
    ) -> Result<Self, ParseError> {
        Self::from_timbuk_reader(ctx, symbols, Cursor::new(input.as_bytes()))
    }

    /// Load a Timbuk automaton from a file.
    pub fn from_timbuk_file<P: AsRef<Path>>(
        ctx: &Context,
        symbols: &SymbolDictionary,
        path: P,
    ) -> Result<Self, ParseError> {
        let file = File::open(path)?;
        Self::from_timbuk_reader(ctx, symbols, BufReader::new(file))
    }
}

/// Split a `name:arity` token; the arity part is optional.
fn split_arity(token: &str, line: usize) -> Result<(&str, Option<usize>), ParseError> {
    match token.split_once(':') {
        None => Ok((token, None)),
        Some((name, arity)) => {
            let arity = arity.parse().map_err(|_| {
                ParseError::syntax(line, format!("invalid arity in '{}'", token))
            })?;
            Ok((name, Some(arity)))
        }
    }
}

/// Parse one `symbol(state, ..., state) -> state` line.
fn parse_transition(
    automaton: &mut NamedAutomaton,
    line: &str,
    number: usize,
) -> Result<(), ParseError> {
    let (lhs_part, rhs_part) = line
        .split_once("->")
        .ok_or_else(|| ParseError::syntax(number, "expected '->' in transition"))?;
    let rhs = rhs_part.trim();
    if rhs.is_empty() || rhs.contains(char::is_whitespace) {
        return Err(ParseError::syntax(
            number,
            "expected a single state after '->'",
        ));
    }

    let lhs_part = lhs_part.trim();
    let (symbol, children) = match lhs_part.split_once('(') {
        None => (lhs_part, Vec::new()),
        Some((symbol, rest)) => {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| ParseError::syntax(number, "missing ')' in transition"))?;
            let inner = inner.trim();
            let children = if inner.is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(str::trim).collect()
            };
            (symbol.trim(), children)
        }
    };
    if symbol.is_empty() {
        return Err(ParseError::syntax(number, "missing symbol in transition"));
    }
    if children.iter().any(|name| name.is_empty()) {
        return Err(ParseError::syntax(
            number,
            "empty state name in transition left-hand side",
        ));
    }

    automaton
        .add_transition(&children, symbol, rhs)
        .map_err(|err| ParseError::build(number, err))
}
