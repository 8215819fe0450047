//! Dictionaries between human-readable names and internal indices
//!
//! The core works on integer states and bit-encoded symbols; the
//! [`SymbolDictionary`] interns symbol names into consecutive indices whose
//! binary encoding becomes the diagram assignment, and translates indices
//! back for printing. The dictionary is shared: automata that are meant to
//! be combined must intern their symbols through the same dictionary, so
//! that equal names mean equal encodings.

use crate::assignment::VarAssignment;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Errors of the name translation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// A symbol index with no interned name was translated back.
    UnknownSymbol {
        /// The offending index.
        index: u64,
    },
    /// A symbol was re-declared with a different arity.
    ArityMismatch {
        /// The symbol name.
        name: String,
        /// The arity it was first declared with.
        declared: usize,
        /// The arity of the conflicting use.
        used: usize,
    },
    /// The dictionary is full: more symbols than the bit width can encode.
    AlphabetOverflow,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::UnknownSymbol { index } => {
                write!(f, "no symbol is interned under index {}", index)
            }
            NameError::ArityMismatch {
                name,
                declared,
                used,
            } => write!(
                f,
                "symbol '{}' declared with arity {} but used with arity {}",
                name, declared, used
            ),
            NameError::AlphabetOverflow => {
                write!(f, "too many symbols for the configured encoding width")
            }
        }
    }
}

impl std::error::Error for NameError {}

struct DictionaryInner {
    names: Vec<Arc<str>>,
    arities: Vec<usize>,
    index: BTreeMap<Arc<str>, usize>,
    symbol_bits: u16,
}

/// Shared bidirectional symbol dictionary
///
/// Cloning yields a handle to the same dictionary
/// ([`SymbolDictionary::same_dictionary`] compares handles). Interning is
/// monotonic: a name keeps its index and arity forever.
///
/// # Examples
///
/// ```
/// use symta::SymbolDictionary;
///
/// let dict = SymbolDictionary::new(4);
/// let a = dict.intern("a", 0).unwrap();
/// let f = dict.intern("f", 2).unwrap();
/// assert_eq!(a.to_string(), "0000");
/// assert_eq!(f.to_string(), "1000");
/// assert_eq!(dict.intern("a", 0).unwrap(), a);
/// assert_eq!(dict.name_of(1).unwrap().as_ref(), "f");
/// ```
#[derive(Clone)]
pub struct SymbolDictionary {
    inner: Arc<RwLock<DictionaryInner>>,
}

impl SymbolDictionary {
    /// Create a dictionary encoding symbols over `symbol_bits` variables.
    pub fn new(symbol_bits: u16) -> Self {
        SymbolDictionary {
            inner: Arc::new(RwLock::new(DictionaryInner {
                names: Vec::new(),
                arities: Vec::new(),
                index: BTreeMap::new(),
                symbol_bits,
            })),
        }
    }

    /// Width of the symbol encoding.
    pub fn symbol_bits(&self) -> u16 {
        self.inner.read().unwrap().symbol_bits
    }

    /// `true` when both handles denote the same dictionary.
    pub fn same_dictionary(&self, other: &SymbolDictionary) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Intern `name` with `arity` and return its assignment encoding.
    ///
    /// Re-interning an existing name is a lookup; using a different arity
    /// is an error.
    pub fn intern(&self, name: &str, arity: usize) -> Result<VarAssignment, NameError> {
        let mut inner = self.inner.write().unwrap();
        let key: Arc<str> = Arc::from(name);
        if let Some(&index) = inner.index.get(&key) {
            if inner.arities[index] != arity {
                return Err(NameError::ArityMismatch {
                    name: name.to_string(),
                    declared: inner.arities[index],
                    used: arity,
                });
            }
            return Ok(VarAssignment::from_index(
                index as u64,
                inner.symbol_bits as usize,
            ));
        }

        let index = inner.names.len();
        if inner.symbol_bits < 64 && index as u64 >= 1u64 << inner.symbol_bits {
            return Err(NameError::AlphabetOverflow);
        }
        inner.names.push(Arc::clone(&key));
        inner.arities.push(arity);
        inner.index.insert(key, index);
        Ok(VarAssignment::from_index(
            index as u64,
            inner.symbol_bits as usize,
        ))
    }

    /// The encoding of an already interned name, if any.
    pub fn lookup(&self, name: &str) -> Option<(VarAssignment, usize)> {
        let inner = self.inner.read().unwrap();
        let key: Arc<str> = Arc::from(name);
        inner.index.get(&key).map(|&index| {
            (
                VarAssignment::from_index(index as u64, inner.symbol_bits as usize),
                inner.arities[index],
            )
        })
    }

    /// Translate an index back to its name.
    pub fn name_of(&self, index: u64) -> Result<Arc<str>, NameError> {
        let inner = self.inner.read().unwrap();
        inner
            .names
            .get(index as usize)
            .cloned()
            .ok_or(NameError::UnknownSymbol { index })
    }

    /// The arity of the symbol at `index`.
    pub fn arity_of(&self, index: u64) -> Result<usize, NameError> {
        let inner = self.inner.read().unwrap();
        inner
            .arities
            .get(index as usize)
            .copied()
            .ok_or(NameError::UnknownSymbol { index })
    }

    /// Number of interned symbols.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().names.len()
    }

    /// `true` when nothing is interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every interned `(name, arity)` in interning order.
    pub fn symbols(&self) -> Vec<(Arc<str>, usize)> {
        let inner = self.inner.read().unwrap();
        inner
            .names
            .iter()
            .cloned()
            .zip(inner.arities.iter().copied())
            .collect()
    }

    /// Expand a symbol cube into the names of every interned symbol it
    /// covers, in interning order.
    pub fn names_matching(&self, cube: &VarAssignment) -> Vec<Arc<str>> {
        let inner = self.inner.read().unwrap();
        inner
            .names
            .iter()
            .enumerate()
            .filter(|&(index, _)| cube.matches_index(index as u64))
            .map(|(_, name)| Arc::clone(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let dict = SymbolDictionary::new(4);
        let a = dict.intern("a", 0).unwrap();
        let b = dict.intern("b", 1).unwrap();
        assert_ne!(a, b);
        assert_eq!(dict.intern("a", 0).unwrap(), a);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn arity_conflicts_are_rejected() {
        let dict = SymbolDictionary::new(4);
        dict.intern("f", 2).unwrap();
        let err = dict.intern("f", 1).unwrap_err();
        assert_eq!(
            err,
            NameError::ArityMismatch {
                name: "f".to_string(),
                declared: 2,
                used: 1,
            }
        );
    }

    #[test]
    fn reverse_translation() {
        let dict = SymbolDictionary::new(4);
        dict.intern("a", 0).unwrap();
        dict.intern("g", 1).unwrap();
        assert_eq!(dict.name_of(0).unwrap().as_ref(), "a");
        assert_eq!(dict.name_of(1).unwrap().as_ref(), "g");
        assert_eq!(dict.arity_of(1).unwrap(), 1);
        assert_eq!(dict.name_of(7).unwrap_err(), NameError::UnknownSymbol { index: 7 });
    }

    #[test]
    fn overflow_is_reported() {
        let dict = SymbolDictionary::new(1);
        dict.intern("a", 0).unwrap();
        dict.intern("b", 0).unwrap();
        assert_eq!(dict.intern("c", 0).unwrap_err(), NameError::AlphabetOverflow);
    }

    #[test]
    fn cube_expansion_respects_interned_range() {
        let dict = SymbolDictionary::new(2);
        dict.intern("a", 0).unwrap(); // 00
        dict.intern("b", 0).unwrap(); // 10
        dict.intern("c", 0).unwrap(); // 01

        let cube: VarAssignment = "X0".parse().unwrap();
        let names: Vec<String> = dict
            .names_matching(&cube)
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, ["a", "b"]);
    }
}
