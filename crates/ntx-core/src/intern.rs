//! Interned security symbols.
//!
//! A [`Symbol`] is a ticker such as `NABIL` or `API`. Symbols are compared,
//! hashed and cloned constantly during replay, so each distinct ticker is
//! stored once behind an `Arc<str>` and normalized to upper case on
//! creation.
//!
//! # Example
//!
//! ```
//! use ntx_core::intern::SymbolInterner;
//!
//! let mut interner = SymbolInterner::new();
//!
//! let s1 = interner.intern("nabil");
//! let s2 = interner.intern(" NABIL ");
//! let s3 = interner.intern("API");
//!
//! assert_eq!(s1, "NABIL");
//! assert!(s1.ptr_eq(&s2));
//! assert!(!s1.ptr_eq(&s3));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An upper-cased, interned ticker symbol.
#[derive(Debug, Clone, Eq)]
pub struct Symbol(Arc<str>);

fn normalize(s: &str) -> String {
    s.trim().to_ascii_uppercase()
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Symbol {
    /// Create a symbol without an interner.
    ///
    /// Prefer [`SymbolInterner::intern`] when many copies are expected.
    pub fn new(s: &str) -> Self {
        Self(normalize(s).into())
    }

    /// Get the ticker text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the symbol is blank.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if two symbols share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: pointer comparison
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.0 == other.0
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Deduplicates symbols so that equal tickers share one allocation.
#[derive(Debug, Default)]
pub struct SymbolInterner {
    symbols: HashSet<Arc<str>>,
}

impl SymbolInterner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a ticker, normalizing it to upper case.
    pub fn intern(&mut self, s: &str) -> Symbol {
        let normalized = normalize(s);
        if let Some(existing) = self.symbols.get(normalized.as_str()) {
            Symbol(existing.clone())
        } else {
            let arc: Arc<str> = normalized.into();
            self.symbols.insert(arc.clone());
            Symbol(arc)
        }
    }

    /// Re-intern an existing symbol, returning the shared copy.
    pub fn canonical(&mut self, symbol: &Symbol) -> Symbol {
        if let Some(existing) = self.symbols.get(symbol.as_str()) {
            Symbol(existing.clone())
        } else {
            self.symbols.insert(symbol.0.clone());
            symbol.clone()
        }
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalized() {
        let s = Symbol::new("  nica ");
        assert_eq!(s, "NICA");
        assert_eq!(s.to_string(), "NICA");
    }

    #[test]
    fn test_interner_shares_ticker_storage() {
        let mut interner = SymbolInterner::new();

        let s1 = interner.intern("NABIL");
        let s2 = interner.intern("nabil");
        let s3 = interner.intern("API");

        assert!(s1.ptr_eq(&s2));
        assert!(!s1.ptr_eq(&s3));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_canonical_shares_allocation() {
        let mut interner = SymbolInterner::new();
        let first = interner.intern("HIDCL");
        let outside = Symbol::new("HIDCL");

        let canonical = interner.canonical(&outside);
        assert!(canonical.ptr_eq(&first));
    }

    #[test]
    fn test_symbol_serde_normalizes() {
        let s: Symbol = serde_json::from_str("\"upper\"").unwrap();
        assert_eq!(s, "UPPER");
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"UPPER\"");
    }

    #[test]
    fn test_symbol_hash_lookup_by_str() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Symbol::new("ADBL"), 1);
        assert_eq!(map.get("ADBL"), Some(&1));
    }
}
