//! Lookup-list sources.
//!
//! A property may carry a lookup source mapping display strings to identity
//! values. The runtime uses it in both directions: resolving a display value
//! back to its identity on assignment, and rendering an identity for display.

use std::fmt::Debug;

use crate::value::Value;

/// An ordered collection of (display string, identity value) pairs.
pub trait LookupSource: Debug + Send + Sync {
    /// The ordered list of (display, identity) pairs.
    fn lookup_list(&self) -> Vec<(String, Value)>;

    /// Resolve a display string back to its identity value.
    fn resolve_display(&self, display: &str) -> Option<Value> {
        self.lookup_list()
            .into_iter()
            .find(|(d, _)| d == display)
            .map(|(_, v)| v)
    }

    /// Render an identity value as its display string.
    fn display_for(&self, value: &Value) -> Option<String> {
        self.lookup_list()
            .into_iter()
            .find(|(_, v)| v == value)
            .map(|(d, _)| d)
    }
}

/// A fixed, in-memory lookup list.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    pairs: Vec<(String, Value)>,
}

impl StaticLookup {
    /// Build a lookup from (display, identity) pairs, keeping order.
    #[must_use]
    pub fn new(pairs: Vec<(String, Value)>) -> Self {
        Self { pairs }
    }
}

impl LookupSource for StaticLookup {
    fn lookup_list(&self) -> Vec<(String, Value)> {
        self.pairs.clone()
    }
}
