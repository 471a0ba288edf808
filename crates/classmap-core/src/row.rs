//! A single result row returned by the connection collaborator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One forward-only cursor row: ordered columns plus a name index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from column/value pairs.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.push(column, value);
        }
        row
    }

    /// Append a column. A repeated column name keeps the first value for
    /// name lookups but remains addressable by position.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        self.index.entry(column.clone()).or_insert(self.columns.len());
        self.columns.push(column);
        self.values.push(value);
    }

    /// Value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.index.get(column).map(|&i| &self.values[i])
    }

    /// Value by position.
    #[must_use]
    pub fn get_at(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    /// Ordered column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Ordered values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
