//! Parameterized SQL statement accumulation.
//!
//! A [`SqlStatement`] is a mutable "statement text + parameter list"
//! accumulator. Parameter placeholders are produced by a
//! [`ParameterNameGenerator`] shared across an entire multi-statement batch
//! so names never collide between statements.

use std::fmt;

use crate::value::Value;

/// Monotonically-incrementing parameter-name source for one batch.
#[derive(Debug, Default, Clone)]
pub struct ParameterNameGenerator {
    next: u32,
}

impl ParameterNameGenerator {
    /// Create a generator starting at `p0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next unique parameter name.
    pub fn next_name(&mut self) -> String {
        let name = format!("p{}", self.next);
        self.next += 1;
        name
    }

    /// How many names have been handed out.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.next
    }
}

/// One named parameter bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    /// Placeholder name without the `:` prefix.
    pub name: String,
    /// Bound value.
    pub value: Value,
}

/// A single parameterized SQL statement under construction.
#[derive(Debug, Clone, Default)]
pub struct SqlStatement {
    text: String,
    parameters: Vec<SqlParameter>,
}

impl SqlStatement {
    /// Create an empty statement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a statement from fixed text with no parameters.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    /// Append raw SQL text.
    pub fn push(&mut self, sql: &str) {
        self.text.push_str(sql);
    }

    /// Bind `value` as the next parameter and append its `:name`
    /// placeholder to the statement text.
    pub fn push_parameter(&mut self, generator: &mut ParameterNameGenerator, value: Value) {
        let name = generator.next_name();
        self.text.push(':');
        self.text.push_str(&name);
        self.parameters.push(SqlParameter { name, value });
    }

    /// Splice another fragment onto this statement, carrying its parameters
    /// across. The fragment must have been built with the same shared
    /// parameter-name generator.
    pub fn append(&mut self, other: &SqlStatement) {
        self.text.push_str(&other.text);
        self.parameters.extend(other.parameters.iter().cloned());
    }

    /// The accumulated statement text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The bound parameters, in placeholder order.
    #[must_use]
    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    /// Whether no text has been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// An ordered batch of statements executed as one unit.
///
/// Supports front-insertion so that inheritance-chain INSERTs can be
/// generated most-derived-first yet execute ancestor-first.
#[derive(Debug, Clone, Default)]
pub struct SqlStatementCollection {
    statements: Vec<SqlStatement>,
}

impl SqlStatementCollection {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement to the back of the batch.
    pub fn add(&mut self, statement: SqlStatement) {
        self.statements.push(statement);
    }

    /// Insert a statement at the front of the batch.
    pub fn add_front(&mut self, statement: SqlStatement) {
        self.statements.insert(0, statement);
    }

    /// Append every statement of another batch.
    pub fn extend(&mut self, other: SqlStatementCollection) {
        self.statements.extend(other.statements);
    }

    /// Statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[SqlStatement] {
        &self.statements
    }

    /// Number of statements in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl IntoIterator for SqlStatementCollection {
    type Item = SqlStatement;
    type IntoIter = std::vec::IntoIter<SqlStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}
