//! Database connection abstraction.
//!
//! The mapping core never talks to a driver directly; it consumes this
//! synchronous, blocking contract. Drivers implement it; tests script it.

use crate::error::Result;
use crate::row::Row;
use crate::statement::{SqlStatement, SqlStatementCollection};

/// The connection collaborator consumed by the persistence engine.
///
/// All I/O is synchronous. `execute_batch` runs every statement of the batch
/// and reports the total number of rows affected; callers compare that
/// against the statement count to detect partial writes.
pub trait DatabaseConnection {
    /// Execute every statement in the batch, returning total rows affected.
    fn execute_batch(&mut self, batch: &SqlStatementCollection) -> Result<u64>;

    /// Execute a SELECT and materialize its rows.
    fn load_rows(&mut self, statement: &SqlStatement) -> Result<Vec<Row>>;

    /// Begin a database transaction (read-committed isolation).
    fn begin_transaction(&mut self) -> Result<()>;

    /// Commit the current database transaction.
    fn commit_transaction(&mut self) -> Result<()>;

    /// Roll back the current database transaction.
    fn rollback_transaction(&mut self) -> Result<()>;

    /// Opening delimiter for a field name in this dialect.
    fn left_field_delimiter(&self) -> char {
        '"'
    }

    /// Closing delimiter for a field name in this dialect.
    fn right_field_delimiter(&self) -> char {
        '"'
    }

    /// Delimit a field name for this dialect.
    fn delimit_field(&self, field: &str) -> String {
        format!(
            "{}{}{}",
            self.left_field_delimiter(),
            field,
            self.right_field_delimiter()
        )
    }
}
