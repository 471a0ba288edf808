//! Criteria expressions and ordering for classmap.
//!
//! `classmap-query` turns user-facing criteria strings into parameterized
//! SQL fragments and parses order-by clauses for both SQL generation and
//! in-memory sorting.
//!
//! # Role In The Architecture
//!
//! - [`Expression`] / [`parse_criteria`]: the criteria tree and its string
//!   parser, rendered against a `ClassDefinition` so property names map to
//!   database fields.
//! - [`OrderClause`]: order-by parsing plus a null-low comparer used by
//!   collection sorting in `classmap-session`.

pub mod expr;
pub mod order;

pub use expr::{parse_criteria, Expression, Operator};
pub use order::{OrderClause, OrderTerm};
