//! Core types and traits for classmap.
//!
//! `classmap-core` is the **foundation layer** for the entire workspace. It
//! defines the metadata model and the contracts that all other crates build
//! on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `DatabaseConnection` is the trait implemented by
//!   database drivers; `PropertyRule` and `LookupSource` are the extension
//!   points for validation and lookup lists.
//! - **Data model**: `Value`, `Row`, and `SqlStatement` represent scalar
//!   values, query results, and parameterized SQL shared across the query
//!   and session crates.
//! - **Metadata model**: `ClassDefinition` and its companions under [`def`]
//!   describe how classes, properties, keys, and relationships map onto
//!   tables, including the three inheritance strategies.
//!
//! # Who Uses This Crate
//!
//! - `classmap-query` consumes class metadata and `Value` to build criteria
//!   SQL.
//! - `classmap-session` depends on the metadata model, `DatabaseConnection`,
//!   `Row`, and `Value` for the runtime object and unit-of-work flows.
//!
//! Most applications should use the `classmap` facade; reach for
//! `classmap-core` directly when writing drivers or advanced integrations.

pub mod connection;
pub mod def;
pub mod error;
pub mod lookup;
pub mod row;
pub mod rule;
pub mod statement;
pub mod value;

pub use connection::DatabaseConnection;
pub use def::{
    ClassDefinition, ClassIdentity, InheritanceStrategy, KeyDefinition, MetadataRegistry,
    PrimaryKeyDefinition, PropertyDefinition, PropertyDefinitionCollection, ReadWriteRule,
    RelationshipCardinality, RelationshipDefinition, RelationshipKeyDefinition,
    RelationshipPropertyDefinition, SuperClassDefinition,
};
pub use error::{Error, Result};
pub use lookup::{LookupSource, StaticLookup};
pub use row::Row;
pub use rule::{
    DateRangeRule, DecimalRangeRule, IntegerRangeRule, PatternRule, PropertyRule, RequiredRule,
    RuleResult, StringLengthRule,
};
pub use statement::{
    ParameterNameGenerator, SqlParameter, SqlStatement, SqlStatementCollection,
};
pub use value::{PropertyType, Value};
