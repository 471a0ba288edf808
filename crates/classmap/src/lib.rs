//! Metadata-driven object-relational mapping core.
//!
//! `classmap` maps business objects to relational tables through runtime
//! class definitions rather than compile-time derive machinery. A
//! [`MetadataRegistry`] holds [`ClassDefinition`]s describing properties,
//! keys, relationships, and one of three inheritance strategies
//! (single-table, class-table, concrete-table). [`BusinessObject`]s carry
//! the runtime property cells with per-cell dirty tracking; the
//! [`ObjectManager`] identity map guarantees one live instance per
//! persisted row; [`CommitBatch`] persists many objects in one database
//! transaction with optimistic concurrency checks.
//!
//! The implementation lives in the layered sub-crates (`classmap-core`,
//! `classmap-query`, `classmap-session`); this facade re-exports their
//! public surface so users depend on a single crate.

pub use classmap_core::{
    ClassDefinition, ClassIdentity, DatabaseConnection, DateRangeRule, DecimalRangeRule, Error,
    InheritanceStrategy, IntegerRangeRule, KeyDefinition, LookupSource, MetadataRegistry,
    ParameterNameGenerator, PatternRule, PrimaryKeyDefinition, PropertyDefinition,
    PropertyDefinitionCollection, PropertyRule, PropertyType, ReadWriteRule,
    RelationshipCardinality, RelationshipDefinition, RelationshipKeyDefinition,
    RelationshipPropertyDefinition, RequiredRule, Result, Row, RuleResult, SqlParameter,
    SqlStatement, SqlStatementCollection, StaticLookup, StringLengthRule, SuperClassDefinition,
    Value,
};
pub use classmap_query::{parse_criteria, Expression, Operator, OrderClause, OrderTerm};
pub use classmap_session::{
    load_object, BusinessObject, BusinessObjectCollection, BusinessObjectKey, CommitBatch,
    ConcurrencyControl, InMemoryTransactionLog, ObjectEvent, ObjectManager, ObjectStatus,
    OptimisticVersionLocking, PersistenceContext, Relationship, RelationshipCollection,
    SharedObject, TransactionAction, TransactionLog, TransactionLogEntry,
};

/// The commonly-used surface in one import.
pub mod prelude {
    pub use classmap_core::{
        ClassDefinition, ClassIdentity, DatabaseConnection, Error, InheritanceStrategy,
        KeyDefinition, MetadataRegistry, PrimaryKeyDefinition, PropertyDefinition,
        PropertyDefinitionCollection, PropertyType, Result, Row, SqlStatement,
        SqlStatementCollection, SuperClassDefinition, Value,
    };
    pub use classmap_query::{parse_criteria, Expression, OrderClause};
    pub use classmap_session::{
        load_object, BusinessObject, BusinessObjectCollection, CommitBatch, ConcurrencyControl,
        ObjectEvent, ObjectManager, OptimisticVersionLocking, PersistenceContext, Relationship,
        SharedObject,
    };
}
