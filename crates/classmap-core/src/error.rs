//! Error taxonomy for the mapping core.
//!
//! Every failure a caller can observe is one variant of [`Error`]. Validation
//! and duplicate/concurrency checks are raised before any SQL is executed for
//! an object; a multi-object commit batch additionally guarantees
//! all-or-nothing at the database-transaction level.

use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by the mapping core.
#[derive(Debug, Error)]
pub enum Error {
    /// Loading a business object by key or criteria matched zero rows.
    #[error("no row found for class '{class_name}' matching: {criteria}")]
    NotFound {
        /// The mapped class that was searched.
        class_name: String,
        /// The criteria that matched nothing.
        criteria: String,
    },

    /// A property name could not be resolved under strict resolution.
    #[error("class '{class_name}' has no property named '{property_name}'")]
    InvalidPropertyName {
        /// The class the lookup started from.
        class_name: String,
        /// The unknown property name.
        property_name: String,
    },

    /// A relationship segment of a dotted property path could not be resolved.
    #[error("class '{class_name}' has no relationship named '{relationship_name}'")]
    InvalidRelationshipPath {
        /// The class the missing segment was resolved against.
        class_name: String,
        /// The unknown relationship segment.
        relationship_name: String,
    },

    /// A persist was attempted while one or more properties fail validation.
    #[error("object '{object_id}' is not in a valid state to be persisted: {reason}")]
    Validation {
        /// The offending object's identity string.
        object_id: String,
        /// The first validation failure encountered.
        reason: String,
    },

    /// Another row already holds this object's primary key values.
    #[error("a record already exists with the primary key values: {where_clause}")]
    DuplicatePrimaryKey {
        /// The conflicting key rendered as a literal where clause.
        where_clause: String,
    },

    /// Another row already holds this object's alternate key values.
    #[error("a record already exists with the same values for key '{key_name}': {where_clause}")]
    DuplicateKey {
        /// The alternate key's name.
        key_name: String,
        /// The conflicting key rendered as a literal where clause.
        where_clause: String,
    },

    /// The stored version number no longer matches the in-memory one.
    #[error(
        "object '{object_id}' was edited by '{user_name}' on machine '{machine_name}' at \
         {updated_at}; the in-memory copy is stale"
    )]
    OptimisticConflict {
        /// The offending object's identity string.
        object_id: String,
        /// The user recorded on the winning edit.
        user_name: String,
        /// The machine recorded on the winning edit.
        machine_name: String,
        /// The timestamp recorded on the winning edit.
        updated_at: String,
    },

    /// The row backing this object is gone and the object is not mid-delete.
    #[error("object '{object_id}' has been deleted by another user")]
    DeletedByAnotherUser {
        /// The offending object's identity string.
        object_id: String,
    },

    /// An optimistic conflict detected at begin-edit time, re-raised as a
    /// distinct kind so callers can auto-refresh instead of block.
    #[error("cannot begin editing object '{object_id}': {source}")]
    BeginEditConflict {
        /// The offending object's identity string.
        object_id: String,
        /// The underlying conflict.
        #[source]
        source: Box<Error>,
    },

    /// `begin_edit` called twice without an intervening apply or cancel.
    #[error("object '{object_id}' is already being edited")]
    EditInProgress {
        /// The offending object's identity string.
        object_id: String,
    },

    /// A persist batch affected a different number of rows than expected.
    #[error("expected {expected} rows to be affected but the database reported {actual}")]
    RowCountMismatch {
        /// Statements in the batch (one row each).
        expected: u64,
        /// Rows the database reported as affected.
        actual: u64,
    },

    /// A read surfaced from the connection collaborator failed.
    #[error("database read failed: {0}")]
    DatabaseRead(String),

    /// A write surfaced from the connection collaborator failed.
    #[error("database write failed: {0}")]
    DatabaseWrite(String),

    /// Developer or configuration error: malformed metadata, missing
    /// registration, duplicate names, empty keys.
    #[error("class definition error: {0}")]
    Definition(String),

    /// A raw value could not be coerced to a property's semantic type.
    #[error("cannot coerce value '{value}' to {target_type} for property '{property_name}'")]
    Coercion {
        /// The property whose type was targeted.
        property_name: String,
        /// Display rendering of the raw value.
        value: String,
        /// Target semantic type name.
        target_type: String,
    },

    /// A criteria or order-by string could not be parsed.
    #[error("invalid expression: {0}")]
    Expression(String),
}

impl Error {
    /// True for any of the duplicate/optimistic/delete conflict kinds.
    #[must_use]
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            Error::DuplicatePrimaryKey { .. }
                | Error::DuplicateKey { .. }
                | Error::OptimisticConflict { .. }
                | Error::DeletedByAnotherUser { .. }
                | Error::BeginEditConflict { .. }
        )
    }
}
