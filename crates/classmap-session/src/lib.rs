//! Runtime object layer: live business objects, identity-mapped loading,
//! lifecycle tracking, and batched persistence.
//!
//! [`BusinessObject`] holds the runtime property cells for one mapped row
//! and drives the `new | loaded -> editing -> applied | cancelled`
//! lifecycle. [`ObjectManager`] is the weak identity map guaranteeing one
//! live instance per persisted identity. [`BusinessObjectCollection`]
//! loads, sorts, and batch-commits sets of objects; [`CommitBatch`] wraps
//! several objects in one database transaction. [`Relationship`] navigates
//! foreign-key associations to related live objects. Concurrency
//! strategies ([`ConcurrencyControl`], [`OptimisticVersionLocking`]) plug
//! into the edit and persist checkpoints.

pub mod batch;
pub mod collection;
pub mod concurrency;
pub mod key;
pub mod log;
pub mod object;
pub mod object_manager;
pub mod persist;
pub mod prop;
pub mod relationship;

pub use batch::CommitBatch;
pub use collection::BusinessObjectCollection;
pub use concurrency::{ConcurrencyControl, OptimisticVersionLocking};
pub use key::{BusinessObjectKey, KeyMember};
pub use log::{InMemoryTransactionLog, TransactionAction, TransactionLog, TransactionLogEntry};
pub use object::{
    load_object, BusinessObject, ObjectEvent, ObjectStatus, PersistenceContext, SharedObject,
};
pub use object_manager::ObjectManager;
pub use persist::{delete_statements, insert_statements, select_statement, update_statements};
pub use prop::{Property, PropertyCollection};
pub use relationship::{Relationship, RelationshipCollection};
