//! Multi-object commit batching.
//!
//! A [`CommitBatch`] queues several objects and commits them inside one
//! database transaction: persist rules run fail-fast at add time and again
//! per object inside the transaction, every object's statement batch
//! executes under the single transaction, and in-memory bookkeeping is
//! deferred until the database commit succeeds. Any failure rolls the
//! whole batch back and notifies every queued object.

use classmap_core::{DatabaseConnection, MetadataRegistry, Result};

use crate::concurrency::ConcurrencyControl;
use crate::object::{BusinessObject, PersistenceContext, SharedObject};

/// An ordered queue of objects to commit atomically.
#[derive(Debug, Default)]
pub struct CommitBatch {
    objects: Vec<(String, SharedObject)>,
}

impl CommitBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an object, running its persist rules immediately so a doomed
    /// batch fails before anything is written. Adding an object whose ID is
    /// already queued is a no-op.
    pub fn add(
        &mut self,
        object: &SharedObject,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        concurrency: Option<&dyn ConcurrencyControl>,
    ) -> Result<()> {
        let id = object.borrow().object_id(registry)?;
        if self.objects.iter().any(|(queued, _)| *queued == id) {
            return Ok(());
        }
        object
            .borrow()
            .check_persist_rules(registry, connection, concurrency)?;
        self.objects.push((id, object.clone()));
        Ok(())
    }

    /// Number of queued objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Commit every queued object inside one database transaction.
    ///
    /// Commits run in two phases. The first re-checks each object's
    /// persist rules (edits made after `add` are still validated) and
    /// executes its statement batch with row-count verification. Only
    /// after the database transaction commits does the second phase run
    /// the in-memory bookkeeping for every object: audit log, property
    /// backup, flag clearing, and identity-map maintenance. Any first-
    /// phase failure rolls the database transaction back and notifies
    /// every queued object, leaving all in-memory edits intact for the
    /// caller to retry or cancel. The queue is cleared on success.
    #[tracing::instrument(level = "debug", skip_all, fields(objects = self.objects.len()))]
    pub fn commit(&mut self, ctx: &mut PersistenceContext<'_>) -> Result<()> {
        if self.objects.is_empty() {
            return Ok(());
        }
        ctx.connection.begin_transaction()?;
        let mut pendings = Vec::with_capacity(self.objects.len());
        for (id, object) in &self.objects {
            match BusinessObject::execute_apply(object, ctx) {
                Ok(pending) => pendings.push(pending),
                Err(e) => {
                    tracing::warn!(object_id = %id, error = %e, "commit failed, rolling back batch");
                    ctx.connection.rollback_transaction()?;
                    for (_, queued) in &self.objects {
                        queued.borrow_mut().transaction_rolled_back(ctx.concurrency);
                    }
                    return Err(e);
                }
            }
        }
        ctx.connection.commit_transaction()?;
        for ((_, object), pending) in self.objects.iter().zip(pendings) {
            BusinessObject::finalize_apply(object, ctx, pending)?;
        }
        self.objects.clear();
        Ok(())
    }

    /// Roll back every queued object's in-memory edits without touching
    /// the database, then clear the queue.
    pub fn cancel_all_edits(&mut self, concurrency: Option<&dyn ConcurrencyControl>) {
        for (_, object) in &self.objects {
            object.borrow_mut().cancel_edit(concurrency);
        }
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_manager::ObjectManager;
    use classmap_core::{
        ClassDefinition, ClassIdentity, Error, PrimaryKeyDefinition, PropertyDefinition,
        PropertyDefinitionCollection, PropertyType, Row, SqlStatement, SqlStatementCollection,
        Value,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct RecordingConnection {
        executed: Vec<String>,
        begun: usize,
        committed: usize,
        rolled_back: usize,
        fail_execution: bool,
        fail_on_call: Option<usize>,
        calls: usize,
    }

    impl DatabaseConnection for RecordingConnection {
        fn execute_batch(&mut self, batch: &SqlStatementCollection) -> Result<u64> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_execution || self.fail_on_call == Some(call) {
                return Err(Error::DatabaseWrite("scripted failure".to_string()));
            }
            for statement in batch.statements() {
                self.executed.push(statement.text().to_string());
            }
            Ok(batch.len() as u64)
        }

        fn load_rows(&mut self, _statement: &SqlStatement) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        fn begin_transaction(&mut self) -> Result<()> {
            self.begun += 1;
            Ok(())
        }

        fn commit_transaction(&mut self) -> Result<()> {
            self.committed += 1;
            Ok(())
        }

        fn rollback_transaction(&mut self) -> Result<()> {
            self.rolled_back += 1;
            Ok(())
        }
    }

    fn contact_class(registry: &MetadataRegistry) -> Arc<ClassDefinition> {
        let mut props = PropertyDefinitionCollection::new("Contact");
        props
            .add(PropertyDefinition::new("ContactID", PropertyType::Guid))
            .unwrap();
        props
            .add(PropertyDefinition::new("Surname", PropertyType::Text).compulsory(true))
            .unwrap();
        let pk = PrimaryKeyDefinition::object_id(Arc::clone(props.get("ContactID").unwrap()))
            .unwrap();
        registry
            .register(ClassDefinition::new(
                ClassIdentity::new("app", "Contact"),
                props,
                Some(pk),
            ))
            .unwrap()
    }

    fn new_contact(
        class: &Arc<ClassDefinition>,
        registry: &MetadataRegistry,
        surname: &str,
    ) -> SharedObject {
        let mut bo = BusinessObject::new(Arc::clone(class), registry).unwrap();
        bo.set_property_value(registry, "Surname", Value::Text(surname.to_string()))
            .unwrap();
        Rc::new(RefCell::new(bo))
    }

    #[test]
    fn test_same_id_add_is_idempotent() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut connection = RecordingConnection::default();
        let object = new_contact(&class, &registry, "Smith");

        let mut batch = CommitBatch::new();
        batch.add(&object, &registry, &mut connection, None).unwrap();
        batch.add(&object, &registry, &mut connection, None).unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_commit_runs_inside_one_transaction() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut connection = RecordingConnection::default();
        let manager = ObjectManager::new();

        let a = new_contact(&class, &registry, "Smith");
        let b = new_contact(&class, &registry, "Jones");

        let mut batch = CommitBatch::new();
        batch.add(&a, &registry, &mut connection, None).unwrap();
        batch.add(&b, &registry, &mut connection, None).unwrap();

        let mut ctx = PersistenceContext {
            registry: &registry,
            connection: &mut connection,
            manager: &manager,
            concurrency: None,
            log: None,
            user_name: "sam",
        };
        batch.commit(&mut ctx).unwrap();
        assert!(batch.is_empty());

        assert_eq!(connection.begun, 1);
        assert_eq!(connection.committed, 1);
        assert_eq!(connection.rolled_back, 0);
        assert_eq!(connection.executed.len(), 2);
        assert!(!a.borrow().is_new());
        assert!(!b.borrow().is_new());
    }

    #[test]
    fn test_failure_rolls_back_whole_batch() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut connection = RecordingConnection::default();
        let manager = ObjectManager::new();

        let a = new_contact(&class, &registry, "Smith");
        let mut batch = CommitBatch::new();
        batch.add(&a, &registry, &mut connection, None).unwrap();

        connection.fail_execution = true;
        let mut ctx = PersistenceContext {
            registry: &registry,
            connection: &mut connection,
            manager: &manager,
            concurrency: None,
            log: None,
            user_name: "sam",
        };
        assert!(batch.commit(&mut ctx).is_err());
        assert_eq!(connection.rolled_back, 1);
        assert_eq!(connection.committed, 0);
        // The object keeps its unsaved edits for the caller to handle.
        assert!(a.borrow().is_new());
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_mid_batch_failure_leaves_earlier_objects_unsaved() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut connection = RecordingConnection::default();
        let manager = ObjectManager::new();

        let a = new_contact(&class, &registry, "Smith");
        let b = new_contact(&class, &registry, "Jones");
        let mut batch = CommitBatch::new();
        batch.add(&a, &registry, &mut connection, None).unwrap();
        batch.add(&b, &registry, &mut connection, None).unwrap();

        // The second object's write fails after the first already executed.
        connection.fail_on_call = Some(1);
        let mut ctx = PersistenceContext {
            registry: &registry,
            connection: &mut connection,
            manager: &manager,
            concurrency: None,
            log: None,
            user_name: "sam",
        };
        assert!(batch.commit(&mut ctx).is_err());

        assert_eq!(connection.rolled_back, 1);
        assert_eq!(connection.committed, 0);
        // Neither object may look persisted after the rollback.
        assert!(a.borrow().is_new());
        assert!(a.borrow().is_dirty());
        assert!(b.borrow().is_new());
        assert!(b.borrow().is_dirty());
        assert_eq!(manager.len(), 0);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_commit_revalidates_objects_edited_after_add() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut connection = RecordingConnection::default();
        let manager = ObjectManager::new();

        let a = new_contact(&class, &registry, "Smith");
        let mut batch = CommitBatch::new();
        batch.add(&a, &registry, &mut connection, None).unwrap();

        // Invalidate the compulsory property after it was queued.
        a.borrow_mut()
            .set_property_value(&registry, "Surname", Value::Null)
            .unwrap();

        let mut ctx = PersistenceContext {
            registry: &registry,
            connection: &mut connection,
            manager: &manager,
            concurrency: None,
            log: None,
            user_name: "sam",
        };
        let err = batch.commit(&mut ctx).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(connection.executed.is_empty());
        assert_eq!(connection.rolled_back, 1);
        assert!(a.borrow().is_new());
    }

    #[test]
    fn test_cancel_all_edits_restores_objects() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut connection = RecordingConnection::default();

        let a = new_contact(&class, &registry, "Smith");
        let mut batch = CommitBatch::new();
        batch.add(&a, &registry, &mut connection, None).unwrap();

        batch.cancel_all_edits(None);
        assert!(batch.is_empty());
        assert!(!a.borrow().is_dirty());
        assert_eq!(
            a.borrow().get_property_value("Surname").unwrap(),
            Value::Null
        );
    }
}
