//! Business objects: the runtime entities the mapping core materializes,
//! tracks, and persists.
//!
//! A [`BusinessObject`] owns a property collection bound to a shared
//! `ClassDefinition` and moves through the lifecycle
//! `new | loaded -> editing -> applied | cancelled` driven by four state
//! flags. Apply builds the ordered statement batch for the object's
//! inheritance chain, runs persist rules first, and only then touches the
//! database.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use classmap_core::{
    ClassDefinition, DatabaseConnection, Error, KeyDefinition, MetadataRegistry,
    ParameterNameGenerator, Result, Row, Value,
};
use classmap_query::Expression;

use crate::collection::BusinessObjectCollection;
use crate::concurrency::ConcurrencyControl;
use crate::key::BusinessObjectKey;
use crate::log::{TransactionAction, TransactionLog, TransactionLogEntry};
use crate::object_manager::ObjectManager;
use crate::persist;
use crate::prop::PropertyCollection;
use crate::relationship::RelationshipCollection;

/// Shared handle to a live business object. The runtime is a
/// single-threaded unit of work; callers serialize access.
pub type SharedObject = Rc<RefCell<BusinessObject>>;

/// Notification drained by the caller after mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectEvent {
    /// The object's state changed (edit applied or cancelled, value set).
    Updated,
    /// The object was deleted (or discarded before ever being saved).
    Deleted,
    /// One property's value changed.
    PropertyUpdated {
        /// The changed property's name.
        property: String,
    },
}

/// The four lifecycle flags plus the terminal discarded marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectStatus {
    /// Never persisted yet.
    pub is_new: bool,
    /// Holds unsaved changes.
    pub is_dirty: bool,
    /// Marked for deletion at the next apply.
    pub is_deleted: bool,
    /// An edit is in progress.
    pub is_editing: bool,
    /// A delete has been applied; the object is terminally dead.
    pub is_discarded: bool,
}

/// Everything an apply needs besides the object itself.
pub struct PersistenceContext<'a> {
    /// Class-definition catalogue.
    pub registry: &'a MetadataRegistry,
    /// Database connection.
    pub connection: &'a mut dyn DatabaseConnection,
    /// Identity map to maintain.
    pub manager: &'a ObjectManager,
    /// Optional concurrency strategy; `None` disables all checks.
    pub concurrency: Option<&'a dyn ConcurrencyControl>,
    /// Optional audit sink.
    pub log: Option<&'a mut dyn TransactionLog>,
    /// The committing user, recorded in concurrency columns and the log.
    pub user_name: &'a str,
}

/// One runtime instance representing a persisted (or about-to-be-persisted)
/// row.
#[derive(Debug)]
pub struct BusinessObject {
    class: Arc<ClassDefinition>,
    properties: PropertyCollection,
    relationships: RelationshipCollection,
    status: ObjectStatus,
    events: Vec<ObjectEvent>,
}

impl BusinessObject {
    /// Construct a new, never-persisted object with default property
    /// values. An object-id primary key receives a fresh surrogate
    /// identity.
    pub fn new(class: Arc<ClassDefinition>, registry: &MetadataRegistry) -> Result<Self> {
        let definitions = class.all_property_defs(registry)?;
        let mut properties = PropertyCollection::from_definitions(&definitions);
        let primary_key = class.resolve_primary_key(registry)?;
        if primary_key.is_object_id() {
            for member in primary_key.key().members() {
                if let Some(cell) = properties.get_mut(member.name()) {
                    cell.initialise(Value::Uuid(uuid::Uuid::new_v4()), true);
                }
            }
        }
        let relationships = RelationshipCollection::from_class(&class, registry)?;
        Ok(Self {
            class,
            properties,
            relationships,
            status: ObjectStatus {
                is_new: true,
                ..ObjectStatus::default()
            },
            events: Vec::new(),
        })
    }

    /// Materialize a persisted object from a result row. Columns are
    /// matched by database field name; a missing column reads as NULL.
    pub fn from_row(
        class: Arc<ClassDefinition>,
        registry: &MetadataRegistry,
        row: &Row,
    ) -> Result<Self> {
        let definitions = class.all_property_defs(registry)?;
        let mut properties = PropertyCollection::from_definitions(&definitions);
        for definition in &definitions {
            let raw = row
                .get(definition.field())
                .cloned()
                .unwrap_or(Value::Null);
            if let Some(cell) = properties.get_mut(definition.name()) {
                cell.initialise(raw, false);
            }
        }
        let relationships = RelationshipCollection::from_class(&class, registry)?;
        Ok(Self {
            class,
            properties,
            relationships,
            status: ObjectStatus::default(),
            events: Vec::new(),
        })
    }

    /// Overwrite this object's cells from a freshly-read row, resetting it
    /// to a clean persisted state. Used by the silent cache-hit refresh.
    pub(crate) fn refresh_from_row(&mut self, registry: &MetadataRegistry, row: &Row) -> Result<()> {
        let definitions = self.class.all_property_defs(registry)?;
        for definition in &definitions {
            let raw = row
                .get(definition.field())
                .cloned()
                .unwrap_or(Value::Null);
            if let Some(cell) = self.properties.get_mut(definition.name()) {
                cell.initialise(raw, false);
            }
        }
        self.status = ObjectStatus::default();
        self.events.push(ObjectEvent::Updated);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The bound class definition.
    #[must_use]
    pub fn class(&self) -> &Arc<ClassDefinition> {
        &self.class
    }

    /// The runtime property cells.
    #[must_use]
    pub fn properties(&self) -> &PropertyCollection {
        &self.properties
    }

    /// Mutable access to the cells. Bypasses the editing state machine;
    /// intended for concurrency strategies and loaders.
    pub fn properties_mut(&mut self) -> &mut PropertyCollection {
        &mut self.properties
    }

    /// The runtime relationships declared on this class and its ancestors.
    #[must_use]
    pub fn relationships(&self) -> &RelationshipCollection {
        &self.relationships
    }

    /// The lifecycle flags.
    #[must_use]
    pub fn status(&self) -> ObjectStatus {
        self.status
    }

    /// Whether this object has never been persisted.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.status.is_new
    }

    /// Whether this object holds unsaved changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.status.is_dirty
    }

    /// Whether this object is marked for deletion.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status.is_deleted
    }

    /// Whether an edit is in progress.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.status.is_editing
    }

    /// Drain the queued notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<ObjectEvent> {
        std::mem::take(&mut self.events)
    }

    /// The runtime primary key. Persisted values are used for objects that
    /// have been saved; current values for new ones.
    pub fn primary_key(&self, registry: &MetadataRegistry) -> Result<BusinessObjectKey> {
        let definition = self.class.resolve_primary_key(registry)?;
        if self.status.is_new {
            BusinessObjectKey::from_current(definition.key(), &self.properties)
        } else {
            BusinessObjectKey::from_persisted(definition.key(), &self.properties)
        }
    }

    /// The identity string used by the identity map.
    pub fn object_id(&self, registry: &MetadataRegistry) -> Result<String> {
        Ok(format!(
            "{}:{}",
            self.class.class_name(),
            self.primary_key(registry)?.id_string()
        ))
    }

    fn object_id_or_unknown(&self, registry: &MetadataRegistry) -> String {
        self.object_id(registry)
            .unwrap_or_else(|_| format!("{}:<unknown>", self.class.class_name()))
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    fn ensure_not_discarded(&self, registry: &MetadataRegistry) -> Result<()> {
        if self.status.is_discarded {
            return Err(Error::Definition(format!(
                "object '{}' has been discarded and can no longer be used",
                self.object_id_or_unknown(registry)
            )));
        }
        Ok(())
    }

    /// Begin an edit, running the concurrency strategy's pre-edit check.
    /// Fails when an edit is already in progress.
    pub fn begin_edit(
        &mut self,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        concurrency: Option<&dyn ConcurrencyControl>,
    ) -> Result<()> {
        self.ensure_not_discarded(registry)?;
        if self.status.is_editing {
            return Err(Error::EditInProgress {
                object_id: self.object_id_or_unknown(registry),
            });
        }
        if let Some(strategy) = concurrency {
            strategy.check_before_begin_edit(self, registry, connection)?;
        }
        self.status.is_editing = true;
        Ok(())
    }

    /// The implicit editing transition: entering the editing state without
    /// the concurrency pre-check. Used by `set_property_value` and
    /// `delete`; callers wanting the checked transition use
    /// [`BusinessObject::begin_edit`].
    fn ensure_editing(&mut self) {
        self.status.is_editing = true;
    }

    /// Set a property by name.
    ///
    /// Implicitly begins an edit. A text value on a lookup-backed property
    /// is resolved from display string to identity value first; coercion to
    /// the semantic type (including Guid-string parsing) happens in the
    /// cell. Marks the object dirty only when the resolved value actually
    /// differs.
    pub fn set_property_value(
        &mut self,
        registry: &MetadataRegistry,
        name: &str,
        raw: Value,
    ) -> Result<()> {
        self.ensure_not_discarded(registry)?;
        self.ensure_editing();
        let cell = self.properties.get_mut(name).ok_or_else(|| {
            Error::InvalidPropertyName {
                class_name: self.class.class_name().to_string(),
                property_name: name.to_string(),
            }
        })?;
        let resolved = match (&raw, cell.definition().lookup_source()) {
            (Value::Text(display), Some(lookup)) => {
                lookup.resolve_display(display).unwrap_or(raw)
            }
            _ => raw,
        };
        let changed = cell.set_value(resolved)?;
        if changed {
            self.status.is_dirty = true;
            self.events.push(ObjectEvent::PropertyUpdated {
                property: name.to_string(),
            });
            self.events.push(ObjectEvent::Updated);
        }
        Ok(())
    }

    /// Read a property's current value by name.
    pub fn get_property_value(&self, name: &str) -> Result<Value> {
        self.properties
            .get(name)
            .map(|p| p.value().clone())
            .ok_or_else(|| Error::InvalidPropertyName {
                class_name: self.class.class_name().to_string(),
                property_name: name.to_string(),
            })
    }

    /// Read a property rendered for display, resolving lookup lists.
    pub fn get_property_display(&self, name: &str) -> Result<String> {
        self.properties
            .get(name)
            .map(crate::prop::Property::display_value)
            .ok_or_else(|| Error::InvalidPropertyName {
                class_name: self.class.class_name().to_string(),
                property_name: name.to_string(),
            })
    }

    // ------------------------------------------------------------------
    // Relationship navigation
    // ------------------------------------------------------------------

    /// Resolve a single relationship to its zero-or-one related object.
    ///
    /// The correlation criteria comes from this object's current
    /// foreign-key values; the target resolves through the identity map,
    /// so a live instance is reused. A keep-reference relationship caches
    /// the result until the key values change.
    pub fn related_object(
        &mut self,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        manager: &ObjectManager,
        concurrency: Option<&dyn ConcurrencyControl>,
        name: &str,
    ) -> Result<Option<SharedObject>> {
        self.ensure_not_discarded(registry)?;
        let Some(relationship) = self.relationships.get_mut(name) else {
            return Err(Error::InvalidRelationshipPath {
                class_name: self.class.class_name().to_string(),
                relationship_name: name.to_string(),
            });
        };
        relationship.resolve_single(&self.properties, registry, connection, manager, concurrency)
    }

    /// Resolve a multiple relationship to a collection of related objects,
    /// ordered by the definition's order-by clause.
    pub fn related_objects(
        &mut self,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        manager: &ObjectManager,
        concurrency: Option<&dyn ConcurrencyControl>,
        name: &str,
    ) -> Result<BusinessObjectCollection> {
        self.ensure_not_discarded(registry)?;
        let Some(relationship) = self.relationships.get_mut(name) else {
            return Err(Error::InvalidRelationshipPath {
                class_name: self.class.class_name().to_string(),
                relationship_name: name.to_string(),
            });
        };
        relationship.resolve_many(&self.properties, registry, connection, manager, concurrency)
    }

    /// Mark the object for deletion. The row is removed at the next apply.
    pub fn delete(&mut self, registry: &MetadataRegistry) -> Result<()> {
        self.ensure_not_discarded(registry)?;
        self.ensure_editing();
        self.status.is_dirty = true;
        self.status.is_deleted = true;
        Ok(())
    }

    /// Discard the in-progress edit: every cell reverts to its persisted
    /// value and the deletion mark is lifted.
    pub fn cancel_edit(&mut self, concurrency: Option<&dyn ConcurrencyControl>) {
        self.properties.restore_all();
        self.status.is_dirty = false;
        self.status.is_deleted = false;
        self.status.is_editing = false;
        if let Some(strategy) = concurrency {
            strategy.release_locks(self);
        }
        self.events.push(ObjectEvent::Updated);
    }

    // ------------------------------------------------------------------
    // Persist rules
    // ------------------------------------------------------------------

    /// All alternate-key definitions visible on this class, its own plus
    /// every ancestor's.
    fn all_key_defs(&self, registry: &MetadataRegistry) -> Result<Vec<KeyDefinition>> {
        let mut keys = Vec::new();
        for class in registry.hierarchy(self.class.identity())? {
            keys.extend(class.key_defs().iter().cloned());
        }
        Ok(keys)
    }

    /// Run every pre-persist check: property validation, the concurrency
    /// strategy, duplicate primary key, and duplicate alternate keys. No
    /// SQL is written; any failure aborts before the statement batch is
    /// built.
    pub fn check_persist_rules(
        &self,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        concurrency: Option<&dyn ConcurrencyControl>,
    ) -> Result<()> {
        if let Err(reason) = self.properties.check_valid() {
            return Err(Error::Validation {
                object_id: self.object_id_or_unknown(registry),
                reason,
            });
        }
        if let Some(strategy) = concurrency {
            strategy.check_before_persist(self, registry, connection)?;
        }
        if self.status.is_deleted {
            // A delete cannot introduce duplicates.
            return Ok(());
        }

        let primary_definition = self.class.resolve_primary_key(registry)?;
        let primary = BusinessObjectKey::from_current(primary_definition.key(), &self.properties)?;
        if primary.must_check(self.status.is_new) {
            let mut generator = ParameterNameGenerator::new();
            let clause = primary.where_clause(&mut generator);
            let select = persist::select_statement(&self.class, registry, Some(&clause), 1)?;
            if !connection.load_rows(&select)?.is_empty() {
                return Err(Error::DuplicatePrimaryKey {
                    where_clause: primary.where_clause_literal(),
                });
            }
        }

        for definition in self.all_key_defs(registry)? {
            let key = BusinessObjectKey::from_current(&definition, &self.properties)?;
            if !key.must_check(self.status.is_new) {
                continue;
            }
            let mut generator = ParameterNameGenerator::new();
            let mut clause = key.where_clause(&mut generator);
            if !self.status.is_new {
                // Exclude this object's own row from the duplicate scan.
                let own = BusinessObjectKey::from_persisted(
                    primary_definition.key(),
                    &self.properties,
                )?;
                clause.push(" AND NOT (");
                clause.append(&own.where_clause(&mut generator));
                clause.push(")");
            }
            let select = persist::select_statement(&self.class, registry, Some(&clause), 1)?;
            if !connection.load_rows(&select)?.is_empty() {
                return Err(Error::DuplicateKey {
                    key_name: key.name().to_string(),
                    where_clause: key.where_clause_literal(),
                });
            }
        }
        Ok(())
    }

    fn persist_batch(
        &self,
        registry: &MetadataRegistry,
    ) -> Result<classmap_core::SqlStatementCollection> {
        let mut generator = ParameterNameGenerator::new();
        if self.status.is_deleted {
            persist::delete_statements(&self.class, registry, &self.properties, &mut generator)
        } else if self.status.is_new {
            persist::insert_statements(&self.class, registry, &self.properties, &mut generator)
        } else {
            persist::update_statements(&self.class, registry, &self.properties, &mut generator)
        }
    }

    // ------------------------------------------------------------------
    // Apply
    // ------------------------------------------------------------------

    /// Apply the in-progress edit.
    ///
    /// An object that is both new and deleted never existed in the
    /// database: the apply touches no SQL and leaves the object terminally
    /// discarded. Otherwise validation and persist rules run first, the
    /// statement batch executes, the executed-row count is verified, the
    /// audit log is recorded, and every cell is backed up. The identity map
    /// entry follows the primary key (remove-then-readd on key change).
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn apply_edit(object: &SharedObject, ctx: &mut PersistenceContext<'_>) -> Result<()> {
        let pending = Self::execute_apply(object, ctx)?;
        Self::finalize_apply(object, ctx, pending)
    }

    /// Phase one of an apply: persist rules plus statement execution.
    ///
    /// All in-memory bookkeeping (flags, backup, audit log, identity map)
    /// is deferred to [`BusinessObject::finalize_apply`], so a surrounding
    /// database transaction can still roll back without leaving the object
    /// looking persisted.
    pub(crate) fn execute_apply(
        object: &SharedObject,
        ctx: &mut PersistenceContext<'_>,
    ) -> Result<PendingApply> {
        let old_id = {
            let bo = object.borrow();
            bo.ensure_not_discarded(ctx.registry)?;
            bo.object_id(ctx.registry)?
        };

        let mut bo = object.borrow_mut();
        let was_new = bo.status.is_new;
        let was_deleted = bo.status.is_deleted;
        if was_new && was_deleted {
            // Never persisted: deleting is a pure in-memory operation.
            return Ok(PendingApply {
                old_id,
                was_new,
                was_deleted,
                wrote: false,
            });
        }

        let wrote = bo.status.is_dirty || bo.status.is_new;
        if wrote {
            bo.check_persist_rules(ctx.registry, ctx.connection, ctx.concurrency)?;
            if !was_deleted {
                if let Some(strategy) = ctx.concurrency {
                    strategy.prepare_for_persist(&mut bo, ctx.user_name)?;
                }
            }

            let batch = bo.persist_batch(ctx.registry)?;
            if !batch.is_empty() {
                let expected = batch.len() as u64;
                let actual = ctx.connection.execute_batch(&batch)?;
                if actual != expected {
                    return Err(Error::RowCountMismatch { expected, actual });
                }
            }
        }

        Ok(PendingApply {
            old_id,
            was_new,
            was_deleted,
            wrote,
        })
    }

    /// Phase two of an apply, run once the write is durable: audit log,
    /// property backup, flag clearing, and identity-map maintenance.
    pub(crate) fn finalize_apply(
        object: &SharedObject,
        ctx: &mut PersistenceContext<'_>,
        pending: PendingApply,
    ) -> Result<()> {
        {
            let mut bo = object.borrow_mut();
            if pending.was_new && pending.was_deleted {
                bo.status = ObjectStatus {
                    is_discarded: true,
                    ..ObjectStatus::default()
                };
                bo.events.push(ObjectEvent::Deleted);
                ctx.manager.remove(&pending.old_id);
                tracing::debug!(object_id = %pending.old_id, "discarded never-persisted object");
                return Ok(());
            }

            if pending.wrote {
                if let Some(log) = ctx.log.as_deref_mut() {
                    log.record(TransactionLogEntry {
                        object_id: pending.old_id.clone(),
                        class_name: bo.class.class_name().to_string(),
                        action: if pending.was_deleted {
                            TransactionAction::Deleted
                        } else if pending.was_new {
                            TransactionAction::Created
                        } else {
                            TransactionAction::Updated
                        },
                        user_name: ctx.user_name.to_string(),
                        logged_at: chrono::Local::now().naive_local(),
                    });
                }
                bo.properties.backup_all();
            }

            bo.status.is_new = false;
            bo.status.is_dirty = false;
            bo.status.is_editing = false;
            if pending.was_deleted {
                bo.status.is_deleted = false;
                bo.status.is_discarded = true;
                bo.events.push(ObjectEvent::Deleted);
            } else {
                bo.events.push(ObjectEvent::Updated);
            }
            if let Some(strategy) = ctx.concurrency {
                strategy.release_locks(&bo);
            }
        }

        // Identity-map maintenance after the mutation settles.
        let discarded = object.borrow().status.is_discarded;
        if discarded {
            ctx.manager.remove(&pending.old_id);
        } else {
            let new_id = object.borrow().object_id(ctx.registry)?;
            if new_id != pending.old_id {
                ctx.manager.remove(&pending.old_id);
            }
            ctx.manager.add(&new_id, object);
        }
        Ok(())
    }

    /// Notification that the surrounding database transaction rolled back.
    /// The write never happened: edits stay in memory for the caller to
    /// retry or cancel, and any write locks are released.
    pub fn transaction_rolled_back(&mut self, concurrency: Option<&dyn ConcurrencyControl>) {
        if let Some(strategy) = concurrency {
            strategy.release_locks(self);
        }
        self.events.push(ObjectEvent::Updated);
    }
}

/// Bookkeeping carried from statement execution to post-commit
/// finalization.
#[derive(Debug)]
pub(crate) struct PendingApply {
    old_id: String,
    was_new: bool,
    was_deleted: bool,
    wrote: bool,
}

// ----------------------------------------------------------------------
// Loading
// ----------------------------------------------------------------------

/// Load one object by criteria, resolving through the identity map so a
/// previously-loaded live instance is refreshed in place rather than
/// duplicated. Fails with a not-found error when no row matches.
#[tracing::instrument(level = "debug", skip_all, fields(class = class.class_name()))]
pub fn load_object(
    class: &Arc<ClassDefinition>,
    registry: &MetadataRegistry,
    connection: &mut dyn DatabaseConnection,
    manager: &ObjectManager,
    concurrency: Option<&dyn ConcurrencyControl>,
    criteria: &Expression,
) -> Result<SharedObject> {
    let mut generator = ParameterNameGenerator::new();
    let clause = criteria.render(class, registry, &mut generator)?;
    let select = persist::select_statement(class, registry, Some(&clause), 1)?;
    let rows = connection.load_rows(&select)?;
    let Some(row) = rows.first() else {
        return Err(Error::NotFound {
            class_name: class.class_name().to_string(),
            criteria: clause.text().to_string(),
        });
    };
    materialize_row(class, registry, connection, manager, concurrency, row)
}

/// Turn one result row into a shared object, consulting the identity map
/// first. A cache hit routes through the concurrency strategy's silent
/// refresh instead of failing.
pub(crate) fn materialize_row(
    class: &Arc<ClassDefinition>,
    registry: &MetadataRegistry,
    connection: &mut dyn DatabaseConnection,
    manager: &ObjectManager,
    concurrency: Option<&dyn ConcurrencyControl>,
    row: &Row,
) -> Result<SharedObject> {
    let fresh = BusinessObject::from_row(Arc::clone(class), registry, row)?;
    let id = fresh.object_id(registry)?;
    if let Some(existing) = manager.get(&id) {
        if let Some(strategy) = concurrency {
            let mut bo = existing.borrow_mut();
            strategy.check_on_cache_hit(&mut bo, registry, connection)?;
        }
        return Ok(existing);
    }
    let shared = Rc::new(RefCell::new(fresh));
    manager.add(&id, &shared);
    Ok(shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use classmap_core::{
        ClassIdentity, PrimaryKeyDefinition, PropertyDefinition, PropertyDefinitionCollection,
        PropertyType, StaticLookup,
    };

    fn contact_class(registry: &MetadataRegistry) -> Arc<ClassDefinition> {
        let mut props = PropertyDefinitionCollection::new("Contact");
        props
            .add(PropertyDefinition::new("ContactID", PropertyType::Guid))
            .unwrap();
        props
            .add(PropertyDefinition::new("Surname", PropertyType::Text).compulsory(true))
            .unwrap();
        props
            .add(PropertyDefinition::new("Country", PropertyType::Int).lookup(Arc::new(
                StaticLookup::new(vec![("Namibia".to_string(), Value::Int(2))]),
            )))
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

    #[test]
    fn test_new_object_gets_surrogate_identity_and_is_clean() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let bo = BusinessObject::new(Arc::clone(&class), &registry).unwrap();
        assert!(bo.is_new());
        assert!(!bo.is_dirty());
        assert!(matches!(
            bo.get_property_value("ContactID").unwrap(),
            Value::Uuid(_)
        ));
    }

    #[test]
    fn test_set_property_value_implicitly_begins_edit() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut bo = BusinessObject::new(Arc::clone(&class), &registry).unwrap();
        assert!(!bo.is_editing());
        bo.set_property_value(&registry, "Surname", Value::Text("Smith".to_string()))
            .unwrap();
        assert!(bo.is_editing());
        assert!(bo.is_dirty());
        let events = bo.take_events();
        assert_eq!(
            events,
            vec![
                ObjectEvent::PropertyUpdated {
                    property: "Surname".to_string()
                },
                ObjectEvent::Updated,
            ]
        );
        assert!(bo.take_events().is_empty());
    }

    #[test]
    fn test_set_property_resolves_lookup_display_value() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut bo = BusinessObject::new(Arc::clone(&class), &registry).unwrap();
        bo.set_property_value(&registry, "Country", Value::Text("Namibia".to_string()))
            .unwrap();
        assert_eq!(bo.get_property_value("Country").unwrap(), Value::Int(2));
        assert_eq!(bo.get_property_display("Country").unwrap(), "Namibia");
    }

    #[test]
    fn test_unknown_property_name_fails() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut bo = BusinessObject::new(Arc::clone(&class), &registry).unwrap();
        assert!(matches!(
            bo.set_property_value(&registry, "Nope", Value::Int(1)),
            Err(Error::InvalidPropertyName { .. })
        ));
        assert!(matches!(
            bo.get_property_value("Nope"),
            Err(Error::InvalidPropertyName { .. })
        ));
    }

    #[test]
    fn test_cancel_edit_restores_and_unmarks_delete() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut bo = BusinessObject::new(Arc::clone(&class), &registry).unwrap();
        bo.set_property_value(&registry, "Surname", Value::Text("Smith".to_string()))
            .unwrap();
        bo.delete(&registry).unwrap();
        assert!(bo.is_deleted());

        bo.cancel_edit(None);
        assert!(!bo.is_deleted());
        assert!(!bo.is_dirty());
        assert!(!bo.is_editing());
        assert_eq!(bo.get_property_value("Surname").unwrap(), Value::Null);
    }

    #[test]
    fn test_guid_string_coerces_on_set() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let mut bo = BusinessObject::new(Arc::clone(&class), &registry).unwrap();
        let id = uuid::Uuid::new_v4();
        bo.set_property_value(&registry, "ContactID", Value::Text(id.to_string()))
            .unwrap();
        assert_eq!(bo.get_property_value("ContactID").unwrap(), Value::Uuid(id));
    }

    #[test]
    fn test_object_id_is_stable_across_key_snapshot() {
        let registry = MetadataRegistry::new();
        let class = contact_class(&registry);
        let bo = BusinessObject::new(Arc::clone(&class), &registry).unwrap();
        let id1 = bo.object_id(&registry).unwrap();
        let id2 = bo.object_id(&registry).unwrap();
        assert_eq!(id1, id2);
        assert!(id1.starts_with("Contact:"));
    }
}
