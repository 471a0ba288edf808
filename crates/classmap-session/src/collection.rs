//! Typed collections of business objects.
//!
//! A [`BusinessObjectCollection`] is bound to one class definition and
//! remembers the criteria it was loaded with, so `refresh` can re-run the
//! same query. Loading resolves every row through the identity map, which
//! keeps previously-loaded live instances instead of duplicating them.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use classmap_core::{
    ClassDefinition, DatabaseConnection, Error, MetadataRegistry, ParameterNameGenerator, Result,
    SqlStatement, Value,
};
use classmap_query::{parse_criteria, Expression, OrderClause};

use crate::batch::CommitBatch;
use crate::concurrency::ConcurrencyControl;
use crate::object::{PersistenceContext, SharedObject};
use crate::object_manager::ObjectManager;
use crate::persist;

/// An ordered, identity-indexed collection of objects of one class.
#[derive(Debug)]
pub struct BusinessObjectCollection {
    class: Arc<ClassDefinition>,
    items: Vec<SharedObject>,
    index: HashMap<String, SharedObject>,
    criteria: Option<Expression>,
    order_by: Option<OrderClause>,
    limit: i64,
}

impl BusinessObjectCollection {
    /// Create an empty collection bound to `class`.
    #[must_use]
    pub fn new(class: Arc<ClassDefinition>) -> Self {
        Self {
            class,
            items: Vec::new(),
            index: HashMap::new(),
            criteria: None,
            order_by: None,
            limit: -1,
        }
    }

    /// The bound class definition.
    #[must_use]
    pub fn class(&self) -> &Arc<ClassDefinition> {
        &self.class
    }

    /// Number of contained objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The object at `index`, in load/sort order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SharedObject> {
        self.items.get(index)
    }

    /// The contained object with the given identity string, if any.
    #[must_use]
    pub fn find_by_id(&self, object_id: &str) -> Option<&SharedObject> {
        self.index.get(object_id)
    }

    /// Iterate the objects in order.
    pub fn iter(&self) -> std::slice::Iter<'_, SharedObject> {
        self.items.iter()
    }

    /// Whether `object` is contained, by persisted identity.
    pub fn contains(&self, registry: &MetadataRegistry, object: &SharedObject) -> Result<bool> {
        let id = object.borrow().object_id(registry)?;
        Ok(self.index.contains_key(&id))
    }

    /// Append an object. The object's class must be the bound class or one
    /// of its descendants; adding an already-contained identity is a no-op.
    pub fn add(&mut self, registry: &MetadataRegistry, object: SharedObject) -> Result<()> {
        let id = {
            let bo = object.borrow();
            let mut related = false;
            for ancestor in registry.hierarchy(bo.class().identity())? {
                if ancestor.identity() == self.class.identity() {
                    related = true;
                    break;
                }
            }
            if !related {
                return Err(Error::Definition(format!(
                    "object of class '{}' cannot be added to a collection of '{}'",
                    bo.class().class_name(),
                    self.class.class_name()
                )));
            }
            bo.object_id(registry)?
        };
        if self.index.contains_key(&id) {
            return Ok(());
        }
        self.index.insert(id, object.clone());
        self.items.push(object);
        Ok(())
    }

    /// Remove an object by identity. Returns whether it was present.
    pub fn remove(&mut self, registry: &MetadataRegistry, object: &SharedObject) -> Result<bool> {
        let id = object.borrow().object_id(registry)?;
        if self.index.remove(&id).is_none() {
            return Ok(false);
        }
        self.items.retain(|item| !Rc::ptr_eq(item, object));
        Ok(true)
    }

    /// Drop every contained object. The stored criteria are kept.
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load the collection from the database.
    ///
    /// `criteria` is a parseable search expression (`None` loads every
    /// row of the class), `order_by` a comma-separated property list with
    /// optional `ASC`/`DESC`, and a non-negative `limit` caps the row
    /// count. The parsed forms are stored so [`Self::refresh`] repeats the
    /// same query.
    #[tracing::instrument(level = "debug", skip_all, fields(class = self.class.class_name()))]
    pub fn load(
        &mut self,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        manager: &ObjectManager,
        concurrency: Option<&dyn ConcurrencyControl>,
        criteria: Option<&str>,
        order_by: Option<&str>,
        limit: i64,
    ) -> Result<()> {
        self.load_with(
            registry,
            connection,
            manager,
            concurrency,
            criteria.map(parse_criteria).transpose()?,
            order_by,
            limit,
        )
    }

    /// Load from an already-built criteria expression. Used where the
    /// criteria carries runtime values, such as relationship navigation.
    pub fn load_with(
        &mut self,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        manager: &ObjectManager,
        concurrency: Option<&dyn ConcurrencyControl>,
        criteria: Option<Expression>,
        order_by: Option<&str>,
        limit: i64,
    ) -> Result<()> {
        self.criteria = criteria;
        self.order_by = order_by.map(OrderClause::parse).transpose()?;
        self.limit = limit;
        self.refresh(registry, connection, manager, concurrency)
    }

    /// Re-run the stored query, replacing the contents. Rows whose
    /// identity is already live come back as the same instance.
    pub fn refresh(
        &mut self,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        manager: &ObjectManager,
        concurrency: Option<&dyn ConcurrencyControl>,
    ) -> Result<()> {
        let select = self.build_select(registry)?;
        let rows = connection.load_rows(&select)?;
        self.clear();
        for row in &rows {
            let object = crate::object::materialize_row(
                &self.class,
                registry,
                connection,
                manager,
                concurrency,
                row,
            )?;
            self.add(registry, object)?;
        }
        Ok(())
    }

    /// The SELECT for the stored criteria, ordering and limit.
    fn build_select(&self, registry: &MetadataRegistry) -> Result<SqlStatement> {
        let mut generator = ParameterNameGenerator::new();
        let clause = self
            .criteria
            .as_ref()
            .map(|expression| expression.render(&self.class, registry, &mut generator))
            .transpose()?;
        let mut select =
            persist::select_statement(&self.class, registry, clause.as_ref(), -1)?;
        if let Some(order) = &self.order_by {
            let mut rendered = Vec::with_capacity(order.terms().len());
            for term in order.terms() {
                let definition = self.class.get_property_def(registry, &term.property)?;
                let direction = if term.descending { " DESC" } else { "" };
                rendered.push(format!("\"{}\"{}", definition.field(), direction));
            }
            select.push(&format!(" ORDER BY {}", rendered.join(", ")));
        }
        if self.limit >= 0 {
            select.push(&format!(" LIMIT {}", self.limit));
        }
        Ok(select)
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// Sort the collection in place by an order expression such as
    /// `"Surname DESC, Age"`. NULL sorts lowest.
    pub fn sort(&mut self, order_by: &str) -> Result<()> {
        let order = OrderClause::parse(order_by)?;
        self.items.sort_by(|a, b| {
            order.compare_with(a, b, |object: &SharedObject, property| {
                object
                    .borrow()
                    .get_property_value(property)
                    .unwrap_or(Value::Null)
            })
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Set operations
    // ------------------------------------------------------------------

    /// A new collection holding every object in `self` or `other`, by
    /// identity, in first-seen order.
    pub fn union(
        &self,
        registry: &MetadataRegistry,
        other: &BusinessObjectCollection,
    ) -> Result<BusinessObjectCollection> {
        let mut result = BusinessObjectCollection::new(Arc::clone(&self.class));
        for object in self.items.iter().chain(other.items.iter()) {
            result.add(registry, object.clone())?;
        }
        Ok(result)
    }

    /// A new collection holding the objects present in both `self` and
    /// `other`, by identity, in `self`'s order.
    pub fn intersection(
        &self,
        registry: &MetadataRegistry,
        other: &BusinessObjectCollection,
    ) -> Result<BusinessObjectCollection> {
        let mut result = BusinessObjectCollection::new(Arc::clone(&self.class));
        for object in &self.items {
            if other.contains(registry, object)? {
                result.add(registry, object.clone())?;
            }
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Commit every new or dirty member in one batched transaction.
    pub fn apply_all_edits(&self, ctx: &mut PersistenceContext<'_>) -> Result<()> {
        let mut batch = CommitBatch::new();
        for object in &self.items {
            let pending = {
                let bo = object.borrow();
                bo.is_new() || bo.is_dirty()
            };
            if pending {
                batch.add(object, ctx.registry, ctx.connection, ctx.concurrency)?;
            }
        }
        batch.commit(ctx)
    }
}

impl<'a> IntoIterator for &'a BusinessObjectCollection {
    type Item = &'a SharedObject;
    type IntoIter = std::slice::Iter<'a, SharedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
