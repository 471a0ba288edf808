//! Runtime relationships: navigable associations resolved from live
//! foreign-key values.
//!
//! A [`Relationship`] pairs a `RelationshipDefinition` with the owning
//! object's property cells. Resolving builds a correlation criteria from
//! the relationship key (`relatedProp = ownerValue`, or `relatedProp IS
//! NULL` for a null owner value) and loads the target through the identity
//! map. A keep-reference relationship caches what it resolved until the
//! owner's key values change.

use std::sync::Arc;

use classmap_core::{
    ClassDefinition, DatabaseConnection, Error, MetadataRegistry, RelationshipCardinality,
    RelationshipDefinition, RelationshipPropertyDefinition, Result,
};
use classmap_query::Expression;

use crate::collection::BusinessObjectCollection;
use crate::concurrency::ConcurrencyControl;
use crate::object::{load_object, SharedObject};
use crate::object_manager::ObjectManager;
use crate::prop::PropertyCollection;

/// One navigable association bound to a live owner.
#[derive(Debug)]
pub struct Relationship {
    definition: RelationshipDefinition,
    // Resolved targets keyed by the owner key values they were loaded for.
    cached: Option<(String, Vec<SharedObject>)>,
}

impl Relationship {
    /// Bind a definition. Nothing is resolved until first navigation.
    #[must_use]
    pub fn new(definition: RelationshipDefinition) -> Self {
        Self {
            definition,
            cached: None,
        }
    }

    /// The backing definition.
    #[must_use]
    pub fn definition(&self) -> &RelationshipDefinition {
        &self.definition
    }

    /// The relationship name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// The correlation criteria against the related class, built from the
    /// owner's current key values. A null owner value correlates as
    /// `relatedProp IS NULL`.
    pub fn criteria(&self, owner: &PropertyCollection) -> Result<Expression> {
        let mut pairs = self.definition.key().pairs().iter();
        let Some(first) = pairs.next() else {
            return Err(Error::Definition(format!(
                "relationship '{}' has no correlation key",
                self.definition.name()
            )));
        };
        let mut expression = self.compare(owner, first)?;
        for pair in pairs {
            expression = expression.and(self.compare(owner, pair)?);
        }
        Ok(expression)
    }

    fn compare(
        &self,
        owner: &PropertyCollection,
        pair: &RelationshipPropertyDefinition,
    ) -> Result<Expression> {
        let property = owner.get(&pair.owner_property).ok_or_else(|| {
            Error::Definition(format!(
                "relationship '{}' correlates on property '{}' which the owner does not hold",
                self.definition.name(),
                pair.owner_property
            ))
        })?;
        Ok(Expression::eq(
            pair.related_property.clone(),
            property.value().clone(),
        ))
    }

    // The cache key: owner key values at resolve time. A changed
    // foreign-key value invalidates the cached target.
    fn fingerprint(&self, owner: &PropertyCollection) -> Result<String> {
        let mut parts = Vec::with_capacity(self.definition.key().pairs().len());
        for pair in self.definition.key().pairs() {
            let property = owner.get(&pair.owner_property).ok_or_else(|| {
                Error::Definition(format!(
                    "relationship '{}' correlates on property '{}' which the owner does not hold",
                    self.definition.name(),
                    pair.owner_property
                ))
            })?;
            parts.push(format!("{}={}", pair.owner_property, property.value()));
        }
        Ok(parts.join("&"))
    }

    fn related_class(&self, registry: &MetadataRegistry) -> Result<Arc<ClassDefinition>> {
        registry.get(self.definition.related_class()).ok_or_else(|| {
            Error::Definition(format!(
                "related class '{}' is not registered",
                self.definition.related_class()
            ))
        })
    }

    /// Resolve a single relationship to its zero-or-one target.
    #[tracing::instrument(level = "debug", skip_all, fields(relationship = self.definition.name()))]
    pub fn resolve_single(
        &mut self,
        owner: &PropertyCollection,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        manager: &ObjectManager,
        concurrency: Option<&dyn ConcurrencyControl>,
    ) -> Result<Option<SharedObject>> {
        if self.definition.cardinality() != RelationshipCardinality::Single {
            return Err(Error::Definition(format!(
                "relationship '{}' resolves to many objects; load it as a collection",
                self.definition.name()
            )));
        }
        let fingerprint = self.fingerprint(owner)?;
        if self.definition.keeps_reference() {
            if let Some((cached_for, targets)) = &self.cached {
                if *cached_for == fingerprint {
                    return Ok(targets.first().cloned());
                }
            }
        }
        let related = self.related_class(registry)?;
        let criteria = self.criteria(owner)?;
        let target = match load_object(&related, registry, connection, manager, concurrency, &criteria)
        {
            Ok(object) => Some(object),
            Err(Error::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        if self.definition.keeps_reference() {
            self.cached = Some((fingerprint, target.iter().cloned().collect()));
        }
        Ok(target)
    }

    /// Resolve a multiple relationship to its zero-or-more targets,
    /// applying the definition's order-by clause.
    #[tracing::instrument(level = "debug", skip_all, fields(relationship = self.definition.name()))]
    pub fn resolve_many(
        &mut self,
        owner: &PropertyCollection,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
        manager: &ObjectManager,
        concurrency: Option<&dyn ConcurrencyControl>,
    ) -> Result<BusinessObjectCollection> {
        if self.definition.cardinality() != RelationshipCardinality::Multiple {
            return Err(Error::Definition(format!(
                "relationship '{}' resolves to a single object",
                self.definition.name()
            )));
        }
        let related = self.related_class(registry)?;
        let fingerprint = self.fingerprint(owner)?;
        if self.definition.keeps_reference() {
            if let Some((cached_for, targets)) = &self.cached {
                if *cached_for == fingerprint {
                    let mut collection = BusinessObjectCollection::new(related);
                    for object in targets {
                        collection.add(registry, object.clone())?;
                    }
                    return Ok(collection);
                }
            }
        }
        let mut collection = BusinessObjectCollection::new(related);
        collection.load_with(
            registry,
            connection,
            manager,
            concurrency,
            Some(self.criteria(owner)?),
            self.definition.order_clause(),
            -1,
        )?;
        if self.definition.keeps_reference() {
            self.cached = Some((fingerprint, collection.iter().cloned().collect()));
        }
        Ok(collection)
    }
}

/// The full set of runtime relationships for one object instance: its own
/// class's declarations plus every ancestor's, most-derived first.
#[derive(Debug, Default)]
pub struct RelationshipCollection {
    items: Vec<Relationship>,
}

impl RelationshipCollection {
    pub(crate) fn from_class(
        class: &ClassDefinition,
        registry: &MetadataRegistry,
    ) -> Result<Self> {
        let mut items: Vec<Relationship> = Vec::new();
        for ancestor in registry.hierarchy(class.identity())? {
            for definition in ancestor.relationships() {
                // Descendant declarations shadow same-named ancestor ones.
                if items.iter().any(|r| r.name() == definition.name()) {
                    continue;
                }
                items.push(Relationship::new(definition.clone()));
            }
        }
        Ok(Self { items })
    }

    /// Look up a relationship by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.name() == name)
    }

    /// Look up a relationship mutably by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Relationship> {
        self.items.iter_mut().find(|r| r.name() == name)
    }

    /// Relationships in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection holds no relationships.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
