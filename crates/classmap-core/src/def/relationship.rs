//! Relationship definitions: navigable associations between mapped classes.

use serde::{Deserialize, Serialize};

use crate::def::class::{ClassDefinition, ClassIdentity};
use crate::def::registry::MetadataRegistry;
use crate::error::{Error, Result};

/// Maps one owning-class property onto the related-class property it
/// correlates with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipPropertyDefinition {
    /// Property on the owning class holding the foreign-key value.
    pub owner_property: String,
    /// Property on the related class the value correlates to.
    pub related_property: String,
}

impl RelationshipPropertyDefinition {
    /// Create a correlation pair.
    #[must_use]
    pub fn new(owner_property: impl Into<String>, related_property: impl Into<String>) -> Self {
        Self {
            owner_property: owner_property.into(),
            related_property: related_property.into(),
        }
    }
}

/// The ordered set of property correlations a relationship navigates on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationshipKeyDefinition {
    pairs: Vec<RelationshipPropertyDefinition>,
}

impl RelationshipKeyDefinition {
    /// Create an empty relationship key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a correlation pair. Fails on a duplicate owner property.
    pub fn add(&mut self, pair: RelationshipPropertyDefinition) -> Result<()> {
        if self
            .pairs
            .iter()
            .any(|p| p.owner_property == pair.owner_property)
        {
            return Err(Error::Definition(format!(
                "relationship key already correlates owner property '{}'",
                pair.owner_property
            )));
        }
        self.pairs.push(pair);
        Ok(())
    }

    /// The correlation pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[RelationshipPropertyDefinition] {
        &self.pairs
    }

    /// Whether the key holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Whether the relationship resolves to at most one or many objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipCardinality {
    /// Zero or one related object.
    Single,
    /// Zero or more related objects.
    Multiple,
}

/// Metadata describing one navigable association.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDefinition {
    name: String,
    related_class: ClassIdentity,
    key: RelationshipKeyDefinition,
    cardinality: RelationshipCardinality,
    keep_reference: bool,
    reverse_name: Option<String>,
    order_by: Option<String>,
}

impl RelationshipDefinition {
    /// Create a single (to-one) relationship.
    #[must_use]
    pub fn single(
        name: impl Into<String>,
        related_class: ClassIdentity,
        key: RelationshipKeyDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            related_class,
            key,
            cardinality: RelationshipCardinality::Single,
            keep_reference: true,
            reverse_name: None,
            order_by: None,
        }
    }

    /// Create a multiple (to-many) relationship.
    #[must_use]
    pub fn multiple(
        name: impl Into<String>,
        related_class: ClassIdentity,
        key: RelationshipKeyDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            related_class,
            key,
            cardinality: RelationshipCardinality::Multiple,
            keep_reference: true,
            reverse_name: None,
            order_by: None,
        }
    }

    /// Whether the runtime relationship caches its resolved target.
    #[must_use]
    pub fn keep_reference(mut self, value: bool) -> Self {
        self.keep_reference = value;
        self
    }

    /// Name of the reverse relationship declared on the related class.
    #[must_use]
    pub fn reverse_name(mut self, name: impl Into<String>) -> Self {
        self.reverse_name = Some(name.into());
        self
    }

    /// Order-by clause applied when resolving a multiple relationship.
    #[must_use]
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    /// The relationship name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the related class, resolved lazily through the registry.
    #[must_use]
    pub fn related_class(&self) -> &ClassIdentity {
        &self.related_class
    }

    /// The correlation key.
    #[must_use]
    pub fn key(&self) -> &RelationshipKeyDefinition {
        &self.key
    }

    /// Single or multiple.
    #[must_use]
    pub fn cardinality(&self) -> RelationshipCardinality {
        self.cardinality
    }

    /// Whether the resolved target is cached by the runtime relationship.
    #[must_use]
    pub fn keeps_reference(&self) -> bool {
        self.keep_reference
    }

    /// The reverse relationship name, if declared.
    #[must_use]
    pub fn reverse(&self) -> Option<&str> {
        self.reverse_name.as_deref()
    }

    /// The order-by clause for multiple relationships.
    #[must_use]
    pub fn order_clause(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    /// A relationship is compulsory when the owning side holds foreign-key
    /// properties that are themselves compulsory.
    #[must_use]
    pub fn is_compulsory(&self, owning_class: &ClassDefinition) -> bool {
        !self.key.is_empty()
            && self.key.pairs().iter().all(|pair| {
                owning_class
                    .property_defs()
                    .get(&pair.owner_property)
                    .is_some_and(|d| d.is_compulsory())
            })
    }

    /// A single relationship is one-to-one when its declared reverse
    /// relationship is itself single.
    pub fn is_one_to_one(&self, registry: &MetadataRegistry) -> Result<bool> {
        if self.cardinality != RelationshipCardinality::Single {
            return Ok(false);
        }
        let Some(reverse) = self.reverse_name.as_deref() else {
            return Ok(false);
        };
        let related = registry.get(&self.related_class).ok_or_else(|| {
            Error::Definition(format!(
                "related class '{}' is not registered",
                self.related_class
            ))
        })?;
        Ok(related
            .relationship(reverse)
            .is_some_and(|r| r.cardinality() == RelationshipCardinality::Single))
    }
}
