//! Key definitions: uniqueness constraints over ordered property sets.

use std::sync::Arc;

use crate::def::property::PropertyDefinition;
use crate::error::{Error, Result};

/// An ordered set of property definitions forming a uniqueness constraint.
#[derive(Debug, Clone)]
pub struct KeyDefinition {
    explicit_name: Option<String>,
    members: Vec<Arc<PropertyDefinition>>,
    ignore_nulls: bool,
}

impl KeyDefinition {
    /// Create a key with an explicit, fixed name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            explicit_name: if name.is_empty() { None } else { Some(name) },
            members: Vec::new(),
            ignore_nulls: false,
        }
    }

    /// Create a key whose name derives from its member property names.
    #[must_use]
    pub fn new() -> Self {
        Self::named(String::new())
    }

    /// Skip duplicate checking when any member value is null.
    #[must_use]
    pub fn ignore_nulls(mut self, value: bool) -> Self {
        self.ignore_nulls = value;
        self
    }

    /// The key name: explicit if given, otherwise the `_`-joined member
    /// property names in order.
    #[must_use]
    pub fn name(&self) -> String {
        match &self.explicit_name {
            Some(name) => name.clone(),
            None => self
                .members
                .iter()
                .map(|m| m.name())
                .collect::<Vec<_>>()
                .join("_"),
        }
    }

    /// Whether null members suppress duplicate checks.
    #[must_use]
    pub fn ignores_nulls(&self) -> bool {
        self.ignore_nulls
    }

    /// Add a member property. Fails on an unnamed definition or a duplicate.
    pub fn add(&mut self, definition: Arc<PropertyDefinition>) -> Result<()> {
        if definition.name().is_empty() {
            return Err(Error::Definition(
                "a key member must have a non-empty property name".to_string(),
            ));
        }
        if self.contains(definition.name()) {
            return Err(Error::Definition(format!(
                "key '{}' already contains property '{}'",
                self.name(),
                definition.name()
            )));
        }
        self.members.push(definition);
        Ok(())
    }

    /// Remove a member by property name. Removing an absent member is a
    /// no-op.
    pub fn remove(&mut self, property_name: &str) {
        self.members.retain(|m| m.name() != property_name);
    }

    /// Whether a member with this property name exists.
    #[must_use]
    pub fn contains(&self, property_name: &str) -> bool {
        self.members.iter().any(|m| m.name() == property_name)
    }

    /// Ordered members.
    #[must_use]
    pub fn members(&self) -> &[Arc<PropertyDefinition>] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the key has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A key is valid once it holds at least one member.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.members.is_empty()
    }
}

impl Default for KeyDefinition {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for KeyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
            && self.ignore_nulls == other.ignore_nulls
            && self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(other.members.iter())
                .all(|(a, b)| **a == **b)
    }
}

/// The object-identity key of a class.
///
/// With `is_object_id` set, the key is a single generated surrogate
/// identity value rather than a natural/composite key.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyDefinition {
    key: KeyDefinition,
    is_object_id: bool,
}

impl PrimaryKeyDefinition {
    /// Wrap a key definition as the primary key.
    #[must_use]
    pub fn new(key: KeyDefinition) -> Self {
        Self {
            key,
            is_object_id: false,
        }
    }

    /// Build a surrogate object-id primary key over a single Guid property.
    pub fn object_id(property: Arc<PropertyDefinition>) -> Result<Self> {
        let mut key = KeyDefinition::new();
        key.add(property)?;
        Ok(Self {
            key,
            is_object_id: true,
        })
    }

    /// Whether this is a surrogate object-id key.
    #[must_use]
    pub fn is_object_id(&self) -> bool {
        self.is_object_id
    }

    /// The underlying key definition.
    #[must_use]
    pub fn key(&self) -> &KeyDefinition {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertyType;

    fn prop(name: &str) -> Arc<PropertyDefinition> {
        Arc::new(PropertyDefinition::new(name, PropertyType::Text))
    }

    #[test]
    fn test_derived_name_joins_member_names() {
        let mut key = KeyDefinition::new();
        key.add(prop("Surname")).unwrap();
        key.add(prop("FirstName")).unwrap();
        assert_eq!(key.name(), "Surname_FirstName");
    }

    #[test]
    fn test_explicit_name_is_fixed() {
        let mut key = KeyDefinition::named("NaturalKey");
        key.add(prop("Surname")).unwrap();
        assert_eq!(key.name(), "NaturalKey");
    }

    #[test]
    fn test_duplicate_member_fails() {
        let mut key = KeyDefinition::new();
        key.add(prop("Surname")).unwrap();
        assert!(key.add(prop("Surname")).is_err());
        assert_eq!(key.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut key = KeyDefinition::new();
        key.add(prop("Surname")).unwrap();
        key.remove("Surname");
        key.remove("Surname");
        assert!(key.is_empty());
        assert!(!key.is_valid());
    }

    #[test]
    fn test_object_id_primary_key() {
        let pk = PrimaryKeyDefinition::object_id(Arc::new(PropertyDefinition::new(
            "ContactID",
            PropertyType::Guid,
        )))
        .unwrap();
        assert!(pk.is_object_id());
        assert_eq!(pk.key().name(), "ContactID");
        assert!(pk.key().is_valid());
    }
}
