//! The metadata registry: the shared catalogue of class definitions.
//!
//! Every inheritance-aware operation takes the registry by reference, so
//! tests and embedding applications can hold independent catalogues instead
//! of sharing mutable global state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::def::class::{ClassDefinition, ClassIdentity};
use crate::error::{Error, Result};

/// Catalogue of registered class definitions keyed by identity.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: RwLock<HashMap<ClassIdentity, Arc<ClassDefinition>>>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class definition. Fails when the identity is already
    /// registered.
    pub fn register(&self, definition: ClassDefinition) -> Result<Arc<ClassDefinition>> {
        let identity = definition.identity().clone();
        let mut classes = self.classes.write().unwrap();
        if classes.contains_key(&identity) {
            return Err(Error::Definition(format!(
                "class '{identity}' is already registered"
            )));
        }
        let definition = Arc::new(definition);
        classes.insert(identity.clone(), Arc::clone(&definition));
        tracing::debug!(class = %identity, "registered class definition");
        Ok(definition)
    }

    /// Look up a definition by identity.
    #[must_use]
    pub fn get(&self, identity: &ClassIdentity) -> Option<Arc<ClassDefinition>> {
        self.classes.read().unwrap().get(identity).cloned()
    }

    /// Look up a definition by bare class name. Returns `None` when the name
    /// is absent or ambiguous across assemblies.
    #[must_use]
    pub fn get_by_class_name(&self, class_name: &str) -> Option<Arc<ClassDefinition>> {
        let classes = self.classes.read().unwrap();
        let mut matches = classes
            .values()
            .filter(|d| d.identity().class() == class_name);
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(Arc::clone(first))
    }

    /// The inheritance chain of `identity`, most-derived first, starting at
    /// the class itself and ending at the hierarchy root.
    pub fn hierarchy(&self, identity: &ClassIdentity) -> Result<Vec<Arc<ClassDefinition>>> {
        let mut chain = Vec::new();
        let mut current = self.get(identity).ok_or_else(|| {
            Error::Definition(format!("class '{identity}' is not registered"))
        })?;
        loop {
            chain.push(Arc::clone(&current));
            match current.superclass_def() {
                Some(sup) => {
                    let parent = sup.resolve(self)?;
                    // Guard against definition cycles.
                    if chain.iter().any(|c| c.identity() == parent.identity()) {
                        return Err(Error::Definition(format!(
                            "inheritance cycle detected at class '{}'",
                            parent.identity()
                        )));
                    }
                    current = parent;
                }
                None => return Ok(chain),
            }
        }
    }

    /// Classes whose direct superclass is `identity`.
    #[must_use]
    pub fn immediate_children(&self, identity: &ClassIdentity) -> Vec<Arc<ClassDefinition>> {
        self.classes
            .read()
            .unwrap()
            .values()
            .filter(|d| {
                d.superclass_def()
                    .is_some_and(|s| s.superclass() == identity)
            })
            .cloned()
            .collect()
    }

    /// All transitive subclasses of `identity`.
    #[must_use]
    pub fn all_children(&self, identity: &ClassIdentity) -> Vec<Arc<ClassDefinition>> {
        let mut found = Vec::new();
        let mut frontier = vec![identity.clone()];
        while let Some(next) = frontier.pop() {
            for child in self.immediate_children(&next) {
                frontier.push(child.identity().clone());
                found.push(child);
            }
        }
        found
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.read().unwrap().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.read().unwrap().is_empty()
    }

    /// Remove every registered definition. Intended for test isolation.
    pub fn reset(&self) {
        self.classes.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::class::{InheritanceStrategy, SuperClassDefinition};
    use crate::def::property::PropertyDefinitionCollection;

    fn identity(class: &str) -> ClassIdentity {
        ClassIdentity::new("app", class)
    }

    fn class(name: &str) -> ClassDefinition {
        ClassDefinition::new(
            identity(name),
            PropertyDefinitionCollection::new(name),
            None,
        )
    }

    fn subclass(name: &str, parent: &str) -> ClassDefinition {
        class(name).superclass(SuperClassDefinition::new(
            identity(parent),
            InheritanceStrategy::ClassTable,
        ))
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = MetadataRegistry::new();
        registry.register(class("Shape")).unwrap();
        assert!(registry.register(class("Shape")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_hierarchy_most_derived_first() {
        let registry = MetadataRegistry::new();
        registry.register(class("Shape")).unwrap();
        registry.register(subclass("Circle", "Shape")).unwrap();
        registry.register(subclass("FilledCircle", "Circle")).unwrap();

        let chain = registry.hierarchy(&identity("FilledCircle")).unwrap();
        let names: Vec<_> = chain.iter().map(|c| c.class_name().to_string()).collect();
        assert_eq!(names, ["FilledCircle", "Circle", "Shape"]);
    }

    #[test]
    fn test_children_queries() {
        let registry = MetadataRegistry::new();
        registry.register(class("Shape")).unwrap();
        registry.register(subclass("Circle", "Shape")).unwrap();
        registry.register(subclass("Square", "Shape")).unwrap();
        registry.register(subclass("FilledCircle", "Circle")).unwrap();

        let mut immediate: Vec<_> = registry
            .immediate_children(&identity("Shape"))
            .iter()
            .map(|c| c.class_name().to_string())
            .collect();
        immediate.sort();
        assert_eq!(immediate, ["Circle", "Square"]);

        let mut all: Vec<_> = registry
            .all_children(&identity("Shape"))
            .iter()
            .map(|c| c.class_name().to_string())
            .collect();
        all.sort();
        assert_eq!(all, ["Circle", "FilledCircle", "Square"]);
    }

    #[test]
    fn test_get_by_class_name_rejects_ambiguity() {
        let registry = MetadataRegistry::new();
        registry.register(class("Shape")).unwrap();
        assert!(registry.get_by_class_name("Shape").is_some());

        registry
            .register(ClassDefinition::new(
                ClassIdentity::new("other", "Shape"),
                PropertyDefinitionCollection::new("Shape"),
                None,
            ))
            .unwrap();
        assert!(registry.get_by_class_name("Shape").is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let registry = MetadataRegistry::new();
        registry.register(class("Shape")).unwrap();
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.get(&identity("Shape")).is_none());
    }
}
