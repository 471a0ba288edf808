//! Class definitions: the per-class mapping metadata and its inheritance
//! structure.
//!
//! A `ClassDefinition` describes how one mapped class stores itself: its
//! locally-declared properties, primary and alternate keys, relationships,
//! table mapping, and (optionally) its superclass together with the
//! inheritance strategy used to map the hierarchy onto tables.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::def::key::{KeyDefinition, PrimaryKeyDefinition};
use crate::def::property::{PropertyDefinition, PropertyDefinitionCollection};
use crate::def::registry::MetadataRegistry;
use crate::def::relationship::RelationshipDefinition;
use crate::error::{Error, Result};

/// Identity of a mapped class: assembly (module) name, class name, and an
/// optional generic type parameter distinguishing parameterized variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassIdentity {
    assembly: String,
    class: String,
    type_parameter: Option<String>,
}

impl ClassIdentity {
    /// Create an identity without a type parameter.
    #[must_use]
    pub fn new(assembly: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            assembly: assembly.into(),
            class: class.into(),
            type_parameter: None,
        }
    }

    /// Create an identity carrying a generic type parameter.
    #[must_use]
    pub fn parameterized(
        assembly: impl Into<String>,
        class: impl Into<String>,
        type_parameter: impl Into<String>,
    ) -> Self {
        Self {
            assembly: assembly.into(),
            class: class.into(),
            type_parameter: Some(type_parameter.into()),
        }
    }

    /// The assembly (module) name.
    #[must_use]
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    /// The bare class name.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// The generic type parameter, if any.
    #[must_use]
    pub fn type_parameter(&self) -> Option<&str> {
        self.type_parameter.as_deref()
    }
}

impl fmt::Display for ClassIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_parameter {
            Some(p) => write!(f, "{}.{}<{}>", self.assembly, self.class, p),
            None => write!(f, "{}.{}", self.assembly, self.class),
        }
    }
}

/// How a subclass maps onto tables relative to its superclass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InheritanceStrategy {
    /// The whole hierarchy shares the root's table; a discriminator column
    /// records each row's concrete class.
    SingleTable { discriminator: String },
    /// Each class stores its locally-declared properties in its own table,
    /// joined on the shared primary key.
    ClassTable,
    /// Each concrete class stores the full flattened property set in its own
    /// table.
    ConcreteTable,
}

/// Links a class definition to its superclass and names the strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperClassDefinition {
    superclass: ClassIdentity,
    strategy: InheritanceStrategy,
}

impl SuperClassDefinition {
    /// Link to `superclass` using `strategy`.
    #[must_use]
    pub fn new(superclass: ClassIdentity, strategy: InheritanceStrategy) -> Self {
        Self {
            superclass,
            strategy,
        }
    }

    /// Identity of the superclass.
    #[must_use]
    pub fn superclass(&self) -> &ClassIdentity {
        &self.superclass
    }

    /// The inheritance strategy.
    #[must_use]
    pub fn strategy(&self) -> &InheritanceStrategy {
        &self.strategy
    }

    /// Resolve the superclass definition through the registry.
    pub fn resolve(&self, registry: &MetadataRegistry) -> Result<Arc<ClassDefinition>> {
        registry.get(&self.superclass).ok_or_else(|| {
            Error::Definition(format!(
                "superclass '{}' is not registered",
                self.superclass
            ))
        })
    }
}

/// The full mapping metadata of one class.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    identity: ClassIdentity,
    table_name: Option<String>,
    properties: PropertyDefinitionCollection,
    primary_key: Option<PrimaryKeyDefinition>,
    key_defs: Vec<KeyDefinition>,
    relationships: Vec<RelationshipDefinition>,
    superclass: Option<SuperClassDefinition>,
    /// Opaque UI layout payloads, keyed by UI definition name. Pass-through
    /// only; nothing in the mapping layer interprets them.
    ui_defs: serde_json::Map<String, serde_json::Value>,
}

impl ClassDefinition {
    /// Create a definition whose table name defaults from the class name.
    #[must_use]
    pub fn new(
        identity: ClassIdentity,
        properties: PropertyDefinitionCollection,
        primary_key: Option<PrimaryKeyDefinition>,
    ) -> Self {
        Self {
            identity,
            table_name: None,
            properties,
            primary_key,
            key_defs: Vec::new(),
            relationships: Vec::new(),
            superclass: None,
            ui_defs: serde_json::Map::new(),
        }
    }

    /// Override the mapped table name.
    #[must_use]
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Attach a superclass link.
    #[must_use]
    pub fn superclass(mut self, definition: SuperClassDefinition) -> Self {
        self.superclass = Some(definition);
        self
    }

    /// Add an alternate-key definition.
    #[must_use]
    pub fn key(mut self, key: KeyDefinition) -> Self {
        self.key_defs.push(key);
        self
    }

    /// Add a relationship definition.
    #[must_use]
    pub fn relationship_def(mut self, relationship: RelationshipDefinition) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Attach a named opaque UI layout payload.
    #[must_use]
    pub fn ui_def(mut self, name: impl Into<String>, payload: serde_json::Value) -> Self {
        self.ui_defs.insert(name.into(), payload);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The class identity.
    #[must_use]
    pub fn identity(&self) -> &ClassIdentity {
        &self.identity
    }

    /// The bare class name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        self.identity.class()
    }

    /// Locally-declared property definitions.
    #[must_use]
    pub fn property_defs(&self) -> &PropertyDefinitionCollection {
        &self.properties
    }

    /// The locally-declared primary key, if any. Under class-table
    /// inheritance subclasses usually declare none and share the root's; use
    /// [`ClassDefinition::resolve_primary_key`] to walk up.
    #[must_use]
    pub fn primary_key_def(&self) -> Option<&PrimaryKeyDefinition> {
        self.primary_key.as_ref()
    }

    /// Alternate-key definitions.
    #[must_use]
    pub fn key_defs(&self) -> &[KeyDefinition] {
        &self.key_defs
    }

    /// Relationship definitions declared on this class.
    #[must_use]
    pub fn relationships(&self) -> &[RelationshipDefinition] {
        &self.relationships
    }

    /// Look up a relationship by name.
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDefinition> {
        self.relationships.iter().find(|r| r.name() == name)
    }

    /// The superclass link, if any.
    #[must_use]
    pub fn superclass_def(&self) -> Option<&SuperClassDefinition> {
        self.superclass.as_ref()
    }

    /// Named UI payload, pass-through.
    #[must_use]
    pub fn ui_def_named(&self, name: &str) -> Option<&serde_json::Value> {
        self.ui_defs.get(name)
    }

    /// The table this class declares for itself, defaulting from the class
    /// name. Inheritance is not considered; see
    /// [`ClassDefinition::effective_table_name`].
    #[must_use]
    pub fn own_table_name(&self) -> &str {
        self.table_name.as_deref().unwrap_or_else(|| self.identity.class())
    }

    // ------------------------------------------------------------------
    // Inheritance-aware resolution
    // ------------------------------------------------------------------

    /// The table this class's rows actually live in.
    ///
    /// Single-table inheritance stores the whole hierarchy in the table of
    /// the topmost single-table ancestor; class-table and concrete-table
    /// classes store rows in their own table.
    pub fn effective_table_name(&self, registry: &MetadataRegistry) -> Result<String> {
        match &self.superclass {
            Some(sup) if matches!(sup.strategy(), InheritanceStrategy::SingleTable { .. }) => {
                sup.resolve(registry)?.effective_table_name(registry)
            }
            _ => Ok(self.own_table_name().to_string()),
        }
    }

    /// The table holding the column for `property_name`, as seen from this
    /// class.
    ///
    /// Single-table resolves to the root's table regardless of where the
    /// property is declared; class-table resolves to the declaring
    /// ancestor's table; concrete-table resolves to this (most-derived)
    /// class's table.
    pub fn table_name_for(
        &self,
        registry: &MetadataRegistry,
        property_name: &str,
    ) -> Result<String> {
        if self.properties.contains(property_name) {
            return self.effective_table_name(registry);
        }
        match &self.superclass {
            Some(sup) => match sup.strategy() {
                InheritanceStrategy::SingleTable { .. } => self.effective_table_name(registry),
                InheritanceStrategy::ConcreteTable => {
                    // The property must still exist somewhere up the chain.
                    self.get_property_def(registry, property_name)?;
                    Ok(self.own_table_name().to_string())
                }
                InheritanceStrategy::ClassTable => sup
                    .resolve(registry)?
                    .table_name_for(registry, property_name),
            },
            None => Err(Error::InvalidPropertyName {
                class_name: self.identity.class().to_string(),
                property_name: property_name.to_string(),
            }),
        }
    }

    /// Resolve the primary key, walking up the hierarchy when this class
    /// declares none of its own.
    pub fn resolve_primary_key(
        &self,
        registry: &MetadataRegistry,
    ) -> Result<PrimaryKeyDefinition> {
        if let Some(pk) = &self.primary_key {
            return Ok(pk.clone());
        }
        match &self.superclass {
            Some(sup) => sup.resolve(registry)?.resolve_primary_key(registry),
            None => Err(Error::Definition(format!(
                "class '{}' has no primary key anywhere in its hierarchy",
                self.identity
            ))),
        }
    }

    /// Find a property definition by name, searching this class then its
    /// ancestors. Returns `None` when no class in the hierarchy declares it.
    #[must_use]
    pub fn find_property_def(
        &self,
        registry: &MetadataRegistry,
        name: &str,
    ) -> Option<Arc<PropertyDefinition>> {
        if let Some(def) = self.properties.get(name) {
            return Some(Arc::clone(def));
        }
        let sup = self.superclass.as_ref()?.resolve(registry).ok()?;
        sup.find_property_def(registry, name)
    }

    /// Find a property definition by name, failing with
    /// [`Error::InvalidPropertyName`] when absent from the whole hierarchy.
    pub fn get_property_def(
        &self,
        registry: &MetadataRegistry,
        name: &str,
    ) -> Result<Arc<PropertyDefinition>> {
        self.find_property_def(registry, name).ok_or_else(|| {
            Error::InvalidPropertyName {
                class_name: self.identity.class().to_string(),
                property_name: name.to_string(),
            }
        })
    }

    /// Resolve a possibly-dotted property path such as
    /// `"Owner.Address.City"`: each dotted segment before the last names a
    /// relationship to follow, the last names a property on the final class.
    pub fn resolve_property_path(
        &self,
        registry: &MetadataRegistry,
        path: &str,
    ) -> Result<Arc<PropertyDefinition>> {
        match path.split_once('.') {
            None => self.get_property_def(registry, path),
            Some((relationship_name, rest)) => {
                let relationship = self
                    .find_relationship(registry, relationship_name)
                    .ok_or_else(|| Error::InvalidRelationshipPath {
                        class_name: self.identity.class().to_string(),
                        relationship_name: relationship_name.to_string(),
                    })?;
                let related = registry.get(relationship.related_class()).ok_or_else(|| {
                    Error::Definition(format!(
                        "related class '{}' is not registered",
                        relationship.related_class()
                    ))
                })?;
                related.resolve_property_path(registry, rest)
            }
        }
    }

    /// Find a relationship by name, searching this class then its ancestors.
    #[must_use]
    pub fn find_relationship(
        &self,
        registry: &MetadataRegistry,
        name: &str,
    ) -> Option<RelationshipDefinition> {
        if let Some(rel) = self.relationship(name) {
            return Some(rel.clone());
        }
        let sup = self.superclass.as_ref()?.resolve(registry).ok()?;
        sup.find_relationship(registry, name)
    }

    /// All property definitions visible on this class: its own plus every
    /// ancestor's, most-derived first. A subclass redeclaration shadows the
    /// ancestor's definition.
    pub fn all_property_defs(
        &self,
        registry: &MetadataRegistry,
    ) -> Result<Vec<Arc<PropertyDefinition>>> {
        let mut seen: Vec<Arc<PropertyDefinition>> = Vec::new();
        for class in registry.hierarchy(&self.identity)? {
            for def in class.property_defs().iter() {
                if !seen.iter().any(|d| d.name() == def.name()) {
                    seen.push(Arc::clone(def));
                }
            }
        }
        Ok(seen)
    }

    /// The discriminator column name, when this class participates in
    /// single-table inheritance.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        match self.superclass.as_ref().map(SuperClassDefinition::strategy) {
            Some(InheritanceStrategy::SingleTable { discriminator }) => Some(discriminator),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Cloning and equality
    // ------------------------------------------------------------------

    /// Shallow clone: property definition instances are shared with the
    /// original.
    #[must_use]
    pub fn clone_shallow(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            table_name: self.table_name.clone(),
            properties: self.properties.clone_shallow(self.identity.class()),
            primary_key: self.primary_key.clone(),
            key_defs: self.key_defs.clone(),
            relationships: self.relationships.clone(),
            superclass: self.superclass.clone(),
            ui_defs: self.ui_defs.clone(),
        }
    }

    /// Deep clone: property definition instances are duplicated.
    #[must_use]
    pub fn clone_deep(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            table_name: self.table_name.clone(),
            properties: self.properties.clone_deep(self.identity.class()),
            primary_key: self.primary_key.clone(),
            key_defs: self.key_defs.clone(),
            relationships: self.relationships.clone(),
            superclass: self.superclass.clone(),
            ui_defs: self.ui_defs.clone(),
        }
    }

    /// Null-safe structural equality: both absent counts as equal.
    #[must_use]
    pub fn structurally_equals(a: Option<&Self>, b: Option<&Self>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for ClassDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
            && self.own_table_name() == other.own_table_name()
            && self.properties == other.properties
            && self.primary_key == other.primary_key
            && self.key_defs == other.key_defs
            && self.relationships == other.relationships
            && self.superclass == other.superclass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertyType;

    fn identity(class: &str) -> ClassIdentity {
        ClassIdentity::new("app", class)
    }

    fn props(class: &str, names: &[&str]) -> PropertyDefinitionCollection {
        let mut col = PropertyDefinitionCollection::new(class);
        for name in names {
            col.add(PropertyDefinition::new(*name, PropertyType::Text))
                .unwrap();
        }
        col
    }

    fn pk(col: &PropertyDefinitionCollection, name: &str) -> PrimaryKeyDefinition {
        let mut key = KeyDefinition::new();
        key.add(Arc::clone(col.get(name).unwrap())).unwrap();
        PrimaryKeyDefinition::new(key)
    }

    /// Shape -> Circle (single table) -> FilledCircle (single table).
    fn single_table_registry() -> MetadataRegistry {
        let registry = MetadataRegistry::new();

        let shape_props = props("Shape", &["ShapeID", "ShapeName"]);
        let shape_pk = pk(&shape_props, "ShapeID");
        registry
            .register(
                ClassDefinition::new(identity("Shape"), shape_props, Some(shape_pk))
                    .table_name("tbShape"),
            )
            .unwrap();

        let circle_props = props("Circle", &["Radius"]);
        registry
            .register(
                ClassDefinition::new(identity("Circle"), circle_props, None).superclass(
                    SuperClassDefinition::new(
                        identity("Shape"),
                        InheritanceStrategy::SingleTable {
                            discriminator: "ShapeType".to_string(),
                        },
                    ),
                ),
            )
            .unwrap();

        let filled_props = props("FilledCircle", &["Colour"]);
        registry
            .register(
                ClassDefinition::new(identity("FilledCircle"), filled_props, None).superclass(
                    SuperClassDefinition::new(
                        identity("Circle"),
                        InheritanceStrategy::SingleTable {
                            discriminator: "ShapeType".to_string(),
                        },
                    ),
                ),
            )
            .unwrap();

        registry
    }

    #[test]
    fn test_table_name_defaults_from_class_name() {
        let def = ClassDefinition::new(identity("Contact"), props("Contact", &[]), None);
        assert_eq!(def.own_table_name(), "Contact");
        let def = def.table_name("contact_tbl");
        assert_eq!(def.own_table_name(), "contact_tbl");
    }

    #[test]
    fn test_single_table_inheritance_resolves_to_root_table() {
        let registry = single_table_registry();
        let filled = registry.get(&identity("FilledCircle")).unwrap();
        assert_eq!(
            filled.effective_table_name(&registry).unwrap(),
            "tbShape"
        );
        assert_eq!(filled.discriminator(), Some("ShapeType"));
    }

    #[test]
    fn test_single_table_leaf_over_class_table_mid_uses_mid_table() {
        let registry = MetadataRegistry::new();
        let shape_props = props("Shape", &["ShapeID", "ShapeName"]);
        let shape_pk = pk(&shape_props, "ShapeID");
        registry
            .register(ClassDefinition::new(
                identity("Shape"),
                shape_props,
                Some(shape_pk),
            ))
            .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("Circle"), props("Circle", &["Radius"]), None)
                    .superclass(SuperClassDefinition::new(
                        identity("Shape"),
                        InheritanceStrategy::ClassTable,
                    )),
            )
            .unwrap();
        registry
            .register(
                ClassDefinition::new(
                    identity("FilledCircle"),
                    props("FilledCircle", &["Colour"]),
                    None,
                )
                .superclass(SuperClassDefinition::new(
                    identity("Circle"),
                    InheritanceStrategy::SingleTable {
                        discriminator: "ShapeType".to_string(),
                    },
                )),
            )
            .unwrap();

        // The single-table leaf shares its class-table parent's table.
        let filled = registry.get(&identity("FilledCircle")).unwrap();
        assert_eq!(filled.effective_table_name(&registry).unwrap(), "Circle");
    }

    #[test]
    fn test_class_table_inheritance_keeps_own_table() {
        let registry = MetadataRegistry::new();
        let shape_props = props("Shape", &["ShapeID"]);
        let shape_pk = pk(&shape_props, "ShapeID");
        registry
            .register(ClassDefinition::new(
                identity("Shape"),
                shape_props,
                Some(shape_pk),
            ))
            .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("Circle"), props("Circle", &["Radius"]), None)
                    .superclass(SuperClassDefinition::new(
                        identity("Shape"),
                        InheritanceStrategy::ClassTable,
                    )),
            )
            .unwrap();

        let circle = registry.get(&identity("Circle")).unwrap();
        assert_eq!(circle.effective_table_name(&registry).unwrap(), "Circle");
        // The primary key comes from the root.
        let pk = circle.resolve_primary_key(&registry).unwrap();
        assert_eq!(pk.key().name(), "ShapeID");
    }

    #[test]
    fn test_concrete_table_inheritance_uses_most_derived_table() {
        let registry = MetadataRegistry::new();
        let shape_props = props("Shape", &["ShapeID", "ShapeName"]);
        let shape_pk = pk(&shape_props, "ShapeID");
        registry
            .register(ClassDefinition::new(
                identity("Shape"),
                shape_props,
                Some(shape_pk),
            ))
            .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("Circle"), props("Circle", &["Radius"]), None)
                    .table_name("tbCircle")
                    .superclass(SuperClassDefinition::new(
                        identity("Shape"),
                        InheritanceStrategy::ConcreteTable,
                    )),
            )
            .unwrap();

        let circle = registry.get(&identity("Circle")).unwrap();
        // A parent-declared property still lives in the leaf's own table.
        assert_eq!(
            circle.table_name_for(&registry, "ShapeName").unwrap(),
            "tbCircle"
        );
        assert_eq!(
            circle.table_name_for(&registry, "Radius").unwrap(),
            "tbCircle"
        );
    }

    #[test]
    fn test_class_table_property_resolves_to_declaring_table() {
        let registry = MetadataRegistry::new();
        let shape_props = props("Shape", &["ShapeID", "ShapeName"]);
        let shape_pk = pk(&shape_props, "ShapeID");
        registry
            .register(
                ClassDefinition::new(identity("Shape"), shape_props, Some(shape_pk))
                    .table_name("tbShape"),
            )
            .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("Circle"), props("Circle", &["Radius"]), None)
                    .superclass(SuperClassDefinition::new(
                        identity("Shape"),
                        InheritanceStrategy::ClassTable,
                    )),
            )
            .unwrap();

        let circle = registry.get(&identity("Circle")).unwrap();
        assert_eq!(
            circle.table_name_for(&registry, "ShapeName").unwrap(),
            "tbShape"
        );
        assert_eq!(circle.table_name_for(&registry, "Radius").unwrap(), "Circle");
    }

    #[test]
    fn test_property_resolution_walks_ancestors() {
        let registry = single_table_registry();
        let filled = registry.get(&identity("FilledCircle")).unwrap();

        let def = filled.get_property_def(&registry, "ShapeName").unwrap();
        assert_eq!(def.owning_class(), Some("Shape"));

        let err = filled.get_property_def(&registry, "Nope").unwrap_err();
        assert!(matches!(err, Error::InvalidPropertyName { .. }));
    }

    #[test]
    fn test_all_property_defs_most_derived_first() {
        let registry = single_table_registry();
        let filled = registry.get(&identity("FilledCircle")).unwrap();
        let names: Vec<_> = filled
            .all_property_defs(&registry)
            .unwrap()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, ["Colour", "Radius", "ShapeID", "ShapeName"]);
    }

    #[test]
    fn test_dotted_path_resolution() {
        use crate::def::relationship::{
            RelationshipKeyDefinition, RelationshipPropertyDefinition,
        };

        let registry = MetadataRegistry::new();
        let address_props = props("Address", &["AddressID", "City"]);
        let address_pk = pk(&address_props, "AddressID");
        registry
            .register(ClassDefinition::new(
                identity("Address"),
                address_props,
                Some(address_pk),
            ))
            .unwrap();

        let contact_props = props("Contact", &["ContactID", "AddressID"]);
        let contact_pk = pk(&contact_props, "ContactID");
        let mut rel_key = RelationshipKeyDefinition::new();
        rel_key
            .add(RelationshipPropertyDefinition::new("AddressID", "AddressID"))
            .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("Contact"), contact_props, Some(contact_pk))
                    .relationship_def(RelationshipDefinition::single(
                        "Address",
                        identity("Address"),
                        rel_key,
                    )),
            )
            .unwrap();

        let contact = registry.get(&identity("Contact")).unwrap();
        let city = contact
            .resolve_property_path(&registry, "Address.City")
            .unwrap();
        assert_eq!(city.name(), "City");

        let err = contact
            .resolve_property_path(&registry, "Nowhere.City")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRelationshipPath { .. }));
    }

    #[test]
    fn test_shallow_and_deep_clone_sharing() {
        let def = ClassDefinition::new(
            identity("Contact"),
            props("Contact", &["Surname"]),
            None,
        );

        let shallow = def.clone_shallow();
        assert_eq!(shallow, def);
        assert!(Arc::ptr_eq(
            def.property_defs().get("Surname").unwrap(),
            shallow.property_defs().get("Surname").unwrap()
        ));

        let deep = def.clone_deep();
        assert_eq!(deep, def);
        assert!(!Arc::ptr_eq(
            def.property_defs().get("Surname").unwrap(),
            deep.property_defs().get("Surname").unwrap()
        ));
    }

    #[test]
    fn test_structural_equality_null_safe() {
        let a = ClassDefinition::new(identity("Contact"), props("Contact", &["Surname"]), None);
        let b = ClassDefinition::new(identity("Contact"), props("Contact", &["Surname"]), None);
        assert!(ClassDefinition::structurally_equals(None, None));
        assert!(ClassDefinition::structurally_equals(Some(&a), Some(&b)));
        assert!(!ClassDefinition::structurally_equals(Some(&a), None));

        let c = ClassDefinition::new(identity("Contact"), props("Contact", &["Name"]), None);
        assert!(!ClassDefinition::structurally_equals(Some(&a), Some(&c)));
    }
}
