//! Property definitions: the per-attribute metadata of a mapped class.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::lookup::LookupSource;
use crate::rule::{PropertyRule, RequiredRule, RuleResult};
use crate::value::{PropertyType, Value};

/// When a property may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadWriteRule {
    /// Readable and writable at any time.
    #[default]
    ReadWrite,
    /// Never writable after construction.
    ReadOnly,
    /// Writable only while the owning object is new (unsaved).
    WriteNew,
    /// Writable until a non-null value has been persisted.
    WriteOnce,
}

/// Metadata describing one scalar attribute of a mapped class.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    name: String,
    display_name: Option<String>,
    property_type: PropertyType,
    read_write_rule: ReadWriteRule,
    default_value: Option<Value>,
    database_field: String,
    compulsory: bool,
    lookup: Option<Arc<dyn LookupSource>>,
    rules: Vec<Arc<dyn PropertyRule>>,
    /// Name of the class whose collection this definition was added to.
    /// Set only when added to a collection, never before.
    owning_class: Option<String>,
}

impl PropertyDefinition {
    /// Create a definition with the database field defaulting from the name.
    #[must_use]
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        let name = name.into();
        Self {
            database_field: name.clone(),
            name,
            display_name: None,
            property_type,
            read_write_rule: ReadWriteRule::default(),
            default_value: None,
            compulsory: false,
            lookup: None,
            rules: Vec::new(),
            owning_class: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the read/write rule.
    #[must_use]
    pub fn read_write_rule(mut self, rule: ReadWriteRule) -> Self {
        self.read_write_rule = rule;
        self
    }

    /// Set the default value for new objects.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Set the database column name.
    #[must_use]
    pub fn database_field(mut self, field: impl Into<String>) -> Self {
        self.database_field = field.into();
        self
    }

    /// Mark the property compulsory (non-null).
    #[must_use]
    pub fn compulsory(mut self, value: bool) -> Self {
        self.compulsory = value;
        self
    }

    /// Attach a lookup-list source.
    #[must_use]
    pub fn lookup(mut self, source: Arc<dyn LookupSource>) -> Self {
        self.lookup = Some(source);
        self
    }

    /// Attach a validation rule.
    #[must_use]
    pub fn rule(mut self, rule: Arc<dyn PropertyRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name, falling back to the property name.
    #[must_use]
    pub fn effective_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// The semantic type.
    #[must_use]
    pub fn property_type(&self) -> &PropertyType {
        &self.property_type
    }

    /// The read/write rule.
    #[must_use]
    pub fn rw_rule(&self) -> ReadWriteRule {
        self.read_write_rule
    }

    /// The database column name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.database_field
    }

    /// Whether a value is required.
    #[must_use]
    pub fn is_compulsory(&self) -> bool {
        self.compulsory
    }

    /// The lookup source, if any.
    #[must_use]
    pub fn lookup_source(&self) -> Option<&Arc<dyn LookupSource>> {
        self.lookup.as_ref()
    }

    /// Attached validation rules.
    #[must_use]
    pub fn rules(&self) -> &[Arc<dyn PropertyRule>] {
        &self.rules
    }

    /// The owning class name, once added to a collection.
    #[must_use]
    pub fn owning_class(&self) -> Option<&str> {
        self.owning_class.as_deref()
    }

    pub(crate) fn set_owning_class(&mut self, class_name: &str) {
        self.owning_class = Some(class_name.to_string());
    }

    /// Default value for a newly-constructed object.
    #[must_use]
    pub fn initial_value(&self) -> Value {
        self.default_value.clone().unwrap_or(Value::Null)
    }

    /// Whether this property may be written on an object in the given state.
    #[must_use]
    pub fn is_writable(&self, object_is_new: bool, persisted_is_null: bool) -> bool {
        match self.read_write_rule {
            ReadWriteRule::ReadWrite => true,
            ReadWriteRule::ReadOnly => false,
            ReadWriteRule::WriteNew => object_is_new,
            ReadWriteRule::WriteOnce => object_is_new || persisted_is_null,
        }
    }

    /// Coerce a raw scalar to this property's semantic type.
    pub fn coerce(&self, raw: Value) -> Result<Value> {
        self.property_type.coerce(&self.name, raw)
    }

    /// Run compulsory plus attached rules against `value`.
    ///
    /// Returns the first failure reason.
    pub fn validate(&self, value: &Value) -> RuleResult {
        if self.compulsory {
            RequiredRule.check(self.effective_display_name(), value)?;
        }
        for rule in &self.rules {
            rule.check(self.effective_display_name(), value)?;
        }
        Ok(())
    }

    /// Compare two values of this property with null-low semantics.
    #[must_use]
    pub fn compare_values(&self, a: &Value, b: &Value) -> std::cmp::Ordering {
        a.compare(b)
    }
}

impl PartialEq for PropertyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.property_type == other.property_type
            && self.read_write_rule == other.read_write_rule
            && self.default_value == other.default_value
            && self.database_field == other.database_field
            && self.compulsory == other.compulsory
            && self.lookup.is_some() == other.lookup.is_some()
            && self.rules.len() == other.rules.len()
            && self
                .rules
                .iter()
                .zip(other.rules.iter())
                .all(|(a, b)| a.name() == b.name())
    }
}

/// The ordered set of property definitions a class declares locally.
///
/// Members are reference-counted so that a shallow clone of the collection
/// shares definition instances while a deep clone duplicates them.
#[derive(Debug, Clone, Default)]
pub struct PropertyDefinitionCollection {
    class_name: String,
    items: Vec<Arc<PropertyDefinition>>,
}

impl PropertyDefinitionCollection {
    /// Create an empty collection owned by `class_name`.
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            items: Vec::new(),
        }
    }

    /// The owning class name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Add a definition, re-parenting its owning-class back-reference.
    ///
    /// Fails when a definition with the same name already exists.
    pub fn add(&mut self, mut definition: PropertyDefinition) -> Result<()> {
        if self.contains(definition.name()) {
            return Err(Error::Definition(format!(
                "class '{}' already declares a property named '{}'",
                self.class_name,
                definition.name()
            )));
        }
        definition.set_owning_class(&self.class_name);
        self.items.push(Arc::new(definition));
        Ok(())
    }

    /// Share an existing definition instance (used by shallow clones and
    /// key definitions). Fails on a duplicate name.
    pub fn add_shared(&mut self, definition: Arc<PropertyDefinition>) -> Result<()> {
        if self.contains(definition.name()) {
            return Err(Error::Definition(format!(
                "class '{}' already declares a property named '{}'",
                self.class_name,
                definition.name()
            )));
        }
        self.items.push(definition);
        Ok(())
    }

    /// Look up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<PropertyDefinition>> {
        self.items.iter().find(|d| d.name() == name)
    }

    /// Whether a definition with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate the definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PropertyDefinition>> {
        self.items.iter()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the class declares no local properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Shallow clone: a new collection re-parented to `class_name` whose
    /// members are the same shared instances.
    #[must_use]
    pub fn clone_shallow(&self, class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            items: self.items.clone(),
        }
    }

    /// Deep clone: members are duplicated into distinct instances.
    #[must_use]
    pub fn clone_deep(&self, class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            items: self
                .items
                .iter()
                .map(|d| Arc::new(PropertyDefinition::clone(d)))
                .collect(),
        }
    }
}

impl PartialEq for PropertyDefinitionCollection {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|(a, b)| **a == **b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surname() -> PropertyDefinition {
        PropertyDefinition::new("Surname", PropertyType::Text).compulsory(true)
    }

    #[test]
    fn test_database_field_defaults_from_name() {
        let def = PropertyDefinition::new("Surname", PropertyType::Text);
        assert_eq!(def.field(), "Surname");
        let def = def.database_field("surname_col");
        assert_eq!(def.field(), "surname_col");
    }

    #[test]
    fn test_owning_class_set_only_on_add() {
        let def = surname();
        assert!(def.owning_class().is_none());

        let mut col = PropertyDefinitionCollection::new("Contact");
        col.add(def).unwrap();
        assert_eq!(col.get("Surname").unwrap().owning_class(), Some("Contact"));
    }

    #[test]
    fn test_duplicate_add_fails() {
        let mut col = PropertyDefinitionCollection::new("Contact");
        col.add(surname()).unwrap();
        let err = col.add(surname()).unwrap_err();
        assert!(matches!(err, Error::Definition(_)));
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn test_validate_compulsory_and_rules() {
        let def = PropertyDefinition::new("Surname", PropertyType::Text)
            .compulsory(true)
            .rule(Arc::new(crate::rule::StringLengthRule::new(1, 5)));
        assert!(def.validate(&Value::Null).is_err());
        assert!(def.validate(&Value::Text("Bob".to_string())).is_ok());
        assert!(def.validate(&Value::Text("toolong".to_string())).is_err());
    }

    #[test]
    fn test_writability_by_rule() {
        let rw = PropertyDefinition::new("A", PropertyType::Text);
        assert!(rw.is_writable(false, false));

        let ro = PropertyDefinition::new("A", PropertyType::Text)
            .read_write_rule(ReadWriteRule::ReadOnly);
        assert!(!ro.is_writable(true, true));

        let wn = PropertyDefinition::new("A", PropertyType::Text)
            .read_write_rule(ReadWriteRule::WriteNew);
        assert!(wn.is_writable(true, false));
        assert!(!wn.is_writable(false, false));

        let wo = PropertyDefinition::new("A", PropertyType::Text)
            .read_write_rule(ReadWriteRule::WriteOnce);
        assert!(wo.is_writable(false, true));
        assert!(!wo.is_writable(false, false));
    }

    #[test]
    fn test_shallow_clone_shares_members_deep_clone_does_not() {
        let mut col = PropertyDefinitionCollection::new("Contact");
        col.add(surname()).unwrap();

        let shallow = col.clone_shallow("Contact");
        assert_eq!(shallow, col);
        assert!(Arc::ptr_eq(col.get("Surname").unwrap(), shallow.get("Surname").unwrap()));

        let deep = col.clone_deep("Contact");
        assert_eq!(deep, col);
        assert!(!Arc::ptr_eq(col.get("Surname").unwrap(), deep.get("Surname").unwrap()));
    }

    #[test]
    fn test_structural_equality_ignores_sharing() {
        let mut a = PropertyDefinitionCollection::new("Contact");
        a.add(surname()).unwrap();
        let mut b = PropertyDefinitionCollection::new("Contact");
        b.add(surname()).unwrap();
        assert_eq!(a, b);

        let mut c = PropertyDefinitionCollection::new("Contact");
        c.add(PropertyDefinition::new("Surname", PropertyType::Int)).unwrap();
        assert_ne!(a, c);
    }
}
