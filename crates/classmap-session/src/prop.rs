//! Runtime property cells.
//!
//! A [`Property`] is one mutable value bound to a `PropertyDefinition`. It
//! tracks the current value, the last-persisted value, a dirty flag, and a
//! validity state. A [`PropertyCollection`] holds the full cell set for one
//! object instance and computes the aggregate dirty/valid state plus the
//! backup/restore pair used by edit transactions.

use std::sync::Arc;

use classmap_core::{Error, PropertyDefinition, Result, Value};

/// One runtime value cell.
#[derive(Debug, Clone)]
pub struct Property {
    definition: Arc<PropertyDefinition>,
    current: Value,
    persisted: Value,
    dirty: bool,
    invalid_reason: Option<String>,
    object_is_new: bool,
}

impl Property {
    /// Create a cell seeded with the definition's default value. Used for
    /// newly-constructed objects; the cell starts clean.
    #[must_use]
    pub fn new(definition: Arc<PropertyDefinition>) -> Self {
        let initial = definition.initial_value();
        let invalid_reason = definition.validate(&initial).err();
        Self {
            definition,
            current: initial.clone(),
            persisted: initial,
            dirty: false,
            invalid_reason,
            object_is_new: true,
        }
    }

    /// Seed the cell from a raw scalar, coercing to the semantic type.
    ///
    /// Both current and persisted values take the coerced result, so a
    /// freshly-loaded value is never considered dirty. A coercion failure
    /// falls back to the raw value and records the failure as the invalid
    /// reason.
    pub fn initialise(&mut self, raw: Value, object_is_new: bool) {
        let coerced = match self.definition.coerce(raw.clone()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    property = self.definition.name(),
                    error = %e,
                    "coercion failed while initialising, keeping raw value"
                );
                raw
            }
        };
        self.invalid_reason = self.definition.validate(&coerced).err();
        self.current = coerced.clone();
        self.persisted = coerced;
        self.dirty = false;
        self.object_is_new = object_is_new;
    }

    /// Set a new value.
    ///
    /// A value equal to the current one is a no-op and does not mark the
    /// cell dirty. Otherwise the value is coerced (falling back to the raw
    /// value when coercion fails), re-validated, and the cell marked dirty.
    /// Returns whether the cell actually changed.
    pub fn set_value(&mut self, raw: Value) -> Result<bool> {
        if raw == self.current {
            return Ok(false);
        }
        if !self
            .definition
            .is_writable(self.object_is_new, self.persisted.is_null())
        {
            return Err(Error::Definition(format!(
                "property '{}' is not writable in its current state",
                self.definition.name()
            )));
        }
        let coerced = self.definition.coerce(raw.clone()).unwrap_or(raw);
        if coerced == self.current {
            return Ok(false);
        }
        self.invalid_reason = self.definition.validate(&coerced).err();
        self.current = coerced;
        self.dirty = true;
        Ok(true)
    }

    /// Commit the current value as persisted and clear the dirty flag.
    /// Called after a successful save.
    pub fn backup(&mut self) {
        self.persisted = self.current.clone();
        self.dirty = false;
        self.object_is_new = false;
    }

    /// Discard the current value in favor of the persisted one and clear
    /// the dirty flag. Called on cancel.
    pub fn restore(&mut self) {
        self.current = self.persisted.clone();
        self.dirty = false;
        self.invalid_reason = self.definition.validate(&self.current).err();
    }

    /// The bound definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<PropertyDefinition> {
        &self.definition
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// The database field name.
    #[must_use]
    pub fn field(&self) -> &str {
        self.definition.field()
    }

    /// The current in-memory value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.current
    }

    /// The last-persisted value.
    #[must_use]
    pub fn persisted_value(&self) -> &Value {
        &self.persisted
    }

    /// Whether the current value differs from the persisted one.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the current value passes the definition's rules.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.invalid_reason.is_none()
    }

    /// The first failing rule's reason, when invalid.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&str> {
        self.invalid_reason.as_deref()
    }

    /// The current value rendered for display, resolving through the
    /// lookup source when one is attached.
    #[must_use]
    pub fn display_value(&self) -> String {
        if let Some(lookup) = self.definition.lookup_source() {
            if let Some(display) = lookup.display_for(&self.current) {
                return display;
            }
        }
        self.current.to_string()
    }
}

/// The full set of runtime cells for one object instance, in declaration
/// order.
#[derive(Debug, Clone, Default)]
pub struct PropertyCollection {
    items: Vec<Property>,
}

impl PropertyCollection {
    /// Build a collection of default-seeded cells from definitions,
    /// most-derived first.
    #[must_use]
    pub fn from_definitions(definitions: &[Arc<PropertyDefinition>]) -> Self {
        Self {
            items: definitions
                .iter()
                .map(|d| Property::new(Arc::clone(d)))
                .collect(),
        }
    }

    /// Look up a cell by property name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.items.iter().find(|p| p.name() == name)
    }

    /// Look up a cell mutably by property name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.items.iter_mut().find(|p| p.name() == name)
    }

    /// Cells in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.items.iter()
    }

    /// Cells whose current value differs from the persisted one.
    pub fn dirty_properties(&self) -> impl Iterator<Item = &Property> {
        self.items.iter().filter(|p| p.is_dirty())
    }

    /// Whether any cell is dirty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.items.iter().any(Property::is_dirty)
    }

    /// `Ok` when every cell is valid, else the first invalid reason.
    pub fn check_valid(&self) -> std::result::Result<(), String> {
        for property in &self.items {
            if let Some(reason) = property.invalid_reason() {
                return Err(reason.to_string());
            }
        }
        Ok(())
    }

    /// Back up every cell. Called after a successful save.
    pub fn backup_all(&mut self) {
        for property in &mut self.items {
            property.backup();
        }
    }

    /// Restore every cell to its persisted value. Called on cancel.
    pub fn restore_all(&mut self) {
        for property in &mut self.items {
            property.restore();
        }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
