//! Runtime business-object keys.
//!
//! A [`BusinessObjectKey`] snapshots the member values of a `KeyDefinition`
//! from a live property collection. It drives duplicate detection
//! (`must_check`), renders SQL predicates, and compares by member
//! name/value alignment so keys built from differently-named definitions
//! can still be equal.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use classmap_core::{
    Error, KeyDefinition, ParameterNameGenerator, Result, SqlStatement, Value,
};

use crate::prop::PropertyCollection;

/// One member of a runtime key: property name, database field, snapshotted
/// value, and whether the backing cell was dirty at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMember {
    /// Property name.
    pub property_name: String,
    /// Database field name.
    pub field: String,
    /// Snapshotted value.
    pub value: Value,
    /// Whether the backing cell was dirty when snapshotted.
    pub dirty: bool,
}

/// A runtime key snapshot bound to a key definition.
#[derive(Debug, Clone)]
pub struct BusinessObjectKey {
    name: String,
    ignore_nulls: bool,
    members: Vec<KeyMember>,
}

impl BusinessObjectKey {
    /// Snapshot the key's current values from `properties`.
    pub fn from_current(definition: &KeyDefinition, properties: &PropertyCollection) -> Result<Self> {
        Self::snapshot(definition, properties, false)
    }

    /// Snapshot the key's last-persisted values from `properties`.
    pub fn from_persisted(
        definition: &KeyDefinition,
        properties: &PropertyCollection,
    ) -> Result<Self> {
        Self::snapshot(definition, properties, true)
    }

    fn snapshot(
        definition: &KeyDefinition,
        properties: &PropertyCollection,
        use_persisted: bool,
    ) -> Result<Self> {
        let mut members = Vec::with_capacity(definition.len());
        for member in definition.members() {
            let property = properties.get(member.name()).ok_or_else(|| {
                Error::Definition(format!(
                    "key '{}' references property '{}' which the object does not hold",
                    definition.name(),
                    member.name()
                ))
            })?;
            let value = if use_persisted {
                property.persisted_value().clone()
            } else {
                property.value().clone()
            };
            members.push(KeyMember {
                property_name: member.name().to_string(),
                field: member.field().to_string(),
                value,
                dirty: property.is_dirty(),
            });
        }
        Ok(Self {
            name: definition.name(),
            ignore_nulls: definition.ignores_nulls(),
            members,
        })
    }

    /// The key name (from the definition).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The snapshotted members in definition order.
    #[must_use]
    pub fn members(&self) -> &[KeyMember] {
        &self.members
    }

    /// Whether a duplicate check is warranted.
    ///
    /// No check when the object is neither new nor dirty in any member
    /// property (no change means no new duplicate risk), and none when
    /// ignore-nulls is set and any member is currently null.
    #[must_use]
    pub fn must_check(&self, object_is_new: bool) -> bool {
        if !object_is_new && !self.members.iter().any(|m| m.dirty) {
            return false;
        }
        if self.ignore_nulls && self.members.iter().any(|m| m.value.is_null()) {
            return false;
        }
        true
    }

    /// Render the key as a parameterized `AND`-joined where clause. A null
    /// member renders as `field IS NULL`.
    #[must_use]
    pub fn where_clause(&self, generator: &mut ParameterNameGenerator) -> SqlStatement {
        let mut statement = SqlStatement::new();
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                statement.push(" AND ");
            }
            if member.value.is_null() {
                statement.push(&format!("\"{}\" IS NULL", member.field));
            } else {
                statement.push(&format!("\"{}\" = ", member.field));
                statement.push_parameter(generator, member.value.clone());
            }
        }
        statement
    }

    /// Render the key as a literal-quoted where clause, for diagnostics and
    /// duplicate-conflict messages.
    #[must_use]
    pub fn where_clause_literal(&self) -> String {
        self.members
            .iter()
            .map(|m| {
                if m.value.is_null() {
                    format!("\"{}\" IS NULL", m.field)
                } else {
                    format!("\"{}\" = {}", m.field, m.value.to_sql_literal())
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// A stable identity string over the member name/value pairs, used as
    /// the identity-map key. Member order does not matter.
    #[must_use]
    pub fn id_string(&self) -> String {
        let mut pairs: Vec<_> = self
            .members
            .iter()
            .map(|m| format!("{}={}", m.property_name, m.value))
            .collect();
        pairs.sort();
        pairs.join("&")
    }

    /// Name/value-aligned equality: same cardinality and every member of
    /// `self` exists by property name in `other` with an equal value. Key
    /// names themselves do not participate.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        self.members.len() == other.members.len()
            && self.members.iter().all(|m| {
                other
                    .members
                    .iter()
                    .any(|o| o.property_name == m.property_name && o.value == m.value)
            })
    }

    /// A hash consistent with [`BusinessObjectKey::equals`].
    #[must_use]
    pub fn value_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.id_string().hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for BusinessObjectKey {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classmap_core::{PropertyDefinition, PropertyType};
    use std::sync::Arc;

    fn props(pairs: &[(&str, Value)]) -> PropertyCollection {
        let defs: Vec<_> = pairs
            .iter()
            .map(|(name, _)| Arc::new(PropertyDefinition::new(*name, PropertyType::Text)))
            .collect();
        let mut collection = PropertyCollection::from_definitions(&defs);
        for (name, value) in pairs {
            collection
                .get_mut(name)
                .unwrap()
                .initialise(value.clone(), false);
        }
        collection
    }

    fn key_over(names: &[&str], properties: &PropertyCollection) -> BusinessObjectKey {
        let mut definition = KeyDefinition::new();
        for name in names {
            definition
                .add(Arc::new(PropertyDefinition::new(*name, PropertyType::Text)))
                .unwrap();
        }
        BusinessObjectKey::from_current(&definition, properties).unwrap()
    }

    #[test]
    fn test_equality_across_differently_named_definitions() {
        let properties = props(&[
            ("Surname", Value::Text("Smith".to_string())),
            ("FirstName", Value::Text("Bob".to_string())),
        ]);

        let mut named = KeyDefinition::named("NaturalKey");
        named
            .add(Arc::new(PropertyDefinition::new("Surname", PropertyType::Text)))
            .unwrap();
        named
            .add(Arc::new(PropertyDefinition::new("FirstName", PropertyType::Text)))
            .unwrap();
        let k1 = BusinessObjectKey::from_current(&named, &properties).unwrap();
        let k2 = key_over(&["FirstName", "Surname"], &properties);

        assert!(k1.equals(&k2));
        assert_eq!(k1.value_hash(), k2.value_hash());
    }

    #[test]
    fn test_inequality_on_value_difference() {
        let a = props(&[("Surname", Value::Text("Smith".to_string()))]);
        let b = props(&[("Surname", Value::Text("Jones".to_string()))]);
        let k1 = key_over(&["Surname"], &a);
        let k2 = key_over(&["Surname"], &b);
        assert!(!k1.equals(&k2));
    }

    #[test]
    fn test_must_check_skips_clean_persisted_objects() {
        let mut properties = props(&[("Surname", Value::Text("Smith".to_string()))]);
        let clean = key_over(&["Surname"], &properties);
        assert!(!clean.must_check(false));
        assert!(clean.must_check(true));

        properties
            .get_mut("Surname")
            .unwrap()
            .set_value(Value::Text("Jones".to_string()))
            .unwrap();
        let dirty = key_over(&["Surname"], &properties);
        assert!(dirty.must_check(false));
    }

    #[test]
    fn test_must_check_honors_ignore_nulls() {
        let properties = props(&[("Surname", Value::Null)]);
        let mut definition = KeyDefinition::new().ignore_nulls(true);
        definition
            .add(Arc::new(PropertyDefinition::new("Surname", PropertyType::Text)))
            .unwrap();
        let key = BusinessObjectKey::from_current(&definition, &properties).unwrap();
        assert!(!key.must_check(true));
    }

    #[test]
    fn test_where_clause_parameterized_and_null() {
        let properties = props(&[
            ("Surname", Value::Text("Smith".to_string())),
            ("FirstName", Value::Null),
        ]);
        let key = key_over(&["Surname", "FirstName"], &properties);
        let mut generator = ParameterNameGenerator::new();
        let clause = key.where_clause(&mut generator);
        assert_eq!(
            clause.text(),
            "\"Surname\" = :p0 AND \"FirstName\" IS NULL"
        );
        assert_eq!(clause.parameters().len(), 1);

        assert_eq!(
            key.where_clause_literal(),
            "\"Surname\" = 'Smith' AND \"FirstName\" IS NULL"
        );
    }
}
