//! Pluggable concurrency control.
//!
//! A strategy is consulted at three checkpoints: before beginning an edit,
//! before persisting, and when a cache hit serves an already-loaded
//! instance. Two side-effecting hooks bracket the persist: refreshing the
//! concurrency columns just before SQL is built, and releasing any locks on
//! commit, cancel, or teardown. Absence of a strategy disables every check;
//! the supplied version-number strategy is purely optimistic and implements
//! the lock hooks as no-ops.

use std::fmt::Debug;

use classmap_core::{
    DatabaseConnection, Error, MetadataRegistry, ParameterNameGenerator, Result, Row, Value,
};

use crate::key::BusinessObjectKey;
use crate::object::BusinessObject;
use crate::persist;

/// Read the row currently backing `object`, by its persisted primary key.
fn read_current_row(
    object: &BusinessObject,
    registry: &MetadataRegistry,
    connection: &mut dyn DatabaseConnection,
) -> Result<Option<Row>> {
    let primary = object.class().resolve_primary_key(registry)?;
    let key = BusinessObjectKey::from_persisted(primary.key(), object.properties())?;
    let mut generator = ParameterNameGenerator::new();
    let clause = key.where_clause(&mut generator);
    let select = persist::select_statement(object.class(), registry, Some(&clause), 1)?;
    Ok(connection.load_rows(&select)?.into_iter().next())
}

/// The strategy contract consumed by `BusinessObject`.
pub trait ConcurrencyControl: Debug {
    /// Check that persisting `object` will not clobber someone else's
    /// write. Raised before any SQL is built.
    fn check_before_persist(
        &self,
        object: &BusinessObject,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
    ) -> Result<()>;

    /// The pre-edit check: wraps the persist check, re-raising an
    /// optimistic conflict as a begin-edit conflict so callers can react
    /// differently (auto-refresh rather than block).
    fn check_before_begin_edit(
        &self,
        object: &BusinessObject,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
    ) -> Result<()> {
        self.check_before_persist(object, registry, connection)
            .map_err(|e| {
                if e.is_concurrency_conflict() {
                    Error::BeginEditConflict {
                        object_id: object.object_id(registry).unwrap_or_default(),
                        source: Box::new(e),
                    }
                } else {
                    e
                }
            })
    }

    /// The cache-hit check: a conflict is recovered locally by reloading
    /// the instance from the database instead of failing.
    fn check_on_cache_hit(
        &self,
        object: &mut BusinessObject,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
    ) -> Result<()> {
        match self.check_before_persist(object, registry, connection) {
            Err(e) if e.is_concurrency_conflict() => {
                match read_current_row(object, registry, connection)? {
                    Some(row) => {
                        tracing::debug!(
                            object_id = %object.object_id(registry).unwrap_or_default(),
                            "stale cache hit, refreshing from database"
                        );
                        object.refresh_from_row(registry, &row)
                    }
                    // The backing row is gone; nothing to refresh into.
                    None => Err(e),
                }
            }
            other => other,
        }
    }

    /// Refresh the concurrency columns just before persist SQL is built.
    fn prepare_for_persist(&self, _object: &mut BusinessObject, _user_name: &str) -> Result<()> {
        Ok(())
    }

    /// Release any read/write locks. Called on commit, cancel, and
    /// teardown.
    fn release_locks(&self, _object: &BusinessObject) {}
}

/// Optimistic locking by version number.
///
/// The mapped class carries four bookkeeping properties: an integer version
/// bumped on every persist, plus the last editor's user name, machine name,
/// and timestamp. A persist whose in-memory version no longer matches the
/// stored one fails with a conflict carrying the winning edit's metadata.
#[derive(Debug, Clone)]
pub struct OptimisticVersionLocking {
    version_property: String,
    user_property: String,
    machine_property: String,
    time_property: String,
}

impl Default for OptimisticVersionLocking {
    fn default() -> Self {
        Self {
            version_property: "VersionNumber".to_string(),
            user_property: "UserLastEdited".to_string(),
            machine_property: "MachineLastEdited".to_string(),
            time_property: "DateLastEdited".to_string(),
        }
    }
}

impl OptimisticVersionLocking {
    /// Use the default bookkeeping property names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom bookkeeping property names.
    #[must_use]
    pub fn with_properties(
        version_property: impl Into<String>,
        user_property: impl Into<String>,
        machine_property: impl Into<String>,
        time_property: impl Into<String>,
    ) -> Self {
        Self {
            version_property: version_property.into(),
            user_property: user_property.into(),
            machine_property: machine_property.into(),
            time_property: time_property.into(),
        }
    }

    fn field_of(
        &self,
        object: &BusinessObject,
        registry: &MetadataRegistry,
        property: &str,
    ) -> Result<String> {
        Ok(object
            .class()
            .get_property_def(registry, property)?
            .field()
            .to_string())
    }

    fn row_text(row: &Row, field: &str) -> String {
        row.get(field).map(ToString::to_string).unwrap_or_default()
    }

    fn set_bookkeeping(
        object: &mut BusinessObject,
        property: &str,
        value: Value,
    ) -> Result<()> {
        let cell = object.properties_mut().get_mut(property).ok_or_else(|| {
            Error::Definition(format!(
                "concurrency bookkeeping property '{property}' is not declared on the class"
            ))
        })?;
        cell.set_value(value)?;
        Ok(())
    }
}

impl ConcurrencyControl for OptimisticVersionLocking {
    fn check_before_persist(
        &self,
        object: &BusinessObject,
        registry: &MetadataRegistry,
        connection: &mut dyn DatabaseConnection,
    ) -> Result<()> {
        if object.is_new() {
            return Ok(());
        }
        let Some(row) = read_current_row(object, registry, connection)? else {
            if object.is_deleted() {
                // Our own delete racing a vanished row is not a conflict.
                return Ok(());
            }
            return Err(Error::DeletedByAnotherUser {
                object_id: object.object_id(registry)?,
            });
        };

        let version_field = self.field_of(object, registry, &self.version_property)?;
        let stored = row.get(&version_field).and_then(Value::as_i64);
        let in_memory = object
            .properties()
            .get(&self.version_property)
            .map(|p| p.persisted_value().as_i64())
            .unwrap_or_default();
        if stored != in_memory {
            let user_field = self.field_of(object, registry, &self.user_property)?;
            let machine_field = self.field_of(object, registry, &self.machine_property)?;
            let time_field = self.field_of(object, registry, &self.time_property)?;
            return Err(Error::OptimisticConflict {
                object_id: object.object_id(registry)?,
                user_name: Self::row_text(&row, &user_field),
                machine_name: Self::row_text(&row, &machine_field),
                updated_at: Self::row_text(&row, &time_field),
            });
        }
        Ok(())
    }

    fn prepare_for_persist(&self, object: &mut BusinessObject, user_name: &str) -> Result<()> {
        let next_version = object
            .properties()
            .get(&self.version_property)
            .and_then(|p| p.value().as_i64())
            .unwrap_or(0)
            + 1;
        let machine = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self::set_bookkeeping(object, &self.version_property, Value::Int(next_version))?;
        Self::set_bookkeeping(
            object,
            &self.user_property,
            Value::Text(user_name.to_string()),
        )?;
        Self::set_bookkeeping(object, &self.machine_property, Value::Text(machine))?;
        Self::set_bookkeeping(
            object,
            &self.time_property,
            Value::DateTime(chrono::Local::now().naive_local()),
        )?;
        Ok(())
    }
}
