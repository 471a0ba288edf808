//! Persistence statement generation.
//!
//! Translates one object's property state and inheritance chain into an
//! ordered sequence of parameterized SQL statements. All parameter binding
//! runs through one shared [`ParameterNameGenerator`] so names never collide
//! across a multi-statement batch.

use std::sync::Arc;

use classmap_core::{
    ClassDefinition, InheritanceStrategy, MetadataRegistry, ParameterNameGenerator, Result,
    SqlStatement, SqlStatementCollection, Value,
};

use crate::key::BusinessObjectKey;
use crate::prop::PropertyCollection;

fn current_value(properties: &PropertyCollection, name: &str) -> Value {
    properties
        .get(name)
        .map(|p| p.value().clone())
        .unwrap_or(Value::Null)
}

fn insert_for_level(
    table: &str,
    columns: &[(String, Value)],
    generator: &mut ParameterNameGenerator,
) -> SqlStatement {
    let mut statement = SqlStatement::new();
    statement.push(&format!("INSERT INTO \"{table}\" ("));
    for (i, (field, _)) in columns.iter().enumerate() {
        if i > 0 {
            statement.push(", ");
        }
        statement.push(&format!("\"{field}\""));
    }
    statement.push(") VALUES (");
    for (i, (_, value)) in columns.iter().enumerate() {
        if i > 0 {
            statement.push(", ");
        }
        statement.push_parameter(generator, value.clone());
    }
    statement.push(")");
    statement
}

/// Build the INSERT batch for a new object.
///
/// Under class-table inheritance one INSERT is generated per table level,
/// most-derived first, each prepended to the front of the batch so that the
/// final execution order is ancestor-first and foreign keys hold. Each
/// ancestor level carries only its locally-declared properties plus the
/// shared primary-key value. Single-table and concrete-table hierarchies
/// flatten into one INSERT, with the discriminator column filled for
/// single-table.
#[tracing::instrument(level = "debug", skip_all, fields(class = class.class_name()))]
pub fn insert_statements(
    class: &Arc<ClassDefinition>,
    registry: &MetadataRegistry,
    properties: &PropertyCollection,
    generator: &mut ParameterNameGenerator,
) -> Result<SqlStatementCollection> {
    let mut batch = SqlStatementCollection::new();
    let primary_key = class.resolve_primary_key(registry)?;
    let mut current = Arc::clone(class);

    loop {
        let class_table_link = matches!(
            current.superclass_def().map(|s| s.strategy()),
            Some(InheritanceStrategy::ClassTable)
        );
        if class_table_link {
            // One INSERT for this level: local properties plus the shared
            // primary-key value.
            let mut columns: Vec<(String, Value)> = Vec::new();
            for member in primary_key.key().members() {
                if !current.property_defs().contains(member.name()) {
                    columns.push((
                        member.field().to_string(),
                        current_value(properties, member.name()),
                    ));
                }
            }
            for def in current.property_defs().iter() {
                columns.push((def.field().to_string(), current_value(properties, def.name())));
            }
            batch.add_front(insert_for_level(
                current.own_table_name(),
                &columns,
                generator,
            ));
            let parent = current
                .superclass_def()
                .map(|s| s.resolve(registry))
                .transpose()?;
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        } else {
            // Terminal level: the remaining hierarchy flattens into one
            // table.
            let table = current.effective_table_name(registry)?;
            let mut columns: Vec<(String, Value)> = current
                .all_property_defs(registry)?
                .iter()
                .map(|def| (def.field().to_string(), current_value(properties, def.name())))
                .collect();
            if let Some(discriminator) = class.discriminator() {
                columns.push((
                    discriminator.to_string(),
                    Value::Text(class.class_name().to_string()),
                ));
            }
            batch.add_front(insert_for_level(&table, &columns, generator));
            break;
        }
    }
    Ok(batch)
}

/// Build the UPDATE batch for a dirty persisted object.
///
/// Dirty properties are grouped by the table that stores them; one UPDATE
/// per table, keyed by the persisted primary-key where clause. Object-id
/// primary-key members are never updated. A level with no dirty columns
/// produces no statement at all.
#[tracing::instrument(level = "debug", skip_all, fields(class = class.class_name()))]
pub fn update_statements(
    class: &Arc<ClassDefinition>,
    registry: &MetadataRegistry,
    properties: &PropertyCollection,
    generator: &mut ParameterNameGenerator,
) -> Result<SqlStatementCollection> {
    let mut batch = SqlStatementCollection::new();
    let primary_key = class.resolve_primary_key(registry)?;
    let object_id_members: Vec<&str> = if primary_key.is_object_id() {
        primary_key
            .key()
            .members()
            .iter()
            .map(|m| m.name())
            .collect()
    } else {
        Vec::new()
    };

    // Group dirty columns by owning table, preserving first-seen order.
    let mut groups: Vec<(String, Vec<(String, Value)>)> = Vec::new();
    for property in properties.dirty_properties() {
        if object_id_members.contains(&property.name()) {
            continue;
        }
        let table = class.table_name_for(registry, property.name())?;
        let column = (property.field().to_string(), property.value().clone());
        match groups.iter_mut().find(|(t, _)| *t == table) {
            Some((_, columns)) => columns.push(column),
            None => groups.push((table, vec![column])),
        }
    }

    for (table, columns) in groups {
        let mut statement = SqlStatement::new();
        statement.push(&format!("UPDATE \"{table}\" SET "));
        for (i, (field, value)) in columns.iter().enumerate() {
            if i > 0 {
                statement.push(", ");
            }
            statement.push(&format!("\"{field}\" = "));
            statement.push_parameter(generator, value.clone());
        }
        statement.push(" WHERE ");
        let key = BusinessObjectKey::from_persisted(primary_key.key(), properties)?;
        statement.append(&key.where_clause(generator));
        batch.add(statement);
    }
    Ok(batch)
}

/// Build the DELETE batch for a persisted object: one DELETE per table
/// level, the object's own table first, then each class-table ancestor's
/// table, each keyed by the persisted primary-key where clause.
#[tracing::instrument(level = "debug", skip_all, fields(class = class.class_name()))]
pub fn delete_statements(
    class: &Arc<ClassDefinition>,
    registry: &MetadataRegistry,
    properties: &PropertyCollection,
    generator: &mut ParameterNameGenerator,
) -> Result<SqlStatementCollection> {
    let mut batch = SqlStatementCollection::new();
    let primary_key = class.resolve_primary_key(registry)?;

    let mut tables = vec![class.effective_table_name(registry)?];
    let mut current = Arc::clone(class);
    while matches!(
        current.superclass_def().map(|s| s.strategy()),
        Some(InheritanceStrategy::ClassTable)
    ) {
        let parent = match current.superclass_def() {
            Some(sup) => sup.resolve(registry)?,
            None => break,
        };
        let table = parent.effective_table_name(registry)?;
        if !tables.contains(&table) {
            tables.push(table);
        }
        current = parent;
    }

    for table in tables {
        let mut statement = SqlStatement::new();
        statement.push(&format!("DELETE FROM \"{table}\" WHERE "));
        let key = BusinessObjectKey::from_persisted(primary_key.key(), properties)?;
        statement.append(&key.where_clause(generator));
        batch.add(statement);
    }
    Ok(batch)
}

/// Build a single SELECT over the class's effective table.
///
/// No joins are generated; single-table hierarchies are narrowed with a
/// discriminator filter over this class and all of its registered
/// subclasses. `limit` caps returned rows; `-1` means unlimited.
#[tracing::instrument(level = "debug", skip_all, fields(class = class.class_name()))]
pub fn select_statement(
    class: &Arc<ClassDefinition>,
    registry: &MetadataRegistry,
    where_clause: Option<&SqlStatement>,
    limit: i64,
) -> Result<SqlStatement> {
    let mut statement = SqlStatement::new();
    statement.push("SELECT ");
    let mut seen_fields: Vec<String> = Vec::new();
    for def in class.all_property_defs(registry)? {
        if seen_fields.iter().any(|f| f == def.field()) {
            continue;
        }
        if !seen_fields.is_empty() {
            statement.push(", ");
        }
        statement.push(&format!("\"{}\"", def.field()));
        seen_fields.push(def.field().to_string());
    }
    statement.push(&format!(
        " FROM \"{}\"",
        class.effective_table_name(registry)?
    ));

    let discriminator_filter = class.discriminator().map(|discriminator| {
        let mut names = vec![class.class_name().to_string()];
        names.extend(
            registry
                .all_children(class.identity())
                .iter()
                .map(|c| c.class_name().to_string()),
        );
        let list = names
            .iter()
            .map(|n| Value::Text(n.clone()).to_sql_literal())
            .collect::<Vec<_>>()
            .join(", ");
        format!("\"{discriminator}\" IN ({list})")
    });

    match (discriminator_filter, where_clause) {
        (None, None) => {}
        (Some(filter), None) => statement.push(&format!(" WHERE {filter}")),
        (None, Some(clause)) => {
            statement.push(" WHERE ");
            statement.append(clause);
        }
        (Some(filter), Some(clause)) => {
            statement.push(&format!(" WHERE {filter} AND ("));
            statement.append(clause);
            statement.push(")");
        }
    }

    if limit >= 0 {
        statement.push(&format!(" LIMIT {limit}"));
    }
    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use classmap_core::{
        ClassIdentity, PrimaryKeyDefinition, PropertyDefinition, PropertyDefinitionCollection,
        PropertyType, SuperClassDefinition,
    };
    use uuid::Uuid;

    fn identity(class: &str) -> ClassIdentity {
        ClassIdentity::new("app", class)
    }

    fn guid_prop(name: &str) -> PropertyDefinition {
        PropertyDefinition::new(name, PropertyType::Guid)
    }

    /// Shape (root, tbShape) <- Circle (class table) <- FilledCircle
    /// (class table).
    fn class_table_registry() -> (MetadataRegistry, Arc<ClassDefinition>) {
        let registry = MetadataRegistry::new();

        let mut shape_props = PropertyDefinitionCollection::new("Shape");
        shape_props.add(guid_prop("ShapeID")).unwrap();
        shape_props
            .add(PropertyDefinition::new("ShapeName", PropertyType::Text))
            .unwrap();
        let pk =
            PrimaryKeyDefinition::object_id(Arc::clone(shape_props.get("ShapeID").unwrap()))
                .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("Shape"), shape_props, Some(pk))
                    .table_name("tbShape"),
            )
            .unwrap();

        let mut circle_props = PropertyDefinitionCollection::new("Circle");
        circle_props
            .add(PropertyDefinition::new("Radius", PropertyType::Int))
            .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("Circle"), circle_props, None).superclass(
                    SuperClassDefinition::new(identity("Shape"), InheritanceStrategy::ClassTable),
                ),
            )
            .unwrap();

        let mut filled_props = PropertyDefinitionCollection::new("FilledCircle");
        filled_props
            .add(PropertyDefinition::new("Colour", PropertyType::Text))
            .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("FilledCircle"), filled_props, None).superclass(
                    SuperClassDefinition::new(identity("Circle"), InheritanceStrategy::ClassTable),
                ),
            )
            .unwrap();

        let leaf = registry.get(&identity("FilledCircle")).unwrap();
        (registry, leaf)
    }

    fn properties_for(
        class: &Arc<ClassDefinition>,
        registry: &MetadataRegistry,
    ) -> PropertyCollection {
        PropertyCollection::from_definitions(&class.all_property_defs(registry).unwrap())
    }

    #[test]
    fn test_insert_orders_ancestor_tables_first() {
        let (registry, leaf) = class_table_registry();
        let mut properties = properties_for(&leaf, &registry);
        properties
            .get_mut("ShapeID")
            .unwrap()
            .initialise(Value::Uuid(Uuid::new_v4()), true);

        let mut generator = ParameterNameGenerator::new();
        let batch = insert_statements(&leaf, &registry, &properties, &mut generator).unwrap();
        let texts: Vec<_> = batch.statements().iter().map(SqlStatement::text).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].starts_with("INSERT INTO \"tbShape\""));
        assert!(texts[1].starts_with("INSERT INTO \"Circle\""));
        assert!(texts[2].starts_with("INSERT INTO \"FilledCircle\""));
        // Every level carries the shared primary key.
        assert!(texts[1].contains("\"ShapeID\""));
        assert!(texts[2].contains("\"ShapeID\""));
    }

    #[test]
    fn test_update_touches_only_dirty_levels() {
        let (registry, leaf) = class_table_registry();
        let mut properties = properties_for(&leaf, &registry);
        properties
            .get_mut("ShapeID")
            .unwrap()
            .initialise(Value::Uuid(Uuid::new_v4()), false);
        properties
            .get_mut("Colour")
            .unwrap()
            .set_value(Value::Text("red".to_string()))
            .unwrap();

        let mut generator = ParameterNameGenerator::new();
        let batch = update_statements(&leaf, &registry, &properties, &mut generator).unwrap();
        assert_eq!(batch.len(), 1);
        let text = batch.statements()[0].text();
        assert!(text.starts_with("UPDATE \"FilledCircle\" SET \"Colour\" = :p0"));
        assert!(text.contains("WHERE \"ShapeID\" = :p1"));
    }

    #[test]
    fn test_update_never_touches_object_id_key() {
        let (registry, leaf) = class_table_registry();
        let mut properties = properties_for(&leaf, &registry);
        // Force the object-id cell dirty; it must still be excluded.
        properties
            .get_mut("ShapeID")
            .unwrap()
            .set_value(Value::Uuid(Uuid::new_v4()))
            .unwrap();

        let mut generator = ParameterNameGenerator::new();
        let batch = update_statements(&leaf, &registry, &properties, &mut generator).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_delete_walks_own_table_then_ancestors() {
        let (registry, leaf) = class_table_registry();
        let mut properties = properties_for(&leaf, &registry);
        properties
            .get_mut("ShapeID")
            .unwrap()
            .initialise(Value::Uuid(Uuid::new_v4()), false);

        let mut generator = ParameterNameGenerator::new();
        let batch = delete_statements(&leaf, &registry, &properties, &mut generator).unwrap();
        let texts: Vec<_> = batch.statements().iter().map(SqlStatement::text).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].starts_with("DELETE FROM \"FilledCircle\""));
        assert!(texts[1].starts_with("DELETE FROM \"Circle\""));
        assert!(texts[2].starts_with("DELETE FROM \"tbShape\""));
    }

    #[test]
    fn test_select_with_where_and_limit() {
        let (registry, leaf) = class_table_registry();
        let mut generator = ParameterNameGenerator::new();
        let mut clause = SqlStatement::new();
        clause.push("\"Colour\" = ");
        clause.push_parameter(&mut generator, Value::Text("red".to_string()));

        let statement = select_statement(&leaf, &registry, Some(&clause), 5).unwrap();
        assert!(statement.text().starts_with("SELECT \"Colour\", \"Radius\", \"ShapeID\", \"ShapeName\" FROM \"FilledCircle\""));
        assert!(statement.text().contains("WHERE \"Colour\" = :p0"));
        assert!(statement.text().ends_with("LIMIT 5"));
        assert_eq!(statement.parameters().len(), 1);

        let unlimited = select_statement(&leaf, &registry, None, -1).unwrap();
        assert!(!unlimited.text().contains("LIMIT"));
    }

    #[test]
    fn test_single_table_insert_fills_discriminator() {
        let registry = MetadataRegistry::new();
        let mut shape_props = PropertyDefinitionCollection::new("Shape");
        shape_props.add(guid_prop("ShapeID")).unwrap();
        let pk =
            PrimaryKeyDefinition::object_id(Arc::clone(shape_props.get("ShapeID").unwrap()))
                .unwrap();
        registry
            .register(
                ClassDefinition::new(identity("Shape"), shape_props, Some(pk))
                    .table_name("tbShape"),
            )
            .unwrap();
        let mut circle_props = PropertyDefinitionCollection::new("Circle");
        circle_props
            .add(PropertyDefinition::new("Radius", PropertyType::Int))
            .unwrap();
        let circle = registry
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

        let mut properties = properties_for(&circle, &registry);
        properties
            .get_mut("ShapeID")
            .unwrap()
            .initialise(Value::Uuid(Uuid::new_v4()), true);

        let mut generator = ParameterNameGenerator::new();
        let batch = insert_statements(&circle, &registry, &properties, &mut generator).unwrap();
        assert_eq!(batch.len(), 1);
        let text = batch.statements()[0].text();
        assert!(text.starts_with("INSERT INTO \"tbShape\""));
        assert!(text.contains("\"ShapeType\""));
        let last = batch.statements()[0].parameters().last().unwrap();
        assert_eq!(last.value, Value::Text("Circle".to_string()));

        // The SELECT narrows by discriminator.
        let select = select_statement(&circle, &registry, None, -1).unwrap();
        assert!(select.text().contains("\"ShapeType\" IN ('Circle')"));
    }
}
