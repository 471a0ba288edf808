//! Shared fixtures for the facade integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use classmap::prelude::*;
use classmap::InheritanceStrategy;

/// Connection double: serves queued row sets in order, records every
/// executed statement, and counts transaction calls.
#[derive(Debug, Default)]
pub struct MockConnection {
    reads: VecDeque<Vec<Row>>,
    pub executed: Vec<String>,
    pub queries: Vec<String>,
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
    pub fail_execution: bool,
    pub fail_on_call: Option<usize>,
    calls: usize,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_rows(&mut self, rows: Vec<Row>) {
        self.reads.push_back(rows);
    }
}

impl DatabaseConnection for MockConnection {
    fn execute_batch(&mut self, batch: &SqlStatementCollection) -> Result<u64> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_execution || self.fail_on_call == Some(call) {
            return Err(Error::DatabaseWrite("scripted failure".to_string()));
        }
        for statement in batch.statements() {
            self.executed.push(statement.text().to_string());
        }
        Ok(batch.len() as u64)
    }

    fn load_rows(&mut self, statement: &SqlStatement) -> Result<Vec<Row>> {
        self.queries.push(statement.text().to_string());
        Ok(self.reads.pop_front().unwrap_or_default())
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.begun += 1;
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        self.committed += 1;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        self.rolled_back += 1;
        Ok(())
    }
}

/// Shape <- Circle <- FilledCircle with per-class tables joined on the
/// shared primary key.
pub fn class_table_shapes(registry: &MetadataRegistry) -> Arc<ClassDefinition> {
    let mut shape_props = PropertyDefinitionCollection::new("Shape");
    shape_props
        .add(PropertyDefinition::new("ShapeID", PropertyType::Guid))
        .unwrap();
    shape_props
        .add(PropertyDefinition::new("ShapeName", PropertyType::Text))
        .unwrap();
    let pk =
        PrimaryKeyDefinition::object_id(Arc::clone(shape_props.get("ShapeID").unwrap())).unwrap();
    registry
        .register(
            ClassDefinition::new(ClassIdentity::new("shapes", "Shape"), shape_props, Some(pk))
                .table_name("tbShape"),
        )
        .unwrap();

    let mut circle_props = PropertyDefinitionCollection::new("Circle");
    circle_props
        .add(PropertyDefinition::new("Radius", PropertyType::Int))
        .unwrap();
    registry
        .register(
            ClassDefinition::new(ClassIdentity::new("shapes", "Circle"), circle_props, None)
                .superclass(SuperClassDefinition::new(
                    ClassIdentity::new("shapes", "Shape"),
                    InheritanceStrategy::ClassTable,
                )),
        )
        .unwrap();

    let mut filled_props = PropertyDefinitionCollection::new("FilledCircle");
    filled_props
        .add(PropertyDefinition::new("Colour", PropertyType::Text))
        .unwrap();
    registry
        .register(
            ClassDefinition::new(
                ClassIdentity::new("shapes", "FilledCircle"),
                filled_props,
                None,
            )
            .superclass(SuperClassDefinition::new(
                ClassIdentity::new("shapes", "Circle"),
                InheritanceStrategy::ClassTable,
            )),
        )
        .unwrap();

    registry
        .get(&ClassIdentity::new("shapes", "FilledCircle"))
        .unwrap()
}

/// Shape <- Circle sharing the root table with a `ShapeType` discriminator.
pub fn single_table_shapes(registry: &MetadataRegistry) -> Arc<ClassDefinition> {
    let mut shape_props = PropertyDefinitionCollection::new("Shape");
    shape_props
        .add(PropertyDefinition::new("ShapeID", PropertyType::Guid))
        .unwrap();
    shape_props
        .add(PropertyDefinition::new("ShapeName", PropertyType::Text))
        .unwrap();
    let pk =
        PrimaryKeyDefinition::object_id(Arc::clone(shape_props.get("ShapeID").unwrap())).unwrap();
    registry
        .register(
            ClassDefinition::new(ClassIdentity::new("shapes", "Shape"), shape_props, Some(pk))
                .table_name("tbShape"),
        )
        .unwrap();

    let mut circle_props = PropertyDefinitionCollection::new("Circle");
    circle_props
        .add(PropertyDefinition::new("Radius", PropertyType::Int))
        .unwrap();
    registry
        .register(
            ClassDefinition::new(ClassIdentity::new("shapes", "Circle"), circle_props, None)
                .superclass(SuperClassDefinition::new(
                    ClassIdentity::new("shapes", "Shape"),
                    InheritanceStrategy::SingleTable {
                        discriminator: "ShapeType".to_string(),
                    },
                )),
        )
        .unwrap();

    registry
        .get(&ClassIdentity::new("shapes", "Circle"))
        .unwrap()
}

/// A flat Contact class with an alternate key on the email property.
pub fn contact_with_email_key(
    registry: &MetadataRegistry,
    ignore_nulls: bool,
) -> Arc<ClassDefinition> {
    let mut props = PropertyDefinitionCollection::new("Contact");
    props
        .add(PropertyDefinition::new("ContactID", PropertyType::Guid))
        .unwrap();
    props
        .add(PropertyDefinition::new("Surname", PropertyType::Text))
        .unwrap();
    props
        .add(PropertyDefinition::new("Email", PropertyType::Text))
        .unwrap();
    let pk = PrimaryKeyDefinition::object_id(Arc::clone(props.get("ContactID").unwrap())).unwrap();
    let mut email_key = KeyDefinition::named("EmailKey").ignore_nulls(ignore_nulls);
    email_key.add(Arc::clone(props.get("Email").unwrap())).unwrap();
    registry
        .register(
            ClassDefinition::new(ClassIdentity::new("app", "Contact"), props, Some(pk))
                .key(email_key),
        )
        .unwrap()
}
