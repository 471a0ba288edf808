//! The metadata model: definitions describing how classes map onto tables.

pub mod class;
pub mod key;
pub mod property;
pub mod registry;
pub mod relationship;

pub use class::{ClassDefinition, ClassIdentity, InheritanceStrategy, SuperClassDefinition};
pub use key::{KeyDefinition, PrimaryKeyDefinition};
pub use property::{PropertyDefinition, PropertyDefinitionCollection, ReadWriteRule};
pub use registry::MetadataRegistry;
pub use relationship::{
    RelationshipCardinality, RelationshipDefinition, RelationshipKeyDefinition,
    RelationshipPropertyDefinition,
};
