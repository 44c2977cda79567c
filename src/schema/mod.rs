//! Schema derivation: field descriptors in, table schemas out.

pub mod column;
pub mod field;
pub mod model;
pub mod registry;

pub use column::{ColumnDefinition, ConstraintKind, ForeignKeySpec, SqlConstraint};
pub use field::{
    CollectionNames, DeclaredType, EnumMeta, EnumStorage, EnumValue, FieldAccessor,
    FieldDescriptor, FieldValue, ForeignKeyRef, ForeignRef, Model,
};
pub use model::{ElementCollectionSpec, ModelSchema};
pub use registry::ModelRegistry;
