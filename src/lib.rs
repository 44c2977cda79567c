//! A lightweight ORM engine over `SQLite`.
//!
//! Models describe themselves through [`schema::FieldDescriptor`]s; the
//! engine derives table schemas from them, maps instances to rows and back,
//! builds parameterized queries, and executes them either synchronously on a
//! pooled [`session::Session`] or asynchronously through the queued
//! [`worker::StatementWorker`].

pub mod convert;
pub mod error;
pub mod factory;
pub mod mapping;
pub mod naming;
pub mod query;
pub mod results;
pub mod schema;
pub mod session;
pub mod sqlite;
pub mod types;
pub mod typing;
pub mod worker;

pub use error::OrmError;
pub use types::{ParameterizedStatement, SqlValue};

pub mod prelude {
    //! Convenient imports for common functionality.

    pub use crate::convert::{ConverterChain, ValueConverter};
    pub use crate::error::OrmError;
    pub use crate::factory::{SessionFactory, SessionFactoryBuilder};
    pub use crate::mapping::{RowMapping, apply_collection, hydrate, map_object};
    pub use crate::naming::{IdentityNaming, NamingStrategy, TablePrefixNaming};
    pub use crate::query::{
        ComparisonOperator, Logic, Order, SelectQuery, SqlComparisonBuilder,
    };
    pub use crate::results::{ResultRow, ResultSet};
    pub use crate::schema::{
        DeclaredType, EnumMeta, EnumStorage, EnumValue, FieldAccessor, FieldDescriptor,
        FieldValue, ForeignKeyRef, ForeignRef, Model, ModelRegistry, ModelSchema,
    };
    pub use crate::session::Session;
    pub use crate::types::{ParameterizedStatement, SqlValue};
    pub use crate::typing::{
        ColumnType, Dialect, GenericTypeMapper, ScalarKind, SqlSize, SqlType, TypeMapper,
    };
    pub use crate::worker::{PendingTask, StatementWorker};
}
