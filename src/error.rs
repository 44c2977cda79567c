use thiserror::Error;

use deadpool_sqlite::rusqlite;

/// Errors produced by the ORM engine.
///
/// Configuration problems that can degrade gracefully (a bad converter chain,
/// an unresolvable foreign key) are logged where they occur and do not show up
/// here; this enum covers the failures that must reach the caller.
#[derive(Debug, Error)]
pub enum OrmError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Pool(#[from] deadpool::managed::PoolError<rusqlite::Error>),

    /// A model declared more than one primary-key column. The engine requires
    /// a single identifying column per table, so this is fatal at schema
    /// construction time.
    #[error("model `{table}` declares more than one primary key")]
    MultiplePrimaryKeys { table: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// A non-nullable column received no value during mapping.
    #[error("column `{column}` was declared NOT NULL and no value was provided")]
    ConstraintViolation { column: String },

    #[error("mapping error: {0}")]
    Mapping(String),

    #[error("SQL execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<deadpool_sqlite::InteractError> for OrmError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        OrmError::Connection(format!("SQLite interact error: {err}"))
    }
}
