//! Synchronous sessions over a pooled SQLite connection.

use deadpool_sqlite::Object;
use deadpool_sqlite::rusqlite;
use tracing::debug;

use crate::error::OrmError;
use crate::results::ResultSet;
use crate::sqlite::{build_result_set, to_sqlite_params};
use crate::types::ParameterizedStatement;

/// A pooled connection with transaction state tracking.
///
/// A session executes statements synchronously on the caller's thread.
/// Transactions follow begin/commit/rollback semantics: beginning while a
/// transaction is already active commits the active one first, and
/// committing or rolling back with none active is a no-op. A driver failure
/// surfaces as an error and leaves the transaction flag unchanged.
pub struct Session {
    object: Object,
    in_transaction: bool,
}

impl Session {
    #[must_use]
    pub fn new(object: Object) -> Self {
        Session {
            object,
            in_transaction: false,
        }
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Begin a transaction, committing any transaction already in flight.
    pub fn begin(&mut self) -> Result<(), OrmError> {
        if self.in_transaction {
            debug!("beginning with an active transaction, committing it first");
            self.commit()?;
        }
        self.with_connection(|conn| conn.execute_batch("BEGIN").map_err(OrmError::Sqlite))?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the active transaction. No-op when none is active.
    pub fn commit(&mut self) -> Result<(), OrmError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.with_connection(|conn| conn.execute_batch("COMMIT").map_err(OrmError::Sqlite))?;
        self.in_transaction = false;
        Ok(())
    }

    /// Roll back the active transaction. No-op when none is active.
    pub fn rollback(&mut self) -> Result<(), OrmError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.with_connection(|conn| conn.execute_batch("ROLLBACK").map_err(OrmError::Sqlite))?;
        self.in_transaction = false;
        Ok(())
    }

    /// Execute a statement expected to return rows.
    pub fn execute_query(
        &self,
        statement: &ParameterizedStatement,
    ) -> Result<ResultSet, OrmError> {
        let params = to_sqlite_params(&statement.params);
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&statement.sql)?;
            build_result_set(&mut stmt, &params)
        })
    }

    /// Execute a statement expected to return no rows, yielding the affected
    /// row count.
    pub fn execute_update(&self, statement: &ParameterizedStatement) -> Result<usize, OrmError> {
        let params = to_sqlite_params(&statement.params);
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&statement.sql)?;
            let param_refs: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
            stmt.execute(&param_refs[..]).map_err(OrmError::Sqlite)
        })
    }

    /// Execute raw SQL without parameters, e.g. schema DDL.
    pub fn execute_batch(&self, sql: &str) -> Result<(), OrmError> {
        self.with_connection(|conn| conn.execute_batch(sql).map_err(OrmError::Sqlite))
    }

    fn with_connection<T, F>(&self, f: F) -> Result<T, OrmError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, OrmError>,
    {
        let mut guard = self.object.lock().map_err(|err| {
            OrmError::Connection(format!("connection mutex poisoned: {err}"))
        })?;
        f(&mut guard)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}
