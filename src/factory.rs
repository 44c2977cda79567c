//! The session factory: pool creation, registry wiring, and the shared
//! statement worker.

use std::sync::Arc;
use std::time::Duration;

use deadpool_sqlite::{Config as DeadpoolSqliteConfig, Pool, Runtime};
use tracing::info;

use crate::error::OrmError;
use crate::naming::{IdentityNaming, NamingStrategy};
use crate::schema::registry::ModelRegistry;
use crate::session::Session;
use crate::typing::{Dialect, GenericTypeMapper, TypeMapper};
use crate::worker::{self, StatementWorker};

/// Fluent builder for a [`SessionFactory`].
pub struct SessionFactoryBuilder {
    db_path: String,
    naming: Arc<dyn NamingStrategy>,
    mapper: Arc<dyn TypeMapper>,
    dialect: Dialect,
    tick: Duration,
}

impl SessionFactoryBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        SessionFactoryBuilder {
            db_path: db_path.into(),
            naming: Arc::new(IdentityNaming),
            mapper: Arc::new(GenericTypeMapper),
            dialect: Dialect::Sqlite,
            tick: worker::DEFAULT_TICK,
        }
    }

    #[must_use]
    pub fn naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    #[must_use]
    pub fn type_mapper(mut self, mapper: Arc<dyn TypeMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Interval between statement-worker queue drains.
    #[must_use]
    pub fn worker_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Create the pool, verify connectivity, and spawn the statement worker.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Connection` if the pool cannot be created or the
    /// smoke test fails.
    pub async fn build(self) -> Result<SessionFactory, OrmError> {
        let cfg = DeadpoolSqliteConfig::new(self.db_path.clone());
        let pool = cfg.create_pool(Runtime::Tokio1).map_err(|e| {
            OrmError::Connection(format!("failed to create SQLite pool: {e}"))
        })?;

        // Smoke test before handing out sessions.
        {
            let conn = pool.get().await?;
            conn.interact(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(OrmError::Sqlite)
            })
            .await??;
        }

        let worker_object = pool.get().await?;
        let worker = StatementWorker::spawn(worker_object, self.tick)?;
        info!(db_path = %self.db_path, "session factory ready");

        Ok(SessionFactory {
            pool,
            registry: Arc::new(ModelRegistry::new(self.naming, self.mapper, self.dialect)),
            worker,
        })
    }
}

/// Hands out pooled sessions and owns the model registry and the shared
/// statement worker.
#[derive(Clone)]
pub struct SessionFactory {
    pool: Pool,
    registry: Arc<ModelRegistry>,
    worker: StatementWorker,
}

impl SessionFactory {
    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SessionFactoryBuilder {
        SessionFactoryBuilder::new(db_path)
    }

    /// Check out a pooled connection wrapped in a [`Session`].
    pub async fn session(&self) -> Result<Session, OrmError> {
        let object = self.pool.get().await?;
        Ok(Session::new(object))
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn naming(&self) -> &dyn NamingStrategy {
        self.registry.naming()
    }

    #[must_use]
    pub fn type_mapper(&self) -> &dyn TypeMapper {
        self.registry.mapper()
    }

    #[must_use]
    pub fn worker(&self) -> &StatementWorker {
        &self.worker
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("worker", &self.worker)
            .finish()
    }
}
