//! The model registry: caches derived schemas and rebuilds them when the
//! dialect changes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::OrmError;
use crate::naming::{IdentityNaming, NamingStrategy};
use crate::schema::model::ModelSchema;
use crate::schema::field::Model;
use crate::typing::{Dialect, GenericTypeMapper, TypeMapper};

type BuildFn = fn(&ModelRegistry) -> Result<ModelSchema, OrmError>;

struct Inner {
    dialect: Dialect,
    schemas: HashMap<&'static str, Arc<ModelSchema>>,
    builders: HashMap<&'static str, BuildFn>,
}

/// Registry of model schemas keyed by [`Model::KEY`].
///
/// The naming strategy and type mapper are fixed at construction; changing
/// either means building a new registry. Changing the dialect is supported
/// and drops every cached schema so lookups rebuild against the new dialect.
///
/// Cyclic foreign-key references between models are not supported.
pub struct ModelRegistry {
    naming: Arc<dyn NamingStrategy>,
    mapper: Arc<dyn TypeMapper>,
    inner: RwLock<Inner>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new(
        naming: Arc<dyn NamingStrategy>,
        mapper: Arc<dyn TypeMapper>,
        dialect: Dialect,
    ) -> Self {
        ModelRegistry {
            naming,
            mapper,
            inner: RwLock::new(Inner {
                dialect,
                schemas: HashMap::new(),
                builders: HashMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn naming(&self) -> &dyn NamingStrategy {
        self.naming.as_ref()
    }

    #[must_use]
    pub fn mapper(&self) -> &dyn TypeMapper {
        self.mapper.as_ref()
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.inner.read().expect("registry lock poisoned").dialect
    }

    /// Switch dialects, invalidating every cached schema. Registered models
    /// stay registered and rebuild on next lookup.
    pub fn set_dialect(&self, dialect: Dialect) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if inner.dialect != dialect {
            inner.dialect = dialect;
            inner.schemas.clear();
        }
    }

    /// Register `M` and derive its schema immediately.
    pub fn register<M: Model>(&self) -> Result<Arc<ModelSchema>, OrmError> {
        {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            inner.builders.insert(M::KEY, ModelSchema::derive::<M>);
        }
        self.schema_by_key(M::KEY)
    }

    /// Schema for `M`, registering it on first use.
    pub fn schema<M: Model>(&self) -> Result<Arc<ModelSchema>, OrmError> {
        {
            let inner = self.inner.read().expect("registry lock poisoned");
            if let Some(schema) = inner.schemas.get(M::KEY) {
                return Ok(Arc::clone(schema));
            }
        }
        self.register::<M>()
    }

    /// Schema for an already registered model key; rebuilds from the cached
    /// builder if the schema was invalidated.
    pub fn schema_by_key(&self, key: &str) -> Result<Arc<ModelSchema>, OrmError> {
        let builder = {
            let inner = self.inner.read().expect("registry lock poisoned");
            if let Some(schema) = inner.schemas.get(key) {
                return Ok(Arc::clone(schema));
            }
            inner.builders.get(key).copied()
        };
        let Some(builder) = builder else {
            return Err(OrmError::Config(format!("model `{key}` is not registered")));
        };

        // Built without holding the lock; derivation takes read locks for
        // foreign-key lookups.
        let schema = Arc::new(builder(self)?);
        let mut inner = self.inner.write().expect("registry lock poisoned");
        Ok(Arc::clone(
            inner
                .schemas
                .entry(schema.key())
                .or_insert(schema),
        ))
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        ModelRegistry::new(
            Arc::new(IdentityNaming),
            Arc::new(GenericTypeMapper),
            Dialect::Sqlite,
        )
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("registry lock poisoned");
        f.debug_struct("ModelRegistry")
            .field("dialect", &inner.dialect)
            .field("registered", &inner.builders.len())
            .field("cached", &inner.schemas.len())
            .finish()
    }
}
