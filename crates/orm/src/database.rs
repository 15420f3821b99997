//! Database - resolved schema bound to a document store
//!
//! Built once at startup from model declarations; every record, query and
//! relationship reaches the store through it.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::OrmConfig;
use crate::error::ModelResult;
use crate::logging::LOG_TARGET;
use crate::model::{ModelDef, ModelRegistry, ModelSchema, Schema};
use crate::query::Query;
use crate::record::Record;
use crate::store::{Document, DocumentStore};

struct DatabaseInner {
    store: Rc<dyn DocumentStore>,
    schema: Schema,
    config: OrmConfig,
}

/// Shared handle on the store and the resolved schema
#[derive(Clone)]
pub struct Database {
    inner: Rc<DatabaseInner>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::default()
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn config(&self) -> &OrmConfig {
        &self.inner.config
    }

    pub fn model(&self, name: &str) -> ModelResult<Rc<ModelSchema>> {
        self.inner.schema.model(name)
    }

    /// Create every model table and join table that does not exist yet.
    /// Returns the names of the tables created by this call.
    pub fn create_tables(&self) -> ModelResult<Vec<String>> {
        let mut created = Vec::new();
        for table in self.inner.schema.tables() {
            if self.inner.store.create_table(&table)? {
                debug!(target: LOG_TARGET, "Created table '{}'", table);
                created.push(table);
            }
        }
        Ok(created)
    }

    /// New unsaved record of a model
    pub fn new_record(&self, model: &str) -> ModelResult<Record> {
        Ok(Record::from_document(self, self.model(model)?, Document::new()))
    }

    /// Fetch a record by primary key
    pub fn get(&self, model: &str, id: Uuid) -> ModelResult<Option<Record>> {
        let schema = self.model(model)?;
        let document = self.inner.store.get(schema.table(), id)?;
        Ok(document.map(|document| Record::from_document(self, schema, document)))
    }

    /// Lazy query over every record of a model
    pub fn query(&self, model: &str) -> ModelResult<Query> {
        self.model(model)?;
        Ok(Query::table(self.clone(), model))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("schema", &self.inner.schema)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Collects configuration and model declarations, then resolves them
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    config: Option<OrmConfig>,
    models: Vec<ModelDef>,
}

impl DatabaseBuilder {
    pub fn config(mut self, config: OrmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn model(mut self, def: ModelDef) -> Self {
        self.models.push(def);
        self
    }

    pub fn models<I>(mut self, defs: I) -> Self
    where
        I: IntoIterator<Item = ModelDef>,
    {
        self.models.extend(defs);
        self
    }

    /// Validate the configuration, resolve every declaration and bind the store
    pub fn build(self, store: Rc<dyn DocumentStore>) -> ModelResult<Database> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut registry = ModelRegistry::new();
        for def in self.models {
            registry.register(def)?;
        }
        let schema = registry.resolve(&config)?;

        info!(
            target: LOG_TARGET,
            "Resolved {} models and {} join tables ({})",
            registry.len(),
            schema.join_tables().len(),
            config.environment
        );

        Ok(Database {
            inner: Rc::new(DatabaseInner {
                store,
                schema,
                config,
            }),
        })
    }
}
