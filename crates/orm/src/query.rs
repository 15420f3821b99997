//! Lazy queries over a model's table
//!
//! A [`Query`] only describes what to fetch. Every call to [`Query::fetch`]
//! (or any method built on it) runs against the store again, so a query can
//! be kept and re-run after the data changes.

use std::collections::HashSet;

use serde_json::Value;
use tracing::trace;
use uuid::Uuid;

use crate::database::Database;
use crate::error::ModelResult;
use crate::logging::LOG_TARGET;
use crate::record::Record;
use crate::relationships::{parse_key, PivotConfig};
use crate::store::{Condition, Document, PRIMARY_KEY_FIELD};

#[derive(Debug, Clone)]
enum Source {
    /// Every document of the model's table
    Table,
    /// Documents named by the join rows of one owner
    Joined { pivot: PivotConfig, owner_key: Value },
    /// Matches nothing without touching the store
    Empty,
}

/// Lazy, restartable query
#[derive(Debug, Clone)]
pub struct Query {
    db: Database,
    model: String,
    source: Source,
    conditions: Vec<Condition>,
}

impl Query {
    pub(crate) fn table(db: Database, model: impl Into<String>) -> Self {
        Self::with_source(db, model, Source::Table)
    }

    pub(crate) fn joined(
        db: Database,
        model: impl Into<String>,
        pivot: PivotConfig,
        owner_key: Value,
    ) -> Self {
        Self::with_source(db, model, Source::Joined { pivot, owner_key })
    }

    pub(crate) fn empty(db: Database, model: impl Into<String>) -> Self {
        Self::with_source(db, model, Source::Empty)
    }

    fn with_source(db: Database, model: impl Into<String>, source: Source) -> Self {
        Self {
            db,
            model: model.into(),
            source,
            conditions: Vec::new(),
        }
    }

    /// Model whose records this query yields
    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Narrow by field equality
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::eq(field, value));
        self
    }

    /// Narrow by several field equalities at once
    pub fn filter<I, K, V>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.conditions.extend(
            predicates
                .into_iter()
                .map(|(field, value)| Condition::eq(field, value)),
        );
        self
    }

    /// Run the query
    pub fn fetch(&self) -> ModelResult<Vec<Record>> {
        let schema = self.db.model(&self.model)?;
        let documents = self.documents(schema.table())?;
        Ok(documents
            .into_iter()
            .map(|document| Record::from_document(&self.db, schema.clone(), document))
            .collect())
    }

    pub fn iter(&self) -> ModelResult<std::vec::IntoIter<Record>> {
        Ok(self.fetch()?.into_iter())
    }

    pub fn count(&self) -> ModelResult<usize> {
        let schema = self.db.model(&self.model)?;
        Ok(self.documents(schema.table())?.len())
    }

    pub fn first(&self) -> ModelResult<Option<Record>> {
        Ok(self.fetch()?.into_iter().next())
    }

    pub fn exists(&self) -> ModelResult<bool> {
        Ok(self.count()? > 0)
    }

    /// Primary keys of the matching records
    pub fn ids(&self) -> ModelResult<Vec<Uuid>> {
        let schema = self.db.model(&self.model)?;
        Ok(self
            .documents(schema.table())?
            .iter()
            .filter_map(|document| document.get(PRIMARY_KEY_FIELD).and_then(parse_key))
            .collect())
    }

    fn documents(&self, table: &str) -> ModelResult<Vec<Document>> {
        let store = self.db.store();
        match &self.source {
            Source::Empty => Ok(Vec::new()),
            Source::Table => store.select(table, &self.conditions),
            Source::Joined { pivot, owner_key } => {
                let rows = store.select(
                    &pivot.table,
                    &[Condition::eq(pivot.local_key.as_str(), owner_key.clone())],
                )?;
                let linked: HashSet<String> = rows
                    .iter()
                    .filter_map(|row| row.get(&pivot.foreign_key))
                    .filter_map(|key| key.as_str().map(str::to_string))
                    .collect();
                if linked.is_empty() {
                    return Ok(Vec::new());
                }

                // Join rows whose target no longer exists simply drop out here
                let mut documents = store.select(table, &self.conditions)?;
                documents.retain(|document| {
                    document
                        .get(PRIMARY_KEY_FIELD)
                        .and_then(Value::as_str)
                        .map(|id| linked.contains(id))
                        .unwrap_or(false)
                });
                trace!(
                    target: LOG_TARGET,
                    "Join '{}' resolved {} of {} linked records",
                    pivot.table,
                    documents.len(),
                    linked.len()
                );
                Ok(documents)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::config::OrmConfig;
    use crate::model::ModelDef;
    use crate::store::MemoryStore;

    fn setup() -> (Rc<MemoryStore>, Database) {
        let store = Rc::new(MemoryStore::new());
        let db = Database::builder()
            .config(OrmConfig::testing())
            .model(ModelDef::new("Song"))
            .build(store.clone())
            .unwrap();
        db.create_tables().unwrap();
        (store, db)
    }

    fn song(db: &Database, album: &str) -> Record {
        let song = db.new_record("Song").unwrap();
        song.set("album", album);
        song.save().unwrap();
        song
    }

    #[test]
    fn test_query_is_lazy_and_restartable() {
        let (store, db) = setup();
        song(&db, "A");

        store.reset_stats();
        let query = db.query("Song").unwrap().where_eq("album", "A");
        assert_eq!(store.stats().total(), 0);

        assert_eq!(query.count().unwrap(), 1);
        song(&db, "A");
        assert_eq!(query.fetch().unwrap().len(), 2);
        assert_eq!(store.stats().selects, 2);
    }

    #[test]
    fn test_filter_combines_conditions() {
        let (_store, db) = setup();
        let first = song(&db, "A");
        song(&db, "B");

        let id = first.id().unwrap().to_string();
        let query = db.query("Song").unwrap().filter([("id", id.as_str()), ("album", "A")]);
        assert_eq!(query.conditions().len(), 2);
        assert_eq!(query.ids().unwrap(), vec![first.id().unwrap()]);

        let none = db.query("Song").unwrap().filter([("id", "id")]);
        assert!(!none.exists().unwrap());
        assert!(none.first().unwrap().is_none());
    }

    #[test]
    fn test_empty_query_never_touches_store() {
        let (store, db) = setup();
        song(&db, "A");
        store.reset_stats();

        let query = Query::empty(db.clone(), "Song");
        assert_eq!(query.count().unwrap(), 0);
        assert!(query.iter().unwrap().next().is_none());
        assert_eq!(store.stats().total(), 0);
    }
}
