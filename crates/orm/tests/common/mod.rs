#![allow(dead_code)]

use std::rc::Rc;

use docrel_orm::{
    init_logging, Database, LoggingConfig, MemoryStore, ModelDef, OrmConfig, Record,
};
use serde_json::{json, Value};

/// A database over a fresh in-memory store with every table created
pub struct Fixture {
    pub store: Rc<MemoryStore>,
    pub db: Database,
}

impl Fixture {
    pub fn new(models: Vec<ModelDef>) -> Self {
        let _ = init_logging(LoggingConfig::test());

        let store = Rc::new(MemoryStore::new());
        let db = Database::builder()
            .config(OrmConfig::testing())
            .models(models)
            .build(store.clone())
            .expect("schema should resolve");
        db.create_tables().expect("tables should be created");
        store.reset_stats();
        Self { store, db }
    }

    /// Artist has one Bio
    pub fn has_one() -> Self {
        Self::new(vec![ModelDef::new("Artist").has_one("Bio"), ModelDef::new("Bio")])
    }

    /// Artist belongs to Person
    pub fn belongs_to() -> Self {
        Self::new(vec![
            ModelDef::new("Artist").belongs_to("Person"),
            ModelDef::new("Person"),
        ])
    }

    /// Artist has many Song
    pub fn has_many() -> Self {
        Self::new(vec![ModelDef::new("Artist").has_many("Song"), ModelDef::new("Song")])
    }

    /// Artist has and belongs to many Taste, and the reverse
    pub fn many_to_many() -> Self {
        Self::new(vec![
            ModelDef::new("Artist").has_and_belongs_to_many("Taste"),
            ModelDef::new("Taste").has_and_belongs_to_many("Artist"),
        ])
    }

    /// Unsaved record
    pub fn record(&self, model: &str) -> Record {
        self.db.new_record(model).expect("model should be registered")
    }

    /// Saved record
    pub fn saved(&self, model: &str) -> Record {
        let record = self.record(model);
        record.save().expect("record should save");
        record
    }

    /// Fresh handle on the stored document, sharing nothing with `record`
    pub fn fetch(&self, record: &Record) -> Record {
        let id = record.id().expect("record should be saved");
        self.db
            .get(&record.model_name(), id)
            .expect("store should answer")
            .expect("record should exist")
    }

    pub fn reset_stats(&self) {
        self.store.reset_stats();
    }

    pub fn round_trips(&self) -> usize {
        self.store.stats().total()
    }
}

/// The JSON value a record's key is stored as
pub fn key_of(record: &Record) -> Value {
    json!(record.id().expect("record should be saved").to_string())
}
