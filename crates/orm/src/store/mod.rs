//! Document store abstraction
//!
//! The relationship layer never assumes relational integrity from its
//! backend: a store only has to persist schemaless documents, fetch them by
//! primary key and answer equality queries.

pub mod memory;

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::error::ModelResult;

pub use memory::{MemoryStore, StoreStats};

/// Field name holding a document's primary key
pub const PRIMARY_KEY_FIELD: &str = "id";

/// A schemaless document: field name to JSON value
pub type Document = HashMap<String, Value>;

/// Equality condition on a single document field
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub value: Value,
}

impl Condition {
    pub fn eq<F, V>(field: F, value: V) -> Self
    where
        F: Into<String>,
        V: Into<Value>,
    {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// A missing field never matches, not even a `null` condition
    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// True when the document satisfies every condition
pub fn matches_all(document: &Document, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| condition.matches(document))
}

/// JSON representation of a primary key as stored in documents
pub fn key_value(id: Uuid) -> Value {
    Value::String(id.to_string())
}

/// Synchronous backing store consumed by records and relationships
pub trait DocumentStore {
    /// Create a table if it does not exist. Returns true when it was created.
    fn create_table(&self, table: &str) -> ModelResult<bool>;

    /// Check whether a table exists
    fn has_table(&self, table: &str) -> bool;

    /// Persist a new document, assigning and returning its primary key
    fn insert(&self, table: &str, document: Document) -> ModelResult<Uuid>;

    /// Overwrite the document stored under `id`, creating it if absent
    fn replace(&self, table: &str, id: Uuid, document: Document) -> ModelResult<()>;

    /// Fetch a single document by primary key
    fn get(&self, table: &str, id: Uuid) -> ModelResult<Option<Document>>;

    /// Fetch every document matching all conditions
    fn select(&self, table: &str, conditions: &[Condition]) -> ModelResult<Vec<Document>>;

    /// Delete a document by primary key. Returns true when one was removed.
    fn delete(&self, table: &str, id: Uuid) -> ModelResult<bool>;

    /// Delete every document matching all conditions, returning the count
    fn delete_where(&self, table: &str, conditions: &[Condition]) -> ModelResult<usize>;
}
