//! In-memory document store
//!
//! Single-threaded backend used by tests and embedded callers. Tables keep
//! insertion order so query results are deterministic.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use tracing::trace;
use uuid::Uuid;

use super::{key_value, matches_all, Condition, Document, DocumentStore, PRIMARY_KEY_FIELD};
use crate::error::{ModelError, ModelResult};
use crate::logging::LOG_TARGET;

/// Counters of the round trips a store has served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub inserts: usize,
    pub replaces: usize,
    pub gets: usize,
    pub selects: usize,
    pub deletes: usize,
}

impl StoreStats {
    /// Round trips that only read
    pub fn reads(&self) -> usize {
        self.gets + self.selects
    }

    /// Round trips that changed stored data
    pub fn writes(&self) -> usize {
        self.inserts + self.replaces + self.deletes
    }

    pub fn total(&self) -> usize {
        self.reads() + self.writes()
    }
}

#[derive(Debug, Default)]
struct Table {
    order: Vec<Uuid>,
    documents: HashMap<Uuid, Document>,
}

impl Table {
    fn put(&mut self, id: Uuid, mut document: Document) {
        document.insert(PRIMARY_KEY_FIELD.to_string(), key_value(id));
        if self.documents.insert(id, document).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: Uuid) -> bool {
        if self.documents.remove(&id).is_some() {
            self.order.retain(|existing| *existing != id);
            true
        } else {
            false
        }
    }

    fn matching(&self, conditions: &[Condition]) -> Vec<Uuid> {
        self.order
            .iter()
            .filter(|id| {
                self.documents
                    .get(id)
                    .map(|document| matches_all(document, conditions))
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }
}

#[derive(Debug, Default)]
struct Counters {
    inserts: Cell<usize>,
    replaces: Cell<usize>,
    gets: Cell<usize>,
    selects: Cell<usize>,
    deletes: Cell<usize>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// In-memory [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RefCell<BTreeMap<String, Table>>,
    counters: Counters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the round-trip counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            inserts: self.counters.inserts.get(),
            replaces: self.counters.replaces.get(),
            gets: self.counters.gets.get(),
            selects: self.counters.selects.get(),
            deletes: self.counters.deletes.get(),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.inserts.set(0);
        self.counters.replaces.set(0);
        self.counters.gets.set(0);
        self.counters.selects.set(0);
        self.counters.deletes.set(0);
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.tables.borrow().keys().cloned().collect()
    }

    /// Number of documents in a table (0 for a missing table)
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .borrow()
            .get(table)
            .map(|t| t.documents.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&mut Table) -> T) -> ModelResult<T> {
        let mut tables = self.tables.borrow_mut();
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| ModelError::Store(format!("Table '{}' does not exist", table)))?;
        Ok(f(entry))
    }
}

impl DocumentStore for MemoryStore {
    fn create_table(&self, table: &str) -> ModelResult<bool> {
        if table.is_empty() {
            return Err(ModelError::Store("Table name cannot be empty".to_string()));
        }

        let mut tables = self.tables.borrow_mut();
        if tables.contains_key(table) {
            return Ok(false);
        }
        tables.insert(table.to_string(), Table::default());
        trace!(target: LOG_TARGET, "Created table '{}'", table);
        Ok(true)
    }

    fn has_table(&self, table: &str) -> bool {
        self.tables.borrow().contains_key(table)
    }

    fn insert(&self, table: &str, document: Document) -> ModelResult<Uuid> {
        bump(&self.counters.inserts);
        let id = Uuid::new_v4();
        self.with_table(table, |t| t.put(id, document))?;
        trace!(target: LOG_TARGET, "Inserted {} into '{}'", id, table);
        Ok(id)
    }

    fn replace(&self, table: &str, id: Uuid, document: Document) -> ModelResult<()> {
        bump(&self.counters.replaces);
        self.with_table(table, |t| t.put(id, document))
    }

    fn get(&self, table: &str, id: Uuid) -> ModelResult<Option<Document>> {
        bump(&self.counters.gets);
        self.with_table(table, |t| t.documents.get(&id).cloned())
    }

    fn select(&self, table: &str, conditions: &[Condition]) -> ModelResult<Vec<Document>> {
        bump(&self.counters.selects);
        self.with_table(table, |t| {
            t.matching(conditions)
                .into_iter()
                .filter_map(|id| t.documents.get(&id).cloned())
                .collect()
        })
    }

    fn delete(&self, table: &str, id: Uuid) -> ModelResult<bool> {
        bump(&self.counters.deletes);
        self.with_table(table, |t| t.remove(id))
    }

    fn delete_where(&self, table: &str, conditions: &[Condition]) -> ModelResult<usize> {
        bump(&self.counters.deletes);
        self.with_table(table, |t| {
            let doomed = t.matching(conditions);
            for id in &doomed {
                t.remove(*id);
            }
            doomed.len()
        })
    }
}
