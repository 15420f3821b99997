//! Relationship Cache - per-record memo of resolved relationships
//!
//! Each record owns one cache. An entry that is missing means the
//! relationship was never resolved; a singular entry holding `None` means it
//! was resolved (or assigned) and found empty.

use std::collections::HashMap;
use std::rc::Rc;

use super::metadata::RelationshipMetadata;
use crate::record::Record;

/// Identity of the collection object handed out for a plural relationship.
///
/// The handle does not point back at its owner, so caching it on the owner
/// never creates a reference cycle.
#[derive(Debug)]
pub struct CollectionHandle {
    metadata: Rc<RelationshipMetadata>,
}

impl CollectionHandle {
    pub(crate) fn new(metadata: Rc<RelationshipMetadata>) -> Rc<Self> {
        Rc::new(Self { metadata })
    }

    pub fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }
}

#[derive(Debug, Clone)]
enum CachedRelation {
    One(Option<Record>),
    Collection(Rc<CollectionHandle>),
}

/// Resolved relationships of one record, keyed by attribute name
#[derive(Debug, Clone, Default)]
pub struct RelationshipCache {
    entries: HashMap<String, CachedRelation>,
}

impl RelationshipCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Cached singular value; `None` when never resolved
    pub fn one(&self, name: &str) -> Option<Option<Record>> {
        match self.entries.get(name)? {
            CachedRelation::One(record) => Some(record.clone()),
            CachedRelation::Collection(_) => None,
        }
    }

    pub fn store_one(&mut self, name: &str, record: Option<Record>) {
        self.entries
            .insert(name.to_string(), CachedRelation::One(record));
    }

    /// Cached collection handle, if one was handed out
    pub fn collection(&self, name: &str) -> Option<Rc<CollectionHandle>> {
        match self.entries.get(name)? {
            CachedRelation::Collection(handle) => Some(Rc::clone(handle)),
            CachedRelation::One(_) => None,
        }
    }

    pub fn store_collection(&mut self, name: &str, handle: Rc<CollectionHandle>) {
        self.entries
            .insert(name.to_string(), CachedRelation::Collection(handle));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of cached relationships, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}
