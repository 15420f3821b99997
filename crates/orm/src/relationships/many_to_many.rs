//! Many-to-many relationship through an implicit join table, and its
//! [`RelatedM2MSet`]
//!
//! Each association is one join row holding the owner's key and the related
//! record's key. Reciprocal declarations share the same join table with the
//! two key fields swapped.

use std::borrow::Borrow;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use super::cache::CollectionHandle;
use super::descriptor::{
    check_members, owner_key, unique_records, Related, RelatedValue, RelationshipDescriptor,
};
use super::metadata::{PivotConfig, RelationshipMetadata};
use crate::error::{ModelError, ModelResult};
use crate::logging::LOG_TARGET;
use crate::query::Query;
use crate::record::Record;
use crate::store::{key_value, Condition, Document};

/// Descriptor of a many-to-many relationship (`Artist` has and belongs to
/// many `Taste`)
#[derive(Debug, Clone)]
pub struct HasAndBelongsToMany {
    metadata: Rc<RelationshipMetadata>,
}

impl HasAndBelongsToMany {
    pub fn new(metadata: Rc<RelationshipMetadata>) -> Self {
        Self { metadata }
    }

    fn collection(&self, owner: &Record) -> RelatedM2MSet {
        let handle = match owner.cached_collection(&self.metadata.name) {
            Some(handle) => handle,
            None => {
                let handle = CollectionHandle::new(Rc::clone(&self.metadata));
                owner.cache_collection(&self.metadata.name, Rc::clone(&handle));
                handle
            }
        };
        RelatedM2MSet {
            handle,
            owner: owner.clone(),
        }
    }
}

impl RelationshipDescriptor for HasAndBelongsToMany {
    fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }

    fn get(&self, owner: &Record) -> ModelResult<Related> {
        Ok(Related::ManyToMany(self.collection(owner)))
    }

    fn set(&self, owner: &Record, value: RelatedValue) -> ModelResult<()> {
        match value {
            RelatedValue::Many(records) => self.collection(owner).replace(records),
            _ => Err(ModelError::NotASequence {
                relationship: self.metadata.name.clone(),
            }),
        }
    }

    fn delete(&self, owner: &Record) -> ModelResult<()> {
        self.collection(owner).clear()
    }
}

/// Live view of the records joined to the owner
#[derive(Debug, Clone)]
pub struct RelatedM2MSet {
    handle: Rc<CollectionHandle>,
    owner: Record,
}

impl RelatedM2MSet {
    pub fn owner(&self) -> &Record {
        &self.owner
    }

    pub fn metadata(&self) -> &RelationshipMetadata {
        self.handle.metadata()
    }

    /// True when both values are the collection cached for the same owner
    pub fn same_set(&self, other: &RelatedM2MSet) -> bool {
        Rc::ptr_eq(&self.handle, &other.handle)
    }

    fn pivot(&self) -> ModelResult<&PivotConfig> {
        self.metadata().pivot()
    }

    fn pair(&self, pivot: &PivotConfig, owner_id: Uuid, related_id: Uuid) -> [Condition; 2] {
        [
            Condition::eq(pivot.local_key.as_str(), key_value(owner_id)),
            Condition::eq(pivot.foreign_key.as_str(), key_value(related_id)),
        ]
    }

    /// Every joined record. An unsaved owner has none.
    pub fn all(&self) -> Query {
        let metadata = self.metadata();
        let db = self.owner.database().clone();
        match (self.owner.id(), metadata.pivot_config.as_ref()) {
            (Some(owner_id), Some(pivot)) => Query::joined(
                db,
                &metadata.related_model,
                pivot.clone(),
                key_value(owner_id),
            ),
            _ => Query::empty(db, &metadata.related_model),
        }
    }

    /// Joined records matching every `(field, value)` predicate
    pub fn filter<I, K, V>(&self, predicates: I) -> Query
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.all().filter(predicates)
    }

    pub fn count(&self) -> ModelResult<usize> {
        self.all().count()
    }

    /// Whether a join row exists for the owner and this record
    pub fn contains(&self, record: &Record) -> ModelResult<bool> {
        check_members(self.metadata(), std::slice::from_ref(record))?;
        let (owner_id, related_id) = match (self.owner.id(), record.id()) {
            (Some(owner_id), Some(related_id)) => (owner_id, related_id),
            _ => return Ok(false),
        };
        let pivot = self.pivot()?;
        let rows = self
            .owner
            .database()
            .store()
            .select(&pivot.table, &self.pair(pivot, owner_id, related_id))?;
        Ok(!rows.is_empty())
    }

    fn check_saved(&self, records: &[Record]) -> ModelResult<()> {
        match records.iter().find(|record| !record.is_saved()) {
            Some(record) => Err(ModelError::UnsavedTarget {
                relationship: self.metadata().name.clone(),
                model: record.model_name(),
            }),
            None => Ok(()),
        }
    }

    /// Join each record to the owner. Records must already be saved;
    /// existing pairs are left alone.
    pub fn add<I, R>(&self, records: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = R>,
        R: Borrow<Record>,
    {
        let records = unique_records(records);
        if records.is_empty() {
            return Ok(());
        }

        let metadata = self.metadata();
        check_members(metadata, &records)?;
        self.check_saved(&records)?;
        let owner_id = owner_key(metadata, &self.owner)?;
        self.join_all(&records, owner_id)
    }

    fn join_all(&self, records: &[Record], owner_id: Uuid) -> ModelResult<()> {
        let metadata = self.metadata();
        let pivot = self.pivot()?;
        let store = self.owner.database().store();

        for record in records {
            let related_id = match record.id() {
                Some(id) => id,
                None => continue,
            };

            let existing = store.select(&pivot.table, &self.pair(pivot, owner_id, related_id))?;
            if !existing.is_empty() {
                trace!(target: LOG_TARGET, "{} already joined", related_id);
                continue;
            }

            let mut row = Document::new();
            row.insert(pivot.local_key.clone(), key_value(owner_id));
            row.insert(pivot.foreign_key.clone(), key_value(related_id));
            store.insert(&pivot.table, row)?;
            debug!(
                target: LOG_TARGET,
                "Joined {} {} to {}.{} via '{}'",
                metadata.related_model,
                related_id,
                metadata.owner_model,
                metadata.name,
                pivot.table
            );
        }
        Ok(())
    }

    /// Delete the join rows for these records. Pairs that are not joined,
    /// including unsaved records, are ignored.
    pub fn remove<I, R>(&self, records: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = R>,
        R: Borrow<Record>,
    {
        let records = unique_records(records);
        if records.is_empty() {
            return Ok(());
        }

        let metadata = self.metadata();
        check_members(metadata, &records)?;
        let owner_id = match self.owner.id() {
            Some(id) => id,
            None => return Ok(()),
        };

        let pivot = self.pivot()?;
        let store = self.owner.database().store();
        for related_id in records.iter().filter_map(Record::id) {
            let removed = store.delete_where(&pivot.table, &self.pair(pivot, owner_id, related_id))?;
            if removed > 0 {
                debug!(
                    target: LOG_TARGET,
                    "Unjoined {} {} from {}.{}",
                    metadata.related_model,
                    related_id,
                    metadata.owner_model,
                    metadata.name
                );
            }
        }
        Ok(())
    }

    /// Delete every join row of the owner. Related records are untouched.
    pub fn clear(&self) -> ModelResult<()> {
        let owner_id = match self.owner.id() {
            Some(id) => id,
            None => return Ok(()),
        };

        let metadata = self.metadata();
        let pivot = self.pivot()?;
        let removed = self.owner.database().store().delete_where(
            &pivot.table,
            &[Condition::eq(pivot.local_key.as_str(), key_value(owner_id))],
        )?;
        debug!(
            target: LOG_TARGET,
            "Cleared {} join rows of {}.{}",
            removed,
            metadata.owner_model,
            metadata.name
        );
        Ok(())
    }

    /// Validate the whole batch, then clear and add
    pub(crate) fn replace(&self, records: Vec<Record>) -> ModelResult<()> {
        let records = unique_records(records);
        let metadata = self.metadata();
        check_members(metadata, &records)?;
        self.check_saved(&records)?;
        if records.is_empty() {
            return self.clear();
        }

        let owner_id = owner_key(metadata, &self.owner)?;
        self.clear()?;
        self.join_all(&records, owner_id)
    }
}
