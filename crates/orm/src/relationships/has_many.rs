//! HasMany Relationship - one-to-many relationship and its [`RelatedSet`]

use std::borrow::Borrow;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use super::cache::CollectionHandle;
use super::descriptor::{
    check_members, owner_key, parse_key, record_label, unique_records, Related, RelatedValue,
    RelationshipDescriptor,
};
use super::metadata::RelationshipMetadata;
use crate::error::{ModelError, ModelResult};
use crate::logging::LOG_TARGET;
use crate::query::Query;
use crate::record::Record;
use crate::store::{key_value, Condition, PRIMARY_KEY_FIELD};

/// Descriptor of a one-to-many relationship (`Artist` has many `Song`)
#[derive(Debug, Clone)]
pub struct HasMany {
    metadata: Rc<RelationshipMetadata>,
}

impl HasMany {
    pub fn new(metadata: Rc<RelationshipMetadata>) -> Self {
        Self { metadata }
    }

    fn collection(&self, owner: &Record) -> RelatedSet {
        let handle = match owner.cached_collection(&self.metadata.name) {
            Some(handle) => handle,
            None => {
                let handle = CollectionHandle::new(Rc::clone(&self.metadata));
                owner.cache_collection(&self.metadata.name, Rc::clone(&handle));
                handle
            }
        };
        RelatedSet {
            handle,
            owner: owner.clone(),
        }
    }
}

impl RelationshipDescriptor for HasMany {
    fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }

    fn get(&self, owner: &Record) -> ModelResult<Related> {
        Ok(Related::Set(self.collection(owner)))
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

/// Live view of the records whose foreign key names the owner.
///
/// Holds no members itself: every read goes to the store.
#[derive(Debug, Clone)]
pub struct RelatedSet {
    handle: Rc<CollectionHandle>,
    owner: Record,
}

impl RelatedSet {
    pub fn owner(&self) -> &Record {
        &self.owner
    }

    pub fn metadata(&self) -> &RelationshipMetadata {
        self.handle.metadata()
    }

    /// True when both values are the collection cached for the same owner
    pub fn same_set(&self, other: &RelatedSet) -> bool {
        Rc::ptr_eq(&self.handle, &other.handle)
    }

    fn owner_value(&self) -> Option<Value> {
        self.owner.id().map(key_value)
    }

    /// Every member. An unsaved owner has no members.
    pub fn all(&self) -> Query {
        let metadata = self.metadata();
        let db = self.owner.database().clone();
        match self.owner_value() {
            Some(key) => {
                Query::table(db, &metadata.related_model).where_eq(metadata.key_field(), key)
            }
            None => Query::empty(db, &metadata.related_model),
        }
    }

    /// Members matching every `(field, value)` predicate
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

    /// Whether the stored record currently carries the owner's key
    pub fn contains(&self, record: &Record) -> ModelResult<bool> {
        check_members(self.metadata(), std::slice::from_ref(record))?;
        match (self.owner_value(), record.id()) {
            (Some(key), Some(id)) => self.stored_key_matches(id, &key),
            _ => Ok(false),
        }
    }

    fn stored_key_matches(&self, id: Uuid, key: &Value) -> ModelResult<bool> {
        let metadata = self.metadata();
        let stored = self
            .owner
            .database()
            .store()
            .get(&metadata.related_table, id)?;
        Ok(stored
            .and_then(|document| document.get(metadata.key_field()).cloned())
            .as_ref()
            == Some(key))
    }

    /// Point each record at the owner and save it. Unsaved records are
    /// inserted; records already linked are left alone.
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
        let key = key_value(owner_key(metadata, &self.owner)?);
        self.link_all(&records, &key)
    }

    /// Linked both in memory and in the store; a stale handle alone does
    /// not count
    fn already_linked(&self, record: &Record, key: &Value) -> ModelResult<bool> {
        match record.id() {
            Some(id) if record.get(self.metadata().key_field()).as_ref() == Some(key) => {
                self.stored_key_matches(id, key)
            }
            _ => Ok(false),
        }
    }

    fn link_all(&self, records: &[Record], key: &Value) -> ModelResult<()> {
        let metadata = self.metadata();
        for record in records {
            if self.already_linked(record, key)? {
                trace!(target: LOG_TARGET, "{} already linked", record_label(record));
                continue;
            }

            record.set(metadata.key_field(), key.clone());
            let id = record.save()?;
            debug!(
                target: LOG_TARGET,
                "Linked {} {} to {}.{}",
                metadata.related_model,
                id,
                metadata.owner_model,
                metadata.name
            );
        }
        Ok(())
    }

    /// Unlink members. Fails before any change if one of the records is not
    /// a member.
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

        let key = self.owner_value();
        for record in &records {
            let member = match (&key, record.id()) {
                (Some(key), Some(id)) => self.stored_key_matches(id, key)?,
                _ => false,
            };
            if !member {
                return Err(ModelError::NotAssociated {
                    relationship: metadata.name.clone(),
                    model: metadata.related_model.clone(),
                    id: record_label(record),
                });
            }
        }

        for record in &records {
            record.remove(metadata.key_field());
            let id = record.save()?;
            debug!(
                target: LOG_TARGET,
                "Unlinked {} {} from {}.{}",
                metadata.related_model,
                id,
                metadata.owner_model,
                metadata.name
            );
        }
        Ok(())
    }

    /// Unlink every member. Nothing to do for an unsaved owner.
    pub fn clear(&self) -> ModelResult<()> {
        let key = match self.owner_value() {
            Some(key) => key,
            None => return Ok(()),
        };

        let metadata = self.metadata();
        let store = self.owner.database().store();
        let members = store.select(
            &metadata.related_table,
            &[Condition::eq(metadata.key_field(), key)],
        )?;

        let cleared = members.len();
        for mut document in members {
            document.remove(metadata.key_field());
            let id = document
                .get(PRIMARY_KEY_FIELD)
                .and_then(parse_key)
                .ok_or_else(|| {
                    ModelError::InvalidKey(format!(
                        "{} document without a primary key",
                        metadata.related_model
                    ))
                })?;
            store.replace(&metadata.related_table, id, document)?;
        }

        debug!(
            target: LOG_TARGET,
            "Cleared {} {} records from {}.{}",
            cleared,
            metadata.related_model,
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
        if records.is_empty() {
            return self.clear();
        }

        let key = key_value(owner_key(metadata, &self.owner)?);
        self.clear()?;
        self.link_all(&records, &key)
    }
}
