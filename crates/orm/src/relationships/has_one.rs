//! HasOne Relationship - one-to-one relationship where the related record
//! carries the owner's key

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::descriptor::{
    check_instance, owner_key, same_record, Related, RelatedValue, RelationshipDescriptor,
};
use super::metadata::RelationshipMetadata;
use crate::error::{ModelError, ModelResult};
use crate::logging::LOG_TARGET;
use crate::query::Query;
use crate::record::Record;
use crate::store::key_value;

/// Descriptor of a one-to-one relationship (`Artist` has one `Bio`)
#[derive(Debug, Clone)]
pub struct HasOne {
    metadata: Rc<RelationshipMetadata>,
}

impl HasOne {
    pub fn new(metadata: Rc<RelationshipMetadata>) -> Self {
        Self { metadata }
    }

    fn lookup(&self, owner: &Record, owner_id: Uuid) -> ModelResult<Option<Record>> {
        let found = Query::table(owner.database().clone(), &self.metadata.related_model)
            .where_eq(self.metadata.key_field(), key_value(owner_id))
            .fetch()?;

        if found.len() > 1 {
            warn!(
                target: LOG_TARGET,
                "{} {} records carry {} = {}, using the first",
                found.len(),
                self.metadata.related_model,
                self.metadata.key_field(),
                owner_id
            );
        }

        Ok(found.into_iter().next())
    }

    /// Record linked right now: the cached one, else the stored one
    fn current(&self, owner: &Record) -> ModelResult<Option<Record>> {
        if let Some(cached) = owner.cached_one(&self.metadata.name) {
            return Ok(cached);
        }
        match owner.id() {
            Some(owner_id) => self.lookup(owner, owner_id),
            None => Ok(None),
        }
    }

    /// Drop the key from a record that still points at the owner
    fn unlink(&self, record: &Record, owner_key: &Value) -> ModelResult<()> {
        let field = self.metadata.key_field();
        if record.get(field).as_ref() != Some(owner_key) {
            return Ok(());
        }

        record.remove(field);
        if record.is_saved() {
            record.save()?;
        }
        debug!(
            target: LOG_TARGET,
            "Unlinked {} from {}.{}",
            self.metadata.related_model,
            self.metadata.owner_model,
            self.metadata.name
        );
        Ok(())
    }
}

impl RelationshipDescriptor for HasOne {
    fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }

    fn get(&self, owner: &Record) -> ModelResult<Related> {
        if let Some(cached) = owner.cached_one(&self.metadata.name) {
            trace!(target: LOG_TARGET, "Cache hit for {}", self.metadata.name);
            return Ok(Related::One(cached));
        }

        let found = match owner.id() {
            Some(owner_id) => self.lookup(owner, owner_id)?,
            None => None,
        };
        owner.cache_one(&self.metadata.name, found.clone());
        Ok(Related::One(found))
    }

    fn set(&self, owner: &Record, value: RelatedValue) -> ModelResult<()> {
        let record = match value {
            RelatedValue::None => return self.delete(owner),
            RelatedValue::One(record) => record,
            many @ RelatedValue::Many(_) => {
                return Err(ModelError::InvalidType {
                    relationship: self.metadata.name.clone(),
                    expected: self.metadata.related_model.clone(),
                    found: many.describe(),
                })
            }
        };

        check_instance(&self.metadata, &record)?;
        let owner_id = owner_key(&self.metadata, owner)?;
        let key = key_value(owner_id);

        if let Some(previous) = self.current(owner)? {
            if !same_record(&previous, &record) {
                self.unlink(&previous, &key)?;
            }
        }

        record.set(self.metadata.key_field(), key);
        record.save()?;
        debug!(
            target: LOG_TARGET,
            "Linked {} to {}.{}",
            self.metadata.related_model,
            self.metadata.owner_model,
            self.metadata.name
        );

        owner.cache_one(&self.metadata.name, Some(record));
        Ok(())
    }

    fn delete(&self, owner: &Record) -> ModelResult<()> {
        if let Some(owner_id) = owner.id() {
            if let Some(previous) = self.current(owner)? {
                self.unlink(&previous, &key_value(owner_id))?;
            }
        }
        owner.cache_one(&self.metadata.name, None);
        Ok(())
    }
}
