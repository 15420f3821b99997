//! BelongsTo Relationship - many-to-one relationship where the owner
//! carries the related record's key

use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::descriptor::{
    check_instance, parse_key, Related, RelatedValue, RelationshipDescriptor,
};
use super::metadata::RelationshipMetadata;
use crate::error::{ModelError, ModelResult};
use crate::logging::LOG_TARGET;
use crate::record::Record;
use crate::store::key_value;

/// Descriptor of a many-to-one relationship (`Song` belongs to `Artist`)
#[derive(Debug, Clone)]
pub struct BelongsTo {
    metadata: Rc<RelationshipMetadata>,
}

impl BelongsTo {
    pub fn new(metadata: Rc<RelationshipMetadata>) -> Self {
        Self { metadata }
    }

    fn resolve(&self, owner: &Record) -> ModelResult<Option<Record>> {
        let raw = match owner.get(self.metadata.key_field()) {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let related_id = match parse_key(&raw) {
            Some(id) => id,
            None => {
                warn!(
                    target: LOG_TARGET,
                    "{}.{} holds malformed key {}",
                    self.metadata.owner_model,
                    self.metadata.key_field(),
                    raw
                );
                return Ok(None);
            }
        };

        let db = owner.database();
        let schema = db.model(&self.metadata.related_model)?;
        match db.store().get(schema.table(), related_id)? {
            Some(document) => Ok(Some(Record::from_document(db, schema, document))),
            None => {
                debug!(
                    target: LOG_TARGET,
                    "{}.{} points at missing {} {}",
                    self.metadata.owner_model,
                    self.metadata.key_field(),
                    self.metadata.related_model,
                    related_id
                );
                Ok(None)
            }
        }
    }
}

impl RelationshipDescriptor for BelongsTo {
    fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }

    fn get(&self, owner: &Record) -> ModelResult<Related> {
        if let Some(cached) = owner.cached_one(&self.metadata.name) {
            trace!(target: LOG_TARGET, "Cache hit for {}", self.metadata.name);
            return Ok(Related::One(cached));
        }

        let found = self.resolve(owner)?;
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
        let related_id = record.id().ok_or_else(|| ModelError::UnsavedTarget {
            relationship: self.metadata.name.clone(),
            model: record.model_name(),
        })?;

        owner.set(self.metadata.key_field(), key_value(related_id));
        debug!(
            target: LOG_TARGET,
            "Pointed {}.{} at {} {}",
            self.metadata.owner_model,
            self.metadata.key_field(),
            self.metadata.related_model,
            related_id
        );

        owner.cache_one(&self.metadata.name, Some(record));
        Ok(())
    }

    fn delete(&self, owner: &Record) -> ModelResult<()> {
        if owner.remove(self.metadata.key_field()).is_some() {
            debug!(
                target: LOG_TARGET,
                "Cleared {}.{}",
                self.metadata.owner_model,
                self.metadata.key_field()
            );
        }
        owner.cache_one(&self.metadata.name, None);
        Ok(())
    }
}
