//! Records - schemaless model instances
//!
//! A [`Record`] is a cheap handle: clones share the same field bag and the
//! same relationship cache. Relationship attributes are reached by name
//! through the descriptors resolved for the record's model.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::logging::LOG_TARGET;
use crate::model::ModelSchema;
use crate::relationships::{
    parse_key, CollectionHandle, Related, RelatedM2MSet, RelatedSet, RelatedValue,
    RelationshipCache, RelationshipDescriptor, RelationshipType,
};
use crate::store::{Document, PRIMARY_KEY_FIELD};

struct RecordState {
    schema: Rc<ModelSchema>,
    fields: Document,
    cache: RelationshipCache,
}

/// Handle on a model instance
#[derive(Clone)]
pub struct Record {
    state: Rc<RefCell<RecordState>>,
    db: Database,
}

impl Record {
    pub(crate) fn from_document(db: &Database, schema: Rc<ModelSchema>, fields: Document) -> Self {
        Self {
            state: Rc::new(RefCell::new(RecordState {
                schema,
                fields,
                cache: RelationshipCache::new(),
            })),
            db: db.clone(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn schema(&self) -> Rc<ModelSchema> {
        Rc::clone(&self.state.borrow().schema)
    }

    pub fn model_name(&self) -> String {
        self.state.borrow().schema.name().to_string()
    }

    pub fn is_instance_of(&self, model_name: &str) -> bool {
        self.state.borrow().schema.name() == model_name
    }

    pub fn table(&self) -> String {
        self.state.borrow().schema.table().to_string()
    }

    /// Primary key, present once the record has been saved
    pub fn id(&self) -> Option<Uuid> {
        self.state
            .borrow()
            .fields
            .get(PRIMARY_KEY_FIELD)
            .and_then(parse_key)
    }

    pub fn is_saved(&self) -> bool {
        self.id().is_some()
    }

    /// True when both handles share the same instance
    pub fn same_instance(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    // Field bag

    pub fn get(&self, field: &str) -> Option<Value> {
        self.state.borrow().fields.get(field).cloned()
    }

    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        self.state
            .borrow_mut()
            .fields
            .insert(field.into(), value.into());
    }

    pub fn remove(&self, field: &str) -> Option<Value> {
        self.state.borrow_mut().fields.remove(field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.state.borrow().fields.contains_key(field)
    }

    /// Snapshot of every field
    pub fn fields(&self) -> Document {
        self.state.borrow().fields.clone()
    }

    /// Deserialize a field into a typed value. A missing field is `None`;
    /// a value of the wrong shape is a serialization error.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> ModelResult<Option<T>> {
        match self.get(field) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    // Persistence

    /// Insert the record, or overwrite its stored document once it has a key
    pub fn save(&self) -> ModelResult<Uuid> {
        let (table, id, document) = {
            let state = self.state.borrow();
            (
                state.schema.table().to_string(),
                state.fields.get(PRIMARY_KEY_FIELD).and_then(parse_key),
                state.fields.clone(),
            )
        };

        match id {
            Some(id) => {
                self.db.store().replace(&table, id, document)?;
                trace!(target: LOG_TARGET, "Saved {} into '{}'", id, table);
                Ok(id)
            }
            None => {
                let id = self.db.store().insert(&table, document)?;
                self.set(PRIMARY_KEY_FIELD, crate::store::key_value(id));
                debug!(target: LOG_TARGET, "Inserted {} into '{}'", id, table);
                Ok(id)
            }
        }
    }

    /// Refresh fields from the store and forget every resolved relationship
    pub fn reload(&self) -> ModelResult<()> {
        let id = self.id().ok_or_else(|| {
            ModelError::InvalidKey(format!("{} record has not been saved", self.model_name()))
        })?;

        let document = self
            .db
            .store()
            .get(&self.table(), id)?
            .ok_or_else(|| ModelError::NotFound {
                model: self.model_name(),
                id: id.to_string(),
            })?;

        let mut state = self.state.borrow_mut();
        state.fields = document;
        state.cache.clear();
        Ok(())
    }

    /// Delete the stored document. The record loses its key and its cache;
    /// related records are left untouched.
    pub fn delete(&self) -> ModelResult<bool> {
        let id = match self.id() {
            Some(id) => id,
            None => return Ok(false),
        };

        let table = self.table();
        let removed = self.db.store().delete(&table, id)?;

        let mut state = self.state.borrow_mut();
        state.fields.remove(PRIMARY_KEY_FIELD);
        state.cache.clear();
        debug!(target: LOG_TARGET, "Deleted {} from '{}'", id, table);
        Ok(removed)
    }

    // Relationship attributes

    fn descriptor(&self, name: &str) -> ModelResult<Rc<dyn RelationshipDescriptor>> {
        self.state.borrow().schema.relationship(name)
    }

    fn kind_descriptor(
        &self,
        name: &str,
        accepted: &[RelationshipType],
        expected: &str,
    ) -> ModelResult<Rc<dyn RelationshipDescriptor>> {
        let descriptor = self.descriptor(name)?;
        let kind = descriptor.metadata().relationship_type;
        if accepted.contains(&kind) {
            Ok(descriptor)
        } else {
            Err(ModelError::WrongRelationshipKind {
                relationship: name.to_string(),
                expected: expected.to_string(),
                found: kind.to_string(),
            })
        }
    }

    /// Read a relationship attribute
    pub fn related(&self, name: &str) -> ModelResult<Related> {
        self.descriptor(name)?.get(self)
    }

    /// Assign a relationship attribute
    pub fn set_related(&self, name: &str, value: impl Into<RelatedValue>) -> ModelResult<()> {
        self.descriptor(name)?.set(self, value.into())
    }

    /// Unassign a relationship attribute
    pub fn delete_related(&self, name: &str) -> ModelResult<()> {
        self.descriptor(name)?.delete(self)
    }

    /// Read a has-one or belongs-to relationship
    pub fn get_one(&self, name: &str) -> ModelResult<Option<Record>> {
        let descriptor = self.kind_descriptor(
            name,
            &[RelationshipType::HasOne, RelationshipType::BelongsTo],
            "singular",
        )?;
        match descriptor.get(self)? {
            Related::One(record) => Ok(record),
            _ => Err(ModelError::Configuration(format!(
                "Relationship '{}' did not resolve to a single record",
                name
            ))),
        }
    }

    /// Assign a has-one or belongs-to relationship
    pub fn set_one(&self, name: &str, value: Option<&Record>) -> ModelResult<()> {
        let descriptor = self.kind_descriptor(
            name,
            &[RelationshipType::HasOne, RelationshipType::BelongsTo],
            "singular",
        )?;
        descriptor.set(self, value.cloned().into())
    }

    /// Collection of a has-many relationship
    pub fn related_set(&self, name: &str) -> ModelResult<RelatedSet> {
        let descriptor = self.kind_descriptor(name, &[RelationshipType::HasMany], "has_many")?;
        descriptor.get(self)?.into_set().ok_or_else(|| {
            ModelError::Configuration(format!("Relationship '{}' did not resolve to a set", name))
        })
    }

    /// Collection of a many-to-many relationship
    pub fn related_m2m(&self, name: &str) -> ModelResult<RelatedM2MSet> {
        let descriptor = self.kind_descriptor(
            name,
            &[RelationshipType::ManyToMany],
            "has_and_belongs_to_many",
        )?;
        descriptor.get(self)?.into_m2m().ok_or_else(|| {
            ModelError::Configuration(format!("Relationship '{}' did not resolve to a set", name))
        })
    }

    /// Replace the members of a plural relationship
    pub fn set_many<I, R>(&self, name: &str, records: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = R>,
        R: std::borrow::Borrow<Record>,
    {
        let descriptor = self.kind_descriptor(
            name,
            &[RelationshipType::HasMany, RelationshipType::ManyToMany],
            "plural",
        )?;
        let records: Vec<Record> = records
            .into_iter()
            .map(|record| std::borrow::Borrow::<Record>::borrow(&record).clone())
            .collect();
        descriptor.set(self, RelatedValue::Many(records))
    }

    pub fn is_relationship_cached(&self, name: &str) -> bool {
        self.state.borrow().cache.contains(name)
    }

    /// Forget every resolved relationship; the next read goes to the store
    pub fn clear_relationship_cache(&self) {
        self.state.borrow_mut().cache.clear();
    }

    pub(crate) fn cached_one(&self, name: &str) -> Option<Option<Record>> {
        self.state.borrow().cache.one(name)
    }

    pub(crate) fn cache_one(&self, name: &str, record: Option<Record>) {
        self.state.borrow_mut().cache.store_one(name, record);
    }

    pub(crate) fn cached_collection(&self, name: &str) -> Option<Rc<CollectionHandle>> {
        self.state.borrow().cache.collection(name)
    }

    pub(crate) fn cache_collection(&self, name: &str, handle: Rc<CollectionHandle>) {
        self.state.borrow_mut().cache.store_collection(name, handle);
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Record")
                .field("model", &state.schema.name())
                .field("fields", &state.fields)
                .field("cached", &state.cache.names())
                .finish(),
            Err(_) => f.debug_struct("Record").finish_non_exhaustive(),
        }
    }
}
