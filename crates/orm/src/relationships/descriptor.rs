//! Relationship descriptors - the get/set/delete protocol behind every
//! relationship attribute, plus validation shared by all four kinds

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use uuid::Uuid;

use super::belongs_to::BelongsTo;
use super::has_many::{HasMany, RelatedSet};
use super::has_one::HasOne;
use super::many_to_many::{HasAndBelongsToMany, RelatedM2MSet};
use super::metadata::{RelationshipMetadata, RelationshipType};
use crate::error::{ModelError, ModelResult};
use crate::record::Record;

/// Attribute protocol implemented once per relationship kind
pub trait RelationshipDescriptor: fmt::Debug {
    /// Resolved metadata of the relationship
    fn metadata(&self) -> &RelationshipMetadata;

    /// Read the relationship, resolving and caching it on first access
    fn get(&self, owner: &Record) -> ModelResult<Related>;

    /// Assign the relationship
    fn set(&self, owner: &Record, value: RelatedValue) -> ModelResult<()>;

    /// Unassign the relationship
    fn delete(&self, owner: &Record) -> ModelResult<()>;
}

/// Build the descriptor matching a relationship's kind
pub fn descriptor_for(metadata: Rc<RelationshipMetadata>) -> Rc<dyn RelationshipDescriptor> {
    match metadata.relationship_type {
        RelationshipType::HasOne => Rc::new(HasOne::new(metadata)),
        RelationshipType::BelongsTo => Rc::new(BelongsTo::new(metadata)),
        RelationshipType::HasMany => Rc::new(HasMany::new(metadata)),
        RelationshipType::ManyToMany => Rc::new(HasAndBelongsToMany::new(metadata)),
    }
}

/// Value read from a relationship attribute
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<Record>),
    Set(RelatedSet),
    ManyToMany(RelatedM2MSet),
}

impl Related {
    pub fn into_one(self) -> Option<Option<Record>> {
        match self {
            Related::One(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_set(self) -> Option<RelatedSet> {
        match self {
            Related::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn into_m2m(self) -> Option<RelatedM2MSet> {
        match self {
            Related::ManyToMany(set) => Some(set),
            _ => None,
        }
    }
}

/// Value assigned to a relationship attribute
#[derive(Debug, Clone)]
pub enum RelatedValue {
    None,
    One(Record),
    Many(Vec<Record>),
}

impl RelatedValue {
    pub(crate) fn describe(&self) -> String {
        match self {
            RelatedValue::None => "nothing".to_string(),
            RelatedValue::One(record) => record.model_name(),
            RelatedValue::Many(records) => format!("a sequence of {} records", records.len()),
        }
    }
}

impl From<Record> for RelatedValue {
    fn from(record: Record) -> Self {
        RelatedValue::One(record)
    }
}

impl From<&Record> for RelatedValue {
    fn from(record: &Record) -> Self {
        RelatedValue::One(record.clone())
    }
}

impl From<Option<Record>> for RelatedValue {
    fn from(record: Option<Record>) -> Self {
        record.map_or(RelatedValue::None, RelatedValue::One)
    }
}

impl From<Vec<Record>> for RelatedValue {
    fn from(records: Vec<Record>) -> Self {
        RelatedValue::Many(records)
    }
}

impl From<&[Record]> for RelatedValue {
    fn from(records: &[Record]) -> Self {
        RelatedValue::Many(records.to_vec())
    }
}

/// Singular assignment must name an instance of the related model
pub(crate) fn check_instance(metadata: &RelationshipMetadata, record: &Record) -> ModelResult<()> {
    if record.is_instance_of(&metadata.related_model) {
        Ok(())
    } else {
        Err(ModelError::InvalidType {
            relationship: metadata.name.clone(),
            expected: metadata.related_model.clone(),
            found: record.model_name(),
        })
    }
}

/// Collection members must be instances of the related model
pub(crate) fn check_members(metadata: &RelationshipMetadata, records: &[Record]) -> ModelResult<()> {
    match records
        .iter()
        .find(|record| !record.is_instance_of(&metadata.related_model))
    {
        Some(record) => Err(ModelError::WrongRelatedType {
            relationship: metadata.name.clone(),
            expected: metadata.related_model.clone(),
            found: record.model_name(),
        }),
        None => Ok(()),
    }
}

/// Primary key of the owner, required before any link is written
pub(crate) fn owner_key(metadata: &RelationshipMetadata, owner: &Record) -> ModelResult<Uuid> {
    owner.id().ok_or_else(|| ModelError::UnsavedOwner {
        relationship: metadata.name.clone(),
    })
}

/// Collect a batch, dropping repeats of the same instance or the same saved record
pub(crate) fn unique_records<I, R>(records: I) -> Vec<Record>
where
    I: IntoIterator<Item = R>,
    R: Borrow<Record>,
{
    let mut seen_ids = HashSet::new();
    let mut unique: Vec<Record> = Vec::new();
    for record in records {
        let record: &Record = record.borrow();
        let repeated = match record.id() {
            Some(id) => !seen_ids.insert(id),
            None => unique.iter().any(|existing| existing.same_instance(record)),
        };
        if !repeated {
            unique.push(record.clone());
        }
    }
    unique
}

/// Same instance, or two handles on the same stored record
pub(crate) fn same_record(a: &Record, b: &Record) -> bool {
    if a.same_instance(b) {
        return true;
    }
    match (a.id(), b.id()) {
        (Some(left), Some(right)) => left == right && a.is_instance_of(&b.model_name()),
        _ => false,
    }
}

/// Parse a stored key value; anything but a UUID string is treated as absent
pub(crate) fn parse_key(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|raw| Uuid::parse_str(raw).ok())
}

/// Label used when reporting a record in an error
pub(crate) fn record_label(record: &Record) -> String {
    record
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "<unsaved>".to_string())
}
