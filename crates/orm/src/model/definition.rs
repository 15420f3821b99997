//! Model declarations
//!
//! A [`ModelDef`] names a model and lists its relationships by related model
//! name. Nothing is resolved here, so a relationship may name a model that is
//! declared later.

use serde::{Deserialize, Serialize};

use crate::relationships::RelationshipType;

/// A single relationship declaration, resolved later by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDecl {
    pub relationship_type: RelationshipType,
    pub related_model: String,
    /// Attribute name; derived from the related model when absent
    pub name: Option<String>,
    /// Foreign key field; derived from the model holding the key when absent
    pub foreign_key: Option<String>,
    /// Join table for many-to-many relationships
    pub join_table: Option<String>,
    /// Join-row fields (owner side, related side) for many-to-many relationships
    pub join_keys: Option<(String, String)>,
}

impl RelationshipDecl {
    pub fn new(relationship_type: RelationshipType, related_model: impl Into<String>) -> Self {
        Self {
            relationship_type,
            related_model: related_model.into(),
            name: None,
            foreign_key: None,
            join_table: None,
            join_keys: None,
        }
    }

    pub fn has_one(related_model: impl Into<String>) -> Self {
        Self::new(RelationshipType::HasOne, related_model)
    }

    pub fn belongs_to(related_model: impl Into<String>) -> Self {
        Self::new(RelationshipType::BelongsTo, related_model)
    }

    pub fn has_many(related_model: impl Into<String>) -> Self {
        Self::new(RelationshipType::HasMany, related_model)
    }

    pub fn has_and_belongs_to_many(related_model: impl Into<String>) -> Self {
        Self::new(RelationshipType::ManyToMany, related_model)
    }

    /// Use a custom attribute name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use a custom foreign key field
    pub fn foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = Some(field.into());
        self
    }

    /// Use a custom join table
    pub fn join_table(mut self, table: impl Into<String>) -> Self {
        self.join_table = Some(table.into());
        self
    }

    /// Use custom join-row fields
    pub fn join_keys(mut self, local_key: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        self.join_keys = Some((local_key.into(), foreign_key.into()));
        self
    }
}

/// Declaration of a model and its relationships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    /// Table name; derived from the model name when absent
    pub table: Option<String>,
    pub relationships: Vec<RelationshipDecl>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            relationships: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn has_one(self, related_model: impl Into<String>) -> Self {
        self.relationship(RelationshipDecl::has_one(related_model))
    }

    pub fn belongs_to(self, related_model: impl Into<String>) -> Self {
        self.relationship(RelationshipDecl::belongs_to(related_model))
    }

    pub fn has_many(self, related_model: impl Into<String>) -> Self {
        self.relationship(RelationshipDecl::has_many(related_model))
    }

    pub fn has_and_belongs_to_many(self, related_model: impl Into<String>) -> Self {
        self.relationship(RelationshipDecl::has_and_belongs_to_many(related_model))
    }

    pub fn relationship(mut self, decl: RelationshipDecl) -> Self {
        self.relationships.push(decl);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_relationships() {
        let def = ModelDef::new("Artist")
            .has_one("Bio")
            .has_many("Song")
            .relationship(RelationshipDecl::has_and_belongs_to_many("Taste").named("likes"));

        assert_eq!(def.name, "Artist");
        assert_eq!(def.table, None);
        assert_eq!(def.relationships.len(), 3);
        assert_eq!(def.relationships[0].relationship_type, RelationshipType::HasOne);
        assert_eq!(def.relationships[2].name.as_deref(), Some("likes"));
    }

    #[test]
    fn test_decl_overrides() {
        let decl = RelationshipDecl::belongs_to("Person")
            .named("owner")
            .foreign_key("owner_ref");
        assert_eq!(decl.foreign_key.as_deref(), Some("owner_ref"));

        let decl = RelationshipDecl::has_and_belongs_to_many("Person")
            .join_table("friendships")
            .join_keys("person_id", "friend_id");
        assert_eq!(decl.join_table.as_deref(), Some("friendships"));
        assert_eq!(
            decl.join_keys,
            Some(("person_id".to_string(), "friend_id".to_string()))
        );
    }
}
