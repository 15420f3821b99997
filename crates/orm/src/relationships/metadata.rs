//! Relationship Metadata System - Resolved definitions for declared relationships

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Defines the type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// One-to-one relationship, the related record stores the key (hasOne)
    HasOne,
    /// Many-to-one relationship, the owner stores the key (belongsTo)
    BelongsTo,
    /// One-to-many relationship (hasMany)
    HasMany,
    /// Many-to-many relationship through an implicit join table
    ManyToMany,
}

impl RelationshipType {
    /// Returns true if this relationship returns a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::ManyToMany)
    }

    /// Returns true if this relationship requires a join table
    pub fn requires_pivot(self) -> bool {
        matches!(self, Self::ManyToMany)
    }

    /// Returns true if the foreign key lives on the owning record
    pub fn key_on_owner(self) -> bool {
        matches!(self, Self::BelongsTo)
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationshipType::HasOne => "has_one",
            RelationshipType::BelongsTo => "belongs_to",
            RelationshipType::HasMany => "has_many",
            RelationshipType::ManyToMany => "has_and_belongs_to_many",
        };
        write!(f, "{}", name)
    }
}

/// Foreign key configuration for relationships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConfig {
    /// The foreign key field name
    pub column: String,

    /// The table whose documents carry the foreign key
    pub table: String,
}

impl ForeignKeyConfig {
    pub fn new(column: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            table: table.into(),
        }
    }

    /// Validate the foreign key configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.column.is_empty() {
            return Err(ModelError::Configuration(
                "Foreign key field name cannot be empty".to_string(),
            ));
        }

        if self.table.is_empty() {
            return Err(ModelError::Configuration(
                "Foreign key configuration must specify a table".to_string(),
            ));
        }

        Ok(())
    }
}

/// Join table configuration for many-to-many relationships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotConfig {
    /// The join table name
    pub table: String,

    /// Join-row field referencing the owning record
    pub local_key: String,

    /// Join-row field referencing the related record
    pub foreign_key: String,
}

impl PivotConfig {
    pub fn new(
        table: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
        }
    }

    /// Validate the pivot configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.table.is_empty() {
            return Err(ModelError::Configuration(
                "Join table name cannot be empty".to_string(),
            ));
        }

        if self.local_key.is_empty() || self.foreign_key.is_empty() {
            return Err(ModelError::Configuration(
                "Join table keys cannot be empty".to_string(),
            ));
        }

        if self.local_key == self.foreign_key {
            return Err(ModelError::Configuration(format!(
                "Join table '{}' uses '{}' for both sides",
                self.table, self.local_key
            )));
        }

        Ok(())
    }
}

/// Fully resolved relationship: every name has been derived and the related
/// model is known to exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    /// The type of relationship
    pub relationship_type: RelationshipType,

    /// Attribute name on the owning model
    pub name: String,

    pub owner_model: String,
    pub owner_table: String,
    pub related_model: String,
    pub related_table: String,

    /// Where the foreign key lives. For many-to-many this is the owner's
    /// key inside the join table.
    pub foreign_key: ForeignKeyConfig,

    /// Join table configuration for many-to-many relationships
    pub pivot_config: Option<PivotConfig>,
}

impl RelationshipMetadata {
    /// Validate the relationship metadata for consistency
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Configuration(format!(
                "Relationship on model '{}' has an empty name",
                self.owner_model
            )));
        }

        if self.relationship_type.requires_pivot() != self.pivot_config.is_some() {
            return Err(ModelError::Configuration(format!(
                "Relationship '{}' of type {} has an inconsistent join table configuration",
                self.name, self.relationship_type
            )));
        }

        let expected_key_table = if self.relationship_type.key_on_owner() {
            &self.owner_table
        } else if let Some(ref pivot) = self.pivot_config {
            &pivot.table
        } else {
            &self.related_table
        };
        if &self.foreign_key.table != expected_key_table {
            return Err(ModelError::Configuration(format!(
                "Relationship '{}' stores its key on '{}', expected '{}'",
                self.name, self.foreign_key.table, expected_key_table
            )));
        }

        self.foreign_key.validate()?;

        if let Some(ref pivot) = self.pivot_config {
            pivot.validate()?;
        }

        Ok(())
    }

    /// The foreign key field name
    pub fn key_field(&self) -> &str {
        &self.foreign_key.column
    }

    /// Join table configuration, required for many-to-many relationships
    pub fn pivot(&self) -> ModelResult<&PivotConfig> {
        self.pivot_config.as_ref().ok_or_else(|| {
            ModelError::Configuration(format!(
                "Relationship '{}' has no join table",
                self.name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_many_songs() -> RelationshipMetadata {
        RelationshipMetadata {
            relationship_type: RelationshipType::HasMany,
            name: "songs".to_string(),
            owner_model: "Artist".to_string(),
            owner_table: "artists".to_string(),
            related_model: "Song".to_string(),
            related_table: "songs".to_string(),
            foreign_key: ForeignKeyConfig::new("artist_id", "songs"),
            pivot_config: None,
        }
    }

    #[test]
    fn test_relationship_type_properties() {
        assert!(RelationshipType::HasMany.is_collection());
        assert!(RelationshipType::ManyToMany.is_collection());
        assert!(!RelationshipType::HasOne.is_collection());
        assert!(RelationshipType::ManyToMany.requires_pivot());
        assert!(RelationshipType::BelongsTo.key_on_owner());
        assert!(!RelationshipType::HasOne.key_on_owner());
        assert_eq!(RelationshipType::ManyToMany.to_string(), "has_and_belongs_to_many");
    }

    #[test]
    fn test_valid_metadata() {
        let metadata = has_many_songs();
        assert!(metadata.validate().is_ok());
        assert_eq!(metadata.key_field(), "artist_id");
        assert!(metadata.pivot().is_err());
    }

    #[test]
    fn test_key_table_must_match_kind() {
        let mut metadata = has_many_songs();
        metadata.foreign_key.table = "artists".to_string();
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_pivot_required_for_many_to_many() {
        let mut metadata = has_many_songs();
        metadata.relationship_type = RelationshipType::ManyToMany;
        assert!(metadata.validate().is_err());

        metadata.pivot_config = Some(PivotConfig::new("artists_songs", "artist_id", "song_id"));
        metadata.foreign_key = ForeignKeyConfig::new("artist_id", "artists_songs");
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn test_pivot_validation() {
        assert!(PivotConfig::new("a_b", "a_id", "b_id").validate().is_ok());
        assert!(PivotConfig::new("", "a_id", "b_id").validate().is_err());
        assert!(PivotConfig::new("a_b", "a_id", "a_id").validate().is_err());
        assert!(ForeignKeyConfig::new("", "songs").validate().is_err());
    }
}
