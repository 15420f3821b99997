//! Error types for the relationship layer
//!
//! Every contract violation detected by a descriptor or a related collection
//! is reported synchronously through [`ModelError`]. Backend failures are
//! wrapped in [`ModelError::Store`] and are never rolled back.

use thiserror::Error;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// Error types for ORM operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A singular relationship was assigned a record of the wrong model
    #[error("Invalid type for relationship '{relationship}': expected {expected}, found {found}")]
    InvalidType {
        relationship: String,
        expected: String,
        found: String,
    },

    /// A plural relationship was assigned something other than a sequence
    #[error("Relationship '{relationship}' must be assigned a sequence of records")]
    NotASequence { relationship: String },

    /// A related collection was handed a record of the wrong model
    #[error("Relationship '{relationship}' accepts {expected} records, found {found}")]
    WrongRelatedType {
        relationship: String,
        expected: String,
        found: String,
    },

    /// The owning record has no primary key yet
    #[error("Cannot modify relationship '{relationship}': owner has not been saved")]
    UnsavedOwner { relationship: String },

    /// The related record has no primary key yet
    #[error("Cannot link unsaved {model} record through relationship '{relationship}'")]
    UnsavedTarget { relationship: String, model: String },

    /// A one-to-many removal named a record that is not a member
    #[error("{model} record {id} is not associated through relationship '{relationship}'")]
    NotAssociated {
        relationship: String,
        model: String,
        id: String,
    },

    /// The model name was never registered
    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    /// The model declares no relationship with this name
    #[error("Model '{model}' has no relationship named '{relationship}'")]
    UnknownRelationship { model: String, relationship: String },

    /// A singular accessor was used on a plural relationship or vice versa
    #[error("Relationship '{relationship}' is {found}, not {expected}")]
    WrongRelationshipKind {
        relationship: String,
        expected: String,
        found: String,
    },

    /// The record is no longer present in the store
    #[error("{model} record {id} not found")]
    NotFound { model: String, id: String },

    /// The model name was registered twice
    #[error("Model '{0}' is already registered")]
    DuplicateModel(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backing store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Malformed primary or foreign key value
    #[error("Invalid key error: {0}")]
    InvalidKey(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    /// True for the errors raised when a value of the wrong shape or model
    /// is handed to a relationship
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            ModelError::InvalidType { .. }
                | ModelError::NotASequence { .. }
                | ModelError::WrongRelatedType { .. }
        )
    }

    /// True for the errors raised when a value has the right type but cannot
    /// be used in its current state
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            ModelError::UnsavedOwner { .. }
                | ModelError::UnsavedTarget { .. }
                | ModelError::NotAssociated { .. }
        )
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

// Convert from anyhow errors raised by custom store backends
impl From<anyhow::Error> for ModelError {
    fn from(err: anyhow::Error) -> Self {
        ModelError::Store(err.to_string())
    }
}

impl From<crate::config::ConfigError> for ModelError {
    fn from(err: crate::config::ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let invalid = ModelError::InvalidType {
            relationship: "bio".to_string(),
            expected: "Bio".to_string(),
            found: "Artist".to_string(),
        };
        assert!(invalid.is_type_error());
        assert!(!invalid.is_value_error());

        let unsaved = ModelError::UnsavedOwner {
            relationship: "bio".to_string(),
        };
        assert!(unsaved.is_value_error());
        assert!(!unsaved.is_type_error());

        let store = ModelError::Store("down".to_string());
        assert!(!store.is_type_error() && !store.is_value_error());
    }

    #[test]
    fn test_error_display() {
        let err = ModelError::NotAssociated {
            relationship: "songs".to_string(),
            model: "Song".to_string(),
            id: "42".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Song record 42 is not associated through relationship 'songs'"
        );
        assert_eq!(
            ModelError::UnknownModel("Ghost".to_string()).to_string(),
            "Unknown model 'Ghost'"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: ModelError = anyhow::anyhow!("connection reset").into();
        assert_eq!(err, ModelError::Store("connection reset".to_string()));
    }
}
