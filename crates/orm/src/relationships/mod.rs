//! Relationships Module - descriptors for the four relationship kinds and
//! the collection objects handed out for plural ones

pub mod belongs_to;
pub mod cache;
pub mod descriptor;
pub mod has_many;
pub mod has_one;
pub mod many_to_many;
pub mod metadata;

// Re-export main types
pub use belongs_to::BelongsTo;
pub use cache::{CollectionHandle, RelationshipCache};
pub use descriptor::{descriptor_for, Related, RelatedValue, RelationshipDescriptor};
pub use has_many::{HasMany, RelatedSet};
pub use has_one::HasOne;
pub use many_to_many::{HasAndBelongsToMany, RelatedM2MSet};
pub use metadata::{ForeignKeyConfig, PivotConfig, RelationshipMetadata, RelationshipType};

pub(crate) use descriptor::parse_key;
