//! # docrel-orm: Relationship layer for schemaless document stores
//!
//! Declares has-one, belongs-to, has-many and many-to-many relationships
//! between models stored as schemaless documents, and keeps the foreign keys
//! and join rows behind them consistent without any help from the store.
//!
//! ```no_run
//! use std::rc::Rc;
//! use docrel_orm::{Database, MemoryStore, ModelDef, ModelResult};
//!
//! fn main() -> ModelResult<()> {
//!     let db = Database::builder()
//!         .model(ModelDef::new("Artist").has_many("Song"))
//!         .model(ModelDef::new("Song").belongs_to("Artist"))
//!         .build(Rc::new(MemoryStore::new()))?;
//!     db.create_tables()?;
//!
//!     let artist = db.new_record("Artist")?;
//!     artist.save()?;
//!     let song = db.new_record("Song")?;
//!     artist.related_set("songs")?.add([&song])?;
//!     assert_eq!(artist.related_set("songs")?.count()?, 1);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod model;
pub mod naming;
pub mod query;
pub mod record;
pub mod relationships;
pub mod store;

// Re-export core types
pub use config::{ConfigError, Environment, OrmConfig, TableNaming};
pub use database::{Database, DatabaseBuilder};
pub use error::{ModelError, ModelResult, OrmError};
pub use logging::{init_logging, LoggingConfig};
pub use model::{ModelDef, ModelRegistry, ModelSchema, RelationshipDecl, Schema};
pub use naming::NamingConvention;
pub use query::Query;
pub use record::Record;
pub use relationships::{
    Related, RelatedM2MSet, RelatedSet, RelatedValue, RelationshipDescriptor,
    RelationshipMetadata, RelationshipType,
};
pub use store::{Condition, Document, DocumentStore, MemoryStore, StoreStats};
