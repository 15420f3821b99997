//! Model System - declarations and their resolved schema
//!
//! - `definition`: model and relationship declarations
//! - `registry`: registration and one-shot resolution into a [`Schema`]

pub mod definition;
pub mod registry;

pub use definition::{ModelDef, RelationshipDecl};
pub use registry::{ModelRegistry, ModelSchema, Schema};
