//! Model Registry - collects declarations and resolves them into a schema
//!
//! Resolution runs once, after every model has been declared, so
//! relationships may reference models in any order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use tracing::debug;

use super::definition::{ModelDef, RelationshipDecl};
use crate::config::OrmConfig;
use crate::error::{ModelError, ModelResult};
use crate::logging::LOG_TARGET;
use crate::naming::NamingConvention;
use crate::relationships::{
    descriptor_for, ForeignKeyConfig, PivotConfig, RelationshipDescriptor, RelationshipMetadata,
    RelationshipType,
};

/// Ordered collection of model declarations
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelDef>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model declaration
    pub fn register(&mut self, def: ModelDef) -> ModelResult<()> {
        if def.name.is_empty() {
            return Err(ModelError::Configuration(
                "Model name cannot be empty".to_string(),
            ));
        }

        if self.contains(&def.name) {
            return Err(ModelError::DuplicateModel(def.name));
        }

        self.models.push(def);
        Ok(())
    }

    pub fn contains(&self, model_name: &str) -> bool {
        self.models.iter().any(|def| def.name == model_name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Resolve every declaration into a [`Schema`]
    pub fn resolve(&self, config: &OrmConfig) -> ModelResult<Schema> {
        let naming = NamingConvention::new(config);

        let mut tables: HashMap<&str, String> = HashMap::new();
        let mut table_owners: HashMap<String, &str> = HashMap::new();
        for def in &self.models {
            let table = def
                .table
                .clone()
                .unwrap_or_else(|| naming.table_name(&def.name));
            if let Some(other) = table_owners.insert(table.clone(), &def.name) {
                return Err(ModelError::Configuration(format!(
                    "Models '{}' and '{}' both use table '{}'",
                    other, def.name, table
                )));
            }
            tables.insert(&def.name, table);
        }

        let mut models = BTreeMap::new();
        let mut join_tables = BTreeSet::new();

        for def in &self.models {
            let owner_table = tables[def.name.as_str()].clone();
            let mut relationships: BTreeMap<String, Rc<dyn RelationshipDescriptor>> =
                BTreeMap::new();

            for decl in &def.relationships {
                let related_table = tables
                    .get(decl.related_model.as_str())
                    .cloned()
                    .ok_or_else(|| ModelError::UnknownModel(decl.related_model.clone()))?;

                let metadata =
                    resolve_relationship(&naming, def, &owner_table, decl, related_table);
                metadata.validate()?;

                if relationships.contains_key(&metadata.name) {
                    return Err(ModelError::Configuration(format!(
                        "Model '{}' declares relationship '{}' more than once",
                        def.name, metadata.name
                    )));
                }

                if let Some(ref pivot) = metadata.pivot_config {
                    if let Some(model) = table_owners.get(&pivot.table) {
                        return Err(ModelError::Configuration(format!(
                            "Join table '{}' collides with the table of model '{}'",
                            pivot.table, model
                        )));
                    }
                    join_tables.insert(pivot.table.clone());
                }

                debug!(
                    target: LOG_TARGET,
                    "Resolved {}.{} ({} {}, key '{}' on '{}')",
                    def.name,
                    metadata.name,
                    metadata.relationship_type,
                    metadata.related_model,
                    metadata.foreign_key.column,
                    metadata.foreign_key.table
                );

                relationships.insert(metadata.name.clone(), descriptor_for(Rc::new(metadata)));
            }

            models.insert(
                def.name.clone(),
                Rc::new(ModelSchema {
                    name: def.name.clone(),
                    table: owner_table,
                    relationships,
                }),
            );
        }

        Ok(Schema {
            models,
            join_tables,
        })
    }
}

fn resolve_relationship(
    naming: &NamingConvention,
    def: &ModelDef,
    owner_table: &str,
    decl: &RelationshipDecl,
    related_table: String,
) -> RelationshipMetadata {
    let kind = decl.relationship_type;
    let name = decl.name.clone().unwrap_or_else(|| {
        if kind.is_collection() {
            naming.plural_attribute(&decl.related_model)
        } else {
            naming.singular_attribute(&decl.related_model)
        }
    });

    let (foreign_key, pivot_config) = match kind {
        RelationshipType::HasOne | RelationshipType::HasMany => {
            let column = decl
                .foreign_key
                .clone()
                .unwrap_or_else(|| naming.foreign_key(&def.name));
            (ForeignKeyConfig::new(column, related_table.clone()), None)
        }
        RelationshipType::BelongsTo => {
            let column = decl
                .foreign_key
                .clone()
                .unwrap_or_else(|| naming.foreign_key(&decl.related_model));
            (ForeignKeyConfig::new(column, owner_table), None)
        }
        RelationshipType::ManyToMany => {
            let table = decl
                .join_table
                .clone()
                .unwrap_or_else(|| naming.join_table(owner_table, &related_table));
            let (local_key, foreign_key) = decl
                .join_keys
                .clone()
                .unwrap_or_else(|| naming.join_keys(&def.name, &decl.related_model));
            (
                ForeignKeyConfig::new(local_key.clone(), table.clone()),
                Some(PivotConfig::new(table, local_key, foreign_key)),
            )
        }
    };

    RelationshipMetadata {
        relationship_type: kind,
        name,
        owner_model: def.name.clone(),
        owner_table: owner_table.to_string(),
        related_model: decl.related_model.clone(),
        related_table,
        foreign_key,
        pivot_config,
    }
}

/// Resolved model: its table and relationship descriptors
#[derive(Debug)]
pub struct ModelSchema {
    name: String,
    table: String,
    relationships: BTreeMap<String, Rc<dyn RelationshipDescriptor>>,
}

impl ModelSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Descriptor of a relationship by attribute name
    pub fn relationship(&self, name: &str) -> ModelResult<Rc<dyn RelationshipDescriptor>> {
        self.relationships
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownRelationship {
                model: self.name.clone(),
                relationship: name.to_string(),
            })
    }

    pub fn has_relationship(&self, name: &str) -> bool {
        self.relationships.contains_key(name)
    }

    /// Relationship attribute names, sorted
    pub fn relationship_names(&self) -> Vec<String> {
        self.relationships.keys().cloned().collect()
    }

    /// Resolved metadata of every relationship
    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipMetadata> {
        self.relationships.values().map(|descriptor| descriptor.metadata())
    }
}

/// Every resolved model plus the join tables their relationships need
#[derive(Debug, Default)]
pub struct Schema {
    models: BTreeMap<String, Rc<ModelSchema>>,
    join_tables: BTreeSet<String>,
}

impl Schema {
    pub fn model(&self, name: &str) -> ModelResult<Rc<ModelSchema>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &Rc<ModelSchema>> {
        self.models.values()
    }

    /// Join tables shared by many-to-many relationships, sorted
    pub fn join_tables(&self) -> Vec<String> {
        self.join_tables.iter().cloned().collect()
    }

    /// Every table the schema needs: model tables first, then join tables
    pub fn tables(&self) -> Vec<String> {
        self.models
            .values()
            .map(|model| model.table.clone())
            .chain(self.join_tables.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn music_registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .register(
                ModelDef::new("Artist")
                    .has_one("Bio")
                    .has_many("Song")
                    .has_and_belongs_to_many("Taste"),
            )
            .unwrap();
        registry.register(ModelDef::new("Bio").belongs_to("Artist")).unwrap();
        registry.register(ModelDef::new("Song").belongs_to("Artist")).unwrap();
        registry
            .register(ModelDef::new("Taste").has_and_belongs_to_many("Artist"))
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_model() {
        let mut registry = music_registry();
        let err = registry.register(ModelDef::new("Song")).unwrap_err();
        assert_eq!(err, ModelError::DuplicateModel("Song".to_string()));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_resolves_conventional_names() {
        let schema = music_registry().resolve(&OrmConfig::default()).unwrap();
        let artist = schema.model("Artist").unwrap();
        assert_eq!(artist.table(), "artists");
        assert_eq!(artist.relationship_names(), vec!["bio", "songs", "tastes"]);

        let bio = artist.relationship("bio").unwrap();
        assert_eq!(bio.metadata().foreign_key, ForeignKeyConfig::new("artist_id", "bios"));

        let artist_of_song = schema.model("Song").unwrap().relationship("artist").unwrap();
        let metadata = artist_of_song.metadata();
        assert_eq!(metadata.relationship_type, RelationshipType::BelongsTo);
        assert_eq!(metadata.foreign_key, ForeignKeyConfig::new("artist_id", "songs"));
    }

    #[test]
    fn test_reciprocal_many_to_many_share_join_table() {
        let schema = music_registry().resolve(&OrmConfig::default()).unwrap();
        let tastes = schema.model("Artist").unwrap().relationship("tastes").unwrap();
        let artists = schema.model("Taste").unwrap().relationship("artists").unwrap();

        let forward = tastes.metadata().pivot().unwrap().clone();
        let backward = artists.metadata().pivot().unwrap().clone();
        assert_eq!(forward.table, "artists_tastes");
        assert_eq!(backward.table, "artists_tastes");
        assert_eq!(forward.local_key, backward.foreign_key);
        assert_eq!(forward.foreign_key, backward.local_key);

        assert_eq!(schema.join_tables(), vec!["artists_tastes"]);
        assert_eq!(
            schema.tables(),
            vec!["artists", "bios", "songs", "tastes", "artists_tastes"]
        );
    }

    #[test]
    fn test_forward_reference_and_unknown_model() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelDef::new("Song").belongs_to("Album")).unwrap();
        assert_eq!(
            registry.resolve(&OrmConfig::default()).unwrap_err(),
            ModelError::UnknownModel("Album".to_string())
        );

        registry.register(ModelDef::new("Album").has_many("Song")).unwrap();
        assert!(registry.resolve(&OrmConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_relationship_name() {
        let mut registry = ModelRegistry::new();
        registry
            .register(
                ModelDef::new("Person")
                    .belongs_to("Person")
                    .relationship(RelationshipDecl::has_one("Person")),
            )
            .unwrap();
        let err = registry.resolve(&OrmConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_table_collisions() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelDef::new("Song")).unwrap();
        registry.register(ModelDef::new("Track").table("songs")).unwrap();
        assert!(matches!(
            registry.resolve(&OrmConfig::default()),
            Err(ModelError::Configuration(_))
        ));
    }

    #[test]
    fn test_self_referential_many_to_many() {
        let mut registry = ModelRegistry::new();
        registry
            .register(
                ModelDef::new("Person")
                    .relationship(RelationshipDecl::has_and_belongs_to_many("Person").named("friends")),
            )
            .unwrap();
        let schema = registry.resolve(&OrmConfig::default()).unwrap();
        let friends = schema.model("Person").unwrap().relationship("friends").unwrap();
        let pivot = friends.metadata().pivot().unwrap();
        assert_eq!(pivot.table, "persons_persons");
        assert_eq!(pivot.local_key, "person_id");
        assert_eq!(pivot.foreign_key, "related_person_id");
    }

    #[test]
    fn test_unknown_relationship() {
        let schema = music_registry().resolve(&OrmConfig::default()).unwrap();
        let err = schema.model("Song").unwrap().relationship("album").unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownRelationship {
                model: "Song".to_string(),
                relationship: "album".to_string(),
            }
        );
        assert!(schema.model("Album").is_err());
    }
}
