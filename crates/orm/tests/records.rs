mod common;

use std::rc::Rc;

use common::{key_of, Fixture};
use docrel_orm::{
    Database, MemoryStore, ModelDef, ModelError, OrmConfig, RelationshipType, TableNaming,
};
use serde_json::json;
use uuid::Uuid;

#[test]
fn test_save_inserts_then_replaces() {
    let fx = Fixture::has_many();
    let song = fx.record("Song");
    song.set("title", "Blue in Green");

    let id = song.save().unwrap();
    assert_eq!(song.id(), Some(id));
    assert_eq!(fx.store.len("songs"), 1);

    song.set("title", "So What");
    assert_eq!(song.save().unwrap(), id);
    assert_eq!(fx.store.len("songs"), 1);
    assert_eq!(fx.fetch(&song).get("title"), Some(json!("So What")));
}

#[test]
fn test_reload_refreshes_fields_and_cache() {
    let fx = Fixture::belongs_to();
    let a = fx.saved("Artist");
    let p = fx.saved("Person");
    a.set_one("person", Some(&p)).unwrap();
    assert!(a.is_relationship_cached("person"));

    a.reload().unwrap();
    assert!(!a.has_field("person_id"));
    assert!(!a.is_relationship_cached("person"));
    assert!(a.get_one("person").unwrap().is_none());
}

#[test]
fn test_reload_unsaved_or_missing() {
    let fx = Fixture::has_one();
    let a = fx.record("Artist");
    assert!(matches!(a.reload(), Err(ModelError::InvalidKey(_))));

    a.set("id", Uuid::new_v4().to_string());
    assert!(matches!(a.reload(), Err(ModelError::NotFound { .. })));
}

#[test]
fn test_delete_forgets_key_and_cache() {
    let fx = Fixture::has_many();
    let a = fx.saved("Artist");
    a.related_set("songs").unwrap();

    assert!(a.delete().unwrap());
    assert!(!a.is_saved());
    assert!(!a.is_relationship_cached("songs"));
    assert!(fx.store.is_empty("artists"));
    assert!(!a.delete().unwrap());
}

#[test]
fn test_clear_relationship_cache() {
    let fx = Fixture::has_one();
    let a = fx.saved("Artist");
    let b = fx.record("Bio");
    a.set_one("bio", Some(&b)).unwrap();
    b.set("text", "edited in memory");

    a.clear_relationship_cache();
    assert!(!a.is_relationship_cached("bio"));
    let stored = a.get_one("bio").unwrap().unwrap();
    assert!(!stored.same_instance(&b));
    assert!(!stored.has_field("text"));
}

#[test]
fn test_query_by_field() {
    let fx = Fixture::has_many();
    let a = fx.saved("Artist");
    let s = fx.record("Song");
    s.set("artist_id", key_of(&a));
    s.save().unwrap();
    fx.saved("Song");

    let query = fx.db.query("Song").unwrap().where_eq("artist_id", key_of(&a));
    assert_eq!(query.ids().unwrap(), vec![s.id().unwrap()]);
    assert!(query.exists().unwrap());
    assert_eq!(fx.db.query("Song").unwrap().count().unwrap(), 2);
    assert!(matches!(
        fx.db.query("Album"),
        Err(ModelError::UnknownModel(_))
    ));
}

#[test]
fn test_unknown_relationship_and_model() {
    let fx = Fixture::has_many();
    let a = fx.record("Artist");
    assert!(matches!(
        a.related("albums"),
        Err(ModelError::UnknownRelationship { .. })
    ));
    assert!(fx.db.new_record("Album").is_err());
}

#[test]
fn test_singular_table_naming() {
    let config = OrmConfig {
        table_naming: TableNaming::Singular,
        ..OrmConfig::testing()
    };
    let store = Rc::new(MemoryStore::new());
    let db = Database::builder()
        .config(config)
        .model(ModelDef::new("Artist").has_and_belongs_to_many("Taste"))
        .model(ModelDef::new("Taste"))
        .build(store.clone())
        .unwrap();

    let mut created = db.create_tables().unwrap();
    created.sort();
    assert_eq!(created, vec!["artist", "artist_taste", "taste"]);
    assert!(db.create_tables().unwrap().is_empty());

    let metadata = db
        .model("Artist")
        .unwrap()
        .relationship("tastes")
        .unwrap()
        .metadata()
        .clone();
    assert_eq!(metadata.relationship_type, RelationshipType::ManyToMany);
    let pivot = metadata.pivot().unwrap();
    assert_eq!(pivot.local_key, "artist_id");
    assert_eq!(pivot.foreign_key, "taste_id");
}

#[test]
fn test_typed_field_access() {
    let fx = Fixture::has_many();
    let song = fx.record("Song");
    song.set("plays", 42);
    song.set("title", "Flamenco Sketches");

    assert_eq!(song.get_as::<u32>("plays").unwrap(), Some(42));
    assert_eq!(
        song.get_as::<String>("title").unwrap().as_deref(),
        Some("Flamenco Sketches")
    );
    assert_eq!(song.get_as::<u32>("missing").unwrap(), None);
    assert!(matches!(
        song.get_as::<u32>("title"),
        Err(ModelError::Serialization(_))
    ));
}

#[test]
fn test_record_debug_lists_cached_relationships() {
    let fx = Fixture::has_one();
    let a = fx.saved("Artist");
    a.get_one("bio").unwrap();

    let rendered = format!("{:?}", a);
    assert!(rendered.contains("Artist"));
    assert!(rendered.contains("bio"));
}
