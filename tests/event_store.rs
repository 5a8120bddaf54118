use std::path::PathBuf;
use std::sync::Arc;

use event_journal::domain::{
    self,
    project::{Project, ProjectClosed, ProjectCreated, ProjectRenamed},
};
use event_journal::event_sourcing::{
    Event, EventQuery, EventStore, InMemoryEventJournal, JournalError, SchemaRegistry, SchemaSettings,
    StoreError,
};
use serde_json::Value;

fn schema_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schemas")
}

fn store(validation_enabled: bool, adds_schema_version: bool) -> EventStore {
    let settings = SchemaSettings {
        schema_dir: schema_dir(),
        validation_enabled,
        adds_schema_version_to_event_data: adds_schema_version,
    };
    let schemas = SchemaRegistry::new(settings, Arc::new(domain::event_registry()));
    EventStore::new(Arc::new(InMemoryEventJournal::new()), Arc::new(schemas))
}

fn created(id: &str) -> Event<ProjectCreated> {
    Event::new(
        id,
        0,
        ProjectCreated {
            name: "Awesome Project".into(),
            owner: Some("ada".into()),
        },
    )
}

#[test]
fn test_shipped_schemas_load() {
    let store = store(true, false);
    let loaded = store.schemas().load_all_schemas().unwrap();

    // NoteAdded has no mutation logic, so it has no schema to preload.
    assert_eq!(loaded.len(), 3);
    assert_eq!(store.schemas().current_version::<ProjectCreated>(), 1);
    assert_eq!(store.schemas().current_version::<ProjectRenamed>(), 2);
}

#[tokio::test]
async fn test_project_lifecycle() {
    let store = store(false, false);
    let stream = EventStore::stream_id_for::<ProjectCreated>("p-1");

    store.append(&created("p-1"), None).await.unwrap();
    store
        .append(&Event::new("p-1", 1, ProjectRenamed { name: "Renamed".into() }), Some(0))
        .await
        .unwrap();
    store
        .append(&Event::new("p-1", 2, ProjectClosed { reason: None }), Some(1))
        .await
        .unwrap();

    let events = store.load_stream(&stream).await.unwrap();
    let project = Project::replay(&events).unwrap().unwrap();
    assert_eq!(project.name, "Renamed");
    assert!(project.closed);
    assert_eq!(project.version, 2);

    let latest = store
        .load_events(&stream, &EventQuery::new().limit(1).query_ascending(false))
        .await
        .unwrap();
    assert_eq!(latest.len(), 1);
    assert!(latest[0].is::<ProjectClosed>());
}

#[tokio::test]
async fn test_duplicate_creation_is_already_exists() {
    let store = store(false, false);
    store.append(&created("p-1"), None).await.unwrap();

    let result = store.append(&created("p-1"), None).await;
    assert!(matches!(
        result,
        Err(StoreError::Journal(JournalError::AlreadyExists { .. }))
    ));
}

#[tokio::test]
async fn test_schema_version_round_trip() {
    let store = store(true, true);

    let renamed = store
        .schemas()
        .stamp(Event::new("p-1", 1, ProjectRenamed { name: "x".into() }));
    assert_eq!(renamed.schema_version, Some(2));

    store.append(&created("p-1"), None).await.unwrap();
    let record = store.append(&renamed, Some(0)).await.unwrap();
    let data: Value = serde_json::from_str(&record.event_data).unwrap();
    assert_eq!(data["schema_version"], 2);

    let created_record = store
        .journal()
        .get_entity_events("Project::p-1", &EventQuery::new().limit(1))
        .await
        .unwrap()
        .remove(0);
    let data: Value = serde_json::from_str(&created_record.event_data).unwrap();
    assert_eq!(data["schema_version"], 1);

    let events = store.load_stream("Project::p-1").await.unwrap();
    assert_eq!(events[0].schema_version(), Some(1));
    assert_eq!(events[1].schema_version(), Some(2));
}

#[tokio::test]
async fn test_metadata_is_write_only() {
    let store = store(false, false);
    let event = created("p-1").with_metadata(serde_json::json!({"user": "ada"}));

    let record = store.append(&event, None).await.unwrap();
    assert_eq!(record.metadata.as_deref(), Some(r#"{"user":"ada"}"#));

    let events = store.load_stream("Project::p-1").await.unwrap();
    assert_eq!(events[0].metadata(), None);
}

#[tokio::test]
async fn test_forced_validation() {
    let store = store(false, false);
    store.append_validated(&created("p-1"), None).await.unwrap();
    store
        .append_validated(&Event::new("p-1", 1, ProjectClosed { reason: None }), Some(0))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let schemas = SchemaRegistry::new(
        SchemaSettings {
            schema_dir: dir.path().to_path_buf(),
            ..SchemaSettings::default()
        },
        Arc::new(domain::event_registry()),
    );
    let bare = EventStore::new(Arc::new(InMemoryEventJournal::new()), Arc::new(schemas));

    assert!(matches!(
        bare.append_validated(&created("p-1"), None).await,
        Err(StoreError::Schema(_))
    ));
    bare.append(&created("p-1"), None).await.unwrap();
}
