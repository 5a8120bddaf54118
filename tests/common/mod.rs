//! Journal scenarios shared by every backend.

use std::sync::Arc;

use event_journal::domain::{self, project::{ProjectCreated, ProjectRenamed}};
use event_journal::event_sourcing::{
    Event, EventJournal, EventQuery, JournalError, SchemaRegistry, SchemaSettings, StoredRecord, Transcoder,
};
use uuid::{NoContext, Timestamp, Uuid};

const BASE_SECONDS: u64 = 1_700_000_000;

pub fn transcoder() -> Transcoder {
    let schemas = SchemaRegistry::new(SchemaSettings::default(), Arc::new(domain::event_registry()));
    Transcoder::new(Arc::new(schemas))
}

fn event_id_at(offset: u64) -> Uuid {
    Uuid::new_v7(Timestamp::from_unix(NoContext, BASE_SECONDS + offset, 0))
}

/// Six records E0..E5 of one project, one second apart.
pub fn project_stream(project_id: &str) -> Vec<StoredRecord> {
    let transcoder = transcoder();
    let created = Event::new(
        project_id,
        0,
        ProjectCreated {
            name: "Awesome Project".into(),
            owner: Some("ada".into()),
        },
    )
    .with_event_id(event_id_at(0));

    let mut records = vec![transcoder.serialize(&created).unwrap()];
    for version in 1..6 {
        let renamed = Event::new(
            project_id,
            version,
            ProjectRenamed {
                name: format!("name {version}"),
            },
        )
        .with_event_id(event_id_at(version as u64));
        records.push(transcoder.serialize(&renamed).unwrap());
    }
    records
}

pub async fn seed(journal: &dyn EventJournal, records: &[StoredRecord]) {
    for record in records {
        let expected = (record.aggregate_version > 0).then(|| record.aggregate_version - 1);
        journal.append(record, expected).await.unwrap();
    }
}

fn versions(records: &[StoredRecord]) -> Vec<i64> {
    records.iter().map(|record| record.aggregate_version).collect()
}

async fn query(journal: &dyn EventJournal, stream: &str, query: EventQuery) -> Vec<i64> {
    versions(&journal.get_entity_events(stream, &query).await.unwrap())
}

pub async fn assert_ranged_queries(journal: &dyn EventJournal) {
    let records = project_stream("p-range");
    seed(journal, &records).await;
    let stream = records[0].stored_entity_id.clone();
    let id = |n: usize| records[n].event_id;

    assert_eq!(query(journal, &stream, EventQuery::new()).await, vec![0, 1, 2, 3, 4, 5]);

    // ascending: after exclusive, until inclusive
    assert_eq!(
        query(journal, &stream, EventQuery::new().after(id(1)).until(id(4))).await,
        vec![2, 3, 4]
    );

    // descending: after inclusive, until exclusive
    assert_eq!(
        query(
            journal,
            &stream,
            EventQuery::new().after(id(1)).until(id(4)).query_ascending(false)
        )
        .await,
        vec![1, 2, 3]
    );
    assert_eq!(
        query(
            journal,
            &stream,
            EventQuery::new()
                .after(id(1))
                .until(id(4))
                .query_ascending(false)
                .results_ascending(false)
        )
        .await,
        vec![3, 2, 1]
    );

    assert_eq!(query(journal, &stream, EventQuery::new().limit(2)).await, vec![0, 1]);

    // the limit cuts the scan, then the window is flipped
    assert_eq!(
        query(journal, &stream, EventQuery::new().limit(2).query_ascending(false)).await,
        vec![4, 5]
    );

    assert_eq!(
        query(journal, &stream, EventQuery::new().until(id(2))).await,
        vec![0, 1, 2]
    );
    assert_eq!(
        query(
            journal,
            &stream,
            EventQuery::new().after(id(3)).query_ascending(false).results_ascending(false)
        )
        .await,
        vec![5, 4, 3]
    );

    // descending without a flip keeps the newest three in scan order
    assert_eq!(
        query(
            journal,
            &stream,
            EventQuery::new().limit(3).query_ascending(false).results_ascending(false)
        )
        .await,
        vec![5, 4, 3]
    );

    // a descending `after` includes its own event
    assert_eq!(
        query(
            journal,
            &stream,
            EventQuery::new().after(id(2)).query_ascending(false).results_ascending(false)
        )
        .await,
        vec![5, 4, 3, 2]
    );
    assert_eq!(
        query(journal, &stream, EventQuery::new().after(id(2)).query_ascending(false)).await,
        vec![2, 3, 4, 5]
    );

    assert!(query(journal, "Project::nobody", EventQuery::new()).await.is_empty());

    let untimed = journal
        .get_entity_events(&stream, &EventQuery::new().after(Uuid::new_v4()))
        .await;
    assert!(matches!(untimed, Err(JournalError::UntimedEventId(_))));
}

pub async fn assert_append_conflicts(journal: &dyn EventJournal) {
    let records = project_stream("p-conflict");
    seed(journal, &records[..2]).await;

    // a second creation of the same project
    let recreated = project_stream("p-conflict").remove(0);
    assert!(matches!(
        journal.append(&recreated, None).await,
        Err(JournalError::AlreadyExists { .. })
    ));

    // a writer that still believes the stream is at version 0
    let stale = project_stream("p-conflict").remove(1);
    match journal.append(&stale, Some(0)).await {
        Err(JournalError::ConcurrencyConflict {
            aggregate_version,
            constraint,
            ..
        }) => {
            assert_eq!(aggregate_version, 1);
            assert_eq!(constraint, event_journal::event_sourcing::VERSION_CONSTRAINT);
        }
        other => panic!("expected a concurrency conflict, got {other:?}"),
    }

    let stored = journal
        .get_entity_events(&records[0].stored_entity_id, &EventQuery::new())
        .await
        .unwrap();
    assert_eq!(stored, records[..2].to_vec());
}

pub async fn assert_entity_version(journal: &dyn EventJournal) {
    let records = project_stream("p-version");
    seed(journal, &records[..3]).await;
    let stream = &records[0].stored_entity_id;

    let found = journal.get_entity_version(stream, 2).await.unwrap();
    assert_eq!(found.entity_version_id, "Project::p-version::version::2");
    assert_eq!(found.event_id, records[2].event_id);

    assert!(matches!(
        journal.get_entity_version(stream, 3).await,
        Err(JournalError::EntityVersionNotFound { version: 3, .. })
    ));
}
