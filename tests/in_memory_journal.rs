mod common;

use event_journal::event_sourcing::{EventJournal, InMemoryEventJournal};

#[tokio::test]
async fn test_ranged_queries() {
    common::assert_ranged_queries(&InMemoryEventJournal::new()).await;
}

#[tokio::test]
async fn test_append_conflicts() {
    common::assert_append_conflicts(&InMemoryEventJournal::new()).await;
}

#[tokio::test]
async fn test_entity_version() {
    common::assert_entity_version(&InMemoryEventJournal::new()).await;
}

#[tokio::test]
async fn test_concurrent_creation_has_one_winner() {
    let journal = InMemoryEventJournal::new();
    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let journal = journal.clone();
            let record = common::project_stream("p-race").remove(0);
            tokio::spawn(async move { journal.append(&record, None).await })
        })
        .collect();

    let mut successes = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(journal.len(), 1);
}
