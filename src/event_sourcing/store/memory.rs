use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::event_sourcing::core::{EntityVersionRef, StoredRecord, VersionKey};
use crate::event_sourcing::error::JournalError;
use crate::event_sourcing::store::journal::{classify_violation, EventJournal, EventQuery, VERSION_CONSTRAINT};

/// Journal kept in process memory. Rows keep insertion order, which stands in
/// for the database's serial id.
#[derive(Clone, Default)]
pub struct InMemoryEventJournal {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    rows: Vec<StoredRecord>,
    versions: HashSet<VersionKey>,
}

impl InMemoryEventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventJournal for InMemoryEventJournal {
    async fn append(&self, record: &StoredRecord, expected_version: Option<i64>) -> Result<(), JournalError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if !inner.versions.insert(record.version_key()) {
            return Err(classify_violation(record, expected_version, VERSION_CONSTRAINT));
        }
        inner.rows.push(record.clone());

        tracing::debug!(
            event_id = %record.event_id,
            stored_entity_id = %record.stored_entity_id,
            aggregate_version = record.aggregate_version,
            "Appended event"
        );
        Ok(())
    }

    async fn get_entity_version(&self, stored_entity_id: &str, version: i64) -> Result<EntityVersionRef, JournalError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .rows
            .iter()
            .find(|row| row.stored_entity_id == stored_entity_id && row.aggregate_version == version)
            .map(StoredRecord::version_ref)
            .ok_or_else(|| JournalError::EntityVersionNotFound {
                stored_entity_id: stored_entity_id.to_string(),
                version,
            })
    }

    async fn get_entity_events(&self, stored_entity_id: &str, query: &EventQuery) -> Result<Vec<StoredRecord>, JournalError> {
        let bounds = query.bounds()?;
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        let matching = |row: &&StoredRecord| {
            row.stored_entity_id == stored_entity_id && bounds.admits(row.create_date)
        };
        let limit = query.limit.unwrap_or(usize::MAX);

        let rows: Vec<StoredRecord> = if query.query_ascending {
            inner.rows.iter().filter(matching).take(limit).cloned().collect()
        } else {
            inner.rows.iter().rev().filter(matching).take(limit).cloned().collect()
        };

        Ok(query.finish(rows))
    }
}
