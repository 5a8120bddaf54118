use std::sync::Arc;
use std::time::Instant;

use crate::event_sourcing::core::{
    make_stored_entity_id, AnyDomainEvent, DomainEvent, EntityVersionRef, StoredRecord,
};
use crate::event_sourcing::error::{JournalError, SchemaError, StoreError};
use crate::event_sourcing::schema::SchemaRegistry;
use crate::event_sourcing::store::journal::{EventJournal, EventQuery};
use crate::event_sourcing::transcoder::Transcoder;
use crate::metrics::JournalMetrics;

// ============================================================================
// Event Store - Application Facade Over the Journal
// ============================================================================
//
// Works with ANY registered event type.
//
// Responsibilities:
// 1. Serialize events and append them to the journal
// 2. Validate payloads against their schema when validation is enabled
// 3. Load and deserialize ranged slices of a stream
// 4. Record journal activity in metrics when attached
//
// ============================================================================

#[derive(Clone)]
pub struct EventStore {
    journal: Arc<dyn EventJournal>,
    transcoder: Transcoder,
    schemas: Arc<SchemaRegistry>,
    metrics: Option<Arc<JournalMetrics>>,
}

impl EventStore {
    pub fn new(journal: Arc<dyn EventJournal>, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            journal,
            transcoder: Transcoder::new(Arc::clone(&schemas)),
            schemas,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<JournalMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn journal(&self) -> &Arc<dyn EventJournal> {
        &self.journal
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// Stream id of the aggregate instance that emits `E`.
    pub fn stream_id_for<E: DomainEvent>(entity_id: &str) -> String {
        make_stored_entity_id(E::DESCRIPTOR.aggregate_type(), entity_id)
    }

    /// Appends one event.
    ///
    /// `expected_version` is the last version the caller saw, `None` when the
    /// event creates the aggregate. On conflict nothing is written and the
    /// caller should reload the stream before trying again.
    pub async fn append(
        &self,
        event: &dyn AnyDomainEvent,
        expected_version: Option<i64>,
    ) -> Result<StoredRecord, StoreError> {
        let validate = self.schemas.settings().validation_enabled;
        self.append_inner(event, expected_version, validate).await
    }

    /// Like [`append`](Self::append), but validates against the schema even
    /// when validation is disabled in the settings.
    pub async fn append_validated(
        &self,
        event: &dyn AnyDomainEvent,
        expected_version: Option<i64>,
    ) -> Result<StoredRecord, StoreError> {
        self.append_inner(event, expected_version, true).await
    }

    async fn append_inner(
        &self,
        event: &dyn AnyDomainEvent,
        expected_version: Option<i64>,
        validate: bool,
    ) -> Result<StoredRecord, StoreError> {
        if validate {
            self.validate(event)?;
        }

        let record = self.transcoder.serialize(event)?;

        let started = Instant::now();
        let result = self.journal.append(&record, expected_version).await;
        self.observe("append", started);

        match result {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_append(&record.aggregate_type);
                }
                tracing::info!(
                    aggregate_id = %record.aggregate_id,
                    aggregate_type = %record.aggregate_type,
                    aggregate_version = record.aggregate_version,
                    event_type = %record.event_type,
                    "✅ Appended event to journal"
                );
                Ok(record)
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    match &e {
                        JournalError::AlreadyExists { .. } => {
                            metrics.record_conflict(&record.aggregate_type, "already_exists")
                        }
                        JournalError::ConcurrencyConflict { .. } => {
                            metrics.record_conflict(&record.aggregate_type, "concurrency_conflict")
                        }
                        _ => {}
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Loads and deserializes a slice of one stream.
    pub async fn load_events(
        &self,
        stream_id: &str,
        query: &EventQuery,
    ) -> Result<Vec<Box<dyn AnyDomainEvent>>, StoreError> {
        let started = Instant::now();
        let records = self.journal.get_entity_events(stream_id, query).await;
        self.observe("get_entity_events", started);

        let events = records?
            .iter()
            .map(|record| self.transcoder.deserialize(record))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(stored_entity_id = %stream_id, count = events.len(), "Loaded events");
        Ok(events)
    }

    /// Every event of a stream, oldest first.
    pub async fn load_stream(&self, stream_id: &str) -> Result<Vec<Box<dyn AnyDomainEvent>>, StoreError> {
        self.load_events(stream_id, &EventQuery::new()).await
    }

    pub async fn entity_version(&self, stream_id: &str, version: i64) -> Result<EntityVersionRef, StoreError> {
        let started = Instant::now();
        let result = self.journal.get_entity_version(stream_id, version).await;
        self.observe("get_entity_version", started);
        Ok(result?)
    }

    /// Checks `event` against the schema of its type, loading that schema on
    /// first use.
    fn validate(&self, event: &dyn AnyDomainEvent) -> Result<(), SchemaError> {
        let descriptor = event.descriptor();
        if matches!(self.schemas.schema_for(&descriptor), Err(SchemaError::NotCached(_))) {
            let schema = self.schemas.load_event_schema(&descriptor)?;
            self.schemas.cache_schema(&descriptor, schema);
        }

        let result = self.schemas.ensure_valid(event);
        if let (Err(SchemaError::ValidationFailure { .. }), Some(metrics)) = (&result, &self.metrics) {
            metrics.record_validation_failure(descriptor.qualified_name);
        }
        result
    }

    fn observe(&self, operation: &str, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_duration(operation, started.elapsed().as_secs_f64());
        }
    }
}
