use std::path::PathBuf;

use uuid::Uuid;

// ============================================================================
// Event Sourcing Errors
// ============================================================================

/// Failures of the event journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// Creation event collided with an existing one: the aggregate was
    /// created concurrently or the id is reused.
    #[error("Aggregate with id {aggregate_id:?} already exists ({aggregate_type})")]
    AlreadyExists {
        aggregate_type: String,
        aggregate_id: String,
    },

    /// Another writer already appended this version.
    #[error(
        "Concurrency conflict: {aggregate_type} {aggregate_id:?} already has version \
         {aggregate_version} (violated {constraint})"
    )]
    ConcurrencyConflict {
        aggregate_type: String,
        aggregate_id: String,
        aggregate_version: i64,
        constraint: String,
    },

    #[error("Entity version {version} does not exist for {stored_entity_id}")]
    EntityVersionNotFound {
        stored_entity_id: String,
        version: i64,
    },

    #[error("Event id {0} does not carry a timestamp")]
    UntimedEventId(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failures converting between events and stored records.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Unable to resolve event type {module_name}#{class_name}: {reason}")]
    ResolveDomainFailed {
        module_name: String,
        class_name: String,
        reason: String,
    },

    #[error("Unable to instantiate {class_name} with data {data}: {source}")]
    Construction {
        class_name: String,
        data: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Event data of {class_name} is not a JSON object")]
    PayloadNotObject { class_name: String },

    #[error("Event id {0} does not carry a timestamp")]
    UntimedEventId(Uuid),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Failures resolving, loading or applying event schemas.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("No event schema found for: {event} (expecting file at:{}).", .path.display())]
    NotFound { event: String, path: PathBuf },

    #[error("Can't parse schema for event: {event} from {}: {reason}", .path.display())]
    Parse {
        event: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Can't read schema for event: {event} from {}: {source}", .path.display())]
    Io {
        event: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cached Schema not found for: {0}")]
    NotCached(String),

    #[error("Event {event} does not match its schema")]
    ValidationFailure { event: String },

    #[error("Can't encode event {event} for validation: {source}")]
    Encoding {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}", join_lines(.0))]
    Aggregated(Vec<SchemaError>),
}

/// Failures of the [`EventStore`](crate::event_sourcing::store::EventStore) facade.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl SchemaError {
    /// Failures contained in this error, flattening aggregates.
    pub fn failures(&self) -> Vec<&SchemaError> {
        match self {
            Self::Aggregated(errors) => errors.iter().flat_map(SchemaError::failures).collect(),
            other => vec![other],
        }
    }
}

fn join_lines(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
