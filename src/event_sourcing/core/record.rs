use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Stored Record - Storage Representation of One Event
// ============================================================================

/// Separator between aggregate type and id in a stream id.
pub const STREAM_SEPARATOR: &str = "::";

/// One event as written to the journal. Never mutated after creation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredRecord {
    pub event_id: Uuid,
    pub event_type: String,
    /// Compact JSON with sorted keys, identity fields stripped.
    pub event_data: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub aggregate_version: i64,
    pub create_date: DateTime<Utc>,
    pub metadata: Option<String>,
    pub module_name: String,
    pub class_name: String,
    pub stored_entity_id: String,
}

/// `(aggregate_id, aggregate_type, aggregate_version)`
pub type VersionKey = (String, String, i64);

impl StoredRecord {
    /// Key enforced unique by the journal.
    pub fn version_key(&self) -> VersionKey {
        (
            self.aggregate_id.clone(),
            self.aggregate_type.clone(),
            self.aggregate_version,
        )
    }

    pub fn version_ref(&self) -> EntityVersionRef {
        EntityVersionRef {
            entity_version_id: make_entity_version_id(&self.stored_entity_id, self.aggregate_version),
            event_id: self.event_id,
        }
    }
}

/// Reference to the record at one exact version of a stream.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EntityVersionRef {
    pub entity_version_id: String,
    pub event_id: Uuid,
}

/// `<aggregate_type>::<aggregate_id>`, the partition key of a stream.
pub fn make_stored_entity_id(aggregate_type: &str, aggregate_id: &str) -> String {
    format!("{aggregate_type}{STREAM_SEPARATOR}{aggregate_id}")
}

pub fn make_entity_version_id(stored_entity_id: &str, version: i64) -> String {
    format!("{stored_entity_id}{STREAM_SEPARATOR}version{STREAM_SEPARATOR}{version}")
}

/// Wall-clock time embedded in a time-based event id (v1, v6 or v7).
pub fn timestamp_from_event_id(event_id: &Uuid) -> Option<DateTime<Utc>> {
    let (seconds, nanos) = event_id.get_timestamp()?.to_unix();
    DateTime::from_timestamp(i64::try_from(seconds).ok()?, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::{NoContext, Timestamp};

    #[test]
    fn test_stream_ids() {
        let stream = make_stored_entity_id("Project", "p-1");
        assert_eq!(stream, "Project::p-1");
        assert_eq!(make_entity_version_id(&stream, 4), "Project::p-1::version::4");
    }

    #[test]
    fn test_timestamp_from_v7_event_id() {
        let id = Uuid::new_v7(Timestamp::from_unix(NoContext, 1_700_000_000, 250_000_000));
        let ts = timestamp_from_event_id(&id).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_random_event_id_has_no_timestamp() {
        assert!(timestamp_from_event_id(&Uuid::new_v4()).is_none());
    }
}
