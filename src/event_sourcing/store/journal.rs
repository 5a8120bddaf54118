use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event_sourcing::core::{timestamp_from_event_id, EntityVersionRef, StoredRecord};
use crate::event_sourcing::error::JournalError;

// ============================================================================
// Event Journal - Append-Only Storage Contract
// ============================================================================
//
// Responsibilities:
// 1. Append one record, with `(aggregate_id, aggregate_type,
//    aggregate_version)` uniqueness enforced atomically by the storage itself
// 2. Look up the record at an exact stream version
// 3. Answer ranged, ordered queries over one stream
//
// No retries happen here: on conflict the caller re-reads and tries again.
//
// ============================================================================

/// Name of the uniqueness constraint on `(aggregate_id, aggregate_type, aggregate_version)`.
pub const VERSION_CONSTRAINT: &str = "event_journal_aggregate_version_key";

#[async_trait]
pub trait EventJournal: Send + Sync {
    /// Writes one record.
    ///
    /// `expected_version` is the version the caller last saw. A uniqueness
    /// violation on a creation attempt (no expected version, or the record is
    /// version 0) means the aggregate already exists; any other violation is
    /// a concurrency conflict.
    async fn append(&self, record: &StoredRecord, expected_version: Option<i64>) -> Result<(), JournalError>;

    /// The record at exactly `version` in a stream.
    async fn get_entity_version(&self, stored_entity_id: &str, version: i64) -> Result<EntityVersionRef, JournalError>;

    /// Records of one stream, filtered and ordered by `query`.
    async fn get_entity_events(&self, stored_entity_id: &str, query: &EventQuery) -> Result<Vec<StoredRecord>, JournalError>;
}

/// Turns a uniqueness violation on append into the matching journal error.
pub fn classify_violation(record: &StoredRecord, expected_version: Option<i64>, constraint: &str) -> JournalError {
    let create_attempt = expected_version.is_none() || record.aggregate_version == 0;
    if create_attempt {
        tracing::warn!(
            aggregate_id = %record.aggregate_id,
            aggregate_type = %record.aggregate_type,
            "Aggregate already exists"
        );
        JournalError::AlreadyExists {
            aggregate_type: record.aggregate_type.clone(),
            aggregate_id: record.aggregate_id.clone(),
        }
    } else {
        tracing::warn!(
            aggregate_id = %record.aggregate_id,
            aggregate_type = %record.aggregate_type,
            aggregate_version = record.aggregate_version,
            constraint,
            "Concurrent append conflict"
        );
        JournalError::ConcurrencyConflict {
            aggregate_type: record.aggregate_type.clone(),
            aggregate_id: record.aggregate_id.clone(),
            aggregate_version: record.aggregate_version,
            constraint: constraint.to_string(),
        }
    }
}

// ============================================================================
// Ranged Queries
// ============================================================================

/// Range query over one stream.
///
/// Rows are scanned in insertion order (ascending or descending). `after`
/// and `until` are event ids whose timestamps bound `create_date`; which
/// side is inclusive depends on the scan direction, so `after` always sits
/// nearer the edge the scan starts from:
///
/// | scan       | `after`  | `until`  |
/// |------------|----------|----------|
/// | ascending  | `>`      | `<=`     |
/// | descending | `>=`     | `<`      |
///
/// `limit` cuts the filtered scan. If `results_ascending` differs from
/// `query_ascending` the limited window is reversed before it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    pub after: Option<Uuid>,
    pub until: Option<Uuid>,
    pub limit: Option<usize>,
    pub query_ascending: bool,
    pub results_ascending: bool,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            after: None,
            until: None,
            limit: None,
            query_ascending: true,
            results_ascending: true,
        }
    }
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after(mut self, event_id: Uuid) -> Self {
        self.after = Some(event_id);
        self
    }

    pub fn until(mut self, event_id: Uuid) -> Self {
        self.until = Some(event_id);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn query_ascending(mut self, ascending: bool) -> Self {
        self.query_ascending = ascending;
        self
    }

    pub fn results_ascending(mut self, ascending: bool) -> Self {
        self.results_ascending = ascending;
        self
    }

    /// Converts `after`/`until` into `create_date` bounds.
    pub fn bounds(&self) -> Result<DateBounds, JournalError> {
        let to_bound = |event_id: Uuid, inclusive: bool| {
            timestamp_from_event_id(&event_id)
                .map(|at| DateBound { at, inclusive })
                .ok_or(JournalError::UntimedEventId(event_id))
        };

        Ok(DateBounds {
            lower: self
                .after
                .map(|id| to_bound(id, !self.query_ascending))
                .transpose()?,
            upper: self
                .until
                .map(|id| to_bound(id, self.query_ascending))
                .transpose()?,
        })
    }

    /// Applies the requested result order to an already limited scan.
    pub fn finish<T>(&self, mut rows: Vec<T>) -> Vec<T> {
        if self.results_ascending != self.query_ascending {
            rows.reverse();
        }
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBound {
    pub at: DateTime<Utc>,
    pub inclusive: bool,
}

impl DateBound {
    /// SQL comparison operator for this bound as a lower (`>`) or upper (`<`) limit.
    pub fn operator(&self, lower: bool) -> &'static str {
        match (lower, self.inclusive) {
            (true, false) => ">",
            (true, true) => ">=",
            (false, false) => "<",
            (false, true) => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateBounds {
    pub lower: Option<DateBound>,
    pub upper: Option<DateBound>,
}

impl DateBounds {
    pub fn admits(&self, create_date: DateTime<Utc>) -> bool {
        let above = self.lower.map_or(true, |bound| {
            if bound.inclusive {
                create_date >= bound.at
            } else {
                create_date > bound.at
            }
        });
        let below = self.upper.map_or(true, |bound| {
            if bound.inclusive {
                create_date <= bound.at
            } else {
                create_date < bound.at
            }
        });
        above && below
    }
}
