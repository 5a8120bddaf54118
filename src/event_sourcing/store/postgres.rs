use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

use crate::event_sourcing::core::{make_entity_version_id, EntityVersionRef, StoredRecord};
use crate::event_sourcing::error::JournalError;
use crate::event_sourcing::store::journal::{classify_violation, EventJournal, EventQuery, VERSION_CONSTRAINT};

// ============================================================================
// PostgreSQL Event Journal
// ============================================================================
//
// One table, `event_journal`. The serial `id` column records insertion order
// and is what ranged queries sort by; `create_date` only filters.
//
// ============================================================================

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS event_journal (
    id                BIGSERIAL PRIMARY KEY,
    event_id          UUID        NOT NULL,
    event_type        TEXT        NOT NULL,
    event_data        TEXT        NOT NULL,
    aggregate_id      TEXT        NOT NULL,
    aggregate_type    TEXT        NOT NULL,
    aggregate_version BIGINT      NOT NULL,
    create_date       TIMESTAMPTZ NOT NULL,
    metadata          TEXT,
    _module_name      TEXT        NOT NULL,
    _class_name       TEXT        NOT NULL,
    _stored_entity_id TEXT        NOT NULL,
    CONSTRAINT event_journal_aggregate_version_key
        UNIQUE (aggregate_id, aggregate_type, aggregate_version)
)
"#;

const CREATE_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS event_journal_stored_entity_id_idx ON event_journal (_stored_entity_id)",
    "CREATE INDEX IF NOT EXISTS event_journal_aggregate_id_idx ON event_journal (aggregate_id)",
    "CREATE INDEX IF NOT EXISTS event_journal_event_id_idx ON event_journal (event_id)",
];

const SELECT_COLUMNS: &str = "SELECT event_id, event_type, event_data, aggregate_id, aggregate_type, \
     aggregate_version, create_date, metadata, _module_name, _class_name, _stored_entity_id \
     FROM event_journal";

#[derive(Clone)]
pub struct PostgresEventJournal {
    pool: PgPool,
}

impl PostgresEventJournal {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the journal table and its indexes if they are missing.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        for statement in CREATE_INDEXES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Event journal schema ready");
        Ok(())
    }
}

#[async_trait]
impl EventJournal for PostgresEventJournal {
    #[tracing::instrument(
        skip(self, record),
        fields(stored_entity_id = %record.stored_entity_id, version = record.aggregate_version)
    )]
    async fn append(&self, record: &StoredRecord, expected_version: Option<i64>) -> Result<(), JournalError> {
        let result = sqlx::query(
            "INSERT INTO event_journal (
                event_id, event_type, event_data, aggregate_id, aggregate_type,
                aggregate_version, create_date, metadata, _module_name, _class_name,
                _stored_entity_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.event_id)
        .bind(&record.event_type)
        .bind(&record.event_data)
        .bind(&record.aggregate_id)
        .bind(&record.aggregate_type)
        .bind(record.aggregate_version)
        .bind(record.create_date)
        .bind(&record.metadata)
        .bind(&record.module_name)
        .bind(&record.class_name)
        .bind(&record.stored_entity_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(event_id = %record.event_id, "Appended event");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                let constraint = db.constraint().unwrap_or(VERSION_CONSTRAINT);
                Err(classify_violation(record, expected_version, constraint))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get_entity_version(&self, stored_entity_id: &str, version: i64) -> Result<EntityVersionRef, JournalError> {
        let row = sqlx::query(
            "SELECT event_id FROM event_journal
             WHERE _stored_entity_id = $1 AND aggregate_version = $2
             ORDER BY id ASC
             LIMIT 1",
        )
        .bind(stored_entity_id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(EntityVersionRef {
                entity_version_id: make_entity_version_id(stored_entity_id, version),
                event_id: row.try_get("event_id")?,
            }),
            None => Err(JournalError::EntityVersionNotFound {
                stored_entity_id: stored_entity_id.to_string(),
                version,
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get_entity_events(&self, stored_entity_id: &str, query: &EventQuery) -> Result<Vec<StoredRecord>, JournalError> {
        let bounds = query.bounds()?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_COLUMNS);
        builder.push(" WHERE _stored_entity_id = ").push_bind(stored_entity_id);
        if let Some(lower) = bounds.lower {
            builder
                .push(format!(" AND create_date {} ", lower.operator(true)))
                .push_bind(lower.at);
        }
        if let Some(upper) = bounds.upper {
            builder
                .push(format!(" AND create_date {} ", upper.operator(false)))
                .push_bind(upper.at);
        }
        builder.push(if query.query_ascending {
            " ORDER BY id ASC"
        } else {
            " ORDER BY id DESC"
        });
        if let Some(limit) = query.limit {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        tracing::debug!(count = records.len(), "Loaded events");
        Ok(query.finish(records))
    }
}

fn record_from_row(row: &PgRow) -> Result<StoredRecord, sqlx::Error> {
    Ok(StoredRecord {
        event_id: row.try_get("event_id")?,
        event_type: row.try_get("event_type")?,
        event_data: row.try_get("event_data")?,
        aggregate_id: row.try_get("aggregate_id")?,
        aggregate_type: row.try_get("aggregate_type")?,
        aggregate_version: row.try_get("aggregate_version")?,
        create_date: row.try_get("create_date")?,
        metadata: row.try_get("metadata")?,
        module_name: row.try_get("_module_name")?,
        class_name: row.try_get("_class_name")?,
        stored_entity_id: row.try_get("_stored_entity_id")?,
    })
}
