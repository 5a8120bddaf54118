use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use event_journal::config::JournalConfig;
use event_journal::domain::{
    self,
    project::{Project, ProjectClosed, ProjectCreated, ProjectRenamed},
};
use event_journal::event_sourcing::{
    Event, EventQuery, EventStore, JournalError, PostgresEventJournal, SchemaRegistry, StoreError,
};
use event_journal::metrics::JournalMetrics;
use event_journal::utils::{retry_on_transient, RetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,event_journal=debug")),
        )
        .init();

    tracing::info!("🚀 Starting event journal demo");

    // === 1. Configuration and event schemas ===
    let config = JournalConfig::from_env()?;
    let schemas = Arc::new(SchemaRegistry::new(
        config.schemas.clone(),
        Arc::new(domain::event_registry()),
    ));

    match schemas.load_all_schemas() {
        Ok(loaded) => {
            let mut detected: Vec<String> = loaded.keys().map(ToString::to_string).collect();
            detected.sort();
            tracing::info!(count = detected.len(), events = ?detected, "📋 Detected event schemas");
        }
        Err(e) => {
            for failure in e.failures() {
                tracing::error!(error = %failure, "Event schema check failed");
            }
            tracing::warn!(
                schema_dir = %config.schemas.schema_dir.display(),
                "Some event schemas are missing or invalid"
            );
        }
    }

    // === 2. Connect to PostgreSQL ===
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set")?;

    tracing::info!("Connecting to PostgreSQL...");
    let pool = retry_on_transient(&RetryConfig::startup(), |_attempt| {
        PgPoolOptions::new().max_connections(5).connect(&database_url)
    })
    .await?;

    let journal = PostgresEventJournal::new(pool);
    journal.migrate().await?;

    // === 3. Store with metrics ===
    let metrics = Arc::new(JournalMetrics::new()?);
    let store = EventStore::new(Arc::new(journal), Arc::clone(&schemas)).with_metrics(Arc::clone(&metrics));

    // === 4. Project lifecycle ===
    let project_id = uuid::Uuid::now_v7().to_string();
    let stream = EventStore::stream_id_for::<ProjectCreated>(&project_id);

    let created = schemas.stamp(Event::new(
        project_id.as_str(),
        0,
        ProjectCreated {
            name: "Awesome Project".into(),
            owner: Some("ada".into()),
        },
    ));
    store.append(&created, None).await?;
    tracing::info!(project_id = %project_id, "✅ Project created");

    // A second creation with the same id must be rejected.
    match store.append(&created, None).await {
        Err(StoreError::Journal(JournalError::AlreadyExists { .. })) => {
            tracing::info!("Duplicate creation rejected as expected");
        }
        Ok(_) => anyhow::bail!("duplicate creation was accepted"),
        Err(e) => return Err(e.into()),
    }

    let renamed = schemas.stamp(Event::new(
        project_id.as_str(),
        1,
        ProjectRenamed {
            name: "Even More Awesome Project".into(),
        },
    ));
    store.append(&renamed, Some(0)).await?;

    let closed = schemas.stamp(Event::new(
        project_id.as_str(),
        2,
        ProjectClosed {
            reason: Some("demo finished".into()),
        },
    ));
    store.append(&closed, Some(1)).await?;

    // === 5. Read it back ===
    let events = store.load_stream(&stream).await?;
    if let Some(project) = Project::replay(&events)? {
        tracing::info!(
            name = %project.name,
            version = project.version,
            closed = project.closed,
            "📖 Rebuilt project from {} events",
            events.len()
        );
    }

    let newest = store
        .load_events(&stream, &EventQuery::new().limit(2).query_ascending(false))
        .await?;
    for event in &newest {
        tracing::info!(
            event_type = event.descriptor().event_type(),
            version = event.entity_version(),
            "Recent event"
        );
    }

    let version = store.entity_version(&stream, 1).await?;
    tracing::info!(entity_version_id = %version.entity_version_id, event_id = %version.event_id, "Version lookup");

    println!("{}", metrics.render()?);

    tracing::info!("🎉 Demo complete!");
    Ok(())
}
