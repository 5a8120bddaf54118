use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use super::document::EventSchema;
use super::naming::schema_path;
use crate::event_sourcing::core::{event_to_json, AnyDomainEvent, DomainEvent, Event, EventDescriptor, EventKey, EventRegistry};
use crate::event_sourcing::error::SchemaError;

// ============================================================================
// Schema Registry - Version Resolution, Loading and Validation
// ============================================================================
//
// Schemas are loaded once at startup and served from an immutable snapshot;
// a reload swaps the whole snapshot so readers never see a half-filled map.
// Resolved versions are cached per event type for the process lifetime and
// can be forgotten explicitly to force re-resolution.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSettings {
    /// Root directory holding one sub-directory per aggregate.
    pub schema_dir: PathBuf,
    /// Validate events against their schema before appending.
    pub validation_enabled: bool,
    /// Store the event's schema version inside its payload.
    pub adds_schema_version_to_event_data: bool,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("schemas"),
            validation_enabled: false,
            adds_schema_version_to_event_data: false,
        }
    }
}

pub type SchemaSnapshot = Arc<HashMap<EventKey, Arc<EventSchema>>>;

/// Highest `vN` schema file present for an event, probing from 1 upwards and
/// stopping at the first missing version. Defaults to 1 when none exist.
pub fn resolve_version_in(root: &Path, aggregate_type: &str, event_type: &str) -> u32 {
    let mut resolved = 1;
    for version in 1.. {
        if !schema_path(root, aggregate_type, event_type, version).is_file() {
            break;
        }
        resolved = version;
    }
    resolved
}

pub struct SchemaRegistry {
    settings: SchemaSettings,
    events: Arc<EventRegistry>,
    versions: RwLock<HashMap<EventKey, u32>>,
    schemas: RwLock<SchemaSnapshot>,
}

impl SchemaRegistry {
    pub fn new(settings: SchemaSettings, events: Arc<EventRegistry>) -> Self {
        Self {
            settings,
            events,
            versions: RwLock::new(HashMap::new()),
            schemas: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    pub fn settings(&self) -> &SchemaSettings {
        &self.settings
    }

    pub fn event_registry(&self) -> &Arc<EventRegistry> {
        &self.events
    }

    /// Schema version of an event type: its explicit tag if it has one,
    /// otherwise the highest version found on disk.
    pub fn resolve_version(&self, descriptor: &EventDescriptor) -> u32 {
        if let Some(version) = descriptor.schema_version {
            return version;
        }

        let key = descriptor.key();
        if let Some(version) = self.read_versions().get(&key) {
            return *version;
        }

        let version = resolve_version_in(
            &self.settings.schema_dir,
            descriptor.aggregate_type(),
            descriptor.event_type(),
        );
        tracing::debug!(event = %key, version, "Resolved event schema version");

        *self
            .versions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(version)
    }

    /// Current schema version for `E`.
    pub fn current_version<E: DomainEvent>(&self) -> u32 {
        self.resolve_version(&E::DESCRIPTOR)
    }

    /// Drops the cached version so the next lookup looks on disk again.
    pub fn forget_version(&self, descriptor: &EventDescriptor) {
        self.versions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&descriptor.key());
    }

    pub fn clear_versions(&self) {
        self.versions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn schema_path(&self, descriptor: &EventDescriptor) -> PathBuf {
        schema_path(
            &self.settings.schema_dir,
            descriptor.aggregate_type(),
            descriptor.event_type(),
            self.resolve_version(descriptor),
        )
    }

    /// Reads and parses the schema file of one event type.
    pub fn load_event_schema(&self, descriptor: &EventDescriptor) -> Result<EventSchema, SchemaError> {
        let path = self.schema_path(descriptor);
        let event = descriptor.qualified_name.to_string();

        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SchemaError::NotFound { event, path });
            }
            Err(source) => return Err(SchemaError::Io { event, path, source }),
        };

        EventSchema::parse(&body).map_err(|e| SchemaError::Parse {
            event,
            path,
            reason: e.to_string(),
        })
    }

    /// Loads the schema of every concrete, mutating event of every concrete
    /// aggregate. Failures are collected and reported together once the
    /// whole scan is done; schemas that did load are still cached.
    pub fn load_all_schemas(&self) -> Result<SchemaSnapshot, SchemaError> {
        let mut loaded = HashMap::new();
        let mut errors = Vec::new();

        for aggregate in self.events.concrete_aggregates() {
            for descriptor in self.events.aggregate_events(aggregate) {
                match self.load_event_schema(&descriptor) {
                    Ok(schema) => {
                        tracing::debug!(
                            event = %descriptor.key(),
                            title = schema.title().unwrap_or_default(),
                            "Loaded event schema"
                        );
                        loaded.insert(descriptor.key(), Arc::new(schema));
                    }
                    Err(e) => errors.push(e),
                }
            }
        }

        let snapshot = Arc::new(loaded);
        *self.schemas.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);

        if errors.is_empty() {
            tracing::info!(schemas = snapshot.len(), "Loaded all event schemas");
            Ok(snapshot)
        } else {
            Err(SchemaError::Aggregated(errors))
        }
    }

    /// Current snapshot of loaded schemas.
    pub fn loaded_schemas(&self) -> SchemaSnapshot {
        Arc::clone(&self.schemas.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn schema_for(&self, descriptor: &EventDescriptor) -> Result<Arc<EventSchema>, SchemaError> {
        self.loaded_schemas()
            .get(&descriptor.key())
            .cloned()
            .ok_or_else(|| SchemaError::NotCached(descriptor.key().to_string()))
    }

    /// Replaces the cached schema of one event type.
    pub fn cache_schema(&self, descriptor: &EventDescriptor, schema: EventSchema) {
        let mut guard = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = HashMap::clone(&guard);
        next.insert(descriptor.key(), Arc::new(schema));
        *guard = Arc::new(next);
    }

    /// Checks every field of `event` against `schema`, or against the cached
    /// schema of its type when none is given.
    pub fn validate(&self, event: &dyn AnyDomainEvent, schema: Option<&EventSchema>) -> Result<bool, SchemaError> {
        let descriptor = event.descriptor();
        let datum = event_to_json(event).map_err(|source| SchemaError::Encoding {
            event: descriptor.qualified_name.to_string(),
            source,
        })?;
        let datum = Value::Object(datum);

        match schema {
            Some(schema) => Ok(schema.validate(&datum)),
            None => Ok(self.schema_for(&descriptor)?.validate(&datum)),
        }
    }

    /// Like [`validate`](Self::validate) against the cached schema, but a
    /// mismatch is an error.
    pub fn ensure_valid(&self, event: &dyn AnyDomainEvent) -> Result<(), SchemaError> {
        if self.validate(event, None)? {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailure {
                event: event.descriptor().qualified_name.to_string(),
            })
        }
    }

    /// Attaches the current schema version to a new event when payload
    /// versioning is enabled and the event does not carry one yet.
    pub fn stamp<E: DomainEvent>(&self, mut event: Event<E>) -> Event<E> {
        if self.settings.adds_schema_version_to_event_data && event.schema_version.is_none() {
            event.schema_version = Some(self.current_version::<E>());
        }
        event
    }

    fn read_versions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<EventKey, u32>> {
        self.versions.read().unwrap_or_else(PoisonError::into_inner)
    }
}
