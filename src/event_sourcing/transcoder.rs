use std::sync::Arc;

use serde_json::{Map, Value};

use crate::event_sourcing::core::{
    make_stored_entity_id, timestamp_from_event_id, AnyDomainEvent, DomainEvent, Event, EventIdentity,
    EventRegistry, StoredRecord, IDENTITY_FIELDS, SCHEMA_VERSION_FIELD,
};
use crate::event_sourcing::error::TranscodeError;
use crate::event_sourcing::schema::SchemaRegistry;

// ============================================================================
// Transcoder - Domain Events <-> Stored Records
// ============================================================================
//
// Payloads are encoded as compact JSON with sorted keys, so the same logical
// event always produces byte-identical `event_data`. Metadata is written but
// never read back.
//
// ============================================================================

#[derive(Clone)]
pub struct Transcoder {
    schemas: Arc<SchemaRegistry>,
}

impl Transcoder {
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        Self { schemas }
    }

    fn events(&self) -> &EventRegistry {
        self.schemas.event_registry()
    }

    fn adds_schema_version(&self) -> bool {
        self.schemas.settings().adds_schema_version_to_event_data
    }

    /// Converts an event into the record stored in the journal.
    pub fn serialize(&self, event: &dyn AnyDomainEvent) -> Result<StoredRecord, TranscodeError> {
        let descriptor = event.descriptor();

        let mut payload = event.payload()?;
        for field in IDENTITY_FIELDS {
            payload.remove(field);
        }

        if self.adds_schema_version() && !payload.contains_key(SCHEMA_VERSION_FIELD) {
            let version = event
                .schema_version()
                .unwrap_or_else(|| self.schemas.resolve_version(&descriptor));
            payload.insert(SCHEMA_VERSION_FIELD.to_string(), Value::from(version));
        }

        let event_id = event.domain_event_id();
        let create_date =
            timestamp_from_event_id(&event_id).ok_or(TranscodeError::UntimedEventId(event_id))?;
        let aggregate_type = descriptor.aggregate_type();

        Ok(StoredRecord {
            event_id,
            event_type: descriptor.event_type().to_string(),
            event_data: encode(&Value::Object(payload))?,
            aggregate_id: event.entity_id().to_string(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_version: event.entity_version(),
            create_date,
            metadata: event.metadata().map(encode).transpose()?,
            module_name: descriptor.module_name.to_string(),
            class_name: descriptor.qualified_name.to_string(),
            stored_entity_id: make_stored_entity_id(aggregate_type, event.entity_id()),
        })
    }

    /// Rebuilds the event a record was created from. Metadata is not restored.
    pub fn deserialize(&self, record: &StoredRecord) -> Result<Box<dyn AnyDomainEvent>, TranscodeError> {
        let registered = self
            .events()
            .resolve(&record.module_name, &record.class_name)?;

        let mut payload = match serde_json::from_str::<Value>(&record.event_data)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(TranscodeError::PayloadNotObject {
                    class_name: record.class_name.clone(),
                })
            }
        };

        let schema_version = if self.adds_schema_version() {
            payload
                .remove(SCHEMA_VERSION_FIELD)
                .and_then(|version| version.as_u64())
                .and_then(|version| u32::try_from(version).ok())
        } else {
            None
        };

        let identity = EventIdentity {
            domain_event_id: record.event_id,
            entity_id: record.aggregate_id.clone(),
            entity_version: record.aggregate_version,
            schema_version,
        };

        registered
            .build(identity, payload)
            .map_err(|source| TranscodeError::Construction {
                class_name: record.class_name.clone(),
                data: record.event_data.clone(),
                source,
            })
    }

    /// Deserializes a record that is expected to hold an `E`.
    pub fn deserialize_as<E: DomainEvent>(&self, record: &StoredRecord) -> Result<Event<E>, TranscodeError> {
        self.deserialize(record)?
            .downcast::<E>()
            .ok_or_else(|| TranscodeError::ResolveDomainFailed {
                module_name: record.module_name.clone(),
                class_name: record.class_name.clone(),
                reason: format!("record does not hold a {}", E::DESCRIPTOR.qualified_name),
            })
    }
}

/// Compact JSON with object keys sorted at every level.
fn encode(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&canonical(value))
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonical(value)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(values.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
