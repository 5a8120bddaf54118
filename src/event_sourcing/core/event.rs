use std::any::Any;
use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ============================================================================
// Domain Events - Typed Events With Their Identity
// ============================================================================
//
// An event is a payload type (the fields the aggregate cares about) wrapped
// in `Event<E>`, which carries the identity every event shares: its own id,
// the aggregate instance it belongs to and the revision it produces.
//
// ============================================================================

/// Identity fields stripped from a payload before it is stored.
pub const IDENTITY_FIELDS: [&str; 4] = ["domain_event_id", "entity_id", "entity_version", "metadata"];

/// Payload key used when schema versions are injected into event data.
pub const SCHEMA_VERSION_FIELD: &str = "schema_version";

/// Static description of one event type.
///
/// `qualified_name` follows the `Aggregate.Event` convention: the first
/// segment names the owning aggregate, the last one the event itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventDescriptor {
    pub module_name: &'static str,
    pub qualified_name: &'static str,
    /// Explicit schema version tag. When absent the version is resolved from
    /// the schema files on disk.
    pub schema_version: Option<u32>,
    /// Not inherited: each event type opts in on its own.
    pub is_abstract: bool,
    /// Whether the aggregate has mutation logic for this event.
    pub mutates: bool,
}

impl EventDescriptor {
    pub const fn new(module_name: &'static str, qualified_name: &'static str) -> Self {
        Self {
            module_name,
            qualified_name,
            schema_version: None,
            is_abstract: false,
            mutates: true,
        }
    }

    pub const fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = Some(version);
        self
    }

    pub const fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub const fn without_mutation(mut self) -> Self {
        self.mutates = false;
        self
    }

    /// Name of the enclosing aggregate type.
    pub fn aggregate_type(&self) -> &'static str {
        self.qualified_name
            .split('.')
            .next()
            .unwrap_or(self.qualified_name)
    }

    /// Short name of the event type.
    pub fn event_type(&self) -> &'static str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(self.qualified_name)
    }

    /// Stable registry key: `(module_name, qualified_name)`.
    pub fn key(&self) -> EventKey {
        EventKey {
            module_name: self.module_name,
            qualified_name: self.qualified_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub module_name: &'static str,
    pub qualified_name: &'static str,
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.module_name, self.qualified_name)
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

/// Implemented by every event payload type.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    const DESCRIPTOR: EventDescriptor;

    fn event_type() -> &'static str
    where
        Self: Sized,
    {
        Self::DESCRIPTOR.event_type()
    }
}

/// Identity shared by all events, used when rebuilding an event from a record.
#[derive(Debug, Clone, PartialEq)]
pub struct EventIdentity {
    pub domain_event_id: Uuid,
    pub entity_id: String,
    pub entity_version: i64,
    pub schema_version: Option<u32>,
}

/// A domain event together with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub domain_event_id: Uuid,
    pub entity_id: String,
    /// Revision the aggregate reaches after this event, 0 for creation.
    pub entity_version: i64,
    /// Write-only side channel, never restored on read.
    pub metadata: Option<Value>,
    pub schema_version: Option<u32>,
    pub data: E,
}

impl<E> Event<E> {
    /// Creates an event with a fresh time-ordered id.
    pub fn new(entity_id: impl Into<String>, entity_version: i64, data: E) -> Self {
        Self {
            domain_event_id: Uuid::now_v7(),
            entity_id: entity_id.into(),
            entity_version,
            metadata: None,
            schema_version: None,
            data,
        }
    }

    pub fn from_identity(identity: EventIdentity, data: E) -> Self {
        Self {
            domain_event_id: identity.domain_event_id,
            entity_id: identity.entity_id,
            entity_version: identity.entity_version,
            metadata: None,
            schema_version: identity.schema_version,
            data,
        }
    }

    pub fn with_event_id(mut self, domain_event_id: Uuid) -> Self {
        self.domain_event_id = domain_event_id;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = Some(version);
        self
    }
}

// ============================================================================
// Type-Erased Events
// ============================================================================

/// Object-safe view of an `Event<E>`, used where the concrete event type is
/// only known at runtime (reading back from the journal).
pub trait AnyDomainEvent: Debug + Send + Sync {
    fn descriptor(&self) -> EventDescriptor;
    fn domain_event_id(&self) -> Uuid;
    fn entity_id(&self) -> &str;
    fn entity_version(&self) -> i64;
    fn metadata(&self) -> Option<&Value>;
    fn schema_version(&self) -> Option<u32>;
    /// The payload fields as a JSON object.
    fn payload(&self) -> Result<Map<String, Value>, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<E: DomainEvent> AnyDomainEvent for Event<E> {
    fn descriptor(&self) -> EventDescriptor {
        E::DESCRIPTOR
    }

    fn domain_event_id(&self) -> Uuid {
        self.domain_event_id
    }

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_version(&self) -> i64 {
        self.entity_version
    }

    fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    fn schema_version(&self) -> Option<u32> {
        self.schema_version
    }

    fn payload(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(&self.data)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(serde::ser::Error::custom(format!(
                "event payload must serialize to an object, got {other}"
            ))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<'a> dyn AnyDomainEvent + 'a {
    pub fn is<E: DomainEvent>(&self) -> bool {
        self.as_any().is::<Event<E>>()
    }

    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&Event<E>> {
        self.as_any().downcast_ref::<Event<E>>()
    }

    pub fn downcast<E: DomainEvent>(self: Box<Self>) -> Option<Event<E>> {
        self.into_any().downcast::<Event<E>>().ok().map(|event| *event)
    }
}

/// Every field of an event as one JSON object: payload plus identity.
///
/// Used for schema validation, which checks the full field set.
pub fn event_to_json(event: &dyn AnyDomainEvent) -> Result<Map<String, Value>, serde_json::Error> {
    let mut fields = event.payload()?;
    fields.insert(
        "domain_event_id".to_string(),
        Value::String(event.domain_event_id().to_string()),
    );
    fields.insert("entity_id".to_string(), Value::String(event.entity_id().to_string()));
    fields.insert("entity_version".to_string(), Value::from(event.entity_version()));
    if let Some(metadata) = event.metadata() {
        fields.insert("metadata".to_string(), metadata.clone());
    }
    if let Some(version) = event.schema_version() {
        fields.insert(SCHEMA_VERSION_FIELD.to_string(), Value::from(version));
    }
    Ok(fields)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct TestCreated {
        name: String,
    }

    impl DomainEvent for TestCreated {
        const DESCRIPTOR: EventDescriptor = EventDescriptor::new(module_path!(), "TestAggregate.Created");
    }

    #[test]
    fn test_descriptor_splits_qualified_name() {
        let descriptor = TestCreated::DESCRIPTOR;
        assert_eq!(descriptor.aggregate_type(), "TestAggregate");
        assert_eq!(descriptor.event_type(), "Created");
        assert_eq!(TestCreated::event_type(), "Created");
        assert!(descriptor.mutates);
        assert!(!descriptor.is_abstract);
    }

    #[test]
    fn test_new_event_has_time_ordered_id() {
        let event = Event::new("a-1", 0, TestCreated { name: "x".into() });
        assert_eq!(event.domain_event_id.get_version_num(), 7);
        assert!(event.domain_event_id.get_timestamp().is_some());
    }

    #[test]
    fn test_downcast_recovers_concrete_event() {
        let event = Event::new("a-1", 0, TestCreated { name: "x".into() });
        let erased: Box<dyn AnyDomainEvent> = Box::new(event.clone());

        assert!(erased.is::<TestCreated>());
        assert_eq!(erased.downcast_ref::<TestCreated>(), Some(&event));
        assert_eq!(erased.downcast::<TestCreated>(), Some(event));
    }

    #[test]
    fn test_event_to_json_includes_identity() {
        let event = Event::new("a-1", 3, TestCreated { name: "x".into() })
            .with_metadata(serde_json::json!({"correlation_id": "c"}));
        let fields = event_to_json(&event).unwrap();

        assert_eq!(fields["name"], "x");
        assert_eq!(fields["entity_id"], "a-1");
        assert_eq!(fields["entity_version"], 3);
        assert_eq!(fields["domain_event_id"], event.domain_event_id.to_string());
        assert_eq!(fields["metadata"]["correlation_id"], "c");
        assert!(!fields.contains_key(SCHEMA_VERSION_FIELD));
    }
}
