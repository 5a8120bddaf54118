// ============================================================================
// Event Sourcing Core - Records, Events and Their Registry
// ============================================================================
//
// Storage-independent building blocks shared by the journal, the transcoder
// and the schema resolver.
//
// ============================================================================

pub mod aggregate;
pub mod event;
pub mod record;
pub mod registry;

// Re-export core types for convenience
pub use aggregate::{Aggregate, AggregateDescriptor};
pub use event::{
    event_to_json, AnyDomainEvent, DomainEvent, Event, EventDescriptor, EventIdentity, EventKey,
    IDENTITY_FIELDS, SCHEMA_VERSION_FIELD,
};
pub use record::{
    make_entity_version_id, make_stored_entity_id, timestamp_from_event_id, EntityVersionRef,
    StoredRecord, VersionKey, STREAM_SEPARATOR,
};
pub use registry::{EventFactory, EventRegistry, RegisteredEvent};
