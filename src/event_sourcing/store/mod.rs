// ============================================================================
// Event Sourcing Store - Journal Backends and the Store Facade
// ============================================================================
//
// `EventJournal` is the storage contract. `PostgresEventJournal` is the
// durable backend, `InMemoryEventJournal` backs tests and embedded use.
// `EventStore` sits on top and speaks in domain events.
//
// ============================================================================

pub mod event_store;
pub mod journal;
pub mod memory;
pub mod postgres;

pub use event_store::EventStore;
pub use journal::{classify_violation, DateBound, DateBounds, EventJournal, EventQuery, VERSION_CONSTRAINT};
pub use memory::InMemoryEventJournal;
pub use postgres::PostgresEventJournal;
