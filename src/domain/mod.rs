// ============================================================================
// Domain Layer - Sample Aggregates
// ============================================================================
//
// Each aggregate has its own subdirectory with its events and the state
// built from them. This layer only depends on the event sourcing core.
//
// ============================================================================

pub mod project;

use crate::event_sourcing::core::EventRegistry;

/// Registry holding every event type of every aggregate in this crate.
pub fn event_registry() -> EventRegistry {
    let mut registry = EventRegistry::new();
    project::register(&mut registry);
    registry
}
