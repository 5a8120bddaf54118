// ============================================================================
// Project Domain
// ============================================================================

pub mod aggregate;
pub mod events;

pub use aggregate::*;
pub use events::*;

use crate::event_sourcing::core::EventRegistry;

pub fn register(registry: &mut EventRegistry) {
    registry
        .register_aggregate::<Project>()
        .register_event::<ProjectCreated>()
        .register_event::<ProjectRenamed>()
        .register_event::<ProjectClosed>()
        .register_event::<ProjectNoteAdded>();
}
