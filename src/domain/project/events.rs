use serde::{Deserialize, Serialize};

use crate::event_sourcing::core::{DomainEvent, EventDescriptor};

// ============================================================================
// Project Events
// ============================================================================

/// First event of every project stream.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectCreated {
    pub name: String,
    pub owner: Option<String>,
}

impl DomainEvent for ProjectCreated {
    const DESCRIPTOR: EventDescriptor = EventDescriptor::new(module_path!(), "Project.Created");
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectRenamed {
    pub name: String,
}

impl DomainEvent for ProjectRenamed {
    const DESCRIPTOR: EventDescriptor = EventDescriptor::new(module_path!(), "Project.Renamed");
}

/// Marks the end of the project.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectClosed {
    pub reason: Option<String>,
}

impl DomainEvent for ProjectClosed {
    const DESCRIPTOR: EventDescriptor = EventDescriptor::new(module_path!(), "Project.Closed");
}

/// Informational only: the project state does not change, so the event has
/// no schema and is skipped when schemas are preloaded.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProjectNoteAdded {
    pub note: String,
}

impl DomainEvent for ProjectNoteAdded {
    const DESCRIPTOR: EventDescriptor =
        EventDescriptor::new(module_path!(), "Project.NoteAdded").without_mutation();
}
