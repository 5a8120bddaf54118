use crate::event_sourcing::core::{Aggregate, AggregateDescriptor, AnyDomainEvent};

use super::events::{ProjectClosed, ProjectCreated, ProjectNoteAdded, ProjectRenamed};

// ============================================================================
// Project Aggregate - State Rebuilt From Its Stream
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub owner: Option<String>,
    pub closed: bool,
    /// Version of the last applied event.
    pub version: i64,
}

impl Aggregate for Project {
    const DESCRIPTOR: AggregateDescriptor = AggregateDescriptor::new("Project");
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProjectError {
    #[error("Stream does not start with a Created event")]
    NotCreated,

    #[error("Project {0} is closed")]
    Closed(String),

    #[error("Event {0} does not belong to a project")]
    UnknownEvent(&'static str),
}

impl Project {
    /// Folds a stream, oldest event first. `None` for an empty stream.
    pub fn replay(events: &[Box<dyn AnyDomainEvent>]) -> Result<Option<Self>, ProjectError> {
        let Some((first, rest)) = events.split_first() else {
            return Ok(None);
        };

        let created = first
            .downcast_ref::<ProjectCreated>()
            .ok_or(ProjectError::NotCreated)?;
        let mut project = Project {
            id: created.entity_id.clone(),
            name: created.data.name.clone(),
            owner: created.data.owner.clone(),
            closed: false,
            version: created.entity_version,
        };

        for event in rest {
            project.apply(event.as_ref())?;
        }
        Ok(Some(project))
    }

    pub fn apply(&mut self, event: &dyn AnyDomainEvent) -> Result<(), ProjectError> {
        if self.closed {
            return Err(ProjectError::Closed(self.id.clone()));
        }

        if let Some(renamed) = event.downcast_ref::<ProjectRenamed>() {
            self.name = renamed.data.name.clone();
        } else if event.is::<ProjectClosed>() {
            self.closed = true;
        } else if !event.is::<ProjectNoteAdded>() {
            return Err(ProjectError::UnknownEvent(event.descriptor().qualified_name));
        }

        self.version = event.entity_version();
        Ok(())
    }

    /// Version the next event of this project must carry.
    pub fn next_version(&self) -> i64 {
        self.version + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::core::Event;

    fn stream() -> Vec<Box<dyn AnyDomainEvent>> {
        vec![
            Box::new(Event::new(
                "p-1",
                0,
                ProjectCreated {
                    name: "Awesome Project".into(),
                    owner: Some("ada".into()),
                },
            )),
            Box::new(Event::new("p-1", 1, ProjectRenamed { name: "Renamed".into() })),
        ]
    }

    #[test]
    fn test_replay_builds_state() {
        let project = Project::replay(&stream()).unwrap().unwrap();
        assert_eq!(project.name, "Renamed");
        assert_eq!(project.owner.as_deref(), Some("ada"));
        assert_eq!(project.version, 1);
        assert_eq!(project.next_version(), 2);
        assert!(!project.closed);
    }

    #[test]
    fn test_replay_empty_stream() {
        assert_eq!(Project::replay(&[]).unwrap(), None);
    }

    #[test]
    fn test_replay_requires_created_first() {
        let mut events = stream();
        events.remove(0);
        assert_eq!(Project::replay(&events), Err(ProjectError::NotCreated));
    }

    #[test]
    fn test_notes_only_advance_the_version() {
        let mut events = stream();
        events.push(Box::new(Event::new("p-1", 2, ProjectNoteAdded { note: "fyi".into() })));

        let project = Project::replay(&events).unwrap().unwrap();
        assert_eq!(project.name, "Renamed");
        assert_eq!(project.version, 2);
    }

    #[test]
    fn test_closed_project_rejects_events() {
        let mut events = stream();
        events.push(Box::new(Event::new("p-1", 2, ProjectClosed { reason: None })));
        events.push(Box::new(Event::new("p-1", 3, ProjectRenamed { name: "late".into() })));
        assert_eq!(Project::replay(&events), Err(ProjectError::Closed("p-1".into())));
    }
}
