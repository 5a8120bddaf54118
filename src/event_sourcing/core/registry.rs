use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::aggregate::{Aggregate, AggregateDescriptor};
use super::event::{AnyDomainEvent, DomainEvent, Event, EventDescriptor, EventIdentity, EventKey};
use crate::event_sourcing::error::TranscodeError;

// ============================================================================
// Event Registry - Explicit Mapping From Stored Locators To Event Types
// ============================================================================
//
// Populated once at startup. Stored records carry `(module_name, class_name)`;
// the registry turns that pair back into a constructor without any dynamic
// symbol lookup. Unknown locators surface as `ResolveDomainFailed`.
//
// ============================================================================

/// Builds an event from its identity and decoded payload.
pub type EventFactory =
    fn(EventIdentity, Map<String, Value>) -> Result<Box<dyn AnyDomainEvent>, serde_json::Error>;

#[derive(Debug, Clone, Copy)]
pub struct RegisteredEvent {
    pub descriptor: EventDescriptor,
    factory: EventFactory,
}

impl RegisteredEvent {
    pub fn build(
        &self,
        identity: EventIdentity,
        payload: Map<String, Value>,
    ) -> Result<Box<dyn AnyDomainEvent>, serde_json::Error> {
        (self.factory)(identity, payload)
    }
}

fn build_event<E: DomainEvent>(
    identity: EventIdentity,
    payload: Map<String, Value>,
) -> Result<Box<dyn AnyDomainEvent>, serde_json::Error> {
    let data: E = serde_json::from_value(Value::Object(payload))?;
    Ok(Box::new(Event::from_identity(identity, data)))
}

#[derive(Debug, Default)]
pub struct EventRegistry {
    aggregates: BTreeMap<&'static str, AggregateDescriptor>,
    events: BTreeMap<EventKey, RegisteredEvent>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_aggregate<A: Aggregate>(&mut self) -> &mut Self {
        self.aggregates.insert(A::DESCRIPTOR.name, A::DESCRIPTOR);
        self
    }

    /// Registers an event type. Its aggregate is registered as concrete if it
    /// was not declared beforehand.
    pub fn register_event<E: DomainEvent>(&mut self) -> &mut Self {
        let descriptor = E::DESCRIPTOR;
        self.aggregates
            .entry(descriptor.aggregate_type())
            .or_insert_with(|| AggregateDescriptor::new(descriptor.aggregate_type()));

        let previous = self.events.insert(
            descriptor.key(),
            RegisteredEvent {
                descriptor,
                factory: build_event::<E>,
            },
        );
        if previous.is_some() {
            tracing::warn!(event = %descriptor.key(), "Event type registered twice, keeping the latest");
        }
        self
    }

    /// Looks up the event type a stored record points at.
    pub fn resolve(&self, module_name: &str, class_name: &str) -> Result<&RegisteredEvent, TranscodeError> {
        let failed = |reason: &str| TranscodeError::ResolveDomainFailed {
            module_name: module_name.to_string(),
            class_name: class_name.to_string(),
            reason: reason.to_string(),
        };

        let mut in_module = self
            .events
            .iter()
            .filter(|(key, _)| key.module_name == module_name)
            .peekable();
        if in_module.peek().is_none() {
            return Err(failed("no event types registered for module"));
        }

        let registered = in_module
            .find(|(key, _)| key.qualified_name == class_name)
            .map(|(_, registered)| registered)
            .ok_or_else(|| failed("module has no event type with this name"))?;

        if registered.descriptor.is_abstract {
            return Err(failed("abstract event types cannot be instantiated"));
        }

        Ok(registered)
    }

    pub fn aggregate(&self, name: &str) -> Option<&AggregateDescriptor> {
        self.aggregates.get(name)
    }

    /// Aggregates not marked abstract.
    pub fn concrete_aggregates(&self) -> impl Iterator<Item = &AggregateDescriptor> {
        self.aggregates.values().filter(|aggregate| !aggregate.is_abstract)
    }

    /// Concrete events of an aggregate that have mutation logic.
    pub fn aggregate_events<'a>(
        &'a self,
        aggregate: &'a AggregateDescriptor,
    ) -> impl Iterator<Item = EventDescriptor> + 'a {
        self.events
            .values()
            .map(|registered| registered.descriptor)
            .filter(move |descriptor| {
                descriptor.aggregate_type() == aggregate.name
                    && descriptor.mutates
                    && !descriptor.is_abstract
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    struct Asset;

    impl Aggregate for Asset {
        const DESCRIPTOR: AggregateDescriptor = AggregateDescriptor::new("Asset");
    }

    struct Template;

    impl Aggregate for Template {
        const DESCRIPTOR: AggregateDescriptor = AggregateDescriptor::abstract_type("Template");
    }

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct AssetCreated {
        name: String,
    }

    impl DomainEvent for AssetCreated {
        const DESCRIPTOR: EventDescriptor = EventDescriptor::new(module_path!(), "Asset.Created");
    }

    #[derive(Serialize, Deserialize, Clone, Debug)]
    struct AssetClosed {}

    impl DomainEvent for AssetClosed {
        const DESCRIPTOR: EventDescriptor =
            EventDescriptor::new(module_path!(), "Asset.Closed").without_mutation();
    }

    #[derive(Serialize, Deserialize, Clone, Debug)]
    struct AssetEvent {}

    impl DomainEvent for AssetEvent {
        const DESCRIPTOR: EventDescriptor =
            EventDescriptor::new(module_path!(), "Asset.Event").abstract_type();
    }

    #[derive(Serialize, Deserialize, Clone, Debug)]
    struct TemplateCreated {}

    impl DomainEvent for TemplateCreated {
        const DESCRIPTOR: EventDescriptor = EventDescriptor::new(module_path!(), "Template.Created");
    }

    fn registry() -> EventRegistry {
        let mut registry = EventRegistry::new();
        registry
            .register_aggregate::<Asset>()
            .register_aggregate::<Template>()
            .register_event::<AssetCreated>()
            .register_event::<AssetClosed>()
            .register_event::<AssetEvent>()
            .register_event::<TemplateCreated>();
        registry
    }

    fn identity() -> EventIdentity {
        EventIdentity {
            domain_event_id: Uuid::now_v7(),
            entity_id: "asset-1".into(),
            entity_version: 0,
            schema_version: None,
        }
    }

    #[test]
    fn test_resolve_builds_registered_event() {
        let registry = registry();
        let registered = registry.resolve(module_path!(), "Asset.Created").unwrap();

        let mut payload = Map::new();
        payload.insert("name".into(), Value::String("laptop".into()));
        let event = registered.build(identity(), payload).unwrap();

        let created = event.downcast_ref::<AssetCreated>().unwrap();
        assert_eq!(created.data.name, "laptop");
        assert_eq!(created.entity_id, "asset-1");
    }

    #[test]
    fn test_resolve_unknown_module_fails() {
        let error = registry().resolve("missing::module", "Asset.Created").unwrap_err();
        assert!(matches!(error, TranscodeError::ResolveDomainFailed { .. }));
        assert!(error.to_string().contains("missing::module#Asset.Created"));
    }

    #[test]
    fn test_resolve_unknown_name_fails() {
        let error = registry().resolve(module_path!(), "Asset.Deleted").unwrap_err();
        assert!(matches!(error, TranscodeError::ResolveDomainFailed { .. }));
    }

    #[test]
    fn test_resolve_abstract_event_fails() {
        let error = registry().resolve(module_path!(), "Asset.Event").unwrap_err();
        assert!(matches!(error, TranscodeError::ResolveDomainFailed { .. }));
    }

    #[test]
    fn test_discovery_skips_abstract_and_non_mutating() {
        let registry = registry();
        let aggregates: Vec<_> = registry.concrete_aggregates().map(|a| a.name).collect();
        assert_eq!(aggregates, vec!["Asset"]);

        let asset = registry.aggregate("Asset").unwrap();
        let events: Vec<_> = registry
            .aggregate_events(asset)
            .map(|descriptor| descriptor.qualified_name)
            .collect();
        assert_eq!(events, vec!["Asset.Created"]);
    }
}
