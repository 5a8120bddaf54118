// ============================================================================
// Aggregate Types
// ============================================================================
//
// The journal never rebuilds aggregate state; it only needs to know which
// aggregate types exist so their events can be discovered for schema
// loading. Replaying events is left to the caller.
//
// ============================================================================

/// Static description of one aggregate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateDescriptor {
    pub name: &'static str,
    /// Abstract aggregates are skipped by event discovery. The flag is not
    /// inherited by anything registered alongside.
    pub is_abstract: bool,
}

impl AggregateDescriptor {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            is_abstract: false,
        }
    }

    pub const fn abstract_type(name: &'static str) -> Self {
        Self {
            name,
            is_abstract: true,
        }
    }
}

/// Implemented by aggregate marker types to expose their descriptor.
pub trait Aggregate {
    const DESCRIPTOR: AggregateDescriptor;

    fn aggregate_type() -> &'static str {
        Self::DESCRIPTOR.name
    }
}
