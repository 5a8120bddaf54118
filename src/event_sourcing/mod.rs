// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Journal, transcoder and schema versioning. Domain-specific code is in
// src/domain/
//
// ============================================================================

pub mod core;
pub mod error;
pub mod schema;
pub mod store;
pub mod transcoder;

// Re-export core infrastructure
pub use self::core::*;
pub use error::{JournalError, SchemaError, StoreError, TranscodeError};
pub use schema::{EventSchema, SchemaRegistry, SchemaSettings};
pub use store::*;
pub use transcoder::Transcoder;
