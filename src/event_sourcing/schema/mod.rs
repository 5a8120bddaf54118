// ============================================================================
// Event Schemas - Versioned Payload Schemas Per Event Type
// ============================================================================

pub mod document;
pub mod naming;
pub mod registry;

pub use document::{EventSchema, SchemaParseError};
pub use naming::{schema_path, snake_case};
pub use registry::{resolve_version_in, SchemaRegistry, SchemaSettings, SchemaSnapshot};
