use std::path::PathBuf;

use crate::event_sourcing::schema::SchemaSettings;

// ============================================================================
// Configuration - Environment Variables
// ============================================================================
//
// DATABASE_URL                     Postgres connection string (binary only)
// EVENT_SCHEMA_DIR                 schema root directory, default `schemas`
// EVENT_SCHEMA_VALIDATION          validate payloads on append, default off
// EVENT_SCHEMA_VERSION_IN_PAYLOAD  inject `schema_version`, default off
//
// ============================================================================

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const EVENT_SCHEMA_DIR: &str = "EVENT_SCHEMA_DIR";
pub const EVENT_SCHEMA_VALIDATION: &str = "EVENT_SCHEMA_VALIDATION";
pub const EVENT_SCHEMA_VERSION_IN_PAYLOAD: &str = "EVENT_SCHEMA_VERSION_IN_PAYLOAD";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a boolean (1/0, true/false, yes/no, on/off), got {value:?}")]
    InvalidBool { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JournalConfig {
    pub database_url: Option<String>,
    pub schemas: SchemaSettings,
}

impl JournalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SchemaSettings::default();
        let flag = |name: &'static str, default: bool| match lookup(name) {
            Some(value) => parse_bool(name, &value),
            None => Ok(default),
        };

        Ok(Self {
            database_url: lookup(DATABASE_URL).filter(|url| !url.is_empty()),
            schemas: SchemaSettings {
                schema_dir: lookup(EVENT_SCHEMA_DIR)
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or(defaults.schema_dir),
                validation_enabled: flag(EVENT_SCHEMA_VALIDATION, defaults.validation_enabled)?,
                adds_schema_version_to_event_data: flag(
                    EVENT_SCHEMA_VERSION_IN_PAYLOAD,
                    defaults.adds_schema_version_to_event_data,
                )?,
            },
        })
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name,
            value: value.to_string(),
        }),
    }
}
