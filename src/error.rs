//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

pub type Result<T> = std::result::Result<T, EventlogError>;

#[derive(Error, Debug)]
pub enum EventlogError {
    // ─────────────────────────────────────────────────────────────
    // Registration errors (EVL-001 to EVL-004)
    // ─────────────────────────────────────────────────────────────
    #[error("EVL-001: Invalid or missing event id '{id}'")]
    InvalidEventId { id: String },

    #[error("EVL-002: Event name '{name}' must be UPPERCASE_WITH_UNDERSCORES")]
    InvalidEventName { name: String },

    #[error("EVL-003: Event with id {id:x} is already registered")]
    DuplicateEventId { id: u64 },

    #[error("EVL-004: Event field name '{field}' must be camel case with first letter lower case")]
    InvalidFieldName { field: String },

    // ─────────────────────────────────────────────────────────────
    // Emit errors (EVL-005)
    // ─────────────────────────────────────────────────────────────
    #[error("EVL-005: Event with id {id:x} is not registered. Did you forget to call register?")]
    UnregisteredEventId { id: u64 },

    // ─────────────────────────────────────────────────────────────
    // Plumbing
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EventlogError {
    /// Stable error code (`EVL-xxx`) for the validation family
    pub fn code(&self) -> Option<&'static str> {
        match self {
            EventlogError::InvalidEventId { .. } => Some("EVL-001"),
            EventlogError::InvalidEventName { .. } => Some("EVL-002"),
            EventlogError::DuplicateEventId { .. } => Some("EVL-003"),
            EventlogError::InvalidFieldName { .. } => Some("EVL-004"),
            EventlogError::UnregisteredEventId { .. } => Some("EVL-005"),
            EventlogError::Io(_)
            | EventlogError::Config(_)
            | EventlogError::Yaml(_)
            | EventlogError::Json(_) => None,
        }
    }
}

impl FixSuggestion for EventlogError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            EventlogError::InvalidEventId { .. } => {
                Some("Use a non-negative integer id, decimal (398472) or hex (0x61488)")
            }
            EventlogError::InvalidEventName { .. } => {
                Some("Use names like SOME_PAYMENT: uppercase letters/digits, single underscores")
            }
            EventlogError::DuplicateEventId { .. } => {
                Some("Register each event id once per process, or pick a different id")
            }
            EventlogError::InvalidFieldName { .. } => {
                Some("Use camelCase field names starting with a lowercase letter (e.g. userName)")
            }
            EventlogError::UnregisteredEventId { .. } => {
                Some("Call register for this id in the current process before logging")
            }
            EventlogError::Io(_) => Some("Check log directory path and permissions"),
            EventlogError::Config(_) => {
                Some("Check EVENTLOG_* environment variables and config file")
            }
            EventlogError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            EventlogError::Json(_) => Some("Pass a JSON object, e.g. '{\"userName\": \"test\"}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_render_in_hex() {
        let err = EventlogError::DuplicateEventId { id: 0x62001 };
        assert_eq!(err.to_string(), "EVL-003: Event with id 62001 is already registered");

        let err = EventlogError::UnregisteredEventId { id: 255 };
        assert!(err.to_string().contains("id ff is not registered"));
    }

    #[test]
    fn validation_errors_have_codes() {
        assert_eq!(
            EventlogError::InvalidEventName { name: "x".into() }.code(),
            Some("EVL-002")
        );
        assert_eq!(EventlogError::Config("bad".into()).code(), None);
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let errors = [
            EventlogError::InvalidEventId { id: "id".into() },
            EventlogError::InvalidEventName { name: "x".into() },
            EventlogError::DuplicateEventId { id: 1 },
            EventlogError::InvalidFieldName { field: "X".into() },
            EventlogError::UnregisteredEventId { id: 1 },
            EventlogError::Config("bad".into()),
        ];
        for err in &errors {
            assert!(err.fix_suggestion().is_some(), "{err}");
        }
    }
}
