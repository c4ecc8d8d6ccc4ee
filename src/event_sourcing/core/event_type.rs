use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Event Type Tag
// ============================================================================
//
// A validated short identifier naming an event's kind. Tags are stored
// alongside serialized payloads and route events during replay dispatch.
//
// ============================================================================

/// Maximum length of an event type tag.
const MAX_LENGTH: usize = 50;

/// Construction-time failures for event type tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("event types must have a value")]
    Empty,

    #[error("event types cannot be longer than 50 characters")]
    TooLong,

    #[error("event types cannot contain whitespace characters")]
    Whitespace,

    #[error("event types cannot contain non word characters")]
    NonWordCharacter,

    #[error("the type name {0} is invalid for an event; event type names must end with Event")]
    MissingEventSuffix(String),
}

/// The type of an event.
///
/// Compares by value: two tags are equal iff their underlying strings are.
/// Only the fallible constructors can produce one, so a held `EventType`
/// is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventType(String);

impl EventType {
    /// Validate a raw string as an event type tag.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::Empty);
        }
        if value.chars().count() > MAX_LENGTH {
            return Err(ValidationError::TooLong);
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ValidationError::Whitespace);
        }
        if value.chars().any(|c| !c.is_alphanumeric() && c != '_') {
            return Err(ValidationError::NonWordCharacter);
        }

        Ok(Self(value))
    }

    /// Derive a tag from a declared event type name by stripping the
    /// mandatory `Event` suffix, e.g. `TreeAddedEvent` -> `TreeAdded`.
    pub fn from_declared_name(name: &str) -> Result<Self, ValidationError> {
        match name.strip_suffix("Event") {
            Some(stem) => Self::new(stem),
            None => Err(ValidationError::MissingEventSuffix(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EventType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.0
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
