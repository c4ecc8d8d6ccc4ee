use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event_type::{EventType, ValidationError};

// ============================================================================
// Event Envelope - Change Event Record
// ============================================================================
//
// Wraps a domain event with the metadata the replay engine and stores work
// with: aggregate identity, one-shot sequence number, routing tag, and a
// recorded-at timestamp. This is GENERIC and works with ANY event set.
//
// ============================================================================

/// Attempt to re-assign a sequence number that is already set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("sequence number already assigned: {existing}")]
    AlreadyAssigned { existing: u64 },
}

/// The closed set of domain events for one aggregate kind.
///
/// Implemented once per aggregate on the enum uniting its event variants.
/// Replay dispatch recognizes exactly the tags [`recognizes`] admits;
/// histories carrying any other tag fail reconstruction instead of being
/// silently skipped.
///
/// [`recognizes`]: DomainEvent::recognizes
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Declared type name of the concrete event, e.g. `"TreeAddedEvent"`.
    fn declared_name(&self) -> &'static str;

    /// True for the event kind that originates an aggregate's identity.
    fn is_creation(&self) -> bool;

    /// Whether this event set's replay dispatch recognizes the tag.
    fn recognizes(event_type: &EventType) -> bool;

    /// Routing tag for this event, derived from its declared name.
    fn event_type(&self) -> Result<EventType, ValidationError> {
        EventType::from_declared_name(self.declared_name())
    }
}

/// One recorded or pending state transition of one aggregate instance.
///
/// Immutable once constructed, except for the single sequence-number
/// assignment performed by the stream writer on append (or by a caller
/// reconstructing a raw history).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    sequence: Option<u64>,
    pub event_type: EventType,
    pub event_data: E,
    pub recorded_at: DateTime<Utc>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    /// Wrap a newly produced event. The sequence number stays unset until
    /// the stream writer assigns it on append.
    pub fn pending(aggregate_id: Uuid, event_data: E) -> Result<Self, ValidationError> {
        Ok(Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            sequence: None,
            event_type: event_data.event_type()?,
            event_data,
            recorded_at: Utc::now(),
        })
    }

    /// Wrap a historical event whose stream position is already known, as
    /// a test fixture or a caller replaying a raw history does.
    pub fn recorded(
        aggregate_id: Uuid,
        sequence: u64,
        event_data: E,
    ) -> Result<Self, ValidationError> {
        let mut envelope = Self::pending(aggregate_id, event_data)?;
        envelope.sequence = Some(sequence);
        Ok(envelope)
    }
}

impl<E> EventEnvelope<E> {
    /// Reassemble a stored event, preserving its recorded identity and tag.
    pub fn restored(
        event_id: Uuid,
        aggregate_id: Uuid,
        sequence: u64,
        event_type: EventType,
        event_data: E,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            sequence: Some(sequence),
            event_type,
            event_data,
            recorded_at,
        }
    }

    /// Position within the aggregate's stream; `None` until persisted.
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Assign the stream position. Exactly once per event.
    pub fn assign_sequence(&mut self, sequence: u64) -> Result<(), SequenceError> {
        match self.sequence {
            Some(existing) => Err(SequenceError::AlreadyAssigned { existing }),
            None => {
                self.sequence = Some(sequence);
                Ok(())
            }
        }
    }
}

// ============================================================================
// Event Serialization Helpers
// ============================================================================

pub fn serialize_event<E: Serialize>(event: &E) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

pub fn deserialize_event<E: DeserializeOwned>(json: &str) -> serde_json::Result<E> {
    serde_json::from_str(json)
}

// ============================================================================
// Unit Tests
// ============================================================================
