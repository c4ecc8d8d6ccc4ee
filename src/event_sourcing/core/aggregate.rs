use anyhow::Result;
use uuid::Uuid;

use super::event::{DomainEvent, EventEnvelope};
use super::event_type::EventType;
use super::outcome::Outcome;

// ============================================================================
// Aggregate Root - Replay Engine
// ============================================================================
//
// State is derived from events, never stored directly. Replay consumes the
// envelopes of one aggregate's stream and reconstructs exactly one valid
// state, enforcing the stream's structural invariants:
//
// 1. Exactly one creation event, holding the lowest sequence number.
// 2. Sequence numbers are contiguous and duplicate-free once sorted.
// 3. Every envelope belongs to the aggregate the creation event established.
// 4. No pending events survive rehydration; history is consumed, not kept.
// 5. Unrecognized event types fail the whole reconstruction.
//
// Input order is irrelevant: envelopes are re-sorted by sequence number, so
// an out-of-order stream reconstructs identically to an ordered one.
//
// ============================================================================

/// Structural replay failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("no events to replay")]
    EmptyHistory,

    #[error("event {event_id} has no sequence number; history events must be sequenced")]
    UnsequencedEvent { event_id: Uuid },

    #[error("aggregate requires a leading creation event, found {found}")]
    MissingCreationEvent { found: EventType },

    #[error("multiple creation events: second at sequence {sequence}")]
    MultipleCreationEvents { sequence: u64 },

    #[error("missing event in sequence: expected {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("duplicate sequence number {sequence} in history")]
    DuplicateSequence { sequence: u64 },

    #[error("event {sequence} belongs to aggregate {found}, expected {expected}")]
    AggregateIdMismatch {
        sequence: u64,
        expected: Uuid,
        found: Uuid,
    },

    #[error("unrecognized event type during replay: {0}")]
    UnrecognizedEventType(EventType),

    #[error("failed to apply event {event_type} at sequence {sequence}: {message}")]
    Apply {
        event_type: EventType,
        sequence: u64,
        message: String,
    },
}

/// An event-sourced aggregate root.
///
/// Implementors supply identity, versioning, the pending-events buffer,
/// and the two apply dispatchers; the replay entry points are provided on
/// top of those.
pub trait AggregateRoot: Sized + Send + Sync {
    /// Identifies this aggregate kind in logs and failure messages.
    const AGGREGATE_TYPE: &'static str;

    type Event: DomainEvent;
    type Error: std::error::Error + Send + Sync + 'static;

    fn aggregate_id(&self) -> Uuid;

    /// Last-applied sequence number; the optimistic-concurrency token a
    /// store checks on append.
    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);

    /// Materialize identity and initial state from the creation envelope.
    ///
    /// Must produce an aggregate with an empty pending buffer.
    fn apply_creation(envelope: &EventEnvelope<Self::Event>) -> Result<Self, Self::Error>;

    /// Apply one subsequent event to update state.
    fn apply_event(&mut self, envelope: &EventEnvelope<Self::Event>) -> Result<(), Self::Error>;

    /// Events produced by commands and not yet persisted.
    fn pending_events(&self) -> &[EventEnvelope<Self::Event>];

    /// Drain the pending buffer for persistence.
    fn take_pending_events(&mut self) -> Vec<EventEnvelope<Self::Event>>;

    /// Rehydrate from history. A broken stream is a programming error here
    /// and surfaces as a hard `anyhow` failure; use
    /// [`from_history_raw`](AggregateRoot::from_history_raw) where failures
    /// should stay composable.
    fn from_history(events: Vec<EventEnvelope<Self::Event>>) -> Result<Self> {
        replay::<Self>(events)
            .map_err(|e| anyhow::anyhow!("failed to rehydrate {}: {}", Self::AGGREGATE_TYPE, e))
    }

    /// Rehydrate from history with every failure, structural or
    /// unrecognized event type, captured as an [`Outcome`] failure.
    /// Always fails on an empty input.
    fn from_history_raw(events: Vec<EventEnvelope<Self::Event>>) -> Outcome<Self> {
        match replay::<Self>(events) {
            Ok(aggregate) => Outcome::success(aggregate),
            Err(e) => Outcome::failure([e.to_string()]),
        }
    }
}

/// Replay a stream of envelopes into a rehydrated aggregate.
fn replay<A: AggregateRoot>(events: Vec<EventEnvelope<A::Event>>) -> Result<A, ReplayError> {
    if events.is_empty() {
        return Err(ReplayError::EmptyHistory);
    }

    let mut sequenced = Vec::with_capacity(events.len());
    for envelope in events {
        match envelope.sequence() {
            Some(sequence) => sequenced.push((sequence, envelope)),
            None => {
                return Err(ReplayError::UnsequencedEvent {
                    event_id: envelope.event_id,
                })
            }
        }
    }

    // The stream's order is its sequence numbers, not its input order.
    sequenced.sort_by_key(|(sequence, _)| *sequence);

    let (first_sequence, first) = &sequenced[0];
    if !first.event_data.is_creation() {
        return Err(ReplayError::MissingCreationEvent {
            found: first.event_type.clone(),
        });
    }

    let stream_id = first.aggregate_id;
    let mut last_sequence = *first_sequence;
    for (sequence, envelope) in sequenced.iter().skip(1) {
        if envelope.event_data.is_creation() {
            return Err(ReplayError::MultipleCreationEvents {
                sequence: *sequence,
            });
        }
        if *sequence == last_sequence {
            return Err(ReplayError::DuplicateSequence {
                sequence: *sequence,
            });
        }
        if *sequence != last_sequence + 1 {
            return Err(ReplayError::SequenceGap {
                expected: last_sequence + 1,
                found: *sequence,
            });
        }
        if envelope.aggregate_id != stream_id {
            return Err(ReplayError::AggregateIdMismatch {
                sequence: *sequence,
                expected: stream_id,
                found: envelope.aggregate_id,
            });
        }
        last_sequence = *sequence;
    }

    for (_, envelope) in &sequenced {
        if !A::Event::recognizes(&envelope.event_type) {
            return Err(ReplayError::UnrecognizedEventType(
                envelope.event_type.clone(),
            ));
        }
    }

    let (first_sequence, first) = &sequenced[0];
    let mut aggregate = A::apply_creation(first).map_err(|e| ReplayError::Apply {
        event_type: first.event_type.clone(),
        sequence: *first_sequence,
        message: e.to_string(),
    })?;

    for (sequence, envelope) in sequenced.iter().skip(1) {
        aggregate
            .apply_event(envelope)
            .map_err(|e| ReplayError::Apply {
                event_type: envelope.event_type.clone(),
                sequence: *sequence,
                message: e.to_string(),
            })?;
    }

    aggregate.set_version(last_sequence);
    Ok(aggregate)
}
