//! Event-sourced aggregate replay kernel.
//!
//! An aggregate's state is never stored directly; it is derived by
//! replaying the ordered stream of change events previously recorded for
//! it. This crate provides the replay engine and its structural invariant
//! checks, the [`Outcome`] type that command pipelines compose with, the
//! validated [`EventType`] tag, and the stream contracts a persistence
//! backend implements. The orchard domain under [`domain`] is the worked
//! example wired through all of it.

pub mod domain;
pub mod event_sourcing;

pub use event_sourcing::{
    deserialize_event, serialize_event, AggregateRoot, CapturedFault, DomainEvent, EventEnvelope,
    EventType, Failure, InMemoryEventStore, Outcome, ReplayError, SequenceError, StoreError,
    StreamReader, StreamWriter, ValidationError,
};
