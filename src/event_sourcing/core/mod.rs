// ============================================================================
// Event Sourcing Core - Generic Kernel
// ============================================================================
//
// This module contains GENERIC, reusable event sourcing machinery that
// works with ANY domain aggregate.
//
// Key Principles:
// - No domain-specific code (no Orchard, no concrete event names)
// - Generic over aggregate and event types
// - Replay and command logic is synchronous; persistence lives behind the
//   stream contracts in the store module
//
// ============================================================================

pub mod aggregate;
pub mod event;
pub mod event_type;
pub mod outcome;

// Re-export core types for convenience
pub use aggregate::{AggregateRoot, ReplayError};
pub use event::{deserialize_event, serialize_event, DomainEvent, EventEnvelope, SequenceError};
pub use event_type::{EventType, ValidationError};
pub use outcome::{CapturedFault, Failure, Outcome};
