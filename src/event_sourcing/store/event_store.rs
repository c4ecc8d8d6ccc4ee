use async_trait::async_trait;
use uuid::Uuid;

use crate::event_sourcing::core::{DomainEvent, EventEnvelope, SequenceError, ValidationError};

// ============================================================================
// Stream Contracts - Persistence Boundary
// ============================================================================
//
// The replay engine consumes these contracts; concrete backends live
// outside the kernel. The in-memory store in memory.rs is the test double
// and demo backend.
//
// ============================================================================

/// Failures surfaced by stream readers and writers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("concurrency conflict: expected version {expected}, but current is {current}")]
    VersionConflict { expected: u64, current: u64 },

    #[error("cannot append an empty event list")]
    EmptyAppend,

    #[error("codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads the recorded history of one aggregate.
#[async_trait]
pub trait StreamReader<E: DomainEvent>: Send + Sync {
    /// Load all events for an aggregate. May return them in any order and
    /// may be empty; the replay engine re-sorts by sequence number.
    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<EventEnvelope<E>>, StoreError>;
}

/// Appends newly produced events to one aggregate's stream.
#[async_trait]
pub trait StreamWriter<E: DomainEvent>: Send + Sync {
    /// Append pending events, assigning ascending, gap-free sequence
    /// numbers continuing from `expected_version`. Returns the stream's
    /// new version.
    ///
    /// Rejects the append with [`StoreError::VersionConflict`] when
    /// `expected_version` does not match the stream's current version;
    /// retry policy belongs to the caller.
    async fn append(
        &self,
        aggregate_id: Uuid,
        events: Vec<EventEnvelope<E>>,
        expected_version: u64,
    ) -> Result<u64, StoreError>;
}
