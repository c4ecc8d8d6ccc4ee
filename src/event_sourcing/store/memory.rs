use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::event_store::{StoreError, StreamReader, StreamWriter};
use crate::event_sourcing::core::{
    deserialize_event, serialize_event, DomainEvent, EventEnvelope, EventType,
};

// ============================================================================
// In-Memory Event Store
// ============================================================================
//
// Test double for the stream contracts. Keeps JSON-encoded payloads per
// stream, assigns sequence numbers on append, and enforces optimistic
// concurrency against the stream's current version. Nothing here is
// durable; a hosting application brings its own backend.
//
// ============================================================================

/// One stored row: envelope metadata plus the JSON-encoded payload.
#[derive(Debug, Clone)]
struct StoredEvent {
    event_id: Uuid,
    aggregate_id: Uuid,
    sequence: u64,
    event_type: String,
    payload: String,
    recorded_at: DateTime<Utc>,
}

pub struct InMemoryEventStore<E> {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
    _phantom: PhantomData<E>,
}

impl<E> InMemoryEventStore<E> {
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            _phantom: PhantomData,
        }
    }
}

impl<E> Default for InMemoryEventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: DomainEvent> StreamWriter<E> for InMemoryEventStore<E> {
    async fn append(
        &self,
        aggregate_id: Uuid,
        events: Vec<EventEnvelope<E>>,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        if events.is_empty() {
            return Err(StoreError::EmptyAppend);
        }
        let event_count = events.len();

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();

        let current = stream.last().map_or(0, |stored| stored.sequence);
        if current != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                current,
            });
        }

        let mut version = expected_version;
        for mut envelope in events {
            version += 1;
            envelope.assign_sequence(version)?;

            let payload = serialize_event(&envelope.event_data)?;
            stream.push(StoredEvent {
                event_id: envelope.event_id,
                aggregate_id: envelope.aggregate_id,
                sequence: version,
                event_type: envelope.event_type.as_str().to_string(),
                payload,
                recorded_at: envelope.recorded_at,
            });
        }

        tracing::info!(
            aggregate_id = %aggregate_id,
            new_version = version,
            event_count,
            "appended events to stream"
        );

        Ok(version)
    }
}

#[async_trait]
impl<E: DomainEvent> StreamReader<E> for InMemoryEventStore<E> {
    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<EventEnvelope<E>>, StoreError> {
        let streams = self.streams.read().await;
        let Some(stream) = streams.get(&aggregate_id) else {
            return Ok(Vec::new());
        };

        let mut events = Vec::with_capacity(stream.len());
        for stored in stream {
            let event_data: E = deserialize_event(&stored.payload)?;
            let event_type = EventType::new(stored.event_type.clone())?;
            events.push(EventEnvelope::restored(
                stored.event_id,
                stored.aggregate_id,
                stored.sequence,
                event_type,
                event_data,
                stored.recorded_at,
            ));
        }

        tracing::debug!(
            aggregate_id = %aggregate_id,
            event_count = events.len(),
            "loaded events from stream"
        );

        Ok(events)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
