use std::sync::Arc;

use anyhow::{bail, Result};
use uuid::Uuid;

use super::aggregate::OrchardAggregate;
use super::events::OrchardEvent;
use crate::event_sourcing::core::AggregateRoot;
use crate::event_sourcing::store::{StreamReader, StreamWriter};

// ============================================================================
// Orchard Command Handler
// ============================================================================
//
// Orchestrates: load -> command -> append. The replayed version is the
// expected version for the append, so a concurrent writer is rejected by
// the store rather than detected here.
//
// ============================================================================

pub struct OrchardCommandHandler<S> {
    store: Arc<S>,
}

impl<S> OrchardCommandHandler<S>
where
    S: StreamReader<OrchardEvent> + StreamWriter<OrchardEvent>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Plant a new orchard and persist its creation event.
    pub async fn create(&self, name: &str) -> Result<(Uuid, u64)> {
        let mut orchard = OrchardAggregate::create(name)
            .into_result()
            .map_err(|failure| anyhow::anyhow!("command rejected: {failure}"))?;
        let orchard_id = orchard.aggregate_id();

        let pending = orchard.take_pending_events();
        let version = self.store.append(orchard_id, pending, 0).await?;

        tracing::info!(orchard_id = %orchard_id, version, "orchard created");
        Ok((orchard_id, version))
    }

    /// Add a tree to an existing orchard.
    pub async fn add_tree(&self, orchard_id: Uuid, species: &str) -> Result<u64> {
        let history = self.store.load(orchard_id).await?;
        if history.is_empty() {
            bail!("orchard not found: {orchard_id}");
        }

        let orchard = OrchardAggregate::from_history(history)?;
        let expected_version = orchard.version();

        let mut orchard = orchard
            .add_tree(species)
            .into_result()
            .map_err(|failure| anyhow::anyhow!("command rejected: {failure}"))?;

        let pending = orchard.take_pending_events();
        let version = self
            .store
            .append(orchard_id, pending, expected_version)
            .await?;

        tracing::info!(orchard_id = %orchard_id, species, version, "tree added");
        Ok(version)
    }

    /// Current state of an orchard, rebuilt from its stream.
    pub async fn get(&self, orchard_id: Uuid) -> Result<OrchardAggregate> {
        let history = self.store.load(orchard_id).await?;
        if history.is_empty() {
            bail!("orchard not found: {orchard_id}");
        }
        OrchardAggregate::from_history(history)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::store::{InMemoryEventStore, StoreError};

    fn handler() -> OrchardCommandHandler<InMemoryEventStore<OrchardEvent>> {
        OrchardCommandHandler::new(Arc::new(InMemoryEventStore::new()))
    }

    #[tokio::test]
    async fn create_persists_the_creation_event() {
        let handler = handler();

        let (orchard_id, version) = handler.create("smith's orchard").await.unwrap();
        assert_eq!(version, 1);

        let orchard = handler.get(orchard_id).await.unwrap();
        assert_eq!(orchard.name, "smith's orchard");
        assert_eq!(orchard.version(), 1);
        assert!(orchard.pending_events().is_empty());
    }

    #[tokio::test]
    async fn add_tree_appends_at_the_replayed_version() {
        let handler = handler();
        let (orchard_id, _) = handler.create("smith's orchard").await.unwrap();

        assert_eq!(handler.add_tree(orchard_id, "maple").await.unwrap(), 2);
        assert_eq!(handler.add_tree(orchard_id, "orange").await.unwrap(), 3);

        let orchard = handler.get(orchard_id).await.unwrap();
        let species: Vec<_> = orchard.trees.iter().map(|t| t.species.as_str()).collect();
        assert_eq!(species, ["maple", "orange"]);
        assert_eq!(orchard.version(), 3);
    }

    #[tokio::test]
    async fn add_tree_to_a_missing_orchard_errors() {
        let handler = handler();
        let err = handler.add_tree(Uuid::new_v4(), "maple").await.unwrap_err();
        assert!(err.to_string().contains("orchard not found"));
    }

    #[tokio::test]
    async fn rejected_command_leaves_the_stream_untouched() {
        let handler = handler();
        let (orchard_id, _) = handler.create("smith's orchard").await.unwrap();

        assert!(handler.add_tree(orchard_id, "  ").await.is_err());

        let orchard = handler.get(orchard_id).await.unwrap();
        assert!(orchard.trees.is_empty());
        assert_eq!(orchard.version(), 1);
    }

    #[tokio::test]
    async fn stale_append_is_rejected_by_the_store() {
        let store = Arc::new(InMemoryEventStore::<OrchardEvent>::new());
        let handler = OrchardCommandHandler::new(store.clone());
        let (orchard_id, _) = handler.create("smith's orchard").await.unwrap();

        // A writer working from a stale version loses the race.
        let stale = handler.get(orchard_id).await.unwrap();
        handler.add_tree(orchard_id, "maple").await.unwrap();

        let mut stale = stale.add_tree("orange").expect_success();
        let err = store
            .append(orchard_id, stale.take_pending_events(), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }
}
