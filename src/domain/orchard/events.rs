use serde::{Deserialize, Serialize};

use super::value_objects::{OrchardId, TreeId};
use crate::event_sourcing::core::{DomainEvent, EventType};

// ============================================================================
// Orchard Events - Domain Events for the Orchard Aggregate
// ============================================================================

/// Union type for all orchard change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrchardEvent {
    Planted(OrchardPlantedEvent),
    TreeAdded(TreeAddedEvent),
}

/// Orchard planted - the creation event that originates the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchardPlantedEvent {
    pub orchard_id: OrchardId,
    pub name: String,
}

/// A tree added to an existing orchard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeAddedEvent {
    pub tree_id: TreeId,
    pub species: String,
}

impl DomainEvent for OrchardEvent {
    fn declared_name(&self) -> &'static str {
        match self {
            OrchardEvent::Planted(_) => "OrchardPlantedEvent",
            OrchardEvent::TreeAdded(_) => "TreeAddedEvent",
        }
    }

    fn is_creation(&self) -> bool {
        matches!(self, OrchardEvent::Planted(_))
    }

    fn recognizes(event_type: &EventType) -> bool {
        matches!(event_type.as_str(), "OrchardPlanted" | "TreeAdded")
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
