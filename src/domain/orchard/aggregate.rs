use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrchardError;
use super::events::{OrchardEvent, OrchardPlantedEvent, TreeAddedEvent};
use super::value_objects::{OrchardId, Tree, TreeId};
use crate::event_sourcing::core::{AggregateRoot, EventEnvelope, Outcome};

// ============================================================================
// Orchard Aggregate - Domain Logic
// ============================================================================
//
// Current state is derived by replaying the orchard's event stream; command
// methods validate business rules, buffer one pending event on success, and
// compose through `Outcome::then`.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchardAggregate {
    // Identity
    pub id: OrchardId,
    pub version: u64,

    // Current State (derived from events)
    pub name: String,
    pub trees: Vec<Tree>,

    // Produced by commands, not yet persisted
    #[serde(skip)]
    pending_events: Vec<EventEnvelope<OrchardEvent>>,
}

impl OrchardAggregate {
    /// Creation command: plant a new orchard.
    ///
    /// On success the aggregate holds one pending creation event and
    /// version 0.
    pub fn create(name: &str) -> Outcome<Self> {
        if name.trim().is_empty() {
            return Outcome::failure([OrchardError::BlankName.to_string()]);
        }

        let id = OrchardId::new();
        let event = OrchardEvent::Planted(OrchardPlantedEvent {
            orchard_id: id,
            name: name.to_string(),
        });

        let envelope = match EventEnvelope::pending(id.as_uuid(), event) {
            Ok(envelope) => envelope,
            Err(e) => return Outcome::failure([e.to_string()]),
        };
        let mut orchard = match Self::apply_creation(&envelope) {
            Ok(orchard) => orchard,
            Err(e) => return Outcome::failure([e.to_string()]),
        };
        orchard.pending_events.push(envelope);

        Outcome::success(orchard)
    }

    /// Add a tree of the given species.
    pub fn add_tree(mut self, species: &str) -> Outcome<Self> {
        if species.trim().is_empty() {
            return Outcome::failure([OrchardError::BlankSpecies.to_string()]);
        }

        let event = OrchardEvent::TreeAdded(TreeAddedEvent {
            tree_id: TreeId::new(),
            species: species.to_string(),
        });

        match self.raise(event) {
            Ok(()) => Outcome::success(self),
            Err(e) => Outcome::failure([e.to_string()]),
        }
    }

    /// Buffer a new event and apply it to in-memory state.
    fn raise(&mut self, event: OrchardEvent) -> Result<(), OrchardError> {
        let envelope = EventEnvelope::pending(self.id.as_uuid(), event)?;
        self.apply_event(&envelope)?;
        self.pending_events.push(envelope);
        Ok(())
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl AggregateRoot for OrchardAggregate {
    const AGGREGATE_TYPE: &'static str = "Orchard";

    type Event = OrchardEvent;
    type Error = OrchardError;

    fn aggregate_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn apply_creation(envelope: &EventEnvelope<OrchardEvent>) -> Result<Self, OrchardError> {
        match &envelope.event_data {
            OrchardEvent::Planted(e) => Ok(Self {
                id: e.orchard_id,
                version: 0,
                name: e.name.clone(),
                trees: Vec::new(),
                pending_events: Vec::new(),
            }),
            _ => Err(OrchardError::NotPlanted),
        }
    }

    fn apply_event(&mut self, envelope: &EventEnvelope<OrchardEvent>) -> Result<(), OrchardError> {
        match &envelope.event_data {
            OrchardEvent::Planted(_) => Err(OrchardError::AlreadyPlanted(self.id)),
            OrchardEvent::TreeAdded(e) => {
                self.trees.push(Tree {
                    id: e.tree_id,
                    species: e.species.clone(),
                });
                Ok(())
            }
        }
    }

    fn pending_events(&self) -> &[EventEnvelope<OrchardEvent>] {
        &self.pending_events
    }

    fn take_pending_events(&mut self) -> Vec<EventEnvelope<OrchardEvent>> {
        std::mem::take(&mut self.pending_events)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::Utc;

    use super::*;
    use crate::event_sourcing::core::EventType;

    fn planted_envelope(
        orchard_id: OrchardId,
        name: &str,
        sequence: u64,
    ) -> EventEnvelope<OrchardEvent> {
        let event = OrchardEvent::Planted(OrchardPlantedEvent {
            orchard_id,
            name: name.to_string(),
        });
        EventEnvelope::recorded(orchard_id.as_uuid(), sequence, event).unwrap()
    }

    fn tree_envelope(
        orchard_id: OrchardId,
        species: &str,
        sequence: u64,
    ) -> EventEnvelope<OrchardEvent> {
        let event = OrchardEvent::TreeAdded(TreeAddedEvent {
            tree_id: TreeId::new(),
            species: species.to_string(),
        });
        EventEnvelope::recorded(orchard_id.as_uuid(), sequence, event).unwrap()
    }

    fn species_of(orchard: &OrchardAggregate) -> Vec<&str> {
        orchard.trees.iter().map(|t| t.species.as_str()).collect()
    }

    // ------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------

    #[test]
    fn rehydrates_identity_and_state_from_the_creation_event() {
        let orchard_id = OrchardId::new();
        let history = vec![planted_envelope(orchard_id, "smith's orchard", 1)];

        let orchard = OrchardAggregate::from_history(history).unwrap();
        assert_eq!(orchard.id, orchard_id);
        assert_eq!(orchard.name, "smith's orchard");
        assert_eq!(orchard.version(), 1);
    }

    #[test]
    fn in_order_subsequent_events_are_applied_in_order() {
        let orchard_id = OrchardId::new();
        let history = vec![
            planted_envelope(orchard_id, "smith's orchard", 1),
            tree_envelope(orchard_id, "maple", 2),
            tree_envelope(orchard_id, "orange", 3),
        ];

        let orchard = OrchardAggregate::from_history(history).unwrap();
        assert_eq!(species_of(&orchard), ["maple", "orange"]);
        assert_eq!(orchard.version(), 3);
    }

    #[test]
    fn out_of_order_input_replays_in_sequence_order() {
        let orchard_id = OrchardId::new();
        let history = vec![
            tree_envelope(orchard_id, "orange", 3),
            planted_envelope(orchard_id, "smith's orchard", 1),
            tree_envelope(orchard_id, "maple", 2),
        ];

        let orchard = OrchardAggregate::from_history(history).unwrap();
        assert_eq!(species_of(&orchard), ["maple", "orange"]);
    }

    #[test]
    fn rehydration_keeps_no_pending_events() {
        let orchard_id = OrchardId::new();
        let history = vec![
            planted_envelope(orchard_id, "smith's orchard", 1),
            tree_envelope(orchard_id, "maple", 2),
        ];

        let orchard = OrchardAggregate::from_history(history).unwrap();
        assert!(orchard.pending_events().is_empty());
    }

    #[test]
    fn missing_event_in_sequence_fails() {
        let orchard_id = OrchardId::new();
        let history = vec![
            planted_envelope(orchard_id, "smith's orchard", 1),
            tree_envelope(orchard_id, "maple", 2),
            tree_envelope(orchard_id, "apple", 4),
        ];

        assert!(OrchardAggregate::from_history(history.clone()).is_err());

        let failure = OrchardAggregate::from_history_raw(history).expect_failure();
        assert!(failure.reasons()[0].contains("missing event in sequence"));
    }

    #[test]
    fn duplicate_sequence_numbers_fail() {
        let orchard_id = OrchardId::new();
        let history = vec![
            planted_envelope(orchard_id, "smith's orchard", 1),
            tree_envelope(orchard_id, "maple", 2),
            tree_envelope(orchard_id, "orange", 2),
        ];

        let failure = OrchardAggregate::from_history_raw(history).expect_failure();
        assert!(failure.reasons()[0].contains("duplicate sequence number"));
    }

    #[test]
    fn empty_history_always_fails() {
        let failure = OrchardAggregate::from_history_raw(Vec::new()).expect_failure();
        assert_eq!(failure.reasons(), ["no events to replay"]);

        assert!(OrchardAggregate::from_history(Vec::new()).is_err());
    }

    #[test]
    fn history_without_a_leading_creation_event_fails() {
        let orchard_id = OrchardId::new();
        let history = vec![
            tree_envelope(orchard_id, "maple", 1),
            tree_envelope(orchard_id, "orange", 2),
        ];

        let failure = OrchardAggregate::from_history_raw(history).expect_failure();
        assert!(failure.reasons()[0].contains("leading creation event"));
    }

    #[test]
    fn creation_event_that_is_not_first_fails() {
        let orchard_id = OrchardId::new();
        let history = vec![
            tree_envelope(orchard_id, "maple", 1),
            planted_envelope(orchard_id, "smith's orchard", 2),
        ];

        assert!(OrchardAggregate::from_history_raw(history).is_failure());
    }

    #[test]
    fn multiple_creation_events_fail() {
        let orchard_id = OrchardId::new();
        let history = vec![
            planted_envelope(orchard_id, "smith's orchard", 1),
            planted_envelope(orchard_id, "jones's orchard", 2),
        ];

        let failure = OrchardAggregate::from_history_raw(history).expect_failure();
        assert!(failure.reasons()[0].contains("multiple creation events"));
    }

    #[test]
    fn mismatched_aggregate_id_fails() {
        let orchard_id = OrchardId::new();
        let other_id = OrchardId::new();
        let history = vec![
            planted_envelope(orchard_id, "smith's orchard", 1),
            tree_envelope(other_id, "maple", 2),
        ];

        let failure = OrchardAggregate::from_history_raw(history).expect_failure();
        assert!(failure.reasons()[0].contains("belongs to aggregate"));
    }

    #[test]
    fn unrecognized_event_type_fails_without_crashing() {
        let orchard_id = OrchardId::new();
        let fake = EventEnvelope::restored(
            Uuid::new_v4(),
            orchard_id.as_uuid(),
            2,
            EventType::new("Fake").unwrap(),
            OrchardEvent::TreeAdded(TreeAddedEvent {
                tree_id: TreeId::new(),
                species: "maple".to_string(),
            }),
            Utc::now(),
        );
        let history = vec![planted_envelope(orchard_id, "smith's orchard", 1), fake];

        let failure = OrchardAggregate::from_history_raw(history).expect_failure();
        assert!(failure.reasons()[0].contains("unrecognized event type"));
    }

    #[test]
    fn unsequenced_history_event_fails() {
        let orchard_id = OrchardId::new();
        let event = OrchardEvent::Planted(OrchardPlantedEvent {
            orchard_id,
            name: "smith's orchard".to_string(),
        });
        let pending = EventEnvelope::pending(orchard_id.as_uuid(), event).unwrap();

        let failure = OrchardAggregate::from_history_raw(vec![pending]).expect_failure();
        assert!(failure.reasons()[0].contains("no sequence number"));
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    #[test]
    fn fresh_orchard_has_version_zero_and_one_pending_event() {
        let orchard = OrchardAggregate::create("smith's orchard").expect_success();

        assert_eq!(orchard.version(), 0);
        assert_eq!(orchard.pending_events().len(), 1);
        assert_eq!(orchard.pending_events()[0].sequence(), None);
        assert_eq!(
            orchard.pending_events()[0].event_type.as_str(),
            "OrchardPlanted"
        );
    }

    #[test]
    fn command_chain_accumulates_trees_in_call_order() {
        let orchard = OrchardAggregate::create("smith's orchard")
            .then(|o| o.add_tree("maple"))
            .then(|o| o.add_tree("orange"))
            .then(|o| o.add_tree("apple"))
            .expect_success();

        assert_eq!(species_of(&orchard), ["maple", "orange", "apple"]);
        assert_eq!(orchard.pending_events().len(), 4);
        assert!(orchard
            .pending_events()
            .iter()
            .all(|e| e.sequence().is_none()));
    }

    #[test]
    fn create_rejects_a_blank_name() {
        let failure = OrchardAggregate::create("   ").expect_failure();
        assert_eq!(failure.reasons(), ["orchard name cannot be blank"]);
    }

    #[test]
    fn add_tree_rejects_a_blank_species() {
        let failure = OrchardAggregate::create("smith's orchard")
            .then(|o| o.add_tree(" "))
            .expect_failure();
        assert_eq!(failure.reasons(), ["tree species cannot be blank"]);
    }

    #[test]
    fn earlier_failure_short_circuits_later_steps() {
        let invoked = Cell::new(false);

        let result = OrchardAggregate::create("smith's orchard")
            .then(|o| o.add_tree("maple"))
            .then(|o| o.add_tree(""))
            .then(|o| {
                invoked.set(true);
                o.add_tree("apple")
            });

        let failure = result.expect_failure();
        assert!(!invoked.get());
        assert_eq!(failure.reasons(), ["tree species cannot be blank"]);
    }

    #[test]
    fn panic_in_a_command_step_is_captured() {
        let result = OrchardAggregate::create("smith's orchard")
            .then(|_| -> Outcome<OrchardAggregate> { panic!("Ruh roh") });

        let failure = result.expect_failure();
        assert_eq!(failure.reasons(), ["Ruh roh"]);
        assert!(failure.cause().is_some());
    }

    #[test]
    #[should_panic(expected = "Ruh roh")]
    fn captured_command_fault_can_be_rethrown() {
        let failure = OrchardAggregate::create("smith's orchard")
            .then(|_| -> Outcome<OrchardAggregate> { panic!("Ruh roh") })
            .expect_failure();

        match failure.into_cause() {
            Some(fault) => fault.resume(),
            None => unreachable!("panic must be captured as the cause"),
        }
    }

    #[test]
    fn taking_pending_events_drains_the_buffer() {
        let mut orchard = OrchardAggregate::create("smith's orchard")
            .then(|o| o.add_tree("maple"))
            .expect_success();

        let pending = orchard.take_pending_events();
        assert_eq!(pending.len(), 2);
        assert!(orchard.pending_events().is_empty());

        // State survives the drain; only the buffer is consumed.
        assert_eq!(species_of(&orchard), ["maple"]);
    }
}
