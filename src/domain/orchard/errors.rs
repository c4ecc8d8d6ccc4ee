use super::value_objects::OrchardId;
use crate::event_sourcing::core::ValidationError;

// ============================================================================
// Orchard Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrchardError {
    #[error("orchard name cannot be blank")]
    BlankName,

    #[error("tree species cannot be blank")]
    BlankSpecies,

    #[error("orchard is not initialized; the first event must plant it")]
    NotPlanted,

    #[error("orchard {0} is already planted")]
    AlreadyPlanted(OrchardId),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
