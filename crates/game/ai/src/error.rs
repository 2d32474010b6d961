//! Errors surfaced by the decision pipeline.

use combat_core::{CombatError, EntityId, Faction};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AiError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error("combatant {entity} belongs to the {faction:?} faction and is not AI controlled")]
    NotAiControlled { entity: EntityId, faction: Faction },

    #[error("combatant {provided} cannot act during {expected:?}'s turn")]
    NotCurrentTurn {
        expected: Option<EntityId>,
        provided: EntityId,
    },

    #[error("combatant {0} cannot act: dead or removed from play")]
    CannotAct(EntityId),
}
