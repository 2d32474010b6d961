//! Unified error types surfaced by the runtime API.
//!
//! Wraps rule and AI failures together with provider wiring problems so
//! clients can bubble them up with consistent context.
use std::fmt;

use combat_ai::AiError;
use combat_core::{CombatError, EntityId, Phase};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no active entities available for turn scheduling")]
    NoActiveEntities,

    #[error("{kind} action provider not set")]
    ProviderNotSet { kind: ProviderKind },

    #[error("action provider channel closed")]
    ActionProviderChannelClosed,

    #[error("runtime requires an encounter or an initial state before building")]
    MissingEncounter,

    #[error("runtime expects an active encounter, found phase {0}")]
    NotActive(Phase),

    #[error("action actor {provided} does not match current entity {expected}")]
    InvalidActionActor {
        expected: EntityId,
        provided: EntityId,
    },

    #[error("failed to parse scenario: {0}")]
    Scenario(#[from] ron::error::SpannedError),

    #[error("failed to read scenario file")]
    ScenarioIo(#[source] std::io::Error),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error(transparent)]
    Ai(#[from] AiError),
}

/// Who supplies requests for a combatant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Player,
    Npc,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderKind::Player => "player",
            ProviderKind::Npc => "npc",
        };
        write!(f, "{}", label)
    }
}
