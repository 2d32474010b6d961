//! Event types for different topics.

use combat_core::{ActionOutcome, CombatAction, EntityId, ErrorKind, Phase};
use serde::{Deserialize, Serialize};

/// Turn and round boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnEvent {
    /// `entity` is about to act.
    Started { entity: EntityId, round: u32 },

    /// A combatant that is dead or inactive was passed over.
    Skipped { entity: EntityId, round: u32 },

    /// The turn order wrapped; budgets were refreshed.
    RoundAdvanced { round: u32 },
}

/// Requests submitted by providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionEvent {
    /// The resolver accepted the request.
    Resolved {
        action: CombatAction,
        outcome: Box<ActionOutcome>,
        round: u32,
    },

    /// The resolver refused the request; the encounter is unchanged.
    Rejected {
        action: CombatAction,
        kind: ErrorKind,
        error: String,
        round: u32,
    },
}

/// Encounter lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    Started { encounter: String, combatants: usize },

    /// `phase` stays `Active` when the round limit stopped the encounter.
    Ended { phase: Phase, rounds: u32 },
}
