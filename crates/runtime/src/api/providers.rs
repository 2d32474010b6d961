//! Asynchronous abstraction for sourcing player and NPC intent.
//!
//! Runtime users plug in [`ActionProvider`] implementations so an encounter
//! can run with human input, scripted fixtures, or the tactical AI.
use std::fmt;

use async_trait::async_trait;
use combat_core::{ActionOutcome, CombatAction, CombatEnv, CombatState, EntityId};

use super::errors::Result;

/// What a provider wants the acting combatant to do next.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnCommand {
    Act(CombatAction),
    EndTurn,
}

impl fmt::Display for TurnCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnCommand::Act(action) => write!(f, "{action}"),
            TurnCommand::EndTurn => f.write_str("end turn"),
        }
    }
}

/// Read-only view handed to a provider for one request.
#[derive(Clone, Copy)]
pub struct TurnRequest<'a> {
    /// The combatant whose turn it is.
    pub entity: EntityId,
    pub state: &'a CombatState,
    pub env: CombatEnv<'a>,
    /// Outcomes already resolved this turn, oldest first.
    pub taken: &'a [ActionOutcome],
}

impl TurnRequest<'_> {
    /// Whether the previous request this turn was a move.
    pub fn just_moved(&self) -> bool {
        matches!(self.taken.last(), Some(ActionOutcome::Movement(_)))
    }
}

/// Trait for providing requests based on the current encounter.
///
/// Different implementations can handle:
/// - Player input (from UI/CLI)
/// - NPC AI decisions
/// - Scripted/replayed requests
/// - Testing fixtures
#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// Provide the next command for `request.entity`.
    ///
    /// Called repeatedly within a turn until it answers
    /// [`TurnCommand::EndTurn`] or the per-turn cap is reached.
    async fn provide_action(&self, request: TurnRequest<'_>) -> Result<TurnCommand>;
}

/// A provider that always ends the turn immediately.
/// Useful for testing or as a fallback.
pub struct EndTurnProvider;

#[async_trait]
impl ActionProvider for EndTurnProvider {
    async fn provide_action(&self, _request: TurnRequest<'_>) -> Result<TurnCommand> {
        Ok(TurnCommand::EndTurn)
    }
}
