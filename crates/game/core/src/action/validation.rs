//! Pre-resolution checks shared by every request.
//!
//! The resolver runs all of these against the incoming state before rolling
//! a single die, so a rejected request never leaves a trace.

use crate::error::CombatError;
use crate::state::{ActionCost, CombatState, Combatant, EntityId, Phase, Position};

pub(crate) fn require_active(state: &CombatState, operation: &'static str) -> Result<(), CombatError> {
    if state.phase() != Phase::Active {
        return Err(CombatError::WrongPhase {
            operation,
            expected: Phase::Active,
            actual: state.phase(),
        });
    }
    Ok(())
}

/// The acting combatant: known, alive, taking part and not disabled.
pub(crate) fn ready_actor(state: &CombatState, id: EntityId) -> Result<&Combatant, CombatError> {
    let actor = state.get(id)?;
    if !actor.is_alive() {
        return Err(CombatError::CombatantDead(id));
    }
    if !actor.status.active {
        return Err(CombatError::CombatantInactive(id));
    }
    Ok(actor)
}

/// A combatant that is about to spend `cost` and is able to act at all.
pub(crate) fn require_budget(actor: &Combatant, cost: ActionCost) -> Result<(), CombatError> {
    let disabled = actor.conditions().is_disabled() && cost != ActionCost::Free;
    if disabled || !actor.budget.allows(cost) {
        return Err(match cost {
            ActionCost::Movement(required) => CombatError::InsufficientMovement {
                entity: actor.id,
                required,
                remaining: if disabled { 0 } else { actor.budget.movement },
            },
            _ => CombatError::ActionUnavailable {
                entity: actor.id,
                cost,
            },
        });
    }
    Ok(())
}

/// A living target other than the actor.
pub(crate) fn living_target<'s>(
    state: &'s CombatState,
    actor: EntityId,
    target: EntityId,
) -> Result<&'s Combatant, CombatError> {
    let combatant = state.get(target)?;
    if !combatant.is_alive() {
        return Err(CombatError::TargetDead(target));
    }
    if target == actor {
        return Err(CombatError::InvalidTarget("a combatant cannot target itself"));
    }
    Ok(combatant)
}

pub(crate) fn require_range(distance: u32, range: u32) -> Result<(), CombatError> {
    if distance > range {
        return Err(CombatError::OutOfRange { distance, range });
    }
    Ok(())
}

pub(crate) fn require_sight(state: &CombatState, from: Position, to: Position) -> Result<(), CombatError> {
    if !state.grid().has_line_of_sight(from, to) {
        return Err(CombatError::NoLineOfSight { from, to });
    }
    Ok(())
}
