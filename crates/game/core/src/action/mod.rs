//! Action resolver.
//!
//! Resolves one request (weapon attack, spell, movement, catalog action)
//! against a [`CombatState`] and returns the next state plus an outcome
//! report. Every request is validated in full against the incoming state
//! before any die is rolled; a rejected request returns an error and the
//! caller keeps its original state.
//!
//! # Module Structure
//!
//! - `validation`: shared pre-resolution checks
//! - `attack`: weapon attacks and the strike shared with opportunity attacks
//! - `spell`: spell casting
//! - `movement`: movement with opportunity attacks
//! - `standard`: dodge, dash, disengage, hide, help and catalog actions
//! - `outcome`: outcome reports

mod attack;
mod movement;
mod outcome;
mod spell;
mod standard;
mod validation;

pub use outcome::{
    AbilityCheck, ActionOutcome, AttackOutcome, AttackRoll, DamageReport, MovementOutcome,
    SpellOutcome, SpellTargetOutcome, StandardOutcome,
};

use std::fmt;

use crate::dice::DiceRoller;
use crate::env::CombatEnv;
use crate::error::CombatError;
use crate::rules::spell::concentration_dc;
use crate::state::{Ability, ActionId, CombatState, EntityId, Position, SpellId, WeaponId};

/// What a spell is aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    Entity(EntityId),
    Point(Position),
}

/// A request to the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatAction {
    WeaponAttack {
        attacker: EntityId,
        weapon: WeaponId,
        target: EntityId,
    },
    CastSpell {
        caster: EntityId,
        spell: SpellId,
        level: u8,
        target: Option<Target>,
    },
    Move {
        entity: EntityId,
        to: Position,
    },
    Perform {
        actor: EntityId,
        action: ActionId,
        target: Option<EntityId>,
    },
}

impl CombatAction {
    pub fn actor(&self) -> EntityId {
        match self {
            CombatAction::WeaponAttack { attacker, .. } => *attacker,
            CombatAction::CastSpell { caster, .. } => *caster,
            CombatAction::Move { entity, .. } => *entity,
            CombatAction::Perform { actor, .. } => *actor,
        }
    }

    pub fn is_movement(&self) -> bool {
        matches!(self, CombatAction::Move { .. })
    }
}

impl fmt::Display for CombatAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatAction::WeaponAttack {
                attacker,
                weapon,
                target,
            } => write!(f, "{attacker} attacks {target} with {weapon}"),
            CombatAction::CastSpell {
                caster,
                spell,
                level,
                target,
            } => {
                write!(f, "{caster} casts {spell} at level {level}")?;
                match target {
                    Some(Target::Entity(id)) => write!(f, " on {id}"),
                    Some(Target::Point(p)) => write!(f, " at {p}"),
                    None => Ok(()),
                }
            }
            CombatAction::Move { entity, to } => write!(f, "{entity} moves to {to}"),
            CombatAction::Perform {
                actor,
                action,
                target,
            } => {
                write!(f, "{actor} uses {action}")?;
                if let Some(target) = target {
                    write!(f, " on {target}")?;
                }
                Ok(())
            }
        }
    }
}

/// Next state plus what happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub state: CombatState,
    pub outcome: ActionOutcome,
}

/// Resolves requests against the catalog it was built with.
#[derive(Clone, Copy)]
pub struct ActionResolver<'a> {
    env: CombatEnv<'a>,
}

impl<'a> ActionResolver<'a> {
    pub fn new(env: CombatEnv<'a>) -> Self {
        Self { env }
    }

    pub fn env(&self) -> CombatEnv<'a> {
        self.env
    }

    /// Dispatches a request to the matching operation.
    pub fn resolve(
        &self,
        state: &CombatState,
        dice: &mut dyn DiceRoller,
        action: &CombatAction,
    ) -> Result<Resolution, CombatError> {
        match action {
            CombatAction::WeaponAttack {
                attacker,
                weapon,
                target,
            } => self.perform_weapon_attack(state, dice, *attacker, weapon, *target),
            CombatAction::CastSpell {
                caster,
                spell,
                level,
                target,
            } => self.cast_spell(state, dice, *caster, spell, *level, *target),
            CombatAction::Move { entity, to } => self.execute_movement(state, dice, *entity, *to),
            CombatAction::Perform {
                actor,
                action,
                target,
            } => self.perform_action(state, dice, *actor, action, *target),
        }
    }
}

/// Applies damage and runs the concentration save it may force.
pub(crate) fn deal_damage(
    state: &CombatState,
    dice: &mut dyn DiceRoller,
    target: EntityId,
    amount: u32,
) -> Result<(CombatState, DamageReport), CombatError> {
    let before = state.get(target)?;
    let concentrating = before.status.concentration.is_some();
    let was_alive = before.is_alive();

    let mut next = state.apply_damage(target, amount)?;
    let after = next.get(target)?;
    let killed = was_alive && !after.is_alive();
    let remaining_hp = after.hp;

    let mut concentration_lost = killed && concentrating;
    if concentrating && after.is_alive() && amount > 0 {
        let save = dice.d20() as i32 + after.modifier(Ability::Constitution);
        if save < concentration_dc(amount) {
            next = next.set_concentration(target, None)?;
            concentration_lost = true;
        }
    }

    Ok((
        next,
        DamageReport {
            target,
            amount,
            remaining_hp,
            killed,
            concentration_lost,
        },
    ))
}
