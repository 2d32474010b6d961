//! Movement and the opportunity attacks it provokes.

use super::validation::{ready_actor, require_active, require_budget};
use super::{ActionOutcome, ActionResolver, MovementOutcome, Resolution};
use crate::dice::DiceRoller;
use crate::env::WeaponDefinition;
use crate::error::CombatError;
use crate::grid::distance;
use crate::state::{ActionCost, CombatState, Combatant, Conditions, EntityId, Position};

impl<'a> ActionResolver<'a> {
    /// Moves `entity` to `to` in a straight line, spending movement.
    ///
    /// Every hostile that had the mover within melee reach and loses it gets
    /// one opportunity attack, in id order, before the mover leaves. A mover
    /// dropped by those attacks stays where it started.
    pub fn execute_movement(
        &self,
        state: &CombatState,
        dice: &mut dyn DiceRoller,
        entity: EntityId,
        to: Position,
    ) -> Result<Resolution, CombatError> {
        require_active(state, "execute_movement")?;
        let mover = ready_actor(state, entity)?;
        let from = mover.position;
        if !state.grid().is_valid_position(to) {
            return Err(CombatError::OutOfBounds(to));
        }
        state.check_path(entity, to)?;
        let cost = state
            .grid()
            .movement_cost(from, to)
            .ok_or(CombatError::Impassable(to))?;
        require_budget(mover, ActionCost::Movement(cost))?;
        // bounds, occupancy and budget, without committing
        state.move_entity(entity, to, None)?;

        let opportunists = if mover.conditions().contains(Conditions::DISENGAGED) {
            Vec::new()
        } else {
            self.opportunists(state, mover, to)
        };

        let minimum = self.env.rules().minimum_hit_damage;
        let mut next = state.clone();
        let mut opportunity_attacks = Vec::with_capacity(opportunists.len());
        for (hostile, weapon) in opportunists {
            let victim = next.get(entity)?;
            if !victim.is_alive() {
                break;
            }
            let Ok(strike) = self.weapon_strike(&next, next.get(hostile)?, victim, weapon) else {
                continue;
            };
            let spent = next.consume_action(hostile, ActionCost::Reaction)?;
            let (after, outcome) = strike.resolve(&spent, dice, minimum)?;
            opportunity_attacks.push(outcome);
            next = after;
        }

        let completed = next.get(entity)?.is_alive();
        if completed {
            next = next.move_entity(entity, to, None)?;
        }

        Ok(Resolution {
            state: next,
            outcome: ActionOutcome::Movement(MovementOutcome {
                entity,
                from,
                to,
                cost,
                opportunity_attacks,
                completed,
            }),
        })
    }

    /// Hostiles whose reach `mover` leaves by going to `to`, with the melee
    /// weapon each would swing.
    fn opportunists(
        &self,
        state: &CombatState,
        mover: &Combatant,
        to: Position,
    ) -> Vec<(EntityId, &'a WeaponDefinition)> {
        state
            .hostiles_of(mover.id)
            .filter(|h| h.budget.reaction && !h.conditions().is_disabled())
            .filter_map(|h| {
                let weapon = self.best_melee_weapon(h)?;
                let reach = weapon.reach();
                let leaves = distance(h.position, mover.position) <= reach
                    && distance(h.position, to) > reach;
                leaves.then_some((h.id, weapon))
            })
            .collect()
    }

    /// Longest-reaching melee weapon, highest damage on ties.
    pub(crate) fn best_melee_weapon(&self, combatant: &Combatant) -> Option<&'a WeaponDefinition> {
        combatant
            .weapons
            .iter()
            .filter_map(|id| self.env.weapon(id).ok())
            .filter(|w| w.is_melee())
            .max_by_key(|w| (w.reach(), w.damage.max()))
    }
}
