//! Standard and catalog actions: dodge, dash, disengage, hide, help, and
//! catalog entries with their own damage or healing.

use super::attack::Strike;
use super::validation::{
    living_target, ready_actor, require_active, require_budget, require_range, require_sight,
};
use super::{AbilityCheck, ActionOutcome, ActionResolver, Resolution, StandardOutcome};
use crate::config::CombatConfig;
use crate::dice::DiceRoller;
use crate::env::{ActionCategory, ActionDefinition};
use crate::error::CombatError;
use crate::grid::distance;
use crate::rules::attack::{
    AttackGeometry, AttackMode, attack_advantage, best_physical_ability, effective_armor_class,
};
use crate::state::{Ability, ActionId, CombatState, Combatant, Conditions, EntityId};

/// Hide DC when no hostile can see the hider.
const UNWATCHED_HIDE_DC: i32 = 10;

impl<'a> ActionResolver<'a> {
    /// Takes a standard or catalog action, spending its cost.
    pub fn perform_action(
        &self,
        state: &CombatState,
        dice: &mut dyn DiceRoller,
        actor: EntityId,
        action: &ActionId,
        target: Option<EntityId>,
    ) -> Result<Resolution, CombatError> {
        require_active(state, "perform_action")?;
        let performer = ready_actor(state, actor)?;
        let definition = self.env.action(action)?;
        if !definition.universal && !performer.knows_action(action) {
            return Err(CombatError::ActionNotKnown {
                entity: actor,
                action: action.clone(),
            });
        }
        require_budget(performer, definition.cost)?;
        if definition.requires_target && target.is_none() {
            return Err(CombatError::InvalidTarget("action requires a target"));
        }

        let mut outcome = StandardOutcome {
            actor,
            action: action.clone(),
            category: definition.category,
            target,
            check: None,
            attack: None,
            healed: 0,
            success: true,
        };

        let next = match definition.category {
            ActionCategory::Attack if definition.damage.is_some() => {
                let target = target.ok_or(CombatError::InvalidTarget("attack requires a target"))?;
                let victim = living_target(state, actor, target)?;
                let strike = self.action_strike(state, performer, victim, definition)?;
                let spent = state.consume_action(actor, definition.cost)?;
                let (next, attack) = strike.resolve(&spent, dice, self.env.rules().minimum_hit_damage)?;
                outcome.success = attack.hit();
                outcome.attack = Some(attack);
                next
            }
            ActionCategory::Heal | ActionCategory::Utility if definition.healing.is_some() => {
                let id = target.unwrap_or(actor);
                let patient = if id == actor {
                    performer
                } else {
                    living_target(state, actor, id)?
                };
                require_range(distance(performer.position, patient.position), definition.range)?;
                let before = patient.hp;
                let amount = definition
                    .healing
                    .map_or(0, |f| f.roll(dice).max(0) as u32);
                let next = state
                    .consume_action(actor, definition.cost)?
                    .apply_healing(id, amount)?;
                outcome.target = Some(id);
                outcome.healed = next.get(id)?.hp - before;
                next
            }
            ActionCategory::Dodge => state
                .consume_action(actor, definition.cost)?
                .apply_conditions(actor, Conditions::DODGING, Conditions::empty())?,
            ActionCategory::Disengage => state
                .consume_action(actor, definition.cost)?
                .apply_conditions(actor, Conditions::DISENGAGED, Conditions::empty())?,
            ActionCategory::Dash => state
                .consume_action(actor, definition.cost)?
                .grant_movement(actor, performer.base.speed)?,
            ActionCategory::Hide => {
                let check = hide_check(state, performer, dice);
                outcome.success = check.success;
                outcome.check = Some(check);
                let spent = state.consume_action(actor, definition.cost)?;
                if check.success {
                    spent.apply_conditions(actor, Conditions::HIDDEN, Conditions::empty())?
                } else {
                    spent
                }
            }
            ActionCategory::Help => {
                let id = target.ok_or(CombatError::InvalidTarget("help requires an ally"))?;
                let ally = living_target(state, actor, id)?;
                if ally.is_hostile_to(performer) {
                    return Err(CombatError::InvalidTarget("cannot help a hostile combatant"));
                }
                require_range(
                    distance(performer.position, ally.position),
                    definition.range.max(CombatConfig::MELEE_REACH),
                )?;
                state
                    .consume_action(actor, definition.cost)?
                    .apply_conditions(id, Conditions::HELPED, Conditions::empty())?
            }
            _ => state.consume_action(actor, definition.cost)?,
        };

        Ok(Resolution {
            state: next,
            outcome: ActionOutcome::Standard(outcome),
        })
    }

    /// Attack roll for a catalog action, using the better of Str and Dex.
    fn action_strike<'s>(
        &self,
        state: &CombatState,
        attacker: &'s Combatant,
        target: &'s Combatant,
        action: &ActionDefinition,
    ) -> Result<Strike<'s>, CombatError> {
        let range = action.range.max(CombatConfig::MELEE_REACH);
        let geometry = AttackGeometry::between(state, attacker, target);
        require_range(geometry.distance, range)?;
        require_sight(state, attacker.position, target.position)?;
        let armor_class = effective_armor_class(target, geometry.cover, self.env.rules()).ok_or(
            CombatError::NoLineOfSight {
                from: attacker.position,
                to: target.position,
            },
        )?;
        let modifier = attacker.modifier(best_physical_ability(attacker));
        let damage = action
            .damage
            .ok_or(CombatError::InvalidTarget("action deals no damage"))?;

        Ok(Strike {
            attacker,
            target,
            source: action.name.clone(),
            bonus: modifier + attacker.base.proficiency_bonus,
            damage: damage.plus(modifier),
            armor_class,
            advantage: attack_advantage(
                attacker,
                target,
                &geometry,
                AttackMode::reach(range, geometry.distance),
            ),
        })
    }
}

/// Stealth against the sharpest passive Perception among hostiles with line
/// of sight to the hider.
fn hide_check(state: &CombatState, hider: &Combatant, dice: &mut dyn DiceRoller) -> AbilityCheck {
    let dc = state
        .hostiles_of(hider.id)
        .filter(|h| state.grid().has_line_of_sight(h.position, hider.position))
        .map(|h| h.base.passive_perception())
        .max()
        .unwrap_or(UNWATCHED_HIDE_DC);
    let natural = dice.d20();
    let bonus = hider.modifier(Ability::Dexterity);
    let total = natural as i32 + bonus;
    AbilityCheck {
        ability: Ability::Dexterity,
        natural,
        bonus,
        total,
        dc,
        success: total >= dc,
    }
}
