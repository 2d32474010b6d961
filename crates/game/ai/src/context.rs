//! Combat context: the per-decision blackboard.
//!
//! A [`CombatContext`] borrows the state it was built from for the duration of
//! one decision and is dropped afterwards; nothing in the AI keeps a handle to
//! the encounter between calls.

use combat_core::{
    CombatEnv, CombatState, Combatant, CombatConfig, EntityId, Position, SpellDefinition,
    WeaponDefinition, distance,
};

use crate::error::{AiError, Result};

#[derive(Clone, Copy)]
pub struct CombatContext<'a> {
    pub state: &'a CombatState,
    pub env: CombatEnv<'a>,
    pub actor: &'a Combatant,
}

impl<'a> CombatContext<'a> {
    /// Context for a living, active combatant.
    pub fn new(state: &'a CombatState, env: CombatEnv<'a>, entity: EntityId) -> Result<Self> {
        let actor = state.get(entity)?;
        if !actor.is_standing() {
            return Err(AiError::CannotAct(entity));
        }
        Ok(Self { state, env, actor })
    }

    pub fn entity(&self) -> EntityId {
        self.actor.id
    }

    pub fn position(&self) -> Position {
        self.actor.position
    }

    /// Living hostiles, in id order.
    pub fn enemies(&self) -> impl Iterator<Item = &'a Combatant> + 'a {
        self.state.hostiles_of(self.actor.id)
    }

    /// Living allies, excluding the actor.
    pub fn allies(&self) -> impl Iterator<Item = &'a Combatant> + 'a {
        self.state.allies_of(self.actor.id)
    }

    pub fn nearest_enemy(&self) -> Option<(&'a Combatant, u32)> {
        let from = self.position();
        self.enemies()
            .map(|e| (e, distance(from, e.position)))
            .min_by_key(|&(e, d)| (d, e.id))
    }

    pub fn nearest_ally(&self) -> Option<(&'a Combatant, u32)> {
        let from = self.position();
        self.allies()
            .map(|a| (a, distance(from, a.position)))
            .min_by_key(|&(a, d)| (d, a.id))
    }

    pub fn distance_to_nearest_enemy(&self) -> Option<u32> {
        self.nearest_enemy().map(|(_, d)| d)
    }

    pub fn hp_percent(&self) -> u32 {
        self.actor.hp_percent()
    }

    /// A hostile stands within melee reach.
    pub fn in_danger(&self) -> bool {
        self.enemies_within(self.position(), CombatConfig::MELEE_REACH) > 0
    }

    pub fn enemies_within(&self, position: Position, radius: u32) -> usize {
        self.enemies()
            .filter(|e| distance(e.position, position) <= radius)
            .count()
    }

    /// Most wounded ally (self included) below `threshold` percent HP.
    pub fn wounded_ally(&self, threshold: u32) -> Option<&'a Combatant> {
        std::iter::once(self.actor)
            .chain(self.allies())
            .filter(|c| c.hp_percent() < threshold)
            .min_by_key(|c| (c.hp_percent(), c.id))
    }

    /// Weapons the actor carries that the catalog knows.
    pub fn weapons(&self) -> impl Iterator<Item = &'a WeaponDefinition> + 'a {
        let env = self.env;
        self.actor.weapons.iter().filter_map(move |id| env.weapon(id).ok())
    }

    /// Known spells castable right now: cantrips, or leveled spells with a
    /// slot at or above their level.
    pub fn castable_spells(&self) -> impl Iterator<Item = (&'a SpellDefinition, u8)> + 'a {
        let env = self.env;
        let actor = self.actor;
        actor.spells.iter().filter_map(move |id| {
            let spell = env.spell(id).ok()?;
            spell.casting_time.cost()?;
            if spell.is_cantrip() {
                Some((spell, 0))
            } else {
                actor.slots.lowest_available(spell.level).map(|slot| (spell, slot))
            }
        })
    }

    pub fn has_ranged_option(&self) -> bool {
        self.weapons().any(|w| w.max_range() > CombatConfig::MELEE_REACH)
            || self
                .castable_spells()
                .any(|(s, _)| s.effect.is_harmful() && s.range > CombatConfig::MELEE_REACH)
    }

    pub fn has_damage_spell(&self) -> bool {
        self.castable_spells().any(|(s, _)| s.effect.is_harmful())
    }

    pub fn has_healing(&self) -> bool {
        self.castable_spells().any(|(s, _)| s.is_healing())
            || self.actor.actions.iter().any(|id| {
                self.env
                    .action(id)
                    .is_ok_and(|a| a.healing.is_some() && self.actor.budget.allows(a.cost))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{Catalog, EncounterBuilder, EntitySpec, ScriptedDice};

    #[test]
    fn nearest_and_danger() {
        let catalog = Catalog::standard();
        let state = EncounterBuilder::new("ctx")
            .entity(EntitySpec::new("goblin", Position::new(0, 0)).initiative(10))
            .entity(EntitySpec::new("fighter", Position::new(1, 0)).initiative(9))
            .entity(EntitySpec::new("wizard", Position::new(6, 0)).initiative(8))
            .entity(EntitySpec::new("orc", Position::new(0, 3)).initiative(7))
            .start(catalog.env(), &mut ScriptedDice::new([]))
            .unwrap();
        let ctx = CombatContext::new(&state, catalog.env(), EntityId(1)).unwrap();

        let (enemy, d) = ctx.nearest_enemy().unwrap();
        assert_eq!((enemy.id, d), (EntityId(2), 1));
        assert_eq!(ctx.nearest_ally().map(|(a, _)| a.id), Some(EntityId(4)));
        assert!(ctx.in_danger());
        assert!(ctx.has_ranged_option());

        let wizard = CombatContext::new(&state, catalog.env(), EntityId(3)).unwrap();
        assert!(wizard.has_damage_spell());
        assert!(!wizard.in_danger());
    }
}
