//! Initiative service: rolling and ordering.

use std::cmp::Reverse;

use crate::dice::DiceRoller;
use crate::error::CombatError;
use crate::state::{Ability, CombatState, Combatant, EntityId};

/// d20 + Dexterity modifier.
pub fn roll_initiative(combatant: &Combatant, dice: &mut dyn DiceRoller) -> i32 {
    dice.d20() as i32 + combatant.modifier(Ability::Dexterity)
}

/// Rolls initiative for every combatant in id order and records it.
pub fn roll_all(state: &CombatState, dice: &mut dyn DiceRoller) -> Result<CombatState, CombatError> {
    let rolls: Vec<(EntityId, i32)> = state
        .combatants()
        .map(|c| (c.id, roll_initiative(c, dice)))
        .collect();

    rolls
        .into_iter()
        .try_fold(state.clone(), |acc, (id, value)| acc.with_initiative(id, value))
}

/// Turn order of the active, living combatants.
///
/// Sorted by initiative descending, then Dexterity score descending; equal
/// pairs fall back to id order so the result is total.
pub fn order<'a>(combatants: impl IntoIterator<Item = &'a Combatant>) -> Vec<EntityId> {
    let mut ranked: Vec<&Combatant> = combatants
        .into_iter()
        .filter(|c| c.is_standing())
        .collect();
    ranked.sort_by_key(|c| {
        (
            Reverse(c.initiative),
            Reverse(c.base.abilities.dexterity),
            c.id,
        )
    });
    ranked.into_iter().map(|c| c.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::state::{AbilityScores, BaseStats, Faction};

    fn with_dex(id: u32, dexterity: i32, initiative: i32) -> Combatant {
        let base = BaseStats {
            abilities: AbilityScores {
                dexterity,
                ..AbilityScores::default()
            },
            ..BaseStats::default()
        };
        Combatant::new(EntityId(id), "c", Faction::Enemy, base).with_initiative(initiative)
    }

    #[test]
    fn roll_adds_dexterity_modifier() {
        let mut dice = ScriptedDice::new([16]);
        assert_eq!(roll_initiative(&with_dex(1, 14, 0), &mut dice), 18);
    }

    #[test]
    fn dexterity_breaks_ties() {
        // equal totals of 18; +2 beats +1
        let a = with_dex(7, 14, 18);
        let b = with_dex(3, 12, 18);
        assert_eq!(order([&b, &a]), vec![EntityId(7), EntityId(3)]);
    }

    #[test]
    fn dead_and_inactive_are_excluded() {
        let dead = with_dex(1, 10, 20).with_hp(0);
        let mut idle = with_dex(2, 10, 19);
        idle.status.active = false;
        let live = with_dex(3, 10, 5);
        assert_eq!(order([&dead, &idle, &live]), vec![EntityId(3)]);
    }
}
