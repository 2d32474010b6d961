//! Spell scaling and save math.

use crate::config::CombatConfig;
use crate::env::{SpellDefinition, SpellResolution};
use crate::state::{Ability, Combatant};

use super::DiceFormula;

/// Extra damage dice a cantrip gains from the caster's level.
pub fn cantrip_tier(level: u32) -> u32 {
    CombatConfig::CANTRIP_TIERS
        .iter()
        .filter(|&&threshold| level >= threshold)
        .count() as u32
}

/// Slot actually spent: zero for cantrips, otherwise the requested level.
pub fn effective_slot(spell: &SpellDefinition, requested: u8) -> u8 {
    if spell.is_cantrip() { 0 } else { requested }
}

fn scale(spell: &SpellDefinition, base: DiceFormula, caster: &Combatant, slot: u8) -> DiceFormula {
    let scaled = if spell.is_cantrip() {
        // every tier repeats the base dice
        base.with_extra_dice(base.count * cantrip_tier(caster.base.level))
    } else {
        let above = u32::from(slot.saturating_sub(spell.level));
        base.with_extra_dice(spell.effect.upcast_dice * above)
    };
    if spell.effect.add_modifier {
        scaled.plus(caster.base.spellcasting_modifier())
    } else {
        scaled
    }
}

/// Damage rolled when `caster` casts `spell` with a slot of `slot`.
pub fn damage_formula(spell: &SpellDefinition, caster: &Combatant, slot: u8) -> Option<DiceFormula> {
    spell
        .effect
        .damage
        .map(|base| scale(spell, base, caster, slot))
}

/// Healing rolled when `caster` casts `spell` with a slot of `slot`.
pub fn healing_formula(spell: &SpellDefinition, caster: &Combatant, slot: u8) -> Option<DiceFormula> {
    spell
        .effect
        .healing
        .map(|base| scale(spell, base, caster, slot))
}

/// Proficiency plus spellcasting modifier.
pub fn spell_attack_bonus(caster: &Combatant) -> i32 {
    caster.base.proficiency_bonus + caster.base.spellcasting_modifier()
}

pub fn save_bonus(target: &Combatant, ability: Ability) -> i32 {
    target.modifier(ability)
}

/// Probability that `d20 + bonus < dc`.
pub fn save_failure_probability(bonus: i32, dc: i32) -> f32 {
    ((dc - bonus - 1) as f32 / 20.0).clamp(0.0, 1.0)
}

/// Concentration save DC after taking `damage`.
pub fn concentration_dc(damage: u32) -> i32 {
    (damage as i32 / 2).max(CombatConfig::CONCENTRATION_MIN_DC)
}

/// Fraction of full damage a target is expected to take, before any roll.
///
/// `hit_chance` is only consulted for spell attack rolls.
pub fn expected_damage_fraction(
    spell: &SpellDefinition,
    caster: &Combatant,
    target: &Combatant,
    hit_chance: f32,
) -> f32 {
    match spell.effect.resolution {
        SpellResolution::Automatic => 1.0,
        SpellResolution::AttackRoll => hit_chance,
        SpellResolution::Save {
            ability,
            half_on_success,
        } => {
            let fail = save_failure_probability(save_bonus(target, ability), caster.base.spell_save_dc());
            if half_on_success {
                fail + (1.0 - fail) * 0.5
            } else {
                fail
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{DamageType, SpellEffect, SpellSchool};
    use crate::state::{AbilityScores, BaseStats, EntityId, Faction};

    fn caster(level: u32) -> Combatant {
        let base = BaseStats {
            level,
            spellcasting: Some(Ability::Intelligence),
            abilities: AbilityScores {
                intelligence: 16,
                ..AbilityScores::default()
            },
            ..BaseStats::default()
        };
        Combatant::new(EntityId(1), "mage", Faction::Player, base)
    }

    #[test]
    fn cantrips_scale_with_character_level() {
        let bolt = SpellDefinition::new(
            "fire_bolt",
            "Fire Bolt",
            0,
            SpellSchool::Evocation,
            24,
            SpellEffect::damage(SpellResolution::AttackRoll, DiceFormula::new(1, 10, 0), DamageType::Fire),
        );
        assert_eq!(damage_formula(&bolt, &caster(1), 0), Some(DiceFormula::new(1, 10, 0)));
        assert_eq!(damage_formula(&bolt, &caster(5), 0), Some(DiceFormula::new(2, 10, 0)));
        assert_eq!(damage_formula(&bolt, &caster(17), 0), Some(DiceFormula::new(4, 10, 0)));
    }

    #[test]
    fn upcasting_adds_dice_per_level() {
        let cure = SpellDefinition::new(
            "cure_wounds",
            "Cure Wounds",
            1,
            SpellSchool::Evocation,
            1,
            SpellEffect::healing(DiceFormula::new(1, 8, 0)).with_upcast(1),
        );
        assert_eq!(healing_formula(&cure, &caster(3), 1), Some(DiceFormula::new(1, 8, 3)));
        assert_eq!(healing_formula(&cure, &caster(3), 3), Some(DiceFormula::new(3, 8, 3)));
    }

    #[test]
    fn concentration_dc_floor() {
        assert_eq!(concentration_dc(7), 10);
        assert_eq!(concentration_dc(30), 15);
    }

    #[test]
    fn save_failure_probability_is_clamped() {
        assert_eq!(save_failure_probability(0, 11), 0.5);
        assert_eq!(save_failure_probability(20, 10), 0.0);
        assert_eq!(save_failure_probability(-5, 30), 1.0);
    }
}
