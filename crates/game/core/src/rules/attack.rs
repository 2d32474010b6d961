//! Attack math shared by the resolver and outcome prediction.

use crate::config::CombatConfig;
use crate::dice::Advantage;
use crate::env::WeaponDefinition;
use crate::grid::{Cover, distance};
use crate::state::{Ability, CombatState, Combatant, Conditions};

use super::DiceFormula;

/// Ability that drives a weapon's attack and damage rolls.
///
/// Melee uses Strength, ranged uses Dexterity, finesse takes the better of
/// the two.
pub fn weapon_ability(attacker: &Combatant, weapon: &WeaponDefinition) -> Ability {
    if weapon.is_finesse() {
        return best_physical_ability(attacker);
    }
    if weapon.is_melee() {
        Ability::Strength
    } else {
        Ability::Dexterity
    }
}

/// The better of Strength and Dexterity; Strength wins ties.
pub fn best_physical_ability(combatant: &Combatant) -> Ability {
    if combatant.modifier(Ability::Dexterity) > combatant.modifier(Ability::Strength) {
        Ability::Dexterity
    } else {
        Ability::Strength
    }
}

/// Ability modifier plus proficiency.
pub fn weapon_attack_bonus(attacker: &Combatant, weapon: &WeaponDefinition) -> i32 {
    attacker.modifier(weapon_ability(attacker, weapon)) + attacker.base.proficiency_bonus
}

/// Weapon dice plus the attack ability modifier.
pub fn weapon_damage(attacker: &Combatant, weapon: &WeaponDefinition) -> DiceFormula {
    weapon
        .damage
        .plus(attacker.modifier(weapon_ability(attacker, weapon)))
}

/// Positional facts about one attacker/target pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackGeometry {
    pub distance: u32,
    pub line_of_sight: bool,
    pub cover: Cover,
    /// A living hostile stands adjacent to the attacker.
    pub threatened: bool,
}

impl AttackGeometry {
    pub fn between(state: &CombatState, attacker: &Combatant, target: &Combatant) -> Self {
        let grid = state.grid();
        let threatened = state
            .hostiles_of(attacker.id)
            .any(|h| distance(h.position, attacker.position) <= CombatConfig::MELEE_REACH);
        Self {
            distance: distance(attacker.position, target.position),
            line_of_sight: grid.has_line_of_sight(attacker.position, target.position),
            cover: grid.cover_between(attacker.position, target.position),
            threatened,
        }
    }
}

/// How an attack roll is shaped by range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AttackMode {
    pub ranged: bool,
    pub long_range: bool,
}

impl AttackMode {
    pub fn weapon(weapon: &WeaponDefinition, distance: u32) -> Self {
        Self {
            ranged: weapon.is_ranged_at(distance),
            long_range: weapon.is_long_range(distance),
        }
    }

    pub fn reach(range: u32, distance: u32) -> Self {
        Self {
            ranged: range > CombatConfig::MELEE_REACH && distance > CombatConfig::MELEE_REACH,
            long_range: false,
        }
    }
}

/// Net advantage from conditions, range and position.
pub fn attack_advantage(
    attacker: &Combatant,
    target: &Combatant,
    geometry: &AttackGeometry,
    mode: AttackMode,
) -> Advantage {
    let own = attacker.conditions();
    let theirs = target.conditions();
    let adjacent = geometry.distance <= CombatConfig::MELEE_REACH;

    let advantage = own.intersects(Conditions::HIDDEN | Conditions::INVISIBLE | Conditions::HELPED)
        || theirs.intersects(Conditions::EXPOSED | Conditions::BLINDED)
        || (theirs.contains(Conditions::PRONE) && adjacent);

    let disadvantage = own.intersects(Conditions::HAMPERED)
        || theirs.intersects(Conditions::DODGING | Conditions::INVISIBLE)
        || (theirs.contains(Conditions::PRONE) && !adjacent)
        || mode.long_range
        || (mode.ranged && geometry.threatened);

    Advantage::from_sources(advantage, disadvantage)
}

/// Target AC including cover; `None` when full cover makes it untargetable.
pub fn effective_armor_class(target: &Combatant, cover: Cover, config: &CombatConfig) -> Option<i32> {
    cover
        .ac_bonus(config)
        .map(|bonus| target.base.armor_class + bonus)
}

/// Probability that `d20 + bonus >= armor_class`.
pub fn hit_probability(bonus: i32, armor_class: i32, advantage: Advantage) -> f32 {
    let needed = armor_class - bonus;
    let single = ((21 - needed) as f32 / 20.0).clamp(0.0, 1.0);
    match advantage {
        Advantage::Normal => single,
        Advantage::Advantage => 1.0 - (1.0 - single) * (1.0 - single),
        Advantage::Disadvantage => single * single,
    }
}

/// Mean damage of a hit, honoring the minimum-damage floor.
pub fn expected_hit_damage(formula: &DiceFormula, config: &CombatConfig) -> f32 {
    formula.expected().max(config.minimum_hit_damage as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::DamageType;
    use crate::state::{AbilityScores, BaseStats, EntityId, Faction};

    fn with_scores(strength: i32, dexterity: i32) -> Combatant {
        let base = BaseStats {
            abilities: AbilityScores {
                strength,
                dexterity,
                ..AbilityScores::default()
            },
            ..BaseStats::default()
        };
        Combatant::new(EntityId(1), "a", Faction::Player, base)
    }

    #[test]
    fn finesse_uses_the_better_ability() {
        let rapier = WeaponDefinition::melee("rapier", "Rapier", DiceFormula::new(1, 8, 0), DamageType::Piercing)
            .with_properties(crate::env::WeaponProperties::FINESSE);
        let nimble = with_scores(10, 16);
        assert_eq!(weapon_ability(&nimble, &rapier), Ability::Dexterity);
        assert_eq!(weapon_attack_bonus(&nimble, &rapier), 5);
        assert_eq!(weapon_damage(&nimble, &rapier), DiceFormula::new(1, 8, 3));
    }

    #[test]
    fn hit_probability_bounds() {
        assert_eq!(hit_probability(5, 15, Advantage::Normal), 0.55);
        assert_eq!(hit_probability(0, 30, Advantage::Normal), 0.0);
        assert_eq!(hit_probability(10, 5, Advantage::Normal), 1.0);
        assert!(hit_probability(5, 15, Advantage::Advantage) > 0.55);
        assert!(hit_probability(5, 15, Advantage::Disadvantage) < 0.55);
    }

    #[test]
    fn dodging_and_long_range_impose_disadvantage() {
        let attacker = with_scores(10, 10);
        let target = with_scores(10, 10).with_conditions(Conditions::DODGING);
        let geometry = AttackGeometry {
            distance: 1,
            line_of_sight: true,
            cover: Cover::None,
            threatened: false,
        };
        assert_eq!(
            attack_advantage(&attacker, &target, &geometry, AttackMode::default()),
            Advantage::Disadvantage
        );

        let hidden = attacker.with_conditions(Conditions::HIDDEN);
        assert_eq!(
            attack_advantage(&hidden, &target, &geometry, AttackMode::default()),
            Advantage::Normal
        );
    }

    #[test]
    fn full_cover_is_untargetable() {
        let target = with_scores(10, 10);
        let config = CombatConfig::default();
        assert_eq!(effective_armor_class(&target, Cover::Half, &config), Some(12));
        assert_eq!(effective_armor_class(&target, Cover::Full, &config), None);
    }
}
