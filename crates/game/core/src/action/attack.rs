//! Weapon attacks.

use super::validation::{living_target, ready_actor, require_active, require_budget, require_range, require_sight};
use super::{ActionOutcome, ActionResolver, AttackOutcome, AttackRoll, Resolution, deal_damage};
use crate::dice::{Advantage, DiceRoller};
use crate::env::WeaponDefinition;
use crate::error::CombatError;
use crate::rules::DiceFormula;
use crate::rules::attack::{
    AttackGeometry, AttackMode, attack_advantage, effective_armor_class, weapon_attack_bonus,
    weapon_damage,
};
use crate::state::{ActionCost, CombatState, Combatant, Conditions, EntityId, WeaponId};

/// A fully validated attack, ready to roll.
pub(crate) struct Strike<'s> {
    pub attacker: &'s Combatant,
    pub target: &'s Combatant,
    pub source: String,
    pub bonus: i32,
    pub damage: DiceFormula,
    pub armor_class: i32,
    pub advantage: Advantage,
}

impl Strike<'_> {
    /// Rolls to hit and, on a hit, rolls and applies damage once.
    ///
    /// Consumes the attacker's hidden and helped conditions.
    pub fn resolve(
        self,
        state: &CombatState,
        dice: &mut dyn DiceRoller,
        minimum_damage: u32,
    ) -> Result<(CombatState, AttackOutcome), CombatError> {
        let d20 = dice.roll_d20(self.advantage);
        let total = d20.natural as i32 + self.bonus;
        let hit = total >= self.armor_class;
        let roll = AttackRoll {
            d20,
            bonus: self.bonus,
            total,
            armor_class: self.armor_class,
            hit,
        };

        let mut next = state.clone();
        let attacker = self.attacker.id;
        if self.attacker.conditions().intersects(Conditions::HIDDEN | Conditions::HELPED) {
            next = next.apply_conditions(
                attacker,
                Conditions::empty(),
                Conditions::HIDDEN | Conditions::HELPED,
            )?;
        }

        let mut report = None;
        if hit {
            let amount = self.damage.roll(dice).max(minimum_damage as i32) as u32;
            let (damaged, damage) = deal_damage(&next, dice, self.target.id, amount)?;
            next = damaged;
            report = Some(damage);
        }

        Ok((
            next,
            AttackOutcome {
                attacker,
                target: self.target.id,
                source: self.source,
                roll,
                damage: report,
            },
        ))
    }
}

impl<'a> ActionResolver<'a> {
    /// Attacks `target` with a weapon `attacker` carries, spending the action.
    ///
    /// A miss still spends the action. A hit deals the weapon formula plus the
    /// attack ability modifier, at least the configured minimum.
    pub fn perform_weapon_attack(
        &self,
        state: &CombatState,
        dice: &mut dyn DiceRoller,
        attacker: EntityId,
        weapon: &WeaponId,
        target: EntityId,
    ) -> Result<Resolution, CombatError> {
        require_active(state, "perform_weapon_attack")?;
        let actor = ready_actor(state, attacker)?;
        let definition = self.env.weapon(weapon)?;
        if !actor.carries_weapon(weapon) {
            return Err(CombatError::WeaponNotCarried {
                entity: attacker,
                weapon: weapon.clone(),
            });
        }
        let victim = living_target(state, attacker, target)?;
        require_budget(actor, ActionCost::Action)?;

        let strike = self.weapon_strike(state, actor, victim, definition)?;
        let spent = state.consume_action(attacker, ActionCost::Action)?;
        let (next, outcome) = strike.resolve(&spent, dice, self.env.rules().minimum_hit_damage)?;

        Ok(Resolution {
            state: next,
            outcome: ActionOutcome::Attack(outcome),
        })
    }

    /// Checks range, sight and cover and prepares the roll.
    pub(crate) fn weapon_strike<'s>(
        &self,
        state: &CombatState,
        attacker: &'s Combatant,
        target: &'s Combatant,
        weapon: &WeaponDefinition,
    ) -> Result<Strike<'s>, CombatError> {
        let geometry = AttackGeometry::between(state, attacker, target);
        require_range(geometry.distance, weapon.max_range())?;
        require_sight(state, attacker.position, target.position)?;
        let armor_class = effective_armor_class(target, geometry.cover, self.env.rules()).ok_or(
            CombatError::NoLineOfSight {
                from: attacker.position,
                to: target.position,
            },
        )?;
        let mode = AttackMode::weapon(weapon, geometry.distance);

        Ok(Strike {
            attacker,
            target,
            source: weapon.name.clone(),
            bonus: weapon_attack_bonus(attacker, weapon),
            damage: weapon_damage(attacker, weapon),
            armor_class,
            advantage: attack_advantage(attacker, target, &geometry, mode),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::env::{Catalog, DamageType};
    use crate::grid::{Cover, TacticalGrid, Terrain};
    use crate::state::{AbilityScores, BaseStats, EncounterId, Faction, Position};

    fn catalog() -> Catalog {
        Catalog::new().with_weapon(WeaponDefinition::melee(
            "longsword",
            "Longsword",
            DiceFormula::new(1, 8, 0),
            DamageType::Slashing,
        ))
    }

    fn duel(grid: TacticalGrid, target_at: Position) -> CombatState {
        let strong = BaseStats {
            abilities: AbilityScores {
                strength: 16,
                ..AbilityScores::default()
            },
            ..BaseStats::default()
        };
        let target = BaseStats {
            armor_class: 15,
            max_hp: 20,
            ..BaseStats::default()
        };
        CombatState::new(EncounterId::new("duel"), grid)
            .add_entity(
                Combatant::new(EntityId(1), "knight", Faction::Player, strong)
                    .at(Position::new(1, 1))
                    .with_weapon("longsword"),
            )
            .unwrap()
            .add_entity(Combatant::new(EntityId(2), "bandit", Faction::Enemy, target).at(target_at))
            .unwrap()
            .start_combat()
            .unwrap()
    }

    #[test]
    fn hit_applies_formula_once_and_spends_the_action() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = duel(TacticalGrid::new(6, 6), Position::new(2, 1));
        // d20 = 10, +3 str +2 prof = 15 vs AC 15; damage die 5 + 3
        let mut dice = ScriptedDice::new([10, 5]);
        let res = resolver
            .perform_weapon_attack(&state, &mut dice, EntityId(1), &WeaponId::from("longsword"), EntityId(2))
            .unwrap();
        let ActionOutcome::Attack(outcome) = &res.outcome else {
            panic!("expected attack outcome");
        };
        assert!(outcome.hit());
        assert_eq!(outcome.damage_dealt(), 8);
        assert_eq!(res.state.combatant(EntityId(2)).unwrap().hp, 12);
        assert!(!res.state.combatant(EntityId(1)).unwrap().budget.action);
    }

    #[test]
    fn miss_spends_the_action_without_damage() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = duel(TacticalGrid::new(6, 6), Position::new(2, 1));
        let mut dice = ScriptedDice::new([9]);
        let res = resolver
            .perform_weapon_attack(&state, &mut dice, EntityId(1), &WeaponId::from("longsword"), EntityId(2))
            .unwrap();
        assert_eq!(res.outcome.damage_dealt(), 0);
        assert_eq!(res.state.combatant(EntityId(2)).unwrap().hp, 20);
        assert!(!res.state.combatant(EntityId(1)).unwrap().budget.action);
        assert_eq!(dice.rolled(), 1);
    }

    #[test]
    fn out_of_reach_is_rejected_before_rolling() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = duel(TacticalGrid::new(6, 6), Position::new(4, 1));
        let mut dice = ScriptedDice::new([20]);
        let err = resolver
            .perform_weapon_attack(&state, &mut dice, EntityId(1), &WeaponId::from("longsword"), EntityId(2))
            .unwrap_err();
        assert_eq!(err, CombatError::OutOfRange { distance: 3, range: 1 });
        assert_eq!(dice.rolled(), 0);
    }

    #[test]
    fn unknown_and_uncarried_weapons() {
        let catalog = catalog().with_weapon(WeaponDefinition::melee(
            "club",
            "Club",
            DiceFormula::new(1, 4, 0),
            DamageType::Bludgeoning,
        ));
        let resolver = ActionResolver::new(catalog.env());
        let state = duel(TacticalGrid::new(6, 6), Position::new(2, 1));
        let mut dice = ScriptedDice::new([]);
        assert!(matches!(
            resolver.perform_weapon_attack(&state, &mut dice, EntityId(1), &WeaponId::from("axe"), EntityId(2)),
            Err(CombatError::UnknownWeapon(_))
        ));
        assert!(matches!(
            resolver.perform_weapon_attack(&state, &mut dice, EntityId(1), &WeaponId::from("club"), EntityId(2)),
            Err(CombatError::WeaponNotCarried { .. })
        ));
    }

    #[test]
    fn half_cover_raises_the_bar() {
        let catalog = Catalog::new().with_weapon(WeaponDefinition::ranged(
            "shortbow",
            "Shortbow",
            DiceFormula::new(1, 6, 0),
            DamageType::Piercing,
            16,
            64,
        ));
        let resolver = ActionResolver::new(catalog.env());
        let mut grid = TacticalGrid::new(8, 3);
        grid.set_cell(Position::new(3, 1), Terrain::Normal, Cover::Half)
            .unwrap();
        let state = duel(grid, Position::new(5, 1));
        let mut archer = state.combatant(EntityId(1)).unwrap().clone();
        archer.weapons = vec![WeaponId::from("shortbow")];
        let mut snapshot = state.snapshot();
        snapshot.combatants[0] = archer;
        let state = CombatState::restore(snapshot).unwrap();

        // dex 10 +2 prof; 15 would hit AC 15 but not 17
        let mut dice = ScriptedDice::new([13]);
        let res = resolver
            .perform_weapon_attack(&state, &mut dice, EntityId(1), &WeaponId::from("shortbow"), EntityId(2))
            .unwrap();
        let ActionOutcome::Attack(outcome) = res.outcome else {
            panic!("expected attack outcome");
        };
        assert_eq!(outcome.roll.armor_class, 17);
        assert!(!outcome.hit());
    }
}
