//! Spell casting.

use super::validation::{living_target, ready_actor, require_active, require_budget, require_range, require_sight};
use super::{
    AbilityCheck, ActionOutcome, ActionResolver, AttackRoll, Resolution, SpellOutcome,
    SpellTargetOutcome, Target, deal_damage,
};
use crate::config::CombatConfig;
use crate::dice::DiceRoller;
use crate::env::{SpellDefinition, SpellResolution};
use crate::error::CombatError;
use crate::grid::distance;
use crate::rules::attack::{AttackGeometry, AttackMode, attack_advantage, effective_armor_class};
use crate::rules::spell::{damage_formula, effective_slot, healing_formula, save_bonus, spell_attack_bonus};
use crate::state::{ActionCost, CombatState, Combatant, Conditions, EntityId, Position, SpellId};

/// Who a validated spell lands on.
struct Aim {
    area: Vec<Position>,
    targets: Vec<EntityId>,
}

impl<'a> ActionResolver<'a> {
    /// Casts a known spell, spending its casting-time resource and, for
    /// leveled spells, one slot of `level`.
    ///
    /// Cantrips ignore `level`. Area spells take an aim point (or an entity
    /// whose cell is used); single-target spells take an entity.
    pub fn cast_spell(
        &self,
        state: &CombatState,
        dice: &mut dyn DiceRoller,
        caster: EntityId,
        spell: &SpellId,
        level: u8,
        target: Option<Target>,
    ) -> Result<Resolution, CombatError> {
        require_active(state, "cast_spell")?;
        let actor = ready_actor(state, caster)?;
        let definition = self.env.spell(spell)?;
        if !actor.knows_spell(spell) {
            return Err(CombatError::SpellNotKnown {
                caster,
                spell: spell.clone(),
            });
        }

        let slot = effective_slot(definition, level);
        if !definition.is_cantrip() {
            if slot < definition.level || slot > CombatConfig::MAX_SPELL_LEVEL {
                return Err(CombatError::InvalidSlotLevel {
                    spell: spell.clone(),
                    level: slot,
                });
            }
            if !actor.slots.has(slot) {
                return Err(CombatError::NoSpellSlot {
                    caster,
                    level: slot,
                });
            }
        }
        let cost = definition
            .casting_time
            .cost()
            .ok_or(CombatError::ActionUnavailable {
                entity: caster,
                cost: ActionCost::Action,
            })?;
        require_budget(actor, cost)?;
        let aim = aim(state, actor, definition, target)?;

        // Validation is complete; nothing below can fail on a legal request.
        let mut next = state.consume_action(caster, cost)?;
        if slot > 0 {
            next = next.consume_spell_slot(caster, slot)?;
        }
        let mut replaced_concentration = None;
        if definition.concentration {
            replaced_concentration = actor.status.concentration.clone();
            next = next.set_concentration(caster, Some(spell.clone()))?;
        }

        let damage = damage_formula(definition, actor, slot).map(|f| f.roll(dice).max(0) as u32);
        let healing = healing_formula(definition, actor, slot).map(|f| f.roll(dice).max(0) as u32);

        let mut rolled_attack = false;
        let mut targets = Vec::with_capacity(aim.targets.len());
        for id in aim.targets {
            let Some(victim) = next.combatant(id).filter(|c| c.is_alive()).cloned() else {
                continue;
            };
            let mut report = SpellTargetOutcome {
                target: id,
                attack: None,
                save: None,
                damage: None,
                healed: 0,
                condition: None,
            };

            // Fraction of the rolled effect that lands: 0, half or full.
            let (lands, share) = match definition.effect.resolution {
                SpellResolution::Automatic => (true, 2),
                SpellResolution::AttackRoll => {
                    rolled_attack = true;
                    let roll = self.spell_attack(state, dice, actor, &victim, definition);
                    report.attack = Some(roll);
                    (roll.hit, if roll.hit { 2 } else { 0 })
                }
                SpellResolution::Save {
                    ability,
                    half_on_success,
                } => {
                    let natural = dice.d20();
                    let bonus = save_bonus(&victim, ability);
                    let total = natural as i32 + bonus;
                    let dc = actor.base.spell_save_dc();
                    let success = total >= dc;
                    report.save = Some(AbilityCheck {
                        ability,
                        natural,
                        bonus,
                        total,
                        dc,
                        success,
                    });
                    match (success, half_on_success) {
                        (false, _) => (true, 2),
                        (true, true) => (false, 1),
                        (true, false) => (false, 0),
                    }
                }
            };

            if let Some(amount) = damage {
                let dealt = amount * share / 2;
                if share > 0 {
                    let (damaged, hurt) = deal_damage(&next, dice, id, dealt)?;
                    next = damaged;
                    report.damage = Some(hurt);
                }
            }
            if let (Some(amount), true) = (healing, lands) {
                let before = next.get(id)?;
                if before.is_alive() {
                    let before = before.hp;
                    next = next.apply_healing(id, amount)?;
                    report.healed = next.get(id)?.hp.saturating_sub(before);
                }
            }
            if let (Some(condition), true) = (definition.effect.condition, lands) {
                if next.get(id)?.is_alive() {
                    next = next.apply_conditions(id, condition, Conditions::empty())?;
                    report.condition = Some(condition);
                }
            }
            targets.push(report);
        }

        if rolled_attack && actor.conditions().intersects(Conditions::HIDDEN | Conditions::HELPED) {
            next = next.apply_conditions(
                caster,
                Conditions::empty(),
                Conditions::HIDDEN | Conditions::HELPED,
            )?;
        }

        Ok(Resolution {
            state: next,
            outcome: ActionOutcome::Spell(SpellOutcome {
                caster,
                spell: spell.clone(),
                slot: (slot > 0).then_some(slot),
                area: aim.area,
                targets,
                replaced_concentration,
            }),
        })
    }

    fn spell_attack(
        &self,
        state: &CombatState,
        dice: &mut dyn DiceRoller,
        caster: &Combatant,
        target: &Combatant,
        spell: &SpellDefinition,
    ) -> AttackRoll {
        let geometry = AttackGeometry::between(state, caster, target);
        let mode = AttackMode::reach(spell.range, geometry.distance);
        let advantage = attack_advantage(caster, target, &geometry, mode);
        let bonus = spell_attack_bonus(caster);
        let d20 = dice.roll_d20(advantage);
        let total = d20.natural as i32 + bonus;
        match effective_armor_class(target, geometry.cover, self.env.rules()) {
            Some(armor_class) => AttackRoll {
                d20,
                bonus,
                total,
                armor_class,
                hit: total >= armor_class,
            },
            None => AttackRoll {
                d20,
                bonus,
                total,
                armor_class: i32::MAX,
                hit: false,
            },
        }
    }
}

/// Validates targeting and lists affected combatants in id order.
fn aim(
    state: &CombatState,
    caster: &Combatant,
    spell: &SpellDefinition,
    target: Option<Target>,
) -> Result<Aim, CombatError> {
    let point_of = |target: Target| -> Result<Position, CombatError> {
        match target {
            Target::Entity(id) => Ok(state.get(id)?.position),
            Target::Point(p) => Ok(p),
        }
    };

    if let Some(shape) = spell.area {
        let origin = caster.position;
        let point = match (target, shape.emanates()) {
            (Some(t), _) => point_of(t)?,
            (None, false) if spell.range == 0 => origin,
            (None, _) => return Err(CombatError::InvalidTarget("area spell needs an aim point")),
        };
        if !state.grid().is_valid_position(point) {
            return Err(CombatError::OutOfBounds(point));
        }
        if shape.emanates() {
            if point == origin {
                return Err(CombatError::InvalidTarget("cannot aim an emanation at oneself"));
            }
        } else {
            require_range(distance(origin, point), spell.range)?;
            require_sight(state, origin, point)?;
        }

        let area = state.grid().area_of_effect(origin, point, shape);
        let healing = spell.is_healing();
        let targets = state
            .living()
            .filter(|c| area.contains(&c.position))
            .filter(|c| {
                if healing {
                    !c.is_hostile_to(caster)
                } else {
                    c.id != caster.id
                }
            })
            .map(|c| c.id)
            .collect();
        return Ok(Aim { area, targets });
    }

    if !spell.targets_creature() {
        return Ok(Aim {
            area: Vec::new(),
            targets: Vec::new(),
        });
    }

    let Some(Target::Entity(id)) = target else {
        return Err(CombatError::InvalidTarget("spell requires a creature target"));
    };
    let victim = if id == caster.id && spell.is_healing() {
        caster
    } else {
        living_target(state, caster.id, id)?
    };
    if !victim.is_alive() {
        return Err(CombatError::TargetDead(id));
    }
    require_range(distance(caster.position, victim.position), spell.range)?;
    require_sight(state, caster.position, victim.position)?;
    Ok(Aim {
        area: Vec::new(),
        targets: vec![id],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::env::{Catalog, DamageType, SpellEffect, SpellSchool};
    use crate::grid::{AreaShape, TacticalGrid};
    use crate::rules::DiceFormula;
    use crate::state::{Ability, AbilityScores, BaseStats, EncounterId, Faction, SpellSlots};

    fn catalog() -> Catalog {
        let dex_half = SpellResolution::Save {
            ability: Ability::Dexterity,
            half_on_success: true,
        };
        Catalog::new()
            .with_spell(
                SpellDefinition::new("fireball", "Fireball", 3, SpellSchool::Evocation, 30, SpellEffect::damage(dex_half, DiceFormula::new(8, 6, 0), DamageType::Fire).with_upcast(1))
                    .with_area(AreaShape::Circle { radius: 2 }),
            )
            .with_spell(SpellDefinition::new(
                "cure_wounds",
                "Cure Wounds",
                1,
                SpellSchool::Evocation,
                1,
                SpellEffect::healing(DiceFormula::new(1, 8, 0)).with_upcast(1),
            ))
            .with_spell(SpellDefinition::new(
                "fire_bolt",
                "Fire Bolt",
                0,
                SpellSchool::Evocation,
                24,
                SpellEffect::damage(SpellResolution::AttackRoll, DiceFormula::new(1, 10, 0), DamageType::Fire),
            ))
            .with_spell(SpellDefinition::new(
                "drain",
                "Drain",
                1,
                SpellSchool::Necromancy,
                30,
                SpellEffect {
                    healing: Some(DiceFormula::new(1, 4, 0)),
                    ..SpellEffect::damage(SpellResolution::Automatic, DiceFormula::new(1, 10, 0), DamageType::Necrotic)
                },
            ))
    }

    fn mage_base() -> BaseStats {
        BaseStats {
            max_hp: 20,
            spellcasting: Some(Ability::Intelligence),
            abilities: AbilityScores {
                intelligence: 16,
                ..AbilityScores::default()
            },
            ..BaseStats::default()
        }
    }

    fn battle(slots: SpellSlots) -> CombatState {
        let mage = Combatant::new(EntityId(1), "mage", Faction::Player, mage_base())
            .at(Position::new(0, 0))
            .with_spell("fireball")
            .with_spell("cure_wounds")
            .with_spell("fire_bolt")
            .with_spell("drain")
            .with_slots(slots);
        let goblin = |id: u32, x: i32| {
            Combatant::new(EntityId(id), "goblin", Faction::Enemy, BaseStats { max_hp: 30, ..BaseStats::default() })
                .at(Position::new(x, 4))
        };
        CombatState::new(EncounterId::new("spells"), TacticalGrid::new(12, 8))
            .add_entity(mage)
            .unwrap()
            .add_entity(goblin(2, 6))
            .unwrap()
            .add_entity(goblin(3, 7))
            .unwrap()
            .add_entity(goblin(4, 11))
            .unwrap()
            .start_combat()
            .unwrap()
    }

    #[test]
    fn missing_slot_fails_and_changes_nothing() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = battle(SpellSlots::from_levels(&[(1, 2), (3, 0)]));
        let mut dice = ScriptedDice::new([6; 8]);
        let err = resolver
            .cast_spell(&state, &mut dice, EntityId(1), &SpellId::from("fireball"), 3, Some(Target::Point(Position::new(6, 4))))
            .unwrap_err();
        assert_eq!(
            err,
            CombatError::NoSpellSlot {
                caster: EntityId(1),
                level: 3
            }
        );
        assert_eq!(dice.rolled(), 0);
        let mage = state.combatant(EntityId(1)).unwrap();
        assert!(mage.budget.action);
        assert_eq!(mage.slots.remaining(1), 2);
    }

    #[test]
    fn area_spell_rolls_once_and_halves_on_save() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = battle(SpellSlots::from_levels(&[(3, 1)]));
        // 8 damage dice of 3 = 24; goblin 2 fails (d20 1), goblin 3 saves (d20 20)
        let mut dice = ScriptedDice::new([3, 3, 3, 3, 3, 3, 3, 3, 1, 20]);
        let res = resolver
            .cast_spell(&state, &mut dice, EntityId(1), &SpellId::from("fireball"), 3, Some(Target::Point(Position::new(6, 4))))
            .unwrap();
        assert_eq!(res.state.combatant(EntityId(2)).unwrap().hp, 6);
        assert_eq!(res.state.combatant(EntityId(3)).unwrap().hp, 18);
        assert_eq!(res.state.combatant(EntityId(4)).unwrap().hp, 30);
        let mage = res.state.combatant(EntityId(1)).unwrap();
        assert_eq!(mage.slots.remaining(3), 0);
        assert!(!mage.budget.action);
    }

    #[test]
    fn upcast_healing_adds_dice_and_modifier() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = battle(SpellSlots::from_levels(&[(1, 1), (2, 1)]))
            .apply_damage(EntityId(1), 15)
            .unwrap();
        // 2d8 (4 + 4) + 3 int
        let mut dice = ScriptedDice::new([4, 4]);
        let res = resolver
            .cast_spell(&state, &mut dice, EntityId(1), &SpellId::from("cure_wounds"), 2, Some(Target::Entity(EntityId(1))))
            .unwrap();
        assert_eq!(res.outcome.healing_done(), 11);
        let mage = res.state.combatant(EntityId(1)).unwrap();
        assert_eq!(mage.hp, 16);
        assert_eq!(mage.slots.remaining(2), 0);
        assert_eq!(mage.slots.remaining(1), 1);
    }

    #[test]
    fn slot_below_spell_level_is_invalid() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = battle(SpellSlots::from_levels(&[(1, 4), (3, 1)]));
        let mut dice = ScriptedDice::new([]);
        assert!(matches!(
            resolver.cast_spell(&state, &mut dice, EntityId(1), &SpellId::from("fireball"), 1, Some(Target::Point(Position::new(6, 4)))),
            Err(CombatError::InvalidSlotLevel { .. })
        ));
    }

    #[test]
    fn cantrip_needs_no_slot() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = battle(SpellSlots::default());
        // damage is rolled once up front: 1d10 = 7; then d20 18 + 5 vs AC 10
        let mut dice = ScriptedDice::new([7, 18]);
        let res = resolver
            .cast_spell(&state, &mut dice, EntityId(1), &SpellId::from("fire_bolt"), 0, Some(Target::Entity(EntityId(4))))
            .unwrap();
        assert_eq!(res.outcome.damage_dealt(), 7);
        let ActionOutcome::Spell(outcome) = res.outcome else {
            panic!("expected spell outcome");
        };
        assert_eq!(outcome.slot, None);
    }

    #[test]
    fn damage_and_healing_both_land_on_the_target() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = battle(SpellSlots::from_levels(&[(1, 1)]));
        // 1d10 = 8 necrotic, then 1d4 = 2 back
        let mut dice = ScriptedDice::new([8, 2]);
        let res = resolver
            .cast_spell(&state, &mut dice, EntityId(1), &SpellId::from("drain"), 1, Some(Target::Entity(EntityId(2))))
            .unwrap();
        assert_eq!(res.outcome.damage_dealt(), 8);
        assert_eq!(res.outcome.healing_done(), 2);
        assert_eq!(res.state.combatant(EntityId(2)).unwrap().hp, 24);
    }

    #[test]
    fn healing_is_skipped_when_the_damage_kills() {
        let catalog = catalog();
        let resolver = ActionResolver::new(catalog.env());
        let state = battle(SpellSlots::from_levels(&[(1, 1)]))
            .apply_damage(EntityId(2), 25)
            .unwrap();
        let mut dice = ScriptedDice::new([8, 2]);
        let res = resolver
            .cast_spell(&state, &mut dice, EntityId(1), &SpellId::from("drain"), 1, Some(Target::Entity(EntityId(2))))
            .unwrap();
        assert_eq!(res.outcome.healing_done(), 0);
        let goblin = res.state.combatant(EntityId(2)).unwrap();
        assert_eq!(goblin.hp, 0);
        assert!(!goblin.is_alive());
        assert_eq!(res.state.combatant(EntityId(1)).unwrap().slots.remaining(1), 0);
    }
}
