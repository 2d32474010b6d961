//! End-to-end rule scenarios driven through the public API.

use combat_core::{
    Ability, AbilityScores, ActionCost, ActionResolver, BaseStats, Catalog, CombatAction,
    CombatError, CombatState, Combatant, EncounterBuilder, EncounterId, EntityId, EntitySpec,
    ErrorKind, Faction, Phase, Position, ScriptedDice, SpellId, SpellSlots, TacticalGrid, Target,
    WeaponId, initiative,
};

fn stats(max_hp: u32, dexterity: i32) -> BaseStats {
    BaseStats {
        max_hp,
        abilities: AbilityScores {
            dexterity,
            ..AbilityScores::default()
        },
        ..BaseStats::default()
    }
}

#[test]
fn overkill_damage_clamps_to_zero_and_kills() {
    let state = CombatState::new(EncounterId::new("overkill"), TacticalGrid::default())
        .add_entity(Combatant::new(EntityId(1), "hero", Faction::Player, stats(10, 10)))
        .unwrap()
        .add_entity(Combatant::new(EntityId(2), "brute", Faction::Enemy, stats(30, 10)).at(Position::new(3, 3)))
        .unwrap()
        .start_combat()
        .unwrap();

    let next = state.apply_damage(EntityId(1), 15).unwrap();
    let hero = next.combatant(EntityId(1)).unwrap();
    assert_eq!(hero.hp, 0);
    assert!(hero.status.dead);
    assert_eq!(next.grid().occupant(Position::ORIGIN), None);
    // the previous value is untouched
    assert_eq!(state.combatant(EntityId(1)).unwrap().hp, 10);
}

#[test]
fn move_beyond_remaining_movement_is_rejected() {
    let state = CombatState::new(EncounterId::new("chase"), TacticalGrid::new(12, 8))
        .add_entity(Combatant::new(EntityId(1), "runner", Faction::Player, stats(10, 10)).at(Position::new(0, 0)))
        .unwrap()
        .add_entity(Combatant::new(EntityId(2), "watcher", Faction::Enemy, stats(10, 10)).at(Position::new(11, 7)))
        .unwrap()
        .start_combat()
        .unwrap();
    assert_eq!(state.combatant(EntityId(1)).unwrap().budget.movement, 6);

    let err = state.move_entity(EntityId(1), Position::new(8, 0), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientResource);

    let catalog = Catalog::standard();
    let resolver = ActionResolver::new(catalog.env());
    let mut dice = ScriptedDice::new([]);
    let action = CombatAction::Move {
        entity: EntityId(1),
        to: Position::new(8, 0),
    };
    assert!(resolver.resolve(&state, &mut dice, &action).is_err());
    assert_eq!(state.combatant(EntityId(1)).unwrap().position, Position::ORIGIN);
    assert_eq!(state.grid().occupant(Position::ORIGIN), Some(EntityId(1)));
}

#[test]
fn last_enemy_down_means_victory() {
    let state = CombatState::new(EncounterId::new("rout"), TacticalGrid::default())
        .add_entity(Combatant::new(EntityId(1), "hero", Faction::Player, stats(10, 10)))
        .unwrap()
        .add_entity(Combatant::new(EntityId(2), "goblin", Faction::Enemy, stats(5, 10)).at(Position::new(2, 0)))
        .unwrap()
        .add_entity(Combatant::new(EntityId(3), "goblin", Faction::Enemy, stats(5, 10)).at(Position::new(4, 0)))
        .unwrap()
        .start_combat()
        .unwrap();

    let one_down = state.apply_damage(EntityId(2), 5).unwrap().check_combat_end();
    assert_eq!(one_down.phase(), Phase::Active);

    let over = one_down.apply_damage(EntityId(3), 9).unwrap().check_combat_end();
    assert_eq!(over.phase(), Phase::Victory);
    assert!(matches!(
        over.advance_turn(),
        Err(CombatError::WrongPhase { .. })
    ));
}

#[test]
fn party_wipe_means_defeat() {
    let state = CombatState::new(EncounterId::new("wipe"), TacticalGrid::default())
        .add_entity(Combatant::new(EntityId(1), "hero", Faction::Player, stats(10, 10)))
        .unwrap()
        .add_entity(Combatant::new(EntityId(2), "squire", Faction::Ally, stats(10, 10)).at(Position::new(1, 0)))
        .unwrap()
        .add_entity(Combatant::new(EntityId(3), "ogre", Faction::Enemy, stats(50, 10)).at(Position::new(5, 5)))
        .unwrap()
        .start_combat()
        .unwrap();
    let over = state
        .apply_damage(EntityId(1), 10)
        .unwrap()
        .apply_damage(EntityId(2), 10)
        .unwrap()
        .check_combat_end();
    assert_eq!(over.phase(), Phase::Defeat);
}

#[test]
fn initiative_ties_break_on_dexterity() {
    // A: d20 16 + 2 (dex 14); B: d20 17 + 1 (dex 12)
    let state = CombatState::new(EncounterId::new("ties"), TacticalGrid::default())
        .add_entity(Combatant::new(EntityId(1), "a", Faction::Player, stats(10, 14)))
        .unwrap()
        .add_entity(Combatant::new(EntityId(2), "b", Faction::Enemy, stats(10, 12)).at(Position::new(3, 3)))
        .unwrap();
    let mut dice = ScriptedDice::new([16, 17]);
    let rolled = initiative::roll_all(&state, &mut dice).unwrap();
    assert_eq!(rolled.combatant(EntityId(1)).unwrap().initiative, 18);
    assert_eq!(rolled.combatant(EntityId(2)).unwrap().initiative, 18);

    let started = rolled.start_combat().unwrap();
    assert_eq!(started.initiative_order(), &[EntityId(1), EntityId(2)]);
    assert_eq!(started.current_entity(), Some(EntityId(1)));
}

#[test]
fn casting_without_a_slot_is_an_insufficient_resource() {
    let catalog = Catalog::standard();
    let resolver = ActionResolver::new(catalog.env());
    let wizard = BaseStats {
        max_hp: 18,
        level: 5,
        spellcasting: Some(Ability::Intelligence),
        ..stats(18, 14)
    };
    let state = CombatState::new(EncounterId::new("dry"), TacticalGrid::default())
        .add_entity(
            Combatant::new(EntityId(1), "mage", Faction::Player, wizard)
                .with_spell("fireball")
                .with_slots(SpellSlots::from_levels(&[(1, 4), (2, 3), (3, 2)]).spend(3).unwrap().spend(3).unwrap()),
        )
        .unwrap()
        .add_entity(Combatant::new(EntityId(2), "orc", Faction::Enemy, stats(15, 10)).at(Position::new(6, 4)))
        .unwrap()
        .start_combat()
        .unwrap();

    let mut dice = ScriptedDice::new([]);
    let cast = CombatAction::CastSpell {
        caster: EntityId(1),
        spell: SpellId::from("fireball"),
        level: 3,
        target: Some(Target::Point(Position::new(6, 4))),
    };
    let err = resolver.resolve(&state, &mut dice, &cast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientResource);

    let mage = state.combatant(EntityId(1)).unwrap();
    assert!(mage.budget.allows(ActionCost::Action));
    assert_eq!(mage.slots.remaining(3), 0);
    assert_eq!(mage.slots.remaining(2), 3);
}

#[test]
fn standard_encounter_plays_a_round() {
    let catalog = Catalog::standard();
    let resolver = ActionResolver::new(catalog.env());
    let mut dice = ScriptedDice::new([]).with_fallback(12);
    let state = EncounterBuilder::new("skirmish")
        .entity(EntitySpec::new("fighter", Position::new(2, 3)).initiative(20))
        .entity(EntitySpec::new("orc", Position::new(3, 3)).initiative(5))
        .start(catalog.env(), &mut dice)
        .unwrap();

    let swing = CombatAction::WeaponAttack {
        attacker: EntityId(1),
        weapon: WeaponId::from("longsword"),
        target: EntityId(2),
    };
    let res = resolver.resolve(&state, &mut dice, &swing).unwrap();
    // 12 + 3 str + 2 prof against the orc's 13
    assert!(res.outcome.damage_dealt() > 0);
    let after = res.state.check_combat_end().advance_turn().unwrap();
    assert_eq!(after.current_entity(), Some(EntityId(2)));
}

#[cfg(feature = "serde")]
#[test]
fn saved_encounter_resumes_identically() {
    use combat_core::CombatSnapshot;

    let catalog = Catalog::standard();
    let resolver = ActionResolver::new(catalog.env());
    let mut dice = ScriptedDice::new([]).with_fallback(12);
    let state = EncounterBuilder::new("save-game")
        .entity(EntitySpec::new("fighter", Position::new(2, 3)).initiative(20))
        .entity(EntitySpec::new("orc", Position::new(3, 3)).initiative(5))
        .start(catalog.env(), &mut dice)
        .unwrap();
    let swing = CombatAction::WeaponAttack {
        attacker: EntityId(1),
        weapon: WeaponId::from("longsword"),
        target: EntityId(2),
    };
    let mid_fight = resolver.resolve(&state, &mut dice, &swing).unwrap().state;

    let saved = serde_json::to_string(&mid_fight.snapshot()).unwrap();
    let loaded: CombatSnapshot = serde_json::from_str(&saved).unwrap();
    let restored = CombatState::restore(loaded).unwrap();

    assert_eq!(restored, mid_fight);
    assert_eq!(serde_json::to_string(&restored.snapshot()).unwrap(), saved);
}
