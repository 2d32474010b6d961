//! In-memory catalog implementing every oracle.

use std::collections::HashMap;

use super::{
    ActionCategory, ActionDefinition, ActionOracle, CastingTime, CombatEnv, CombatantTemplate,
    DamageType, Env, SpellDefinition, SpellDuration, SpellEffect, SpellOracle, SpellResolution,
    SpellSchool, TemplateOracle, WeaponDefinition, WeaponOracle, WeaponProperties,
};
use crate::config::CombatConfig;
use crate::grid::AreaShape;
use crate::rules::DiceFormula;
use crate::state::{
    Ability, AbilityScores, ActionCost, ActionId, BaseStats, Conditions, Faction, SpellId,
    SpellSlots, TemplateId, WeaponId,
};

/// Weapon, spell, action and template tables held in memory.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    weapons: HashMap<WeaponId, WeaponDefinition>,
    spells: HashMap<SpellId, SpellDefinition>,
    actions: HashMap<ActionId, ActionDefinition>,
    templates: HashMap<TemplateId, CombatantTemplate>,
    rules: CombatConfig,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, rules: CombatConfig) -> Self {
        self.rules = rules;
        self
    }

    pub fn insert_weapon(&mut self, weapon: WeaponDefinition) {
        self.weapons.insert(weapon.id.clone(), weapon);
    }

    pub fn insert_spell(&mut self, spell: SpellDefinition) {
        self.spells.insert(spell.id.clone(), spell);
    }

    pub fn insert_action(&mut self, action: ActionDefinition) {
        self.actions.insert(action.id.clone(), action);
    }

    pub fn insert_template(&mut self, template: CombatantTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn with_weapon(mut self, weapon: WeaponDefinition) -> Self {
        self.insert_weapon(weapon);
        self
    }

    pub fn with_spell(mut self, spell: SpellDefinition) -> Self {
        self.insert_spell(spell);
        self
    }

    pub fn with_action(mut self, action: ActionDefinition) -> Self {
        self.insert_action(action);
        self
    }

    pub fn with_template(mut self, template: CombatantTemplate) -> Self {
        self.insert_template(template);
        self
    }

    pub fn rules(&self) -> &CombatConfig {
        &self.rules
    }

    /// Borrows the catalog as a [`CombatEnv`].
    pub fn env(&self) -> CombatEnv<'_> {
        Env::new(
            self as &dyn WeaponOracle,
            self as &dyn SpellOracle,
            self as &dyn ActionOracle,
            self as &dyn TemplateOracle,
            &self.rules,
        )
    }

    /// The five standard actions: dodge, dash, disengage, hide, help.
    pub fn standard_actions() -> Vec<ActionDefinition> {
        vec![
            ActionDefinition::standard("dodge", "Dodge", ActionCategory::Dodge),
            ActionDefinition::standard("dash", "Dash", ActionCategory::Dash),
            ActionDefinition::standard("disengage", "Disengage", ActionCategory::Disengage),
            ActionDefinition::standard("hide", "Hide", ActionCategory::Hide),
            ActionDefinition::standard("help", "Help", ActionCategory::Help),
        ]
    }

    /// A ready-made catalog of common weapons, spells and creatures.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for action in Self::standard_actions() {
            catalog.insert_action(action);
        }
        for weapon in standard_weapons() {
            catalog.insert_weapon(weapon);
        }
        for spell in standard_spells() {
            catalog.insert_spell(spell);
        }
        for action in standard_special_actions() {
            catalog.insert_action(action);
        }
        for template in standard_templates() {
            catalog.insert_template(template);
        }
        catalog
    }
}

impl WeaponOracle for Catalog {
    fn weapon(&self, id: &WeaponId) -> Option<&WeaponDefinition> {
        self.weapons.get(id)
    }
}

impl SpellOracle for Catalog {
    fn spell(&self, id: &SpellId) -> Option<&SpellDefinition> {
        self.spells.get(id)
    }
}

impl ActionOracle for Catalog {
    fn action(&self, id: &ActionId) -> Option<&ActionDefinition> {
        self.actions.get(id)
    }

    fn universal_actions(&self) -> Vec<&ActionDefinition> {
        let mut universal: Vec<_> = self.actions.values().filter(|a| a.universal).collect();
        universal.sort_by(|a, b| a.id.cmp(&b.id));
        universal
    }
}

impl TemplateOracle for Catalog {
    fn template(&self, id: &TemplateId) -> Option<&CombatantTemplate> {
        self.templates.get(id)
    }
}

fn d(count: u32, sides: u32) -> DiceFormula {
    DiceFormula::new(count, sides, 0)
}

fn standard_weapons() -> Vec<WeaponDefinition> {
    use DamageType::*;
    use WeaponProperties as P;
    vec![
        WeaponDefinition::melee("club", "Club", d(1, 4), Bludgeoning).with_properties(P::LIGHT),
        WeaponDefinition::melee("dagger", "Dagger", d(1, 4), Piercing)
            .with_properties(P::FINESSE | P::LIGHT)
            .with_thrown_range(4, 12),
        WeaponDefinition::melee("mace", "Mace", d(1, 6), Bludgeoning),
        WeaponDefinition::melee("quarterstaff", "Quarterstaff", d(1, 6), Bludgeoning),
        WeaponDefinition::melee("spear", "Spear", d(1, 6), Piercing).with_thrown_range(4, 12),
        WeaponDefinition::melee("shortsword", "Shortsword", d(1, 6), Piercing)
            .with_properties(P::FINESSE | P::LIGHT),
        WeaponDefinition::melee("scimitar", "Scimitar", d(1, 6), Slashing)
            .with_properties(P::FINESSE | P::LIGHT),
        WeaponDefinition::melee("rapier", "Rapier", d(1, 8), Piercing).with_properties(P::FINESSE),
        WeaponDefinition::melee("longsword", "Longsword", d(1, 8), Slashing),
        WeaponDefinition::melee("greataxe", "Greataxe", d(1, 12), Slashing)
            .with_properties(P::HEAVY | P::TWO_HANDED),
        WeaponDefinition::melee("greatsword", "Greatsword", d(2, 6), Slashing)
            .with_properties(P::HEAVY | P::TWO_HANDED),
        WeaponDefinition::melee("greatclub", "Greatclub", d(2, 8), Bludgeoning)
            .with_properties(P::TWO_HANDED),
        WeaponDefinition::melee("glaive", "Glaive", d(1, 10), Slashing)
            .with_properties(P::HEAVY | P::REACH | P::TWO_HANDED),
        WeaponDefinition::melee("bite", "Bite", d(2, 4), Piercing),
        WeaponDefinition::ranged("shortbow", "Shortbow", d(1, 6), Piercing, 16, 64)
            .with_properties(P::TWO_HANDED),
        WeaponDefinition::ranged("longbow", "Longbow", d(1, 8), Piercing, 30, 120)
            .with_properties(P::HEAVY | P::TWO_HANDED),
        WeaponDefinition::ranged("light_crossbow", "Light Crossbow", d(1, 8), Piercing, 16, 64)
            .with_properties(P::TWO_HANDED),
    ]
}

fn standard_spells() -> Vec<SpellDefinition> {
    use DamageType::*;
    use SpellResolution::*;
    use SpellSchool::*;

    let dex_half = Save {
        ability: Ability::Dexterity,
        half_on_success: true,
    };
    let con_half = Save {
        ability: Ability::Constitution,
        half_on_success: true,
    };

    vec![
        SpellDefinition::new("fire_bolt", "Fire Bolt", 0, Evocation, 24, SpellEffect::damage(AttackRoll, d(1, 10), Fire)),
        SpellDefinition::new("ray_of_frost", "Ray of Frost", 0, Evocation, 12, SpellEffect::damage(AttackRoll, d(1, 8), Cold)),
        SpellDefinition::new(
            "sacred_flame",
            "Sacred Flame",
            0,
            Evocation,
            12,
            SpellEffect::damage(
                Save {
                    ability: Ability::Dexterity,
                    half_on_success: false,
                },
                d(1, 8),
                Radiant,
            ),
        ),
        SpellDefinition::new(
            "magic_missile",
            "Magic Missile",
            1,
            Evocation,
            24,
            SpellEffect::damage(Automatic, DiceFormula::new(3, 4, 3), Force).with_upcast(1),
        ),
        SpellDefinition::new("guiding_bolt", "Guiding Bolt", 1, Evocation, 24, SpellEffect::damage(AttackRoll, d(4, 6), Radiant).with_upcast(1))
            .with_duration(SpellDuration::Rounds(1)),
        SpellDefinition::new("inflict_wounds", "Inflict Wounds", 1, Necromancy, 1, SpellEffect::damage(AttackRoll, d(3, 10), Necrotic).with_upcast(1)),
        SpellDefinition::new("burning_hands", "Burning Hands", 1, Evocation, 0, SpellEffect::damage(dex_half, d(3, 6), Fire).with_upcast(1))
            .with_area(AreaShape::Cone { length: 3 }),
        SpellDefinition::new("thunderwave", "Thunderwave", 1, Evocation, 0, SpellEffect::damage(con_half, d(2, 8), Thunder).with_upcast(1))
            .with_area(AreaShape::Square { side: 3 }),
        SpellDefinition::new("cure_wounds", "Cure Wounds", 1, Evocation, 1, SpellEffect::healing(d(1, 8)).with_upcast(1)),
        SpellDefinition::new("healing_word", "Healing Word", 1, Evocation, 12, SpellEffect::healing(d(1, 4)).with_upcast(1))
            .cast_as(CastingTime::BonusAction),
        SpellDefinition::new("shatter", "Shatter", 2, Evocation, 12, SpellEffect::damage(con_half, d(3, 8), Thunder).with_upcast(1))
            .with_area(AreaShape::Circle { radius: 2 }),
        SpellDefinition::new(
            "hold_person",
            "Hold Person",
            2,
            Enchantment,
            12,
            SpellEffect::condition(
                Save {
                    ability: Ability::Wisdom,
                    half_on_success: false,
                },
                Conditions::PARALYZED,
            ),
        )
        .with_duration(SpellDuration::Minutes(1))
        .concentration(),
        SpellDefinition::new("fireball", "Fireball", 3, Evocation, 30, SpellEffect::damage(dex_half, d(8, 6), Fire).with_upcast(1))
            .with_area(AreaShape::Circle { radius: 4 }),
        SpellDefinition::new("lightning_bolt", "Lightning Bolt", 3, Evocation, 0, SpellEffect::damage(dex_half, d(8, 6), Lightning).with_upcast(1))
            .with_area(AreaShape::Line { length: 20, width: 1 }),
        SpellDefinition::new("mass_healing_word", "Mass Healing Word", 3, Evocation, 6, SpellEffect::healing(d(1, 4)).with_upcast(1))
            .cast_as(CastingTime::BonusAction)
            .with_area(AreaShape::Circle { radius: 6 }),
    ]
}

fn standard_special_actions() -> Vec<ActionDefinition> {
    vec![
        ActionDefinition::new("second_wind", "Second Wind", ActionCategory::Heal)
            .costing(ActionCost::BonusAction)
            .healing(DiceFormula::new(1, 10, 1), 0),
        ActionDefinition::new("claw", "Claw", ActionCategory::Attack).dealing(d(1, 6), 1),
        ActionDefinition::new("rock", "Hurl Rock", ActionCategory::Attack)
            .dealing(d(2, 10), 12)
            .provoking(),
    ]
}

fn stats(max_hp: u32, armor_class: i32, level: u32, abilities: AbilityScores) -> BaseStats {
    BaseStats {
        max_hp,
        armor_class,
        speed: 6,
        level,
        proficiency_bonus: 2 + (level.saturating_sub(1) / 4) as i32,
        abilities,
        spellcasting: None,
    }
}

fn standard_templates() -> Vec<CombatantTemplate> {
    let caster = |mut base: BaseStats, ability: Ability| {
        base.spellcasting = Some(ability);
        base
    };

    vec![
        CombatantTemplate::new("fighter", "Fighter", Faction::Ally, stats(28, 18, 3, AbilityScores::new(16, 12, 14, 10, 12, 10)))
            .with_weapons(&["longsword", "longbow"])
            .with_actions(&["second_wind"])
            .with_behavior("defensive"),
        CombatantTemplate::new("rogue", "Rogue", Faction::Ally, stats(21, 14, 3, AbilityScores::new(10, 17, 12, 12, 12, 14)))
            .with_weapons(&["rapier", "shortbow"])
            .with_behavior("skirmisher"),
        CombatantTemplate::new(
            "wizard",
            "Wizard",
            Faction::Ally,
            caster(stats(17, 12, 5, AbilityScores::new(8, 14, 13, 17, 12, 10)), Ability::Intelligence),
        )
        .with_weapons(&["quarterstaff"])
        .with_spells(&["fire_bolt", "ray_of_frost", "magic_missile", "burning_hands", "thunderwave", "shatter", "fireball", "lightning_bolt", "hold_person"])
        .with_slots(SpellSlots::from_levels(&[(1, 4), (2, 3), (3, 2)]))
        .with_behavior("tactical"),
        CombatantTemplate::new(
            "cleric",
            "Cleric",
            Faction::Ally,
            caster(stats(24, 16, 3, AbilityScores::new(14, 10, 13, 10, 16, 12)), Ability::Wisdom),
        )
        .with_weapons(&["mace"])
        .with_spells(&["sacred_flame", "cure_wounds", "healing_word", "guiding_bolt", "inflict_wounds", "hold_person"])
        .with_slots(SpellSlots::from_levels(&[(1, 4), (2, 2)]))
        .with_behavior("support"),
        CombatantTemplate::new("goblin", "Goblin", Faction::Enemy, stats(7, 15, 1, AbilityScores::new(8, 14, 10, 10, 8, 8)))
            .with_weapons(&["scimitar", "shortbow"])
            .with_behavior("cowardly"),
        CombatantTemplate::new("orc", "Orc", Faction::Enemy, stats(15, 13, 1, AbilityScores::new(16, 12, 16, 7, 11, 10)))
            .with_weapons(&["greataxe", "spear"])
            .with_behavior("aggressive"),
        CombatantTemplate::new("wolf", "Wolf", Faction::Enemy, stats(11, 13, 1, AbilityScores::new(12, 15, 12, 3, 12, 6)))
            .with_weapons(&["bite"])
            .with_behavior("aggressive"),
        CombatantTemplate::new("skeleton", "Skeleton", Faction::Enemy, stats(13, 13, 1, AbilityScores::new(10, 14, 15, 6, 8, 5)))
            .with_weapons(&["shortsword", "shortbow"])
            .with_behavior("tactical"),
        CombatantTemplate::new("ogre", "Ogre", Faction::Enemy, stats(59, 11, 5, AbilityScores::new(19, 8, 16, 5, 7, 7)))
            .with_weapons(&["greatclub"])
            .with_actions(&["rock"])
            .with_behavior("berserker"),
        CombatantTemplate::new(
            "cultist",
            "Cult Fanatic",
            Faction::Enemy,
            caster(stats(33, 13, 4, AbilityScores::new(11, 14, 12, 10, 13, 14)), Ability::Wisdom),
        )
        .with_weapons(&["dagger"])
        .with_spells(&["sacred_flame", "inflict_wounds", "hold_person", "cure_wounds"])
        .with_slots(SpellSlots::from_levels(&[(1, 4), (2, 3)]))
        .with_behavior("support"),
    ]
}
