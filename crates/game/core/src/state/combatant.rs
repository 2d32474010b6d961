//! Combatant records and their per-turn resources.
//!
//! A [`Combatant`] is created once during setup and afterwards only ever
//! replaced by [`CombatState`](super::CombatState) transitions. The setters
//! here are crate-private building blocks for those transitions.

use std::fmt;

use bitflags::bitflags;

use super::common::{ActionId, EntityId, Position, SpellId, TemplateId, WeaponId};
use crate::config::CombatConfig;
use crate::dice::ability_modifier;

/// The six ability scores.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityScores {
    pub const fn new(
        strength: i32,
        dexterity: i32,
        constitution: i32,
        intelligence: i32,
        wisdom: i32,
        charisma: i32,
    ) -> Self {
        Self {
            strength,
            dexterity,
            constitution,
            intelligence,
            wisdom,
            charisma,
        }
    }

    pub const fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub const fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.score(ability))
    }
}

impl Default for AbilityScores {
    /// All tens: every modifier is zero.
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// Stats fixed for the whole encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaseStats {
    pub max_hp: u32,
    pub armor_class: i32,
    /// Movement per turn in grid squares.
    pub speed: u32,
    pub level: u32,
    pub proficiency_bonus: i32,
    pub abilities: AbilityScores,
    pub spellcasting: Option<Ability>,
}

impl BaseStats {
    pub fn modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    /// Spellcasting ability modifier, or zero for non-casters.
    pub fn spellcasting_modifier(&self) -> i32 {
        self.spellcasting.map_or(0, |ability| self.modifier(ability))
    }

    /// Save DC for spells: 8 + proficiency + spellcasting modifier.
    pub fn spell_save_dc(&self) -> i32 {
        8 + self.proficiency_bonus + self.spellcasting_modifier()
    }

    /// Passive Perception: 10 + Wisdom modifier.
    pub fn passive_perception(&self) -> i32 {
        10 + self.modifier(Ability::Wisdom)
    }
}

impl Default for BaseStats {
    fn default() -> Self {
        Self {
            max_hp: 10,
            armor_class: 10,
            speed: 6,
            level: 1,
            proficiency_bonus: 2,
            abilities: AbilityScores::default(),
            spellcasting: None,
        }
    }
}

/// Side a combatant fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Faction {
    Player,
    Ally,
    Enemy,
}

impl Faction {
    /// Player and ally factions fight on the same side.
    pub const fn is_party(self) -> bool {
        matches!(self, Faction::Player | Faction::Ally)
    }

    pub const fn is_hostile_to(self, other: Faction) -> bool {
        self.is_party() != other.is_party()
    }
}

/// Resource an operation draws from the per-turn action budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionCost {
    Action,
    BonusAction,
    Reaction,
    Movement(u32),
    Free,
}

/// Per-turn action economy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionBudget {
    pub action: bool,
    pub bonus_action: bool,
    pub reaction: bool,
    pub movement: u32,
}

impl ActionBudget {
    /// A full budget for a combatant with the given speed.
    pub const fn full(speed: u32) -> Self {
        Self {
            action: true,
            bonus_action: true,
            reaction: true,
            movement: speed,
        }
    }

    pub const fn exhausted() -> Self {
        Self {
            action: false,
            bonus_action: false,
            reaction: false,
            movement: 0,
        }
    }

    pub const fn allows(&self, cost: ActionCost) -> bool {
        match cost {
            ActionCost::Action => self.action,
            ActionCost::BonusAction => self.bonus_action,
            ActionCost::Reaction => self.reaction,
            ActionCost::Movement(amount) => self.movement >= amount,
            ActionCost::Free => true,
        }
    }

    /// Returns the budget after paying `cost`, or `None` if it cannot be paid.
    pub const fn spend(self, cost: ActionCost) -> Option<Self> {
        if !self.allows(cost) {
            return None;
        }
        let mut next = self;
        match cost {
            ActionCost::Action => next.action = false,
            ActionCost::BonusAction => next.bonus_action = false,
            ActionCost::Reaction => next.reaction = false,
            ActionCost::Movement(amount) => next.movement -= amount,
            ActionCost::Free => {}
        }
        Some(next)
    }
}

/// Spell slot pool indexed by level 0 (cantrips, unused) through 9.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellSlots {
    current: [u8; CombatConfig::SPELL_LEVELS],
    maximum: [u8; CombatConfig::SPELL_LEVELS],
}

impl SpellSlots {
    /// Builds a full pool from per-level maximums (index = spell level).
    pub fn new(maximum: [u8; CombatConfig::SPELL_LEVELS]) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Builds a pool from `(level, count)` pairs.
    pub fn from_levels(levels: &[(u8, u8)]) -> Self {
        let mut maximum = [0; CombatConfig::SPELL_LEVELS];
        for &(level, count) in levels {
            if let Some(slot) = maximum.get_mut(level as usize) {
                *slot = count;
            }
        }
        Self::new(maximum)
    }

    pub fn remaining(&self, level: u8) -> u8 {
        self.current.get(level as usize).copied().unwrap_or(0)
    }

    pub fn maximum(&self, level: u8) -> u8 {
        self.maximum.get(level as usize).copied().unwrap_or(0)
    }

    pub fn has(&self, level: u8) -> bool {
        self.remaining(level) > 0
    }

    /// Total remaining slots across levels 1-9.
    pub fn total_remaining(&self) -> u32 {
        self.current.iter().skip(1).map(|&n| u32::from(n)).sum()
    }

    pub fn total_maximum(&self) -> u32 {
        self.maximum.iter().skip(1).map(|&n| u32::from(n)).sum()
    }

    /// Lowest level at or above `min_level` with a slot left.
    pub fn lowest_available(&self, min_level: u8) -> Option<u8> {
        (min_level.max(1)..CombatConfig::SPELL_LEVELS as u8).find(|&level| self.has(level))
    }

    /// Returns the pool with one slot of `level` spent.
    pub fn spend(self, level: u8) -> Option<Self> {
        if level == 0 || !self.has(level) {
            return None;
        }
        let mut next = self;
        next.current[level as usize] -= 1;
        Some(next)
    }
}

bitflags! {
    /// Condition tags carried by a combatant.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Conditions: u32 {
        const BLINDED = 1 << 0;
        const CHARMED = 1 << 1;
        const FRIGHTENED = 1 << 2;
        const GRAPPLED = 1 << 3;
        const INCAPACITATED = 1 << 4;
        const INVISIBLE = 1 << 5;
        const PARALYZED = 1 << 6;
        const POISONED = 1 << 7;
        const PRONE = 1 << 8;
        const RESTRAINED = 1 << 9;
        const STUNNED = 1 << 10;
        const UNCONSCIOUS = 1 << 11;
        /// Took the Dodge action; attacks against it have disadvantage.
        const DODGING = 1 << 12;
        /// Took the Disengage action; provokes no opportunity attacks.
        const DISENGAGED = 1 << 13;
        /// Successfully hidden; next attack has advantage.
        const HIDDEN = 1 << 14;
        /// Received the Help action; next attack has advantage.
        const HELPED = 1 << 15;
    }
}

impl Conditions {
    /// Conditions that last only until the combatant's budget is refreshed.
    pub const TURN_SCOPED: Self = Self::DODGING.union(Self::DISENGAGED);

    /// Conditions that prevent taking actions or reactions.
    pub const DISABLING: Self = Self::INCAPACITATED
        .union(Self::PARALYZED)
        .union(Self::STUNNED)
        .union(Self::UNCONSCIOUS);

    /// Conditions that give attackers advantage.
    pub const EXPOSED: Self = Self::RESTRAINED
        .union(Self::STUNNED)
        .union(Self::PARALYZED)
        .union(Self::UNCONSCIOUS);

    /// Conditions that give the affected attacker disadvantage.
    pub const HAMPERED: Self = Self::BLINDED
        .union(Self::POISONED)
        .union(Self::FRIGHTENED)
        .union(Self::PRONE);

    pub fn is_disabled(self) -> bool {
        self.intersects(Self::DISABLING)
    }
}

/// Lifecycle flags of a combatant.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatantStatus {
    pub active: bool,
    pub dead: bool,
    pub conditions: Conditions,
    /// Spell the combatant is concentrating on.
    pub concentration: Option<SpellId>,
}

/// A participant in the encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Combatant {
    pub id: EntityId,
    pub name: String,
    pub faction: Faction,
    pub base: BaseStats,

    pub hp: u32,
    pub position: Position,
    pub initiative: i32,
    pub budget: ActionBudget,
    pub slots: SpellSlots,

    pub actions: Vec<ActionId>,
    pub spells: Vec<SpellId>,
    pub weapons: Vec<WeaponId>,
    pub status: CombatantStatus,

    /// Template this combatant was built from, if any.
    pub template: Option<TemplateId>,
    /// Behavior archetype tag consulted by the AI.
    pub behavior: Option<String>,
}

impl Combatant {
    /// Creates an active, full-health combatant with a full budget.
    pub fn new(id: EntityId, name: impl Into<String>, faction: Faction, base: BaseStats) -> Self {
        let hp = base.max_hp;
        let budget = ActionBudget::full(base.speed);
        Self {
            id,
            name: name.into(),
            faction,
            base,
            hp,
            position: Position::ORIGIN,
            initiative: 0,
            budget,
            slots: SpellSlots::default(),
            actions: Vec::new(),
            spells: Vec::new(),
            weapons: Vec::new(),
            status: CombatantStatus {
                active: true,
                ..CombatantStatus::default()
            },
            template: None,
            behavior: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_initiative(mut self, initiative: i32) -> Self {
        self.initiative = initiative;
        self
    }

    pub fn with_slots(mut self, slots: SpellSlots) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_weapon(mut self, weapon: impl Into<WeaponId>) -> Self {
        self.weapons.push(weapon.into());
        self
    }

    pub fn with_spell(mut self, spell: impl Into<SpellId>) -> Self {
        self.spells.push(spell.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<ActionId>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn with_behavior(mut self, behavior: impl Into<String>) -> Self {
        self.behavior = Some(behavior.into());
        self
    }

    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = hp.min(self.base.max_hp);
        self.status.dead = self.hp == 0;
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.status.conditions |= conditions;
        self
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.status.dead
    }

    /// Alive and taking part in the encounter.
    #[inline]
    pub fn is_standing(&self) -> bool {
        self.status.active && !self.status.dead
    }

    pub fn conditions(&self) -> Conditions {
        self.status.conditions
    }

    /// Current HP as a fraction of maximum (0.0-1.0).
    pub fn hp_fraction(&self) -> f32 {
        if self.base.max_hp == 0 {
            return 0.0;
        }
        self.hp as f32 / self.base.max_hp as f32
    }

    /// Current HP as a whole percentage (0-100).
    pub fn hp_percent(&self) -> u32 {
        if self.base.max_hp == 0 {
            return 0;
        }
        (self.hp * 100) / self.base.max_hp
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        self.base.modifier(ability)
    }

    pub fn is_hostile_to(&self, other: &Combatant) -> bool {
        self.faction.is_hostile_to(other.faction)
    }

    pub fn knows_spell(&self, spell: &SpellId) -> bool {
        self.spells.contains(spell)
    }

    pub fn carries_weapon(&self, weapon: &WeaponId) -> bool {
        self.weapons.contains(weapon)
    }

    pub fn knows_action(&self, action: &ActionId) -> bool {
        self.actions.contains(action)
    }

    // ===== transition building blocks =====

    /// HP after taking `amount` damage, clamped at zero; zero HP means dead.
    pub(crate) fn damaged(&self, amount: u32) -> Self {
        let mut next = self.clone();
        next.hp = self.hp.saturating_sub(amount);
        if next.hp == 0 {
            next.status.dead = true;
            next.status.concentration = None;
            next.budget = ActionBudget::exhausted();
        }
        next
    }

    /// HP after healing `amount`, clamped at maximum.
    pub(crate) fn healed(&self, amount: u32) -> Self {
        let mut next = self.clone();
        next.hp = self.hp.saturating_add(amount).min(self.base.max_hp);
        next.status.dead = next.hp == 0;
        next
    }

    /// Refreshes the action budget and drops turn-scoped conditions.
    pub(crate) fn refreshed(&self) -> Self {
        let mut next = self.clone();
        if next.is_alive() {
            next.budget = ActionBudget::full(self.base.speed);
        }
        next.status.conditions.remove(Conditions::TURN_SCOPED);
        next
    }
}

impl fmt::Display for Combatant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] hp {}/{} at {}",
            self.id, self.name, self.faction, self.hp, self.base.max_hp, self.position
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter() -> Combatant {
        Combatant::new(EntityId(1), "Fighter", Faction::Player, BaseStats::default())
    }

    #[test]
    fn damage_to_zero_marks_dead() {
        let hurt = fighter().damaged(15);
        assert_eq!(hurt.hp, 0);
        assert!(hurt.status.dead);
        assert_eq!(hurt.budget, ActionBudget::exhausted());
    }

    #[test]
    fn healing_clamps_to_maximum() {
        let healed = fighter().damaged(4).healed(50);
        assert_eq!(healed.hp, 10);
        assert!(!healed.status.dead);
    }

    #[test]
    fn budget_spend_rejects_missing_resource() {
        let budget = ActionBudget::full(6);
        let spent = budget.spend(ActionCost::Action).unwrap();
        assert!(!spent.action);
        assert!(spent.spend(ActionCost::Action).is_none());
        assert_eq!(spent.spend(ActionCost::Movement(4)).unwrap().movement, 2);
        assert!(spent.spend(ActionCost::Movement(7)).is_none());
    }

    #[test]
    fn slots_spend_and_search_upward() {
        let slots = SpellSlots::from_levels(&[(1, 2), (3, 1)]);
        assert_eq!(slots.lowest_available(2), Some(3));
        let slots = slots.spend(3).unwrap();
        assert_eq!(slots.remaining(3), 0);
        assert_eq!(slots.lowest_available(2), None);
        assert!(slots.spend(3).is_none());
        assert!(slots.spend(0).is_none());
        assert_eq!(slots.total_remaining(), 2);
    }

    #[test]
    fn factions_split_into_two_sides() {
        assert!(Faction::Player.is_hostile_to(Faction::Enemy));
        assert!(!Faction::Player.is_hostile_to(Faction::Ally));
        assert!(Faction::Enemy.is_hostile_to(Faction::Ally));
    }
}
