//! Spell catalog interface.

use bitflags::bitflags;

use super::weapons::DamageType;
use crate::grid::AreaShape;
use crate::rules::DiceFormula;
use crate::state::{Ability, ActionCost, Conditions, SpellId};

/// Oracle resolving spell ids to definitions.
pub trait SpellOracle: Send + Sync {
    fn spell(&self, id: &SpellId) -> Option<&SpellDefinition>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellSchool {
    Abjuration,
    Conjuration,
    Divination,
    Enchantment,
    Evocation,
    Illusion,
    Necromancy,
    Transmutation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastingTime {
    Action,
    BonusAction,
    Reaction,
    /// One minute or more; not castable during combat.
    Longer,
}

impl CastingTime {
    /// Budget resource the casting draws from; `None` for long castings.
    pub const fn cost(self) -> Option<ActionCost> {
        match self {
            CastingTime::Action => Some(ActionCost::Action),
            CastingTime::BonusAction => Some(ActionCost::BonusAction),
            CastingTime::Reaction => Some(ActionCost::Reaction),
            CastingTime::Longer => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellDuration {
    Instantaneous,
    Rounds(u32),
    Minutes(u32),
    Hours(u32),
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Components: u8 {
        const VERBAL = 1 << 0;
        const SOMATIC = 1 << 1;
        const MATERIAL = 1 << 2;
    }
}

/// How a spell decides whether it lands on each target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellResolution {
    /// Always takes effect.
    Automatic,
    /// Spell attack roll against the target's AC.
    AttackRoll,
    /// Target rolls a save against the caster's spell DC.
    Save {
        ability: Ability,
        /// Successful saves take half damage instead of none.
        half_on_success: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellEffect {
    pub resolution: SpellResolution,
    pub damage: Option<DiceFormula>,
    pub damage_type: Option<DamageType>,
    pub healing: Option<DiceFormula>,
    /// Extra dice added per slot level above the spell's own level.
    pub upcast_dice: u32,
    /// Whether the spellcasting modifier is added to the damage or healing roll.
    pub add_modifier: bool,
    /// Condition applied to a target the spell lands on.
    pub condition: Option<Conditions>,
}

impl SpellEffect {
    pub fn damage(resolution: SpellResolution, formula: DiceFormula, damage_type: DamageType) -> Self {
        Self {
            resolution,
            damage: Some(formula),
            damage_type: Some(damage_type),
            healing: None,
            upcast_dice: 0,
            add_modifier: false,
            condition: None,
        }
    }

    pub fn healing(formula: DiceFormula) -> Self {
        Self {
            resolution: SpellResolution::Automatic,
            damage: None,
            damage_type: None,
            healing: Some(formula),
            upcast_dice: 0,
            add_modifier: true,
            condition: None,
        }
    }

    pub fn condition(resolution: SpellResolution, condition: Conditions) -> Self {
        Self {
            resolution,
            damage: None,
            damage_type: None,
            healing: None,
            upcast_dice: 0,
            add_modifier: false,
            condition: Some(condition),
        }
    }

    pub fn with_upcast(mut self, dice: u32) -> Self {
        self.upcast_dice = dice;
        self
    }

    pub fn with_modifier(mut self, add: bool) -> Self {
        self.add_modifier = add;
        self
    }

    pub fn with_condition(mut self, condition: Conditions) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_harmful(&self) -> bool {
        self.damage.is_some() || self.condition.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellDefinition {
    pub id: SpellId,
    pub name: String,
    /// 0 for cantrips, otherwise 1-9.
    pub level: u8,
    pub school: SpellSchool,
    pub casting_time: CastingTime,
    /// Range in squares; zero means the spell originates on the caster.
    pub range: u32,
    pub duration: SpellDuration,
    pub components: Components,
    pub effect: SpellEffect,
    pub area: Option<AreaShape>,
    pub concentration: bool,
    pub ritual: bool,
}

impl SpellDefinition {
    pub fn new(
        id: impl Into<SpellId>,
        name: &str,
        level: u8,
        school: SpellSchool,
        range: u32,
        effect: SpellEffect,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            level,
            school,
            casting_time: CastingTime::Action,
            range,
            duration: SpellDuration::Instantaneous,
            components: Components::VERBAL | Components::SOMATIC,
            effect,
            area: None,
            concentration: false,
            ritual: false,
        }
    }

    pub fn cast_as(mut self, casting_time: CastingTime) -> Self {
        self.casting_time = casting_time;
        self
    }

    pub fn with_area(mut self, area: AreaShape) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_duration(mut self, duration: SpellDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_components(mut self, components: Components) -> Self {
        self.components = components;
        self
    }

    pub fn concentration(mut self) -> Self {
        self.concentration = true;
        self
    }

    pub fn ritual(mut self) -> Self {
        self.ritual = true;
        self
    }

    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }

    pub fn is_healing(&self) -> bool {
        self.effect.healing.is_some()
    }

    /// Whether the caster must name a creature target.
    pub fn targets_creature(&self) -> bool {
        self.area.is_none() && (self.effect.is_harmful() || self.is_healing())
    }
}
