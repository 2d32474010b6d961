//! Weapon catalog interface.

use bitflags::bitflags;

use crate::config::CombatConfig;
use crate::rules::DiceFormula;
use crate::state::WeaponId;

/// Oracle resolving weapon ids to definitions.
pub trait WeaponOracle: Send + Sync {
    fn weapon(&self, id: &WeaponId) -> Option<&WeaponDefinition>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageType {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeaponKind {
    Melee,
    Ranged,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct WeaponProperties: u16 {
        /// Attacker may use Dexterity instead of Strength.
        const FINESSE = 1 << 0;
        /// Melee reach of two squares.
        const REACH = 1 << 1;
        /// Melee weapon that can also be thrown at its listed ranges.
        const THROWN = 1 << 2;
        const LIGHT = 1 << 3;
        const HEAVY = 1 << 4;
        const TWO_HANDED = 1 << 5;
        const AMMUNITION = 1 << 6;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponDefinition {
    pub id: WeaponId,
    pub name: String,
    pub kind: WeaponKind,
    pub damage: DiceFormula,
    pub damage_type: DamageType,
    pub properties: WeaponProperties,
    /// Normal range in squares for ranged or thrown use.
    pub normal_range: u32,
    /// Long range in squares; attacks past normal range have disadvantage.
    pub long_range: u32,
}

impl WeaponDefinition {
    pub fn melee(id: impl Into<WeaponId>, name: &str, damage: DiceFormula, damage_type: DamageType) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            kind: WeaponKind::Melee,
            damage,
            damage_type,
            properties: WeaponProperties::empty(),
            normal_range: 0,
            long_range: 0,
        }
    }

    pub fn ranged(
        id: impl Into<WeaponId>,
        name: &str,
        damage: DiceFormula,
        damage_type: DamageType,
        normal_range: u32,
        long_range: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            kind: WeaponKind::Ranged,
            damage,
            damage_type,
            properties: WeaponProperties::AMMUNITION,
            normal_range,
            long_range: long_range.max(normal_range),
        }
    }

    pub fn with_properties(mut self, properties: WeaponProperties) -> Self {
        self.properties |= properties;
        self
    }

    /// Thrown range for a melee weapon with the thrown property.
    pub fn with_thrown_range(mut self, normal_range: u32, long_range: u32) -> Self {
        self.properties |= WeaponProperties::THROWN;
        self.normal_range = normal_range;
        self.long_range = long_range.max(normal_range);
        self
    }

    pub fn is_melee(&self) -> bool {
        self.kind == WeaponKind::Melee
    }

    pub fn is_finesse(&self) -> bool {
        self.properties.contains(WeaponProperties::FINESSE)
    }

    /// Melee reach in squares; zero for ranged weapons.
    pub fn reach(&self) -> u32 {
        match self.kind {
            WeaponKind::Ranged => 0,
            WeaponKind::Melee if self.properties.contains(WeaponProperties::REACH) => {
                CombatConfig::EXTENDED_REACH
            }
            WeaponKind::Melee => CombatConfig::MELEE_REACH,
        }
    }

    /// Farthest distance at which the weapon can attack at all.
    pub fn max_range(&self) -> u32 {
        match self.kind {
            WeaponKind::Ranged => self.long_range,
            WeaponKind::Melee if self.properties.contains(WeaponProperties::THROWN) => {
                self.reach().max(self.long_range)
            }
            WeaponKind::Melee => self.reach(),
        }
    }

    /// Whether an attack at `distance` is a ranged attack.
    pub fn is_ranged_at(&self, distance: u32) -> bool {
        match self.kind {
            WeaponKind::Ranged => true,
            WeaponKind::Melee => distance > self.reach(),
        }
    }

    /// Whether `distance` lies past normal range (disadvantage).
    pub fn is_long_range(&self, distance: u32) -> bool {
        self.is_ranged_at(distance) && distance > self.normal_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thrown_melee_weapons_reach_their_long_range() {
        let dagger = WeaponDefinition::melee("dagger", "Dagger", DiceFormula::new(1, 4, 0), DamageType::Piercing)
            .with_properties(WeaponProperties::FINESSE | WeaponProperties::LIGHT)
            .with_thrown_range(4, 12);
        assert_eq!(dagger.reach(), 1);
        assert_eq!(dagger.max_range(), 12);
        assert!(!dagger.is_ranged_at(1));
        assert!(dagger.is_long_range(6));
    }

    #[test]
    fn reach_weapons_extend_melee() {
        let glaive = WeaponDefinition::melee("glaive", "Glaive", DiceFormula::new(1, 10, 0), DamageType::Slashing)
            .with_properties(WeaponProperties::REACH | WeaponProperties::HEAVY);
        assert_eq!(glaive.reach(), 2);
        assert_eq!(glaive.max_range(), 2);
    }
}
