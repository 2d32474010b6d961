//! Outcome reports produced by the resolver.

use std::fmt;

use crate::dice::D20Roll;
use crate::env::ActionCategory;
use crate::state::{Ability, ActionId, Conditions, EntityId, Position, SpellId};

/// An attack roll against armor class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackRoll {
    pub d20: D20Roll,
    pub bonus: i32,
    pub total: i32,
    /// Target AC including cover.
    pub armor_class: i32,
    pub hit: bool,
}

/// A d20 test against a DC: saving throws and the Hide check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityCheck {
    pub ability: Ability,
    pub natural: u32,
    pub bonus: i32,
    pub total: i32,
    pub dc: i32,
    pub success: bool,
}

/// Damage applied to one combatant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageReport {
    pub target: EntityId,
    pub amount: u32,
    pub remaining_hp: u32,
    pub killed: bool,
    /// The target was concentrating and failed to keep it.
    pub concentration_lost: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackOutcome {
    pub attacker: EntityId,
    pub target: EntityId,
    /// Weapon or action name.
    pub source: String,
    pub roll: AttackRoll,
    /// Present only on a hit.
    pub damage: Option<DamageReport>,
}

impl AttackOutcome {
    pub fn hit(&self) -> bool {
        self.roll.hit
    }

    pub fn damage_dealt(&self) -> u32 {
        self.damage.map_or(0, |d| d.amount)
    }
}

/// What a spell did to one affected combatant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellTargetOutcome {
    pub target: EntityId,
    pub attack: Option<AttackRoll>,
    pub save: Option<AbilityCheck>,
    pub damage: Option<DamageReport>,
    pub healed: u32,
    pub condition: Option<Conditions>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellOutcome {
    pub caster: EntityId,
    pub spell: SpellId,
    /// Slot spent; `None` for cantrips.
    pub slot: Option<u8>,
    /// Cells covered by an area spell.
    pub area: Vec<Position>,
    pub targets: Vec<SpellTargetOutcome>,
    /// Concentration spell dropped in favour of this one.
    pub replaced_concentration: Option<SpellId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovementOutcome {
    pub entity: EntityId,
    pub from: Position,
    pub to: Position,
    pub cost: u32,
    pub opportunity_attacks: Vec<AttackOutcome>,
    /// False when an opportunity attack dropped the mover before it left.
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StandardOutcome {
    pub actor: EntityId,
    pub action: ActionId,
    pub category: ActionCategory,
    pub target: Option<EntityId>,
    pub check: Option<AbilityCheck>,
    pub attack: Option<AttackOutcome>,
    pub healed: u32,
    pub success: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionOutcome {
    Attack(AttackOutcome),
    Spell(SpellOutcome),
    Movement(MovementOutcome),
    Standard(StandardOutcome),
}

impl ActionOutcome {
    pub fn actor(&self) -> EntityId {
        match self {
            ActionOutcome::Attack(o) => o.attacker,
            ActionOutcome::Spell(o) => o.caster,
            ActionOutcome::Movement(o) => o.entity,
            ActionOutcome::Standard(o) => o.actor,
        }
    }

    /// Sum of damage dealt by the action itself, opportunity attacks excluded.
    pub fn damage_dealt(&self) -> u32 {
        match self {
            ActionOutcome::Attack(o) => o.damage_dealt(),
            ActionOutcome::Spell(o) => o
                .targets
                .iter()
                .map(|t| t.damage.map_or(0, |d| d.amount))
                .sum(),
            ActionOutcome::Movement(_) => 0,
            ActionOutcome::Standard(o) => o.attack.as_ref().map_or(0, AttackOutcome::damage_dealt),
        }
    }

    pub fn healing_done(&self) -> u32 {
        match self {
            ActionOutcome::Spell(o) => o.targets.iter().map(|t| t.healed).sum(),
            ActionOutcome::Standard(o) => o.healed,
            _ => 0,
        }
    }

    /// Combatants killed by this action, opportunity attacks included.
    pub fn killed(&self) -> Vec<EntityId> {
        let reports: Vec<DamageReport> = match self {
            ActionOutcome::Attack(o) => o.damage.into_iter().collect(),
            ActionOutcome::Spell(o) => o.targets.iter().filter_map(|t| t.damage).collect(),
            ActionOutcome::Movement(o) => o
                .opportunity_attacks
                .iter()
                .filter_map(|a| a.damage)
                .collect(),
            ActionOutcome::Standard(o) => o.attack.iter().filter_map(|a| a.damage).collect(),
        };
        reports
            .into_iter()
            .filter(|d| d.killed)
            .map(|d| d.target)
            .collect()
    }
}

impl fmt::Display for AttackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attacks {} with {}: {} vs AC {}",
            self.attacker, self.target, self.source, self.roll.total, self.roll.armor_class
        )?;
        match self.damage {
            Some(d) if d.killed => write!(f, ", hit for {} (down)", d.amount),
            Some(d) => write!(f, ", hit for {} ({} hp left)", d.amount, d.remaining_hp),
            None => f.write_str(", miss"),
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Attack(o) => o.fmt(f),
            ActionOutcome::Spell(o) => {
                write!(f, "{} casts {}", o.caster, o.spell)?;
                if let Some(slot) = o.slot {
                    write!(f, " (level {slot})")?;
                }
                let damage = self.damage_dealt();
                let healing = self.healing_done();
                write!(f, " on {} target(s)", o.targets.len())?;
                if damage > 0 {
                    write!(f, ", {damage} damage")?;
                }
                if healing > 0 {
                    write!(f, ", {healing} healed")?;
                }
                Ok(())
            }
            ActionOutcome::Movement(o) => {
                if o.completed {
                    write!(f, "{} moves {} -> {} ({} squares)", o.entity, o.from, o.to, o.cost)?;
                } else {
                    write!(f, "{} falls leaving {}", o.entity, o.from)?;
                }
                for attack in &o.opportunity_attacks {
                    write!(f, "; opportunity: {attack}")?;
                }
                Ok(())
            }
            ActionOutcome::Standard(o) => {
                write!(f, "{} takes {} ({})", o.actor, o.action, o.category)?;
                if let Some(target) = o.target {
                    write!(f, " on {target}")?;
                }
                if let Some(attack) = &o.attack {
                    write!(f, ": {attack}")?;
                } else if o.healed > 0 {
                    write!(f, ": {} healed", o.healed)?;
                } else if !o.success {
                    f.write_str(": failed")?;
                }
                Ok(())
            }
        }
    }
}
