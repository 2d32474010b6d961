//! Combatant templates: characters and monsters spawned during setup.

use crate::state::{
    ActionId, BaseStats, Combatant, EntityId, Faction, Position, SpellId, SpellSlots, TemplateId,
    WeaponId,
};

/// Oracle resolving template ids to stat blocks.
pub trait TemplateOracle: Send + Sync {
    fn template(&self, id: &TemplateId) -> Option<&CombatantTemplate>;
}

/// Stat block and equipment shared by every combatant spawned from it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatantTemplate {
    pub id: TemplateId,
    pub name: String,
    pub faction: Faction,
    pub base: BaseStats,
    pub slots: SpellSlots,
    pub weapons: Vec<WeaponId>,
    pub spells: Vec<SpellId>,
    pub actions: Vec<ActionId>,
    pub behavior: Option<String>,
}

impl CombatantTemplate {
    pub fn new(id: impl Into<TemplateId>, name: &str, faction: Faction, base: BaseStats) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            faction,
            base,
            slots: SpellSlots::default(),
            weapons: Vec::new(),
            spells: Vec::new(),
            actions: Vec::new(),
            behavior: None,
        }
    }

    pub fn with_weapons(mut self, weapons: &[&str]) -> Self {
        self.weapons.extend(weapons.iter().map(|&w| WeaponId::from(w)));
        self
    }

    pub fn with_spells(mut self, spells: &[&str]) -> Self {
        self.spells.extend(spells.iter().map(|&s| SpellId::from(s)));
        self
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.actions.extend(actions.iter().map(|&a| ActionId::from(a)));
        self
    }

    pub fn with_slots(mut self, slots: SpellSlots) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_behavior(mut self, behavior: &str) -> Self {
        self.behavior = Some(behavior.to_owned());
        self
    }

    /// Spawns a full-health combatant from this template.
    pub fn spawn(&self, id: EntityId, name: Option<&str>, faction: Option<Faction>, position: Position) -> Combatant {
        let mut combatant = Combatant::new(
            id,
            name.unwrap_or(&self.name),
            faction.unwrap_or(self.faction),
            self.base.clone(),
        )
        .at(position)
        .with_slots(self.slots);
        combatant.weapons = self.weapons.clone();
        combatant.spells = self.spells.clone();
        combatant.actions = self.actions.clone();
        combatant.template = Some(self.id.clone());
        combatant.behavior = self.behavior.clone();
        combatant
    }
}
