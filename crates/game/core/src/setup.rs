//! Encounter setup: grid, placements and initiative.
//!
//! An [`EncounterBuilder`] is a plain description of an encounter. Building
//! it spawns every [`EntitySpec`] from its template, allocating entity ids in
//! placement order starting at 1, then rolls initiative for each combatant
//! that does not carry a fixed value.

use crate::config::CombatConfig;
use crate::dice::DiceRoller;
use crate::env::CombatEnv;
use crate::error::CombatError;
use crate::grid::{CellOverride, TacticalGrid};
use crate::initiative::roll_initiative;
use crate::state::{CombatState, EncounterId, EntityId, Faction, Position, TemplateId};

/// One combatant to place.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySpec {
    pub template: TemplateId,
    pub position: Position,
    /// Overrides the template name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    /// Overrides the template faction.
    #[cfg_attr(feature = "serde", serde(default))]
    pub faction: Option<Faction>,
    /// Overrides the template behavior preset.
    #[cfg_attr(feature = "serde", serde(default))]
    pub behavior: Option<String>,
    /// Skips the initiative roll.
    #[cfg_attr(feature = "serde", serde(default))]
    pub initiative: Option<i32>,
}

impl EntitySpec {
    pub fn new(template: impl Into<TemplateId>, position: Position) -> Self {
        Self {
            template: template.into(),
            position,
            name: None,
            faction: None,
            behavior: None,
            initiative: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn faction(mut self, faction: Faction) -> Self {
        self.faction = Some(faction);
        self
    }

    pub fn behavior(mut self, behavior: impl Into<String>) -> Self {
        self.behavior = Some(behavior.into());
        self
    }

    pub fn initiative(mut self, initiative: i32) -> Self {
        self.initiative = Some(initiative);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncounterBuilder {
    pub id: EncounterId,
    pub width: u32,
    pub height: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cells: Vec<CellOverride>,
    pub entities: Vec<EntitySpec>,
}

impl EncounterBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: EncounterId::new(id),
            width: CombatConfig::DEFAULT_GRID_WIDTH,
            height: CombatConfig::DEFAULT_GRID_HEIGHT,
            cells: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn cell(mut self, cell: CellOverride) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn entity(mut self, spec: EntitySpec) -> Self {
        self.entities.push(spec);
        self
    }

    /// Builds the encounter in the setup phase, initiative already rolled.
    pub fn build(&self, env: CombatEnv<'_>, dice: &mut dyn DiceRoller) -> Result<CombatState, CombatError> {
        let mut grid = TacticalGrid::new(self.width, self.height);
        for cell in &self.cells {
            grid.apply_override(cell)?;
        }

        let mut state = CombatState::new(self.id.clone(), grid);
        for (index, spec) in self.entities.iter().enumerate() {
            let template = env.template(&spec.template)?;
            let mut combatant = template.spawn(
                EntityId(index as u32 + 1),
                spec.name.as_deref(),
                spec.faction,
                spec.position,
            );
            if let Some(behavior) = &spec.behavior {
                combatant.behavior = Some(behavior.clone());
            }
            state = state.add_entity(combatant)?;
        }

        for (index, spec) in self.entities.iter().enumerate() {
            let id = EntityId(index as u32 + 1);
            let value = match spec.initiative {
                Some(fixed) => fixed,
                None => roll_initiative(state.get(id)?, dice),
            };
            state = state.with_initiative(id, value)?;
        }
        state.calculate_initiative_order()
    }

    /// Builds the encounter and starts combat.
    pub fn start(&self, env: CombatEnv<'_>, dice: &mut dyn DiceRoller) -> Result<CombatState, CombatError> {
        self.build(env, dice)?.start_combat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::env::Catalog;
    use crate::grid::{Cover, Terrain};
    use crate::state::Phase;

    #[test]
    fn spawns_templates_in_placement_order() {
        let catalog = Catalog::standard();
        let builder = EncounterBuilder::new("ambush")
            .size(10, 6)
            .cell(CellOverride {
                position: Position::new(5, 2),
                terrain: Terrain::Normal,
                cover: Cover::Half,
                visible: true,
            })
            .entity(EntitySpec::new("fighter", Position::new(1, 1)).named("Aldric").initiative(15))
            .entity(EntitySpec::new("goblin", Position::new(8, 4)).initiative(12));
        let mut dice = ScriptedDice::new([]);
        let state = builder.start(catalog.env(), &mut dice).unwrap();

        assert_eq!(state.phase(), Phase::Active);
        assert_eq!(state.initiative_order(), &[EntityId(1), EntityId(2)]);
        assert_eq!(state.combatant(EntityId(1)).unwrap().name, "Aldric");
        assert_eq!(state.combatant(EntityId(2)).unwrap().faction, Faction::Enemy);
        assert_eq!(state.grid().cell(Position::new(5, 2)).unwrap().cover, Cover::Half);
        assert_eq!(dice.rolled(), 0);
    }

    #[test]
    fn rolls_initiative_when_not_fixed() {
        let catalog = Catalog::standard();
        let builder = EncounterBuilder::new("duel")
            .entity(EntitySpec::new("fighter", Position::new(0, 0)))
            .entity(EntitySpec::new("orc", Position::new(3, 0)));
        let mut dice = ScriptedDice::new([2, 19]);
        let state = builder.build(catalog.env(), &mut dice).unwrap();
        assert_eq!(state.phase(), Phase::Setup);
        assert_eq!(state.initiative_order()[0], EntityId(2));
    }

    #[test]
    fn unknown_template_and_overlap_are_rejected() {
        let catalog = Catalog::standard();
        let mut dice = ScriptedDice::new([]);
        let missing = EncounterBuilder::new("x").entity(EntitySpec::new("dragon", Position::new(0, 0)));
        assert!(matches!(
            missing.build(catalog.env(), &mut dice),
            Err(CombatError::UnknownTemplate(_))
        ));

        let stacked = EncounterBuilder::new("y")
            .entity(EntitySpec::new("goblin", Position::new(2, 2)))
            .entity(EntitySpec::new("goblin", Position::new(2, 2)));
        assert!(matches!(
            stacked.build(catalog.env(), &mut dice),
            Err(CombatError::CellOccupied { .. })
        ));
    }
}
