//! Scenario files: an encounter description plus optional replay seed.
//!
//! Scenarios are written in RON. The encounter section is a plain
//! [`EncounterBuilder`], so templates, placements, grid size and terrain
//! overrides all come from the file while stats come from the catalog.
//!
//! ```ron
//! #![enable(unwrap_newtypes, implicit_some)]
//! (
//!     name: "ambush",
//!     encounter: (
//!         id: "ambush",
//!         width: 12,
//!         height: 8,
//!         entities: [
//!             (template: "fighter", position: (x: 1, y: 1)),
//!             (template: "goblin", position: (x: 6, y: 1), initiative: 12),
//!         ],
//!     ),
//! )
//! ```

use std::path::Path;

use combat_core::{CombatEnv, CombatState, DiceRoller, EncounterBuilder};
use serde::{Deserialize, Serialize};

use crate::api::{Result, RuntimeError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Dice seed used when the runtime configuration does not fix one.
    #[serde(default)]
    pub seed: Option<u64>,

    pub encounter: EncounterBuilder,
}

impl Scenario {
    pub fn new(name: impl Into<String>, encounter: EncounterBuilder) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            seed: None,
            encounter,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(RuntimeError::ScenarioIo)?;
        tracing::info!(path = %path.display(), "loading scenario");
        Self::from_ron(&source)
    }

    /// Spawns every placement, rolls initiative and starts combat.
    pub fn create_initial_state(
        &self,
        env: CombatEnv<'_>,
        dice: &mut dyn DiceRoller,
    ) -> Result<CombatState> {
        tracing::info!(
            scenario = %self.name,
            placements = self.encounter.entities.len(),
            width = self.encounter.width,
            height = self.encounter.height,
            "creating initial state"
        );
        let state = self.encounter.start(env, dice)?;
        for combatant in state.combatants() {
            tracing::debug!(
                entity = %combatant.id,
                name = %combatant.name,
                faction = %combatant.faction,
                position = %combatant.position,
                initiative = combatant.initiative,
                "placed"
            );
        }
        Ok(state)
    }
}
