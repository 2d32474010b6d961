//! Plain, serializable image of a [`CombatState`].

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Combatant, CombatState, EncounterId, EntityId, Phase};
use crate::error::CombatError;
use crate::grid::{CellOverride, TacticalGrid};

/// Every field needed to rebuild a [`CombatState`] exactly.
///
/// Grid occupancy is not stored; it is derived from living combatants'
/// positions on restore.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatSnapshot {
    pub id: EncounterId,
    pub width: u32,
    pub height: u32,
    pub cells: Vec<CellOverride>,
    pub combatants: Vec<Combatant>,
    pub order: Vec<EntityId>,
    pub current: usize,
    pub round: u32,
    pub phase: Phase,
}

impl CombatState {
    pub fn snapshot(&self) -> CombatSnapshot {
        CombatSnapshot {
            id: self.id.clone(),
            width: self.grid.width(),
            height: self.grid.height(),
            cells: self.grid.overrides(),
            combatants: self.combatants().cloned().collect(),
            order: self.order.clone(),
            current: self.current,
            round: self.round,
            phase: self.phase,
        }
    }

    /// Rebuilds a state from a snapshot, re-checking every invariant.
    ///
    /// Snapshot data comes from outside, so a violation is returned as
    /// [`CombatError::InvariantViolation`] without asserting.
    pub fn restore(snapshot: CombatSnapshot) -> Result<Self, CombatError> {
        let reject = |message: String| Err(CombatError::InvariantViolation(message));

        let mut grid = TacticalGrid::new(snapshot.width, snapshot.height);
        if grid.width() != snapshot.width || grid.height() != snapshot.height {
            return reject(format!(
                "grid {}x{} is outside supported dimensions",
                snapshot.width, snapshot.height
            ));
        }
        for over in &snapshot.cells {
            grid.apply_override(over)?;
        }

        let mut entities = BTreeMap::new();
        for combatant in snapshot.combatants {
            if combatant.hp > combatant.base.max_hp || combatant.status.dead != (combatant.hp == 0) {
                return reject(format!(
                    "{} has inconsistent hp {}/{}",
                    combatant.id, combatant.hp, combatant.base.max_hp
                ));
            }
            if !grid.is_valid_position(combatant.position) {
                return reject(format!(
                    "{} stands outside the grid at {}",
                    combatant.id, combatant.position
                ));
            }
            if combatant.is_alive() {
                if let Err(err) = grid.occupy(combatant.position, combatant.id) {
                    return reject(format!("cannot place {}: {err}", combatant.id));
                }
            }
            let id = combatant.id;
            if entities.insert(id, Arc::new(combatant)).is_some() {
                return reject(format!("combatant {id} appears twice"));
            }
        }

        let mut unique = snapshot.order.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != snapshot.order.len()
            || snapshot.order.iter().any(|id| !entities.contains_key(id))
        {
            return reject("initiative order is not a set of known ids".to_owned());
        }
        if snapshot.phase != Phase::Setup && snapshot.current >= snapshot.order.len() {
            return reject(format!(
                "turn index {} outside order of {}",
                snapshot.current,
                snapshot.order.len()
            ));
        }

        Ok(Self::from_parts(
            snapshot.id,
            grid,
            entities,
            snapshot.order,
            snapshot.current,
            snapshot.round,
            snapshot.phase,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cover, Terrain};
    use crate::state::{BaseStats, Faction, Position};

    fn state() -> CombatState {
        let mut grid = TacticalGrid::new(6, 6);
        grid.set_cell(Position::new(2, 2), Terrain::Difficult, Cover::Half)
            .unwrap();
        CombatState::new(EncounterId::new("snap"), grid)
            .add_entity(
                Combatant::new(EntityId(1), "a", Faction::Player, BaseStats::default())
                    .at(Position::new(1, 1)),
            )
            .unwrap()
            .add_entity(
                Combatant::new(EntityId(2), "b", Faction::Enemy, BaseStats::default())
                    .at(Position::new(4, 4)),
            )
            .unwrap()
            .start_combat()
            .unwrap()
    }

    #[test]
    fn restore_reproduces_the_state() {
        let original = state().apply_damage(EntityId(2), 10).unwrap();
        let restored = CombatState::restore(original.snapshot()).unwrap();
        assert_eq!(restored, original);
        restored.validate().unwrap();
    }

    #[test]
    fn restore_rejects_overlapping_combatants() {
        let mut snapshot = state().snapshot();
        snapshot.combatants[1].position = Position::new(1, 1);
        assert!(matches!(
            CombatState::restore(snapshot),
            Err(CombatError::InvariantViolation(_))
        ));
    }

    #[test]
    fn restore_rejects_dead_flag_mismatch() {
        let mut snapshot = state().snapshot();
        snapshot.combatants[0].hp = 0;
        assert!(matches!(
            CombatState::restore(snapshot),
            Err(CombatError::InvariantViolation(_))
        ));
    }
}
