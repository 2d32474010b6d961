//! Authoritative combat state.
//!
//! [`CombatState`] is an immutable value. Every transition borrows the current
//! state and returns a new one; the receiver is never touched, so a caller
//! that wants to undo simply keeps the previous value. The grid and every
//! combatant sit behind [`Arc`], which lets a transition share everything it
//! does not change and replace only the altered entries.
mod combatant;
mod common;
mod snapshot;

pub use combatant::{
    Ability, AbilityScores, ActionBudget, ActionCost, BaseStats, Combatant, CombatantStatus,
    Conditions, Faction, SpellSlots,
};
pub use common::{ActionId, EncounterId, EntityId, Position, SpellId, TemplateId, WeaponId};
pub use snapshot::CombatSnapshot;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::CombatError;
use crate::grid::{geometry, TacticalGrid};
use crate::initiative;

/// Encounter lifecycle: `Setup -> Active -> Victory | Defeat`, never backward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    #[default]
    Setup,
    Active,
    Victory,
    Defeat,
}

impl Phase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Victory | Phase::Defeat)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombatState {
    id: EncounterId,
    grid: Arc<TacticalGrid>,
    entities: BTreeMap<EntityId, Arc<Combatant>>,
    order: Vec<EntityId>,
    current: usize,
    round: u32,
    phase: Phase,
}

impl CombatState {
    /// Creates an empty encounter in the setup phase.
    pub fn new(id: EncounterId, grid: TacticalGrid) -> Self {
        Self {
            id,
            grid: Arc::new(grid),
            entities: BTreeMap::new(),
            order: Vec::new(),
            current: 0,
            round: 0,
            phase: Phase::Setup,
        }
    }

    // ===== queries =====

    pub fn id(&self) -> &EncounterId {
        &self.id
    }

    pub fn grid(&self) -> &TacticalGrid {
        &self.grid
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn initiative_order(&self) -> &[EntityId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        self.entities.get(&id).map(Arc::as_ref)
    }

    /// Like [`combatant`](Self::combatant) but reports unknown ids as errors.
    pub fn get(&self, id: EntityId) -> Result<&Combatant, CombatError> {
        self.combatant(id)
            .ok_or(CombatError::UnknownCombatant(id))
    }

    /// All combatants, dead ones included, in id order.
    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> + '_ {
        self.entities.values().map(Arc::as_ref)
    }

    pub fn living(&self) -> impl Iterator<Item = &Combatant> + '_ {
        self.combatants().filter(|c| c.is_alive())
    }

    /// Living, active combatants hostile to `id`.
    pub fn hostiles_of(&self, id: EntityId) -> impl Iterator<Item = &Combatant> + '_ {
        let faction = self.combatant(id).map(|c| c.faction);
        self.combatants().filter(move |c| {
            c.is_standing() && faction.is_some_and(|f| f.is_hostile_to(c.faction))
        })
    }

    /// Living, active combatants on the same side as `id`, excluding `id`.
    pub fn allies_of(&self, id: EntityId) -> impl Iterator<Item = &Combatant> + '_ {
        let faction = self.combatant(id).map(|c| c.faction);
        self.combatants().filter(move |c| {
            c.id != id
                && c.is_standing()
                && faction.is_some_and(|f| !f.is_hostile_to(c.faction))
        })
    }

    /// Living combatant standing on `position`.
    pub fn occupant_at(&self, position: Position) -> Option<&Combatant> {
        self.grid
            .occupant(position)
            .and_then(|id| self.combatant(id))
    }

    /// Id of the combatant whose turn it is.
    pub fn current_entity(&self) -> Option<EntityId> {
        if self.phase != Phase::Active {
            return None;
        }
        self.order.get(self.current).copied()
    }

    pub fn current_combatant(&self) -> Option<&Combatant> {
        self.current_entity().and_then(|id| self.combatant(id))
    }

    // ===== transitions =====

    /// Inserts a combatant and places it on the grid. Setup phase only.
    pub fn add_entity(&self, combatant: Combatant) -> Result<Self, CombatError> {
        self.require_phase("add_entity", Phase::Setup)?;
        if self.entities.contains_key(&combatant.id) {
            return Err(CombatError::DuplicateCombatant(combatant.id));
        }
        if !self.grid.is_valid_position(combatant.position) {
            return Err(CombatError::OutOfBounds(combatant.position));
        }

        let mut next = self.clone();
        if combatant.is_alive() {
            Arc::make_mut(&mut next.grid).occupy(combatant.position, combatant.id)?;
        }
        next.entities.insert(combatant.id, Arc::new(combatant));
        Ok(next)
    }

    /// Sets a combatant's initiative value. Setup phase only.
    pub fn with_initiative(&self, id: EntityId, initiative: i32) -> Result<Self, CombatError> {
        self.require_phase("with_initiative", Phase::Setup)?;
        self.update(id, |c| {
            let mut next = c.clone();
            next.initiative = initiative;
            Ok(next)
        })
    }

    /// Recomputes turn order from active, living combatants and rewinds to
    /// the first of them.
    pub fn calculate_initiative_order(&self) -> Result<Self, CombatError> {
        self.require_mutable("calculate_initiative_order")?;
        let mut next = self.clone();
        next.order = initiative::order(self.combatants());
        next.current = 0;
        Ok(next)
    }

    /// Refreshes every budget, orders initiative and enters the active phase.
    pub fn start_combat(&self) -> Result<Self, CombatError> {
        self.require_phase("start_combat", Phase::Setup)?;
        if self.entities.is_empty() {
            return Err(CombatError::NoCombatants);
        }

        let mut next = self.calculate_initiative_order()?;
        if next.order.is_empty() {
            return Err(CombatError::NoCombatants);
        }
        next.refresh_all();
        next.round = 1;
        next.phase = Phase::Active;
        Ok(next)
    }

    /// Moves the turn pointer; wrapping starts a new round with fresh budgets.
    pub fn advance_turn(&self) -> Result<Self, CombatError> {
        self.require_phase("advance_turn", Phase::Active)?;
        if self.order.is_empty() {
            return Err(CombatError::invariant("active encounter has an empty turn order"));
        }

        let mut next = self.clone();
        next.current += 1;
        if next.current >= next.order.len() {
            next.current = 0;
            next.round += 1;
            next.refresh_all();
        }
        Ok(next)
    }

    /// Reduces HP, clamping at zero. Reaching zero marks the combatant dead and
    /// frees its cell. Damage to a corpse changes nothing.
    pub fn apply_damage(&self, id: EntityId, amount: u32) -> Result<Self, CombatError> {
        self.require_mutable("apply_damage")?;
        let combatant = self.get(id)?;
        if !combatant.is_alive() {
            return Ok(self.clone());
        }

        let damaged = combatant.damaged(amount);
        let mut next = self.clone();
        if !damaged.is_alive() {
            Arc::make_mut(&mut next.grid).free(damaged.position, id)?;
        }
        next.entities.insert(id, Arc::new(damaged));
        Ok(next)
    }

    /// Restores HP, clamping at maximum. The dead cannot be healed.
    pub fn apply_healing(&self, id: EntityId, amount: u32) -> Result<Self, CombatError> {
        self.require_mutable("apply_healing")?;
        self.update(id, |c| {
            if !c.is_alive() {
                return Err(CombatError::CombatantDead(id));
            }
            Ok(c.healed(amount))
        })
    }

    /// Moves a combatant, spending movement and updating grid occupancy.
    ///
    /// `cost` overrides the straight-line [`TacticalGrid::movement_cost`].
    /// Either grid and combatant both change or the move is rejected.
    pub fn move_entity(
        &self,
        id: EntityId,
        to: Position,
        cost: Option<u32>,
    ) -> Result<Self, CombatError> {
        self.require_mutable("move_entity")?;
        let combatant = self.get(id)?;
        if !combatant.is_alive() {
            return Err(CombatError::CombatantDead(id));
        }
        if !self.grid.is_valid_position(to) {
            return Err(CombatError::OutOfBounds(to));
        }

        let from = combatant.position;
        self.check_path(id, to)?;
        let required = match cost {
            Some(cost) => cost,
            None => self
                .grid
                .movement_cost(from, to)
                .ok_or(CombatError::Impassable(to))?,
        };
        let remaining = combatant.budget.movement;
        let budget = combatant
            .budget
            .spend(ActionCost::Movement(required))
            .ok_or(CombatError::InsufficientMovement {
                entity: id,
                required,
                remaining,
            })?;

        let mut next = self.clone();
        Arc::make_mut(&mut next.grid).move_occupant(id, from, to)?;
        let mut moved = combatant.clone();
        moved.position = to;
        moved.budget = budget;
        next.entities.insert(id, Arc::new(moved));
        Ok(next)
    }

    /// Checks the straight path from `id`'s position to `to`.
    ///
    /// Every cell after the start must be passable, and no cell before the
    /// destination may hold a standing hostile. Allies can be passed through.
    pub fn check_path(&self, id: EntityId, to: Position) -> Result<(), CombatError> {
        let mover = self.get(id)?;
        if let Some(blocked) = self.grid.path_blocker(mover.position, to) {
            return Err(CombatError::Impassable(blocked));
        }
        for position in geometry::interior(mover.position, to) {
            let Some(occupant) = self.grid.occupant(position) else {
                continue;
            };
            if self
                .combatant(occupant)
                .is_some_and(|c| c.is_standing() && mover.is_hostile_to(c))
            {
                return Err(CombatError::CellOccupied { position, occupant });
            }
        }
        Ok(())
    }

    /// Spends one unit of the given action-economy resource.
    pub fn consume_action(&self, id: EntityId, cost: ActionCost) -> Result<Self, CombatError> {
        self.require_mutable("consume_action")?;
        self.update(id, |c| {
            if !c.is_alive() {
                return Err(CombatError::CombatantDead(id));
            }
            let budget = c.budget.spend(cost).ok_or(match cost {
                ActionCost::Movement(required) => CombatError::InsufficientMovement {
                    entity: id,
                    required,
                    remaining: c.budget.movement,
                },
                _ => CombatError::ActionUnavailable { entity: id, cost },
            })?;
            let mut next = c.clone();
            next.budget = budget;
            Ok(next)
        })
    }

    /// Adds movement to the current budget.
    pub fn grant_movement(&self, id: EntityId, amount: u32) -> Result<Self, CombatError> {
        self.require_mutable("grant_movement")?;
        self.update(id, |c| {
            if !c.is_alive() {
                return Err(CombatError::CombatantDead(id));
            }
            let mut next = c.clone();
            next.budget.movement = next.budget.movement.saturating_add(amount);
            Ok(next)
        })
    }

    /// Spends one spell slot of `level`.
    pub fn consume_spell_slot(&self, id: EntityId, level: u8) -> Result<Self, CombatError> {
        self.require_mutable("consume_spell_slot")?;
        self.update(id, |c| {
            let slots = c
                .slots
                .spend(level)
                .ok_or(CombatError::NoSpellSlot { caster: id, level })?;
            let mut next = c.clone();
            next.slots = slots;
            Ok(next)
        })
    }

    /// Adds and removes condition tags on a living combatant.
    pub fn apply_conditions(
        &self,
        id: EntityId,
        add: Conditions,
        remove: Conditions,
    ) -> Result<Self, CombatError> {
        self.require_mutable("apply_conditions")?;
        self.update(id, |c| {
            if !c.is_alive() {
                return Err(CombatError::CombatantDead(id));
            }
            let mut next = c.clone();
            next.status.conditions.remove(remove);
            next.status.conditions.insert(add);
            Ok(next)
        })
    }

    /// Sets or clears the spell a combatant concentrates on.
    pub fn set_concentration(
        &self,
        id: EntityId,
        spell: Option<SpellId>,
    ) -> Result<Self, CombatError> {
        self.require_mutable("set_concentration")?;
        self.update(id, |c| {
            let mut next = c.clone();
            next.status.concentration = spell;
            Ok(next)
        })
    }

    /// Flips the phase to victory or defeat once one side has no living members.
    ///
    /// Only an active encounter can end; any other phase is returned unchanged.
    pub fn check_combat_end(&self) -> Self {
        if self.phase != Phase::Active {
            return self.clone();
        }
        let enemies_alive = self.living().any(|c| !c.faction.is_party());
        let party_alive = self.living().any(|c| c.faction.is_party());

        let phase = if !enemies_alive {
            Phase::Victory
        } else if !party_alive {
            Phase::Defeat
        } else {
            return self.clone();
        };
        let mut next = self.clone();
        next.phase = phase;
        next
    }

    // ===== invariants =====

    /// Checks every structural invariant of the aggregate.
    pub fn validate(&self) -> Result<(), CombatError> {
        let mut claimed = BTreeSet::new();
        for c in self.combatants() {
            if c.hp > c.base.max_hp {
                return Err(CombatError::invariant(format!(
                    "{} has {} hp above maximum {}",
                    c.id, c.hp, c.base.max_hp
                )));
            }
            if c.status.dead != (c.hp == 0) {
                return Err(CombatError::invariant(format!(
                    "{} dead flag disagrees with hp {}",
                    c.id, c.hp
                )));
            }
            if !self.grid.is_valid_position(c.position) {
                return Err(CombatError::invariant(format!(
                    "{} stands outside the grid at {}",
                    c.id, c.position
                )));
            }
            if c.is_alive() {
                if self.grid.occupant(c.position) != Some(c.id) {
                    return Err(CombatError::invariant(format!(
                        "cell {} does not record occupant {}",
                        c.position, c.id
                    )));
                }
                if !claimed.insert(c.position) {
                    return Err(CombatError::invariant(format!(
                        "cell {} holds two living combatants",
                        c.position
                    )));
                }
            }
        }

        for position in self.grid.positions() {
            if let Some(id) = self.grid.occupant(position) {
                let consistent = self
                    .combatant(id)
                    .is_some_and(|c| c.is_alive() && c.position == position);
                if !consistent {
                    return Err(CombatError::invariant(format!(
                        "cell {position} names stale occupant {id}"
                    )));
                }
            }
        }

        let unique: BTreeSet<_> = self.order.iter().collect();
        if unique.len() != self.order.len()
            || self.order.iter().any(|id| !self.entities.contains_key(id))
        {
            return Err(CombatError::invariant("initiative order is not a set of known ids"));
        }
        if self.phase != Phase::Setup && self.current >= self.order.len() {
            return Err(CombatError::invariant(format!(
                "turn index {} outside order of {}",
                self.current,
                self.order.len()
            )));
        }
        Ok(())
    }

    // ===== internals =====

    fn require_phase(&self, operation: &'static str, expected: Phase) -> Result<(), CombatError> {
        if self.phase != expected {
            return Err(CombatError::WrongPhase {
                operation,
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn require_mutable(&self, operation: &'static str) -> Result<(), CombatError> {
        if self.phase.is_terminal() {
            return Err(CombatError::WrongPhase {
                operation,
                expected: Phase::Active,
                actual: self.phase,
            });
        }
        Ok(())
    }

    /// Replaces one combatant with the result of `f`, leaving position untouched.
    fn update<F>(&self, id: EntityId, f: F) -> Result<Self, CombatError>
    where
        F: FnOnce(&Combatant) -> Result<Combatant, CombatError>,
    {
        let current = self.get(id)?;
        let replaced = f(current)?;
        if replaced.position != current.position || replaced.id != id {
            return Err(CombatError::invariant(format!(
                "update of {id} changed its identity or position"
            )));
        }
        let mut next = self.clone();
        next.entities.insert(id, Arc::new(replaced));
        Ok(next)
    }

    fn refresh_all(&mut self) {
        for entry in self.entities.values_mut() {
            *entry = Arc::new(entry.refreshed());
        }
    }

    pub(crate) fn from_parts(
        id: EncounterId,
        grid: TacticalGrid,
        entities: BTreeMap<EntityId, Arc<Combatant>>,
        order: Vec<EntityId>,
        current: usize,
        round: u32,
        phase: Phase,
    ) -> Self {
        Self {
            id,
            grid: Arc::new(grid),
            entities,
            order,
            current,
            round,
            phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cover, Terrain};

    fn fighter(id: u32, faction: Faction, x: i32) -> Combatant {
        Combatant::new(EntityId(id), format!("c{id}"), faction, BaseStats::default())
            .at(Position::new(x, 0))
    }

    fn encounter() -> CombatState {
        CombatState::new(EncounterId::new("test"), TacticalGrid::new(12, 8))
            .add_entity(fighter(1, Faction::Player, 0).with_initiative(15))
            .unwrap()
            .add_entity(fighter(2, Faction::Enemy, 3).with_initiative(10))
            .unwrap()
    }

    #[test]
    fn add_entity_rejected_after_start() {
        let active = encounter().start_combat().unwrap();
        let err = active.add_entity(fighter(3, Faction::Ally, 5)).unwrap_err();
        assert!(matches!(err, CombatError::WrongPhase { .. }));
    }

    #[test]
    fn add_entity_rejects_shared_cell() {
        let err = encounter()
            .add_entity(fighter(3, Faction::Ally, 3))
            .unwrap_err();
        assert_eq!(
            err,
            CombatError::CellOccupied {
                position: Position::new(3, 0),
                occupant: EntityId(2)
            }
        );
    }

    #[test]
    fn start_requires_combatants() {
        let empty = CombatState::new(EncounterId::new("empty"), TacticalGrid::new(4, 4));
        assert_eq!(empty.start_combat(), Err(CombatError::NoCombatants));
    }

    #[test]
    fn lethal_damage_marks_dead_and_frees_cell() {
        let state = encounter().start_combat().unwrap();
        let next = state.apply_damage(EntityId(2), 15).unwrap();
        let target = next.combatant(EntityId(2)).unwrap();
        assert_eq!(target.hp, 0);
        assert!(target.status.dead);
        assert!(next.grid().is_cell_free(Position::new(3, 0)));
        // the receiver is untouched
        assert_eq!(state.combatant(EntityId(2)).unwrap().hp, 10);
        next.validate().unwrap();
    }

    #[test]
    fn healing_the_dead_fails() {
        let state = encounter()
            .start_combat()
            .unwrap()
            .apply_damage(EntityId(2), 10)
            .unwrap();
        assert_eq!(
            state.apply_healing(EntityId(2), 5),
            Err(CombatError::CombatantDead(EntityId(2)))
        );
    }

    #[test]
    fn move_beyond_remaining_movement_is_rejected() {
        let state = encounter().start_combat().unwrap();
        let err = state
            .move_entity(EntityId(1), Position::new(0, 7), None)
            .unwrap_err();
        assert_eq!(
            err,
            CombatError::InsufficientMovement {
                entity: EntityId(1),
                required: 7,
                remaining: 6
            }
        );
    }

    #[test]
    fn move_updates_grid_and_budget() {
        let state = encounter().start_combat().unwrap();
        let next = state
            .move_entity(EntityId(1), Position::new(2, 2), None)
            .unwrap();
        let mover = next.combatant(EntityId(1)).unwrap();
        assert_eq!(mover.position, Position::new(2, 2));
        assert_eq!(mover.budget.movement, 4);
        assert_eq!(next.grid().occupant(Position::new(2, 2)), Some(EntityId(1)));
        assert!(next.grid().is_cell_free(Position::ORIGIN));
        next.validate().unwrap();
    }

    #[test]
    fn move_through_a_sealed_wall_is_rejected() {
        let mut grid = TacticalGrid::new(12, 3);
        for y in 0..3 {
            grid.set_cell(Position::new(3, y), Terrain::Impassable, Cover::None)
                .unwrap();
        }
        let state = CombatState::new(EncounterId::new("wall"), grid)
            .add_entity(fighter(1, Faction::Player, 0).at(Position::new(0, 1)))
            .unwrap()
            .add_entity(fighter(2, Faction::Enemy, 10))
            .unwrap()
            .start_combat()
            .unwrap();
        assert_eq!(
            state.move_entity(EntityId(1), Position::new(5, 1), None),
            Err(CombatError::Impassable(Position::new(3, 1)))
        );
        assert_eq!(
            state.move_entity(EntityId(1), Position::new(5, 1), Some(1)),
            Err(CombatError::Impassable(Position::new(3, 1)))
        );
    }

    #[test]
    fn hostiles_block_the_path_but_allies_do_not() {
        let state = encounter()
            .add_entity(fighter(3, Faction::Ally, 1))
            .unwrap()
            .start_combat()
            .unwrap();
        assert_eq!(
            state.move_entity(EntityId(1), Position::new(5, 0), None),
            Err(CombatError::CellOccupied {
                position: Position::new(3, 0),
                occupant: EntityId(2)
            })
        );
        let next = state
            .move_entity(EntityId(1), Position::new(2, 0), None)
            .unwrap();
        assert_eq!(next.combatant(EntityId(1)).unwrap().position, Position::new(2, 0));
        next.validate().unwrap();
    }

    #[test]
    fn consume_action_twice_fails() {
        let state = encounter().start_combat().unwrap();
        let spent = state.consume_action(EntityId(1), ActionCost::Action).unwrap();
        assert_eq!(
            spent.consume_action(EntityId(1), ActionCost::Action),
            Err(CombatError::ActionUnavailable {
                entity: EntityId(1),
                cost: ActionCost::Action
            })
        );
    }

    #[test]
    fn terminal_phase_rejects_mutation() {
        let won = encounter()
            .start_combat()
            .unwrap()
            .apply_damage(EntityId(2), 99)
            .unwrap()
            .check_combat_end();
        assert_eq!(won.phase(), Phase::Victory);
        assert!(matches!(
            won.advance_turn(),
            Err(CombatError::WrongPhase { .. })
        ));
        assert!(matches!(
            won.apply_damage(EntityId(1), 1),
            Err(CombatError::WrongPhase { .. })
        ));
    }

    #[test]
    fn wrap_refreshes_budgets_and_clears_turn_conditions() {
        let state = encounter()
            .start_combat()
            .unwrap()
            .consume_action(EntityId(1), ActionCost::Action)
            .unwrap()
            .apply_conditions(EntityId(1), Conditions::DODGING, Conditions::empty())
            .unwrap();
        let next = state.advance_turn().unwrap();
        assert_eq!(next.round(), 1);
        assert!(!next.combatant(EntityId(1)).unwrap().budget.action);

        let wrapped = next.advance_turn().unwrap();
        assert_eq!(wrapped.round(), 2);
        assert_eq!(wrapped.current_index(), 0);
        let c = wrapped.combatant(EntityId(1)).unwrap();
        assert!(c.budget.action);
        assert!(!c.conditions().contains(Conditions::DODGING));
    }
}
