//! Tactical grid: cell terrain, cover and occupancy, plus spatial queries.
//!
//! The grid is a dense row-major array of [`Cell`]s. Query methods are pure;
//! the occupancy mutators are crate-private and are only called by
//! [`CombatState`](crate::state::CombatState) transitions on a freshly cloned
//! grid, so a published grid never changes.
mod area;
pub mod geometry;

pub use area::AreaShape;
pub use geometry::{distance, manhattan_distance};

use crate::config::CombatConfig;
use crate::error::CombatError;
use crate::state::{EntityId, Position};

/// Ground type of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terrain {
    #[default]
    Normal,
    Difficult,
    Impassable,
    Water,
    Pit,
}

impl Terrain {
    /// Whether a combatant may enter or cross this cell.
    pub const fn is_passable(self) -> bool {
        !matches!(self, Terrain::Impassable)
    }

    /// Movement multiplier when this is the destination of a move.
    ///
    /// Water and pits are descriptive only and cost the same as open ground.
    pub const fn cost_multiplier(self) -> u32 {
        match self {
            Terrain::Difficult => 2,
            _ => 1,
        }
    }
}

/// Degree of protection a cell offers, ordered from none to full.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cover {
    #[default]
    None,
    Half,
    ThreeQuarters,
    Full,
}

impl Cover {
    /// AC bonus this cover grants; `None` means the target cannot be targeted.
    pub fn ac_bonus(self, config: &CombatConfig) -> Option<i32> {
        match self {
            Cover::None => Some(0),
            Cover::Half => Some(config.half_cover_bonus),
            Cover::ThreeQuarters => Some(config.three_quarters_cover_bonus),
            Cover::Full => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub terrain: Terrain,
    pub cover: Cover,
    pub occupant: Option<EntityId>,
    pub visible: bool,
}

impl Cell {
    pub const OPEN: Self = Self {
        terrain: Terrain::Normal,
        cover: Cover::None,
        occupant: None,
        visible: true,
    };

    /// Opaque to sight: impassable terrain or full cover.
    pub const fn blocks_sight(&self) -> bool {
        matches!(self.terrain, Terrain::Impassable) || matches!(self.cover, Cover::Full)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::OPEN
    }
}

/// A non-default cell, as carried in snapshots and setup specs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellOverride {
    pub position: Position,
    pub terrain: Terrain,
    pub cover: Cover,
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TacticalGrid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl TacticalGrid {
    /// Creates an open grid; sides are clamped to `1..=MAX_GRID_SIDE`.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.clamp(1, CombatConfig::MAX_GRID_SIDE);
        let height = height.clamp(1, CombatConfig::MAX_GRID_SIDE);
        Self {
            width,
            height,
            cells: vec![Cell::OPEN; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn is_valid_position(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.is_valid_position(position)
            .then(|| position.y as usize * self.width as usize + position.x as usize)
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.index(position).map(|i| &self.cells[i])
    }

    fn cell_mut(&mut self, position: Position) -> Result<&mut Cell, CombatError> {
        match self.index(position) {
            Some(i) => Ok(&mut self.cells[i]),
            None => Err(CombatError::OutOfBounds(position)),
        }
    }

    /// Iterates all positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Position::new(x, y)))
    }

    pub fn terrain(&self, position: Position) -> Option<Terrain> {
        self.cell(position).map(|c| c.terrain)
    }

    pub fn occupant(&self, position: Position) -> Option<EntityId> {
        self.cell(position).and_then(|c| c.occupant)
    }

    /// In bounds, passable and unoccupied.
    pub fn is_cell_free(&self, position: Position) -> bool {
        self.cell(position)
            .is_some_and(|c| c.terrain.is_passable() && c.occupant.is_none())
    }

    // ===== setup =====

    /// Sets terrain and cover of a cell.
    pub fn set_cell(
        &mut self,
        position: Position,
        terrain: Terrain,
        cover: Cover,
    ) -> Result<(), CombatError> {
        let cell = self.cell_mut(position)?;
        cell.terrain = terrain;
        cell.cover = cover;
        Ok(())
    }

    pub fn set_visible(&mut self, position: Position, visible: bool) -> Result<(), CombatError> {
        self.cell_mut(position)?.visible = visible;
        Ok(())
    }

    pub fn apply_override(&mut self, over: &CellOverride) -> Result<(), CombatError> {
        let cell = self.cell_mut(over.position)?;
        cell.terrain = over.terrain;
        cell.cover = over.cover;
        cell.visible = over.visible;
        Ok(())
    }

    /// Cells that differ from [`Cell::OPEN`] in terrain, cover or visibility.
    pub fn overrides(&self) -> Vec<CellOverride> {
        self.positions()
            .zip(self.cells.iter())
            .filter(|(_, c)| {
                c.terrain != Terrain::Normal || c.cover != Cover::None || !c.visible
            })
            .map(|(position, c)| CellOverride {
                position,
                terrain: c.terrain,
                cover: c.cover,
                visible: c.visible,
            })
            .collect()
    }

    // ===== occupancy =====

    pub(crate) fn occupy(&mut self, position: Position, id: EntityId) -> Result<(), CombatError> {
        let cell = self.cell_mut(position)?;
        if !cell.terrain.is_passable() {
            return Err(CombatError::Impassable(position));
        }
        if let Some(occupant) = cell.occupant {
            return Err(CombatError::CellOccupied { position, occupant });
        }
        cell.occupant = Some(id);
        Ok(())
    }

    pub(crate) fn free(&mut self, position: Position, id: EntityId) -> Result<(), CombatError> {
        let cell = self.cell_mut(position)?;
        if cell.occupant != Some(id) {
            return Err(CombatError::invariant(format!(
                "cell {position} is not occupied by {id}"
            )));
        }
        cell.occupant = None;
        Ok(())
    }

    pub(crate) fn move_occupant(
        &mut self,
        id: EntityId,
        from: Position,
        to: Position,
    ) -> Result<(), CombatError> {
        if from == to {
            return Ok(());
        }
        if !self.is_valid_position(to) {
            return Err(CombatError::OutOfBounds(to));
        }
        if self.occupant(from) != Some(id) {
            return Err(CombatError::invariant(format!(
                "cell {from} is not occupied by {id}"
            )));
        }
        self.occupy(to, id)?;
        self.free(from, id)
    }

    // ===== spatial queries =====

    /// In-bounds positions within Chebyshev `radius` of `center`, center included.
    pub fn positions_in_radius(&self, center: Position, radius: u32) -> Vec<Position> {
        let r = radius.min(CombatConfig::MAX_GRID_SIDE) as i32;
        let mut out = Vec::new();
        for y in (center.y - r)..=(center.y + r) {
            for x in (center.x - r)..=(center.x + r) {
                let p = Position::new(x, y);
                if self.is_valid_position(p) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// In-bounds neighbours of `center`.
    pub fn adjacent_positions(&self, center: Position) -> Vec<Position> {
        geometry::neighbours(center)
            .into_iter()
            .filter(|&p| self.is_valid_position(p))
            .collect()
    }

    /// False if any interior cell of the Bresenham line is impassable or full cover.
    pub fn has_line_of_sight(&self, from: Position, to: Position) -> bool {
        geometry::interior(from, to)
            .into_iter()
            .all(|p| self.cell(p).is_none_or(|c| !c.blocks_sight()))
    }

    /// Highest cover among interior line cells, or full cover without line of sight.
    pub fn cover_between(&self, from: Position, to: Position) -> Cover {
        let mut best = Cover::None;
        for p in geometry::interior(from, to) {
            let Some(cell) = self.cell(p) else { continue };
            if cell.blocks_sight() {
                return Cover::Full;
            }
            best = best.max(cell.cover);
        }
        best
    }

    /// First cell after `from` on the straight path to `to` that cannot be
    /// entered, destination included.
    pub fn path_blocker(&self, from: Position, to: Position) -> Option<Position> {
        geometry::line(from, to)
            .into_iter()
            .skip(1)
            .find(|&p| self.terrain(p).is_none_or(|t| !t.is_passable()))
    }

    /// Squares of movement needed to go from `from` to `to` in a straight move.
    ///
    /// Chebyshev distance, doubled when the destination is difficult.
    /// `None` when the destination is outside the grid or any cell along the
    /// path is impassable.
    pub fn movement_cost(&self, from: Position, to: Position) -> Option<u32> {
        let terrain = self.terrain(to)?;
        if self.path_blocker(from, to).is_some() {
            return None;
        }
        Some(distance(from, to) * terrain.cost_multiplier())
    }

    /// In-bounds cells covered by `shape` cast from `origin` toward `target`.
    pub fn area_of_effect(&self, origin: Position, target: Position, shape: AreaShape) -> Vec<Position> {
        let anchor = if shape.emanates() { origin } else { target };
        self.positions_in_radius(anchor, shape.extent())
            .into_iter()
            .filter(|&p| shape.contains(origin, target, p))
            .collect()
    }
}

impl Default for TacticalGrid {
    fn default() -> Self {
        Self::new(
            CombatConfig::DEFAULT_GRID_WIDTH,
            CombatConfig::DEFAULT_GRID_HEIGHT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bounds_follow_dimensions() {
        let grid = TacticalGrid::new(12, 8);
        assert!(grid.is_valid_position(Position::new(11, 7)));
        assert!(!grid.is_valid_position(Position::new(12, 7)));
        assert!(!grid.is_valid_position(Position::new(0, -1)));
        assert_eq!(grid.positions().count(), 96);
    }

    #[test]
    fn occupancy_rejects_double_booking() {
        let mut grid = TacticalGrid::new(4, 4);
        grid.occupy(Position::new(1, 1), EntityId(1)).unwrap();
        assert_eq!(
            grid.occupy(Position::new(1, 1), EntityId(2)),
            Err(CombatError::CellOccupied {
                position: Position::new(1, 1),
                occupant: EntityId(1)
            })
        );
        grid.move_occupant(EntityId(1), Position::new(1, 1), Position::new(2, 2))
            .unwrap();
        assert!(grid.is_cell_free(Position::new(1, 1)));
        assert_eq!(grid.occupant(Position::new(2, 2)), Some(EntityId(1)));
    }

    #[test]
    fn movement_cost_doubles_on_difficult_ground() {
        let mut grid = TacticalGrid::new(8, 8);
        grid.set_cell(Position::new(3, 0), Terrain::Difficult, Cover::None)
            .unwrap();
        grid.set_cell(Position::new(4, 0), Terrain::Impassable, Cover::None)
            .unwrap();
        assert_eq!(grid.movement_cost(Position::ORIGIN, Position::new(2, 1)), Some(2));
        assert_eq!(grid.movement_cost(Position::ORIGIN, Position::new(3, 0)), Some(6));
        assert_eq!(grid.movement_cost(Position::ORIGIN, Position::new(4, 0)), None);
        assert_eq!(grid.movement_cost(Position::ORIGIN, Position::new(9, 0)), None);
    }

    #[test]
    fn water_and_pits_cost_like_open_ground() {
        let mut grid = TacticalGrid::new(6, 1);
        grid.set_cell(Position::new(2, 0), Terrain::Water, Cover::None)
            .unwrap();
        grid.set_cell(Position::new(3, 0), Terrain::Pit, Cover::None)
            .unwrap();
        assert_eq!(grid.movement_cost(Position::ORIGIN, Position::new(2, 0)), Some(2));
        assert_eq!(grid.movement_cost(Position::ORIGIN, Position::new(3, 0)), Some(3));
        assert!(grid.is_cell_free(Position::new(3, 0)));
    }

    #[test]
    fn walls_along_the_path_block_movement() {
        let mut grid = TacticalGrid::new(12, 3);
        for y in 0..3 {
            grid.set_cell(Position::new(3, y), Terrain::Impassable, Cover::None)
                .unwrap();
        }
        let (from, to) = (Position::new(0, 1), Position::new(5, 1));
        assert_eq!(grid.path_blocker(from, to), Some(Position::new(3, 1)));
        assert_eq!(grid.movement_cost(from, to), None);
        assert_eq!(grid.movement_cost(from, Position::new(2, 1)), Some(2));
    }

    #[test]
    fn cover_takes_the_highest_interior_value() {
        let mut grid = TacticalGrid::new(8, 3);
        grid.set_cell(Position::new(2, 1), Terrain::Normal, Cover::Half)
            .unwrap();
        grid.set_cell(Position::new(4, 1), Terrain::Normal, Cover::ThreeQuarters)
            .unwrap();
        let (a, b) = (Position::new(0, 1), Position::new(6, 1));
        assert_eq!(grid.cover_between(a, b), Cover::ThreeQuarters);
        assert!(grid.has_line_of_sight(a, b));

        grid.set_cell(Position::new(3, 1), Terrain::Impassable, Cover::None)
            .unwrap();
        assert!(!grid.has_line_of_sight(a, b));
        assert_eq!(grid.cover_between(a, b), Cover::Full);
    }

    #[test]
    fn endpoints_never_block_sight() {
        let mut grid = TacticalGrid::new(4, 1);
        grid.set_cell(Position::new(0, 0), Terrain::Normal, Cover::Full)
            .unwrap();
        assert!(grid.has_line_of_sight(Position::new(0, 0), Position::new(3, 0)));
    }

    #[test]
    fn area_is_clipped_to_the_grid() {
        let grid = TacticalGrid::new(5, 5);
        let hit = grid.area_of_effect(
            Position::ORIGIN,
            Position::ORIGIN,
            AreaShape::Square { side: 3 },
        );
        assert_eq!(hit.len(), 4);
    }

    proptest! {
        #[test]
        fn sight_is_blocked_iff_an_interior_cell_blocks(
            wall_x in 1i32..9,
            wall_y in 0i32..5,
            to_x in 0i32..10,
            to_y in 0i32..5,
            full_cover in any::<bool>(),
        ) {
            let mut grid = TacticalGrid::new(10, 5);
            let (terrain, cover) = if full_cover {
                (Terrain::Normal, Cover::Full)
            } else {
                (Terrain::Impassable, Cover::None)
            };
            let wall = Position::new(wall_x, wall_y);
            grid.set_cell(wall, terrain, cover).unwrap();
            let (from, to) = (Position::new(0, 2), Position::new(to_x, to_y));
            let blocked = geometry::interior(from, to).contains(&wall);
            prop_assert_eq!(grid.has_line_of_sight(from, to), !blocked);
        }
    }
}
