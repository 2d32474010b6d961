//! Area-of-effect templates.
//!
//! Circles and squares are centred on the target point. Cones and lines
//! emanate from the origin toward the target point and never include the
//! origin cell itself:
//!
//! - a cone of length `L` holds every cell within `L` squares whose direction
//!   from the origin deviates from the aim by at most `atan(1/2)`, so the cone
//!   is as wide as it is long;
//! - a line of length `L` and width `W` holds every cell ahead of the origin
//!   within `L` squares whose centre lies at most `W / 2` squares from the aim
//!   axis.

use super::geometry::{self, distance};
use crate::state::Position;

/// Shape and size of a spell's area, in squares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AreaShape {
    Circle { radius: u32 },
    Square { side: u32 },
    Cone { length: u32 },
    Line { length: u32, width: u32 },
}

impl AreaShape {
    /// Whether the shape is anchored on the caster rather than on the target point.
    pub const fn emanates(&self) -> bool {
        matches!(self, AreaShape::Cone { .. } | AreaShape::Line { .. })
    }

    /// Returns true if `cell` lies inside the shape cast from `origin` at `target`.
    pub fn contains(&self, origin: Position, target: Position, cell: Position) -> bool {
        match *self {
            AreaShape::Circle { radius } => {
                let (dx, dy) = ((cell.x - target.x) as i64, (cell.y - target.y) as i64);
                let r = radius as i64;
                dx * dx + dy * dy <= r * r
            }
            AreaShape::Square { side } => {
                // Even sides extend one square further toward +x/+y.
                let low = (side.saturating_sub(1) / 2) as i32;
                let high = (side / 2) as i32;
                let (dx, dy) = (cell.x - target.x, cell.y - target.y);
                side > 0 && (-low..=high).contains(&dx) && (-low..=high).contains(&dy)
            }
            AreaShape::Cone { length } => {
                if cell == origin || distance(origin, cell) > length {
                    return false;
                }
                match geometry::project(origin, target, cell) {
                    Some((along, across)) => along > 0.0 && across * 2.0 <= along,
                    None => false,
                }
            }
            AreaShape::Line { length, width } => {
                if cell == origin || distance(origin, cell) > length {
                    return false;
                }
                match geometry::project(origin, target, cell) {
                    Some((along, across)) => along > 0.0 && across <= width.max(1) as f32 / 2.0,
                    None => false,
                }
            }
        }
    }

    /// Chebyshev radius around the anchor that bounds the shape.
    pub(crate) fn extent(&self) -> u32 {
        match *self {
            AreaShape::Circle { radius } => radius,
            AreaShape::Square { side } => side.div_ceil(2),
            AreaShape::Cone { length } | AreaShape::Line { length, .. } => length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(shape: AreaShape, origin: Position, target: Position, span: i32) -> Vec<Position> {
        let mut out = Vec::new();
        for y in -span..=span {
            for x in -span..=span {
                let cell = Position::new(x, y);
                if shape.contains(origin, target, cell) {
                    out.push(cell);
                }
            }
        }
        out
    }

    #[test]
    fn circle_radius_one_is_a_plus() {
        let hit = cells(AreaShape::Circle { radius: 1 }, Position::ORIGIN, Position::ORIGIN, 3);
        assert_eq!(hit.len(), 5);
    }

    #[test]
    fn square_side_three_is_three_by_three() {
        let hit = cells(AreaShape::Square { side: 3 }, Position::ORIGIN, Position::ORIGIN, 3);
        assert_eq!(hit.len(), 9);
    }

    #[test]
    fn cone_widens_with_distance() {
        let shape = AreaShape::Cone { length: 3 };
        let hit = cells(shape, Position::ORIGIN, Position::new(3, 0), 4);
        assert!(!hit.contains(&Position::ORIGIN));
        assert!(hit.contains(&Position::new(1, 0)));
        assert!(!hit.contains(&Position::new(1, 1)));
        assert!(hit.contains(&Position::new(2, 1)));
        assert!(hit.contains(&Position::new(3, -1)));
        assert!(!hit.contains(&Position::new(-1, 0)));
        assert!(!hit.contains(&Position::new(4, 0)));
    }

    #[test]
    fn line_follows_the_aim() {
        let shape = AreaShape::Line {
            length: 4,
            width: 1,
        };
        let hit = cells(shape, Position::ORIGIN, Position::new(0, 2), 5);
        assert_eq!(
            hit,
            vec![
                Position::new(0, 1),
                Position::new(0, 2),
                Position::new(0, 3),
                Position::new(0, 4)
            ]
        );
    }

    #[test]
    fn directionless_cone_is_empty() {
        let shape = AreaShape::Cone { length: 3 };
        assert!(cells(shape, Position::ORIGIN, Position::ORIGIN, 3).is_empty());
    }
}
