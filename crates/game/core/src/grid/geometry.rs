//! Grid metrics and line rasterization, independent of any cell contents.

use arrayvec::ArrayVec;

use crate::state::Position;

/// Chebyshev distance: `max(|dx|, |dy|)`, the square-grid movement metric.
#[inline]
pub fn distance(a: Position, b: Position) -> u32 {
    let dx = (a.x - b.x).unsigned_abs();
    let dy = (a.y - b.y).unsigned_abs();
    dx.max(dy)
}

/// Manhattan distance: `|dx| + |dy|`.
#[inline]
pub fn manhattan_distance(a: Position, b: Position) -> u32 {
    (a.x - b.x).unsigned_abs() + (a.y - b.y).unsigned_abs()
}

/// The eight neighbours of `center`, in row-major order. Not bounds-checked.
pub fn neighbours(center: Position) -> ArrayVec<Position, 8> {
    let mut out = ArrayVec::new();
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx != 0 || dy != 0 {
                out.push(center.offset(dx, dy));
            }
        }
    }
    out
}

/// Every cell on the Bresenham line from `from` to `to`, endpoints included.
pub fn line(from: Position, to: Position) -> Vec<Position> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut cells = Vec::with_capacity(distance(from, to) as usize + 1);
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);
    loop {
        cells.push(Position::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// Cells strictly between `from` and `to` on the Bresenham line.
pub fn interior(from: Position, to: Position) -> Vec<Position> {
    let mut cells = line(from, to);
    if cells.len() <= 2 {
        return Vec::new();
    }
    cells.pop();
    cells.remove(0);
    cells
}

/// Offset of `cell` from `origin` projected onto the direction `origin -> toward`.
///
/// Returns `(along, across)` in squares, or `None` when the direction is zero.
pub(crate) fn project(origin: Position, toward: Position, cell: Position) -> Option<(f32, f32)> {
    let (dx, dy) = ((toward.x - origin.x) as f32, (toward.y - origin.y) as f32);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return None;
    }
    let (cx, cy) = ((cell.x - origin.x) as f32, (cell.y - origin.y) as f32);
    let along = (cx * dx + cy * dy) / len;
    let across = (cx * dy - cy * dx).abs() / len;
    Some((along, across))
}
