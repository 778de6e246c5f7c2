//! Boundary policy and Moore neighborhoods
//!
//! The policy decides what an out-of-range neighbor coordinate means. It
//! changes simulation behavior, so it is part of the grid configuration and
//! is passed to the GPU kernel as a numeric code.

use super::cell::{Cell, Grid};

/// How neighbor coordinates outside the grid are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    /// Toroidal wraparound: the left edge neighbors the right edge
    #[default]
    Wrap,
    /// Out-of-range coordinates snap to the nearest edge cell
    Clamp,
    /// Out-of-range coordinates read as a dead cell
    Dead,
}

impl BoundaryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryPolicy::Wrap => "wrap",
            BoundaryPolicy::Clamp => "clamp",
            BoundaryPolicy::Dead => "dead",
        }
    }

    /// Code understood by the transition kernel (`boundary` uniform)
    pub fn kernel_code(&self) -> u32 {
        match self {
            BoundaryPolicy::Wrap => 0,
            BoundaryPolicy::Clamp => 1,
            BoundaryPolicy::Dead => 2,
        }
    }

    /// Resolve `(x + dx, y + dy)` on a `width`×`height` grid
    ///
    /// `None` means "no cell there", which the [`BoundaryPolicy::Dead`]
    /// policy treats as a dead neighbor.
    pub fn resolve(
        &self,
        x: u32,
        y: u32,
        dx: i32,
        dy: i32,
        width: u32,
        height: u32,
    ) -> Option<(u32, u32)> {
        let nx = x as i64 + dx as i64;
        let ny = y as i64 + dy as i64;
        let (w, h) = (width as i64, height as i64);

        match self {
            BoundaryPolicy::Wrap => Some((nx.rem_euclid(w) as u32, ny.rem_euclid(h) as u32)),
            BoundaryPolicy::Clamp => Some((nx.clamp(0, w - 1) as u32, ny.clamp(0, h - 1) as u32)),
            BoundaryPolicy::Dead => {
                if nx < 0 || ny < 0 || nx >= w || ny >= h {
                    None
                } else {
                    Some((nx as u32, ny as u32))
                }
            }
        }
    }
}

/// Offsets of the eight Moore neighbors, row by row
pub const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A cell together with its eight Moore neighbors, as read from `current()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood {
    pub center: Cell,
    /// Neighbors in [`MOORE_OFFSETS`] order
    pub neighbors: [Cell; 8],
}

impl Neighborhood {
    /// Gather the neighborhood of `(x, y)` from a grid under a policy
    pub fn gather(grid: &Grid, x: u32, y: u32, policy: BoundaryPolicy) -> Self {
        let (width, height) = grid.dimensions();
        let mut neighbors = [Cell::DEAD; 8];
        for (slot, &(dx, dy)) in neighbors.iter_mut().zip(MOORE_OFFSETS.iter()) {
            *slot = policy
                .resolve(x, y, dx, dy, width, height)
                .map_or(Cell::DEAD, |(nx, ny)| grid.get(nx, ny));
        }
        Self {
            center: grid.get(x, y),
            neighbors,
        }
    }

    pub fn live_neighbors(&self) -> u32 {
        self.neighbors.iter().filter(|cell| cell.is_alive()).count() as u32
    }

    /// Neighbor at a Moore offset; `(0, 0)` is the center
    pub fn at(&self, dx: i32, dy: i32) -> Option<Cell> {
        if (dx, dy) == (0, 0) {
            return Some(self.center);
        }
        MOORE_OFFSETS
            .iter()
            .position(|&offset| offset == (dx, dy))
            .map(|index| self.neighbors[index])
    }
}

/// Resolved neighbor coordinates of `(x, y)`, excluding missing ones
pub fn neighbor_coords(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    policy: BoundaryPolicy,
) -> Vec<(u32, u32)> {
    MOORE_OFFSETS
        .iter()
        .filter_map(|&(dx, dy)| policy.resolve(x, y, dx, dy, width, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_includes_opposite_corner() {
        let coords = neighbor_coords(0, 0, 3, 3, BoundaryPolicy::Wrap);
        assert_eq!(coords.len(), 8);
        assert!(coords.contains(&(2, 2)));
        assert!(coords.contains(&(2, 0)));
        assert!(coords.contains(&(0, 2)));
    }

    #[test]
    fn test_clamp_excludes_opposite_corner() {
        let coords = neighbor_coords(0, 0, 3, 3, BoundaryPolicy::Clamp);
        assert!(!coords.contains(&(2, 2)));
        // (-1, -1) snaps back onto the corner itself
        assert!(coords.contains(&(0, 0)));
    }

    #[test]
    fn test_dead_excludes_opposite_corner() {
        let coords = neighbor_coords(0, 0, 3, 3, BoundaryPolicy::Dead);
        assert!(!coords.contains(&(2, 2)));
        assert_eq!(coords, vec![(1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_gather_counts_wrapped_neighbor() {
        let mut grid = Grid::new(3, 3);
        grid.set_alive(2, 2, true);

        let wrapped = Neighborhood::gather(&grid, 0, 0, BoundaryPolicy::Wrap);
        assert_eq!(wrapped.live_neighbors(), 1);
        assert_eq!(wrapped.at(-1, -1), Some(Cell::ALIVE));

        let dead = Neighborhood::gather(&grid, 0, 0, BoundaryPolicy::Dead);
        assert_eq!(dead.live_neighbors(), 0);
        assert_eq!(dead.at(-1, -1), Some(Cell::DEAD));
        assert_eq!(dead.at(2, 0), None);
    }

    #[test]
    fn test_interior_cells_agree_across_policies() {
        let mut grid = Grid::new(5, 5);
        grid.set_alive(1, 1, true);
        grid.set_alive(3, 3, true);
        let policies = [BoundaryPolicy::Wrap, BoundaryPolicy::Clamp, BoundaryPolicy::Dead];
        for policy in policies {
            assert_eq!(Neighborhood::gather(&grid, 2, 2, policy).live_neighbors(), 2);
        }
    }
}
