//! Space
//!
//! A rectangular grid of cells indexing which agents stand where.
//!
//! The grid stores entities per cell; each agent also carries a `GridPos`
//! component. Every mutation goes through `place`, `remove` or `move_agent`
//! so the two never disagree.

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::GridPos;
use crate::error::{SimError, SimResult};

/// How many agents a cell may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Single,
    Multi,
}

/// Shape of a neighborhood query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// All cells within Chebyshev distance `radius` (8 neighbors at radius 1)
    Moore,
    /// All cells within Manhattan distance `radius` (4 neighbors at radius 1)
    VonNeumann,
}

/// Resource: the model's spatial index
#[derive(Resource, Debug, Clone)]
pub struct SpaceGrid {
    width: usize,
    height: usize,
    torus: bool,
    occupancy: Occupancy,
    cells: Vec<Vec<Entity>>,
}

impl SpaceGrid {
    pub fn new(width: usize, height: usize, torus: bool, occupancy: Occupancy) -> SimResult<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidParameter(format!(
                "grid must be at least 1x1, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            torus,
            occupancy,
            cells: vec![Vec::new(); width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn torus(&self) -> bool {
        self.torus
    }

    pub fn occupancy(&self) -> Occupancy {
        self.occupancy
    }

    /// Number of cells
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Resolve signed coordinates to a cell, wrapping on a torus.
    /// Returns None when the coordinates fall off a bounded grid.
    pub fn resolve(&self, x: i64, y: i64) -> Option<GridPos> {
        let (w, h) = (self.width as i64, self.height as i64);
        if self.torus {
            Some(GridPos::new(x.rem_euclid(w) as usize, y.rem_euclid(h) as usize))
        } else if (0..w).contains(&x) && (0..h).contains(&y) {
            Some(GridPos::new(x as usize, y as usize))
        } else {
            None
        }
    }

    fn index(&self, pos: GridPos) -> SimResult<usize> {
        if !self.in_bounds(pos) {
            return Err(SimError::OutOfBounds {
                x: pos.x as i64,
                y: pos.y as i64,
                width: self.width,
                height: self.height,
            });
        }
        Ok(pos.y * self.width + pos.x)
    }

    /// Agents in a cell. Out-of-bounds positions are empty.
    pub fn cell(&self, pos: GridPos) -> &[Entity] {
        match self.index(pos) {
            Ok(i) => &self.cells[i],
            Err(_) => &[],
        }
    }

    pub fn is_cell_empty(&self, pos: GridPos) -> bool {
        self.cell(pos).is_empty()
    }

    /// Whether an agent may be placed into the cell
    pub fn has_room(&self, pos: GridPos) -> bool {
        self.in_bounds(pos) && (self.occupancy == Occupancy::Multi || self.is_cell_empty(pos))
    }

    /// Every empty cell, row-major
    pub fn empty_cells(&self) -> Vec<GridPos> {
        self.positions().filter(|p| self.is_cell_empty(*p)).collect()
    }

    /// Every cell, row-major
    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| GridPos::new(x, y)))
    }

    /// Total agents on the grid
    pub fn population(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_full(&self) -> bool {
        self.occupancy == Occupancy::Single && self.population() >= self.area()
    }

    /// Cells around `pos`, row-major, without duplicates.
    pub fn neighborhood(
        &self,
        pos: GridPos,
        kind: Neighborhood,
        include_center: bool,
        radius: usize,
    ) -> Vec<GridPos> {
        let r = radius as i64;
        let (cx, cy) = (pos.x as i64, pos.y as i64);
        let mut out = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 && !include_center {
                    continue;
                }
                if kind == Neighborhood::VonNeumann && dx.abs() + dy.abs() > r {
                    continue;
                }
                if let Some(cell) = self.resolve(cx + dx, cy + dy) {
                    // On small tori several offsets can wrap onto the same cell
                    if !out.contains(&cell) && (include_center || cell != pos) {
                        out.push(cell);
                    }
                }
            }
        }
        out.sort_by_key(|p| (p.y, p.x));
        out
    }

    /// Agents standing in the neighborhood of `pos`
    pub fn neighbors(
        &self,
        pos: GridPos,
        kind: Neighborhood,
        include_center: bool,
        radius: usize,
    ) -> Vec<Entity> {
        self.neighborhood(pos, kind, include_center, radius)
            .into_iter()
            .flat_map(|p| self.cell(p).iter().copied())
            .collect()
    }

    /// Empty cells in the Moore neighborhood of `pos`
    pub fn empty_neighbors(&self, pos: GridPos) -> Vec<GridPos> {
        self.neighborhood(pos, Neighborhood::Moore, false, 1)
            .into_iter()
            .filter(|p| self.is_cell_empty(*p))
            .collect()
    }

    pub fn place(&mut self, entity: Entity, pos: GridPos) -> SimResult<()> {
        let i = self.index(pos)?;
        if self.occupancy == Occupancy::Single && !self.cells[i].is_empty() {
            return Err(SimError::CellOccupied(pos));
        }
        self.cells[i].push(entity);
        Ok(())
    }

    pub fn remove(&mut self, entity: Entity, pos: GridPos) -> SimResult<()> {
        let i = self.index(pos)?;
        let cell = &mut self.cells[i];
        match cell.iter().position(|e| *e == entity) {
            Some(slot) => {
                cell.remove(slot);
                Ok(())
            }
            None => Err(SimError::AgentNotOnGrid(pos)),
        }
    }

    /// Move an agent between cells. The grid is unchanged on error.
    pub fn move_agent(&mut self, entity: Entity, from: GridPos, to: GridPos) -> SimResult<()> {
        if from == to {
            return Ok(());
        }
        let target = self.index(to)?;
        if self.occupancy == Occupancy::Single && !self.cells[target].is_empty() {
            return Err(SimError::CellOccupied(to));
        }
        self.remove(entity, from)?;
        self.cells[target].push(entity);
        Ok(())
    }

    /// A uniformly random empty cell, or None when the grid is full
    pub fn random_empty_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<GridPos> {
        self.empty_cells().choose(rng).copied()
    }

    /// A uniformly random cell
    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> GridPos {
        GridPos::new(rng.gen_range(0..self.width), rng.gen_range(0..self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(world: &mut World, n: usize) -> Vec<Entity> {
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn test_rejects_empty_grid() {
        assert!(SpaceGrid::new(0, 5, false, Occupancy::Single).is_err());
    }

    #[test]
    fn test_moore_neighborhood_bounded() {
        let grid = SpaceGrid::new(10, 10, false, Occupancy::Single).unwrap();

        assert_eq!(grid.neighborhood(GridPos::new(5, 5), Neighborhood::Moore, false, 1).len(), 8);
        assert_eq!(grid.neighborhood(GridPos::new(5, 5), Neighborhood::Moore, true, 1).len(), 9);
        // Corners lose the off-grid cells
        assert_eq!(grid.neighborhood(GridPos::new(0, 0), Neighborhood::Moore, false, 1).len(), 3);
        assert_eq!(grid.neighborhood(GridPos::new(9, 4), Neighborhood::Moore, false, 1).len(), 5);
    }

    #[test]
    fn test_von_neumann_and_radius() {
        let grid = SpaceGrid::new(10, 10, false, Occupancy::Single).unwrap();
        let centre = GridPos::new(5, 5);

        assert_eq!(grid.neighborhood(centre, Neighborhood::VonNeumann, false, 1).len(), 4);
        assert_eq!(grid.neighborhood(centre, Neighborhood::VonNeumann, false, 2).len(), 12);
        assert_eq!(grid.neighborhood(centre, Neighborhood::Moore, false, 2).len(), 24);
    }

    #[test]
    fn test_torus_wraps() {
        let grid = SpaceGrid::new(10, 10, true, Occupancy::Multi).unwrap();
        let cells = grid.neighborhood(GridPos::new(0, 0), Neighborhood::Moore, false, 1);

        assert_eq!(cells.len(), 8);
        assert!(cells.contains(&GridPos::new(9, 9)));
        assert!(cells.contains(&GridPos::new(9, 0)));
        assert!(cells.contains(&GridPos::new(0, 9)));
    }

    #[test]
    fn test_small_torus_has_no_duplicates() {
        let grid = SpaceGrid::new(2, 2, true, Occupancy::Multi).unwrap();
        let cells = grid.neighborhood(GridPos::new(0, 0), Neighborhood::Moore, false, 1);
        assert_eq!(cells.len(), 3);
        assert!(!cells.contains(&GridPos::new(0, 0)));
    }

    #[test]
    fn test_single_occupancy_place_and_move() {
        let mut world = World::new();
        let e = entities(&mut world, 2);
        let mut grid = SpaceGrid::new(3, 3, false, Occupancy::Single).unwrap();

        grid.place(e[0], GridPos::new(1, 1)).unwrap();
        assert!(matches!(
            grid.place(e[1], GridPos::new(1, 1)),
            Err(SimError::CellOccupied(_))
        ));
        grid.place(e[1], GridPos::new(0, 0)).unwrap();

        assert!(grid.move_agent(e[1], GridPos::new(0, 0), GridPos::new(1, 1)).is_err());
        // Failed move leaves the agent where it was
        assert_eq!(grid.cell(GridPos::new(0, 0)), &[e[1]]);

        grid.move_agent(e[1], GridPos::new(0, 0), GridPos::new(2, 2)).unwrap();
        assert!(grid.is_cell_empty(GridPos::new(0, 0)));
        assert_eq!(grid.population(), 2);
        assert_eq!(grid.empty_cells().len(), 7);
    }

    #[test]
    fn test_multi_occupancy_and_out_of_bounds() {
        let mut world = World::new();
        let e = entities(&mut world, 3);
        let mut grid = SpaceGrid::new(4, 4, false, Occupancy::Multi).unwrap();

        for entity in &e {
            grid.place(*entity, GridPos::new(2, 2)).unwrap();
        }
        assert_eq!(grid.cell(GridPos::new(2, 2)).len(), 3);
        assert!(matches!(
            grid.place(e[0], GridPos::new(4, 0)),
            Err(SimError::OutOfBounds { .. })
        ));

        grid.remove(e[1], GridPos::new(2, 2)).unwrap();
        assert!(matches!(
            grid.remove(e[1], GridPos::new(2, 2)),
            Err(SimError::AgentNotOnGrid(_))
        ));
        assert_eq!(grid.neighbors(GridPos::new(1, 1), Neighborhood::Moore, false, 1).len(), 2);
    }

    #[test]
    fn test_full_grid() {
        let mut world = World::new();
        let e = entities(&mut world, 4);
        let mut grid = SpaceGrid::new(2, 2, false, Occupancy::Single).unwrap();
        for (entity, pos) in e.iter().zip(grid.positions().collect::<Vec<_>>()) {
            grid.place(*entity, pos).unwrap();
        }
        assert!(grid.is_full());
        assert!(grid.empty_cells().is_empty());
        assert!(grid.empty_neighbors(GridPos::new(0, 0)).is_empty());
    }
}
