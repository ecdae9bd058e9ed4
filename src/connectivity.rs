//! Wall-aware movement and reachability queries
//!
//! A wall is stored once, on the cell south or east of it. Moving up or left
//! tests the bit of the current cell; moving down or right tests the bit of
//! the neighbour.

use std::collections::VecDeque;

use crate::{Cell, Direction, Grid, Point};

/// One side of a wall segment, seen from `cell`
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Edge {
    pub cell: Point,
    pub direction: Direction,
}

impl Edge {
    /// Cell on the other side of the edge, if it lies within `grid`
    pub fn far_side(&self, grid: &Grid) -> Option<Point> {
        self.direction
            .offset(self.cell, grid.width(), grid.height())
    }
}

/// Test whether the edge on `direction` side of `from` is open.
///
/// Moving down or right from the last row or column is never possible.
/// Moving up or left from the first row or column only tests the cell's own
/// bit, so callers must bounds-check the target.
pub fn can_move(grid: &Grid, from: Point, direction: Direction) -> bool {
    match direction {
        Direction::Up => !grid.cell(from).wall_top(),
        Direction::Left => !grid.cell(from).wall_left(),
        Direction::Down => {
            from.y + 1 < grid.height() && !grid.cell(Point::new(from.x, from.y + 1)).wall_top()
        }
        Direction::Right => {
            from.x + 1 < grid.width() && !grid.cell(Point::new(from.x + 1, from.y)).wall_left()
        }
    }
}

/// Neighbour reached by moving in `direction`, if the move is possible
pub fn step(grid: &Grid, from: Point, direction: Direction) -> Option<Point> {
    direction
        .offset(from, grid.width(), grid.height())
        .filter(|_| can_move(grid, from, direction))
}

/// Cell and flag that store the wall on `direction` side of `cell`
fn wall_owner(grid: &Grid, cell: Point, direction: Direction) -> Option<(Point, u8)> {
    match direction {
        Direction::Up => Some((cell, Cell::WALL_TOP)),
        Direction::Left => Some((cell, Cell::WALL_LEFT)),
        Direction::Down => direction
            .offset(cell, grid.width(), grid.height())
            .map(|owner| (owner, Cell::WALL_TOP)),
        Direction::Right => direction
            .offset(cell, grid.width(), grid.height())
            .map(|owner| (owner, Cell::WALL_LEFT)),
    }
}

/// Whether the wall on `direction` side of `cell` is stored in the grid.
///
/// Down from the last row and right from the last column have no owner.
pub fn can_break(grid: &Grid, cell: Point, direction: Direction) -> bool {
    wall_owner(grid, cell, direction).is_some()
}

/// Remove the wall on `direction` side of `cell`.
///
/// Returns `false` without changing anything if the wall would be stored in
/// a cell outside the grid.
pub fn break_wall(grid: &mut Grid, cell: Point, direction: Direction) -> bool {
    match wall_owner(grid, cell, direction) {
        Some((owner, flag)) => {
            grid.set_flag(owner, flag, false);
            true
        }
        None => false,
    }
}

/// Connected set of cells
#[derive(Clone, Debug, Default)]
pub struct Region {
    /// Cells in discovery order, starting cell first
    pub cells: Vec<Point>,
    /// Every blocked edge of the region, including edges facing off-grid
    pub borders: Vec<Edge>,
}

impl Region {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Breadth-first fill from `start` over open edges
pub fn flood_fill(grid: &Grid, start: Point) -> Region {
    let mut visited = vec![false; grid.width() * grid.height()];
    flood_fill_from(grid, start, &mut visited)
}

fn flood_fill_from(grid: &Grid, start: Point, visited: &mut [bool]) -> Region {
    let mut region = Region::default();
    let mut queue = VecDeque::from([start]);
    visited[grid.index(start)] = true;

    while let Some(cell) = queue.pop_front() {
        region.cells.push(cell);
        for direction in Direction::ALL {
            if can_move(grid, cell, direction) {
                if let Some(next) = direction.offset(cell, grid.width(), grid.height()) {
                    let index = grid.index(next);
                    if !visited[index] {
                        visited[index] = true;
                        queue.push_back(next);
                    }
                }
            } else {
                region.borders.push(Edge { cell, direction });
            }
        }
    }
    region
}

/// Partition of a grid into connected components
#[derive(Clone, Debug)]
pub struct Regions {
    width: usize,
    /// Region index of each cell, row-major
    labels: Vec<usize>,
    regions: Vec<Region>,
}

impl Regions {
    /// Flood fill from every unvisited cell in row-major order.
    pub fn label(grid: &Grid) -> Self {
        let mut visited = vec![false; grid.width() * grid.height()];
        let mut labels = vec![0; grid.width() * grid.height()];
        let mut regions = Vec::new();

        for start in grid.positions() {
            if visited[grid.index(start)] {
                continue;
            }
            let region = flood_fill_from(grid, start, &mut visited);
            for cell in &region.cells {
                labels[grid.index(*cell)] = regions.len();
            }
            regions.push(region);
        }

        Regions {
            width: grid.width(),
            labels,
            regions,
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, index: usize) -> &Region {
        &self.regions[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> + '_ {
        self.regions.iter()
    }

    pub fn region_of(&self, p: Point) -> usize {
        self.labels[p.y * self.width + p.x]
    }

    /// Border edges of region `index` that face a different region
    pub fn entries(&self, grid: &Grid, index: usize) -> Vec<Edge> {
        self.regions[index]
            .borders
            .iter()
            .filter(|edge| {
                edge.far_side(grid)
                    .is_some_and(|far| self.region_of(far) != index)
            })
            .copied()
            .collect()
    }
}

/// Row-major mask of the cells reachable from `start`
pub fn reachable_from(grid: &Grid, start: Point) -> Vec<bool> {
    let mut visited = vec![false; grid.width() * grid.height()];
    flood_fill_from(grid, start, &mut visited);
    visited
}

/// Set [Cell::INACCESSIBLE] on every cell not reachable from `start` and
/// clear it on the rest. Returns the number of flagged cells.
pub fn flag_inaccessible(grid: &mut Grid, start: Point) -> usize {
    let visited = reachable_from(grid, start);
    let mut flagged = 0;
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let p = Point::new(x, y);
            let unreachable = !visited[grid.index(p)];
            grid.set_flag(p, Cell::INACCESSIBLE, unreachable);
            flagged += usize::from(unreachable);
        }
    }
    flagged
}

/// Breadth-first search from `start` that stops at the first cell on the
/// playable perimeter ring.
pub fn is_reachable_to_perimeter(grid: &Grid, start: Point) -> bool {
    let mut visited = vec![false; grid.width() * grid.height()];
    let mut queue = VecDeque::from([start]);
    visited[grid.index(start)] = true;

    while let Some(cell) = queue.pop_front() {
        if grid.is_on_perimeter(cell) {
            return true;
        }
        for direction in Direction::ALL {
            if let Some(next) = step(grid, cell, direction) {
                let index = grid.index(next);
                if !visited[index] {
                    visited[index] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    false
}
