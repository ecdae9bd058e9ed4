//! Post-generation map checks
//!
//! These work on any grid, including maps read back from an exported
//! literal, and report what they find instead of failing fast.

use std::collections::VecDeque;
use std::ops::Range;

use itertools::Itertools;

use crate::connectivity::{can_move, is_reachable_to_perimeter, step, Edge, Region, Regions};
use crate::map_generator::DEAD_END_SIZES;
use crate::{Cell, Direction, Grid, Point};

/// Boundary bits that should have been set by border sealing
pub fn unsealed_borders(grid: &Grid) -> Vec<Edge> {
    let (width, height) = (grid.width(), grid.height());
    let top = (0..width).map(|x| Point::new(x, 0));
    let bottom = (0..width).map(|x| Point::new(x, height - 1));
    let left = (0..height).map(|y| Point::new(0, y));
    let right = (0..height).map(|y| Point::new(width - 1, y));

    let horizontal = top
        .chain(bottom)
        .filter(|p| !grid.cell(*p).wall_top())
        .map(|cell| Edge {
            cell,
            direction: Direction::Up,
        });
    let vertical = left
        .chain(right)
        .filter(|p| !grid.cell(*p).wall_left())
        .map(|cell| Edge {
            cell,
            direction: Direction::Left,
        });
    horizontal.chain(vertical).unique().collect()
}

/// Cells of the playable ring, clockwise from the top-left corner
pub fn perimeter_ring(grid: &Grid) -> Vec<Point> {
    let last = grid.last_playable();
    let top = (0..=last.x).map(|x| Point::new(x, 0));
    let right = (1..=last.y).map(|y| Point::new(last.x, y));
    let bottom = (0..last.x).rev().map(|x| Point::new(x, last.y));
    let left = (1..last.y).rev().map(|y| Point::new(0, y));
    top.chain(right).chain(bottom).chain(left).collect()
}

/// Walled edges between consecutive ring cells
pub fn blocked_corridor_edges(grid: &Grid) -> Vec<Edge> {
    perimeter_ring(grid)
        .into_iter()
        .circular_tuple_windows()
        .filter_map(|(from, to)| Direction::between(from, to).map(|direction| (from, direction)))
        .filter(|(from, direction)| !can_move(grid, *from, *direction))
        .map(|(cell, direction)| Edge { cell, direction })
        .collect()
}

/// True if a search that never leaves the ring visits every ring cell.
pub fn ring_is_connected(grid: &Grid) -> bool {
    let ring = perimeter_ring(grid);
    let Some(&start) = ring.first() else {
        return false;
    };

    let mut visited = vec![false; grid.width() * grid.height()];
    let mut queue = VecDeque::from([start]);
    visited[grid.index(start)] = true;
    let mut seen = 1;

    while let Some(cell) = queue.pop_front() {
        for direction in Direction::ALL {
            if let Some(next) = step(grid, cell, direction).filter(|p| grid.is_on_perimeter(*p)) {
                let index = grid.index(next);
                if !visited[index] {
                    visited[index] = true;
                    seen += 1;
                    queue.push_back(next);
                }
            }
        }
    }
    seen == ring.len()
}

/// True if every playable corner can step to both of its ring neighbours.
pub fn corners_intact(grid: &Grid) -> bool {
    grid.corner_exits().iter().all(|(corner, directions)| {
        directions
            .iter()
            .all(|direction| can_move(grid, *corner, *direction))
    })
}

/// Ghost house cells with no way out to the perimeter
pub fn unreachable_ghost_spawns(grid: &Grid) -> Vec<Point> {
    grid.find(Cell::GHOST_SPAWN)
        .into_iter()
        .filter(|p| !is_reachable_to_perimeter(grid, *p))
        .collect()
}

/// Cells not flagged [Cell::INACCESSIBLE] whose region never touches the
/// perimeter ring
pub fn stranded_cells(grid: &Grid) -> Vec<Point> {
    let regions = Regions::label(grid);
    let touches_ring = regions
        .iter()
        .map(|region| region.cells.iter().any(|p| grid.is_on_perimeter(*p)))
        .collect::<Vec<_>>();

    grid.positions()
        .filter(|p| !grid.has_flag(*p, Cell::INACCESSIBLE))
        .filter(|p| !touches_ring[regions.region_of(*p)])
        .collect()
}

/// Regions sized within `sizes` that have exactly one entry
pub fn dead_ends(grid: &Grid, sizes: Range<usize>) -> Vec<Region> {
    let regions = Regions::label(grid);
    regions
        .iter()
        .enumerate()
        .filter(|(_, region)| sizes.contains(&region.len()))
        .filter(|(index, _)| regions.entries(grid, *index).len() == 1)
        .map(|(_, region)| region.clone())
        .collect()
}

/// Cells carrying both collectibles, or a collectible on a spawn
pub fn collectible_violations(grid: &Grid) -> Vec<Point> {
    grid.positions()
        .filter(|p| {
            let cell = grid.cell(*p);
            (cell.has(Cell::DOT) && cell.has(Cell::POWER_PELLET))
                || (cell.is_spawn() && cell.has_collectible())
        })
        .collect()
}

/// Results of every check on one grid
#[derive(Clone, Debug)]
pub struct ValidationReport {
    pub pacman_spawns: usize,
    pub unsealed_borders: Vec<Edge>,
    pub blocked_corridor: Vec<Edge>,
    pub ring_connected: bool,
    pub corners_intact: bool,
    pub unreachable_ghost_spawns: Vec<Point>,
    pub stranded_cells: Vec<Point>,
    pub collectible_violations: Vec<Point>,
    /// Informational only, elimination is a single pass
    pub dead_ends: usize,
}

impl ValidationReport {
    /// Run every check, counting dead ends over [DEAD_END_SIZES]
    pub fn run(grid: &Grid) -> Self {
        Self::run_with_sizes(grid, DEAD_END_SIZES)
    }

    /// Run every check, counting dead ends over `dead_end_sizes`
    pub fn run_with_sizes(grid: &Grid, dead_end_sizes: Range<usize>) -> Self {
        ValidationReport {
            pacman_spawns: grid.count(Cell::PACMAN_SPAWN),
            unsealed_borders: unsealed_borders(grid),
            blocked_corridor: blocked_corridor_edges(grid),
            ring_connected: ring_is_connected(grid),
            corners_intact: corners_intact(grid),
            unreachable_ghost_spawns: unreachable_ghost_spawns(grid),
            stranded_cells: stranded_cells(grid),
            collectible_violations: collectible_violations(grid),
            dead_ends: dead_ends(grid, dead_end_sizes).len(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.pacman_spawns == 1
            && self.unsealed_borders.is_empty()
            && self.blocked_corridor.is_empty()
            && self.ring_connected
            && self.corners_intact
            && self.unreachable_ghost_spawns.is_empty()
            && self.stranded_cells.is_empty()
            && self.collectible_violations.is_empty()
    }

    /// Print report
    pub fn print_report(&self) {
        fn line(name: &str, ok: bool, detail: String) {
            let mark = if ok { "ok  " } else { "FAIL" };
            if detail.is_empty() {
                println!("[{}] {}", mark, name);
            } else {
                println!("[{}] {}: {}", mark, name, detail);
            }
        }
        fn edges(edges: &[Edge]) -> String {
            edges
                .iter()
                .map(|edge| format!("{} {:?}", edge.cell, edge.direction))
                .join(", ")
        }
        fn points(points: &[Point]) -> String {
            points.iter().join(", ")
        }

        line(
            "Single player spawn",
            self.pacman_spawns == 1,
            format!("{} found", self.pacman_spawns),
        );
        line(
            "Border sealed",
            self.unsealed_borders.is_empty(),
            edges(&self.unsealed_borders),
        );
        line(
            "Perimeter corridor open",
            self.blocked_corridor.is_empty(),
            edges(&self.blocked_corridor),
        );
        line("Perimeter ring connected", self.ring_connected, String::new());
        line("Corners traversable", self.corners_intact, String::new());
        line(
            "Ghost spawns reach perimeter",
            self.unreachable_ghost_spawns.is_empty(),
            points(&self.unreachable_ghost_spawns),
        );
        line(
            "Accessible cells reach perimeter",
            self.stranded_cells.is_empty(),
            points(&self.stranded_cells),
        );
        line(
            "Collectibles exclusive",
            self.collectible_violations.is_empty(),
            points(&self.collectible_violations),
        );
        println!("Remaining dead ends: {}", self.dead_ends);
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::map_generator::{
        create_perimeter_path, ensure_traversable_corners, generate_random_walls, seal_borders,
    };

    fn sealed_open(width: usize, height: usize) -> Grid {
        let mut grid = Grid::new(width, height);
        seal_borders(&mut grid);
        grid
    }

    #[test]
    fn ring_order_is_clockwise() {
        let grid = Grid::new(5, 4);
        // Playable area is 4x3
        assert_eq!(
            perimeter_ring(&grid),
            vec![
                Point::new(0, 0),
                Point::new(1, 0),
                Point::new(2, 0),
                Point::new(3, 0),
                Point::new(3, 1),
                Point::new(3, 2),
                Point::new(2, 2),
                Point::new(1, 2),
                Point::new(0, 2),
                Point::new(0, 1),
            ]
        );
    }

    #[test]
    fn detect_unsealed_border() {
        let mut grid = sealed_open(8, 8);
        assert!(unsealed_borders(&grid).is_empty());

        grid.set_wall_top(Point::new(3, 7), false);
        grid.set_wall_left(Point::new(0, 0), false);
        assert_eq!(
            unsealed_borders(&grid),
            vec![
                Edge {
                    cell: Point::new(3, 7),
                    direction: Direction::Up
                },
                Edge {
                    cell: Point::new(0, 0),
                    direction: Direction::Left
                },
            ]
        );
    }

    #[test]
    fn detect_blocked_corridor() {
        let mut grid = sealed_open(8, 8);
        assert!(blocked_corridor_edges(&grid).is_empty());
        assert!(ring_is_connected(&grid));

        // Cut the top row between (2, 0) and (3, 0)
        grid.set_wall_left(Point::new(3, 0), true);
        assert_eq!(
            blocked_corridor_edges(&grid),
            vec![Edge {
                cell: Point::new(2, 0),
                direction: Direction::Right
            }]
        );
        // Still a path the long way round
        assert!(ring_is_connected(&grid));

        grid.set_wall_top(Point::new(0, 3), true);
        assert!(!ring_is_connected(&grid));
        assert_eq!(blocked_corridor_edges(&grid).len(), 2);
    }

    #[test]
    fn ring_through_interior_does_not_count() {
        let mut grid = sealed_open(8, 8);
        grid.set_wall_left(Point::new(3, 0), true);
        grid.set_wall_top(Point::new(0, 3), true);
        // The open interior still joins both ring halves, but not along the ring
        assert!(!ring_is_connected(&grid));
    }

    #[test]
    fn corners_need_both_ring_edges() {
        let mut grid = sealed_open(8, 8);
        assert!(corners_intact(&grid));
        grid.set_wall_top(Point::new(6, 6), true);
        assert!(!corners_intact(&grid));
    }

    #[test]
    fn ghost_spawn_in_closed_house() {
        let mut grid = sealed_open(10, 10);
        let spawn = Point::new(5, 5);
        grid.set_flag(spawn, Cell::GHOST_SPAWN, true);
        assert!(unreachable_ghost_spawns(&grid).is_empty());

        grid.set_wall_top(spawn, true);
        grid.set_wall_left(spawn, true);
        grid.set_wall_top(Point::new(5, 6), true);
        grid.set_wall_left(Point::new(6, 5), true);
        assert_eq!(unreachable_ghost_spawns(&grid), vec![spawn]);
    }

    #[test]
    fn stranded_cells_ignore_flagged_cells() {
        let mut grid = sealed_open(10, 10);
        let pocket = Point::new(4, 4);
        grid.set_wall_top(pocket, true);
        grid.set_wall_left(pocket, true);
        grid.set_wall_top(Point::new(4, 5), true);
        grid.set_wall_left(Point::new(5, 4), true);

        let stranded = stranded_cells(&grid);
        assert!(stranded.contains(&pocket));
        // The virtual border is cut off from the ring as well
        assert!(stranded.contains(&Point::new(9, 9)));

        for p in stranded {
            grid.set_flag(p, Cell::INACCESSIBLE, true);
        }
        assert!(stranded_cells(&grid).is_empty());
    }

    #[test]
    fn collectible_exclusivity() {
        let mut grid = Grid::new(6, 6);
        grid.set_flag(Point::new(1, 1), Cell::DOT, true);
        grid.set_flag(Point::new(2, 2), Cell::POWER_PELLET, true);
        assert!(collectible_violations(&grid).is_empty());

        grid.set_flag(Point::new(1, 1), Cell::POWER_PELLET, true);
        grid.set_flag(Point::new(3, 3), Cell::GHOST_SPAWN | Cell::DOT, true);
        assert_eq!(
            collectible_violations(&grid),
            vec![Point::new(1, 1), Point::new(3, 3)]
        );
    }

    #[test]
    fn report_counts_dead_ends_in_given_band() {
        let mut grid = generate_random_walls(4, 1, 1.0, &mut StdRng::seed_from_u64(0));
        grid.set_wall_left(Point::new(1, 0), false);
        grid.set_wall_left(Point::new(2, 0), false);

        assert_eq!(ValidationReport::run(&grid).dead_ends, 1);
        assert_eq!(ValidationReport::run_with_sizes(&grid, 5..10).dead_ends, 0);
        assert_eq!(ValidationReport::run_with_sizes(&grid, 1..4).dead_ends, 2);
    }

    #[test]
    fn report_on_carved_grid() {
        let mut grid = generate_random_walls(18, 12, 1.0, &mut StdRng::seed_from_u64(0));
        seal_borders(&mut grid);
        ensure_traversable_corners(&mut grid);
        create_perimeter_path(&mut grid);

        let report = ValidationReport::run(&grid);
        assert!(report.unsealed_borders.is_empty());
        assert!(report.blocked_corridor.is_empty());
        assert!(report.ring_connected);
        assert!(report.corners_intact);
        // No player spawn and the walled interior is stranded
        assert_eq!(report.pacman_spawns, 0);
        assert!(!report.stranded_cells.is_empty());
        assert!(!report.is_ok());
    }
}
