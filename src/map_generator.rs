//! Map generation
//!
//! The pipeline seeds random walls, seals the border, places the spawns,
//! repairs reachability, removes dead ends and finally carves the perimeter
//! corridor and places the collectibles. Repair passes may punch through the
//! border, which is why sealing runs twice.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;

use anyhow::{anyhow, bail, Context};
use itertools::Itertools;
use log::{debug, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::connectivity::{
    break_wall, can_break, can_move, flag_inaccessible, is_reachable_to_perimeter, Edge, Regions,
};
use crate::{validation, Cell, Direction, Grid, Point};

/// Region sizes eligible for dead-end elimination
pub const DEAD_END_SIZES: Range<usize> = 3..30;

/// Tunable generation parameters
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
    /// Board width, including the virtual border column
    pub width: usize,
    /// Board height, including the virtual border row
    pub height: usize,
    /// Rendered cell size in pixels, carried through to the export only
    pub cell_size: u32,
    /// Probability of seeding each top and each left wall
    pub wall_probability: f64,
    /// Walls broken at most per reachability repair
    pub repair_attempts: usize,
    pub dead_end_sizes: Range<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            width: 18,
            height: 12,
            cell_size: 40,
            wall_probability: 0.55,
            repair_attempts: 100,
            dead_end_sizes: DEAD_END_SIZES,
        }
    }
}

impl GeneratorConfig {
    pub const MIN_SIZE: usize = 6;

    /// Check the configuration before any generation starts.
    ///
    /// The board must fit the ghost house and leave room for a player spawn
    /// outside its exclusion zone.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width < Self::MIN_SIZE || self.height < Self::MIN_SIZE {
            bail!(
                "Board must be at least {min}x{min}, got {}x{}",
                self.width,
                self.height,
                min = Self::MIN_SIZE
            );
        }
        if !(0.0..=1.0).contains(&self.wall_probability) {
            bail!(
                "Wall probability must be within [0, 1], got {}",
                self.wall_probability
            );
        }
        if self.dead_end_sizes.is_empty() {
            bail!("Dead-end size range {:?} is empty", self.dead_end_sizes);
        }
        if player_spawn_candidates(self.width, self.height).is_empty() {
            bail!(
                "A {}x{} board leaves no player spawn outside the ghost house zone",
                self.width,
                self.height
            );
        }
        Ok(())
    }
}

/// Locations the reachability repair has to connect to the perimeter
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct SpawnPoints {
    pub pacman: Point,
    /// Ghost house cell whose top wall is the exit
    pub ghost_exit: Point,
}

/// Result of one [break_path_to_perimeter] run
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct RepairOutcome {
    pub attempts: usize,
    pub reached: bool,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct DeadEndReport {
    /// Regions found when the pass started
    pub regions: usize,
    /// Regions within the size band
    pub candidates: usize,
    /// Dead ends that had a wall broken
    pub fixed: usize,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct DotReport {
    pub dots: usize,
    pub pellets: usize,
    pub inaccessible: usize,
}

/// Everything the pipeline could not guarantee, collected for the caller
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct GenerationReport {
    pub player_repair: RepairOutcome,
    pub ghost_repair: RepairOutcome,
    pub dead_ends: DeadEndReport,
    pub dots: DotReport,
    /// One-entry regions left after the single elimination pass
    pub residual_dead_ends: usize,
    /// Playable cells the player cannot reach
    pub unreachable_playable: usize,
    pub corners_intact: bool,
}

/// Overall quality of a generated map
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MapStatus {
    /// Every playable cell is reachable, no dead end remains and the
    /// perimeter corners are open
    Connected,
    Degraded {
        exhausted_repairs: usize,
        residual_dead_ends: usize,
        unreachable_cells: usize,
        corners_intact: bool,
    },
}

impl GenerationReport {
    pub fn status(&self) -> MapStatus {
        let exhausted_repairs = [self.player_repair, self.ghost_repair]
            .iter()
            .filter(|repair| !repair.reached)
            .count();
        if exhausted_repairs == 0
            && self.residual_dead_ends == 0
            && self.unreachable_playable == 0
            && self.corners_intact
        {
            MapStatus::Connected
        } else {
            MapStatus::Degraded {
                exhausted_repairs,
                residual_dead_ends: self.residual_dead_ends,
                unreachable_cells: self.unreachable_playable,
                corners_intact: self.corners_intact,
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status() == MapStatus::Connected
    }
}

impl fmt::Display for MapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapStatus::Connected => write!(f, "connected"),
            MapStatus::Degraded {
                exhausted_repairs,
                residual_dead_ends,
                unreachable_cells,
                corners_intact,
            } => write!(
                f,
                "degraded ({} exhausted repairs, {} dead ends, {} unreachable cells, corners {})",
                exhausted_repairs,
                residual_dead_ends,
                unreachable_cells,
                if *corners_intact { "intact" } else { "blocked" }
            ),
        }
    }
}

/// Finished map, handed off to consumers
#[derive(Clone, Debug)]
pub struct GeneratedMap {
    pub grid: Grid,
    pub spawns: SpawnPoints,
    pub report: GenerationReport,
}

/// Maze generator for PacMan boards.
pub struct MapGenerator {
    config: GeneratorConfig,
    random: StdRng,
}

impl MapGenerator {
    /// Create generator, seeded from `seed` or from system entropy.
    ///
    /// Returns error, if `config` does not pass [GeneratorConfig::validate].
    pub fn new(config: GeneratorConfig, seed: Option<u64>) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            random: if let Some(state) = seed {
                StdRng::seed_from_u64(state)
            } else {
                StdRng::from_entropy()
            },
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run the full pipeline on a fresh grid.
    pub fn generate(&mut self) -> anyhow::Result<GeneratedMap> {
        let config = &self.config;
        let random = &mut self.random;

        let mut grid = generate_random_walls(
            config.width,
            config.height,
            config.wall_probability,
            random,
        );
        seal_borders(&mut grid);

        let spawns = add_spawn_points(&mut grid, random)?;
        let player_repair = break_path_to_perimeter(&mut grid, spawns.pacman, config.repair_attempts);
        let ghost_repair =
            break_path_to_perimeter(&mut grid, spawns.ghost_exit, config.repair_attempts);

        let dead_ends = fix_dead_ends(&mut grid, config.dead_end_sizes.clone(), random);

        // Repairs may have opened the outer boundary
        seal_borders(&mut grid);
        ensure_traversable_corners(&mut grid);
        create_perimeter_path(&mut grid);

        let dots = add_dots(&mut grid, spawns.pacman);

        let report = GenerationReport {
            player_repair,
            ghost_repair,
            dead_ends,
            dots,
            residual_dead_ends: validation::dead_ends(&grid, config.dead_end_sizes.clone()).len(),
            unreachable_playable: grid
                .find(Cell::INACCESSIBLE)
                .into_iter()
                .filter(|p| grid.is_playable(*p))
                .count(),
            corners_intact: validation::corners_intact(&grid),
        };
        info!(
            "Generated {}x{} map: {} dots, {} pellets, {}",
            grid.width(),
            grid.height(),
            dots.dots,
            dots.pellets,
            report.status()
        );

        Ok(GeneratedMap {
            grid,
            spawns,
            report,
        })
    }

    /// Generate until a [MapStatus::Connected] map comes out, at most
    /// `max_runs` times.
    ///
    /// If no run is connected, the map with the fewest unreachable cells is
    /// returned.
    pub fn generate_until_connected(&mut self, max_runs: usize) -> anyhow::Result<GeneratedMap> {
        if max_runs == 0 {
            bail!("At least one generation run is required");
        }

        let mut best: Option<GeneratedMap> = None;
        for run in 1..=max_runs {
            let map = self.generate()?;
            if map.report.is_connected() {
                debug!("Connected map found on run {}", run);
                return Ok(map);
            }
            let improves = best.as_ref().map_or(true, |best| {
                map.report.unreachable_playable < best.report.unreachable_playable
            });
            if improves {
                best = Some(map);
            }
        }

        let best = best.ok_or_else(|| anyhow!("No map was generated"))?;
        warn!(
            "No connected map in {} runs, returning {} map",
            max_runs,
            best.report.status()
        );
        Ok(best)
    }
}

/// Fresh grid where every top and left wall is an independent Bernoulli
/// trial with probability `wall_probability`.
///
/// # Panics
///
/// If `wall_probability` is outside `[0, 1]` or NaN. [GeneratorConfig::validate]
/// rejects such values before [MapGenerator] gets here.
pub fn generate_random_walls<R: Rng>(
    width: usize,
    height: usize,
    wall_probability: f64,
    random: &mut R,
) -> Grid {
    let mut grid = Grid::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let p = Point::new(x, y);
            if random.gen_bool(wall_probability) {
                grid.set_wall_top(p, true);
            }
            if random.gen_bool(wall_probability) {
                grid.set_wall_left(p, true);
            }
        }
    }
    grid
}

/// Wall off the first and virtual last row and column. Idempotent.
pub fn seal_borders(grid: &mut Grid) {
    let (width, height) = (grid.width(), grid.height());
    for x in 0..width {
        grid.set_wall_top(Point::new(x, 0), true);
        grid.set_wall_top(Point::new(x, height - 1), true);
    }
    for y in 0..height {
        grid.set_wall_left(Point::new(0, y), true);
        grid.set_wall_left(Point::new(width - 1, y), true);
    }
}

/// Cells in the bottom three playable rows that keep a Chebyshev distance
/// of more than two from the board center.
pub fn player_spawn_candidates(width: usize, height: usize) -> Vec<Point> {
    if width < 3 || height < 4 {
        return Vec::new();
    }
    let center = Point::new(width / 2, height / 2);
    ((height - 4)..=(height - 2))
        .cartesian_product(1..=(width - 2))
        .map(|(y, x)| Point::new(x, y))
        .filter(|p| p.x.abs_diff(center.x) > 2 || p.y.abs_diff(center.y) > 2)
        .collect()
}

/// Place the player spawn and the 3x3 ghost house with its single exit.
pub fn add_spawn_points<R: Rng>(grid: &mut Grid, random: &mut R) -> anyhow::Result<SpawnPoints> {
    let (width, height) = (grid.width(), grid.height());
    if width < GeneratorConfig::MIN_SIZE || height < GeneratorConfig::MIN_SIZE {
        bail!("A {}x{} board cannot hold the ghost house", width, height);
    }

    let pacman = *player_spawn_candidates(width, height)
        .choose(random)
        .with_context(|| {
            format!(
                "No player spawn outside the ghost house zone on a {}x{} board",
                width, height
            )
        })?;
    grid.set_flag(pacman, Cell::PACMAN_SPAWN, true);
    debug!("Placed player spawn at {}", pacman);

    let center = grid.center();
    for y in center.y - 1..=center.y + 1 {
        for x in center.x - 1..=center.x + 1 {
            if y == center.y - 1 {
                grid.set_wall_top(Point::new(x, y), true);
            }
            if x == center.x - 1 {
                grid.set_wall_left(Point::new(x, y), true);
            }
            if y == center.y + 1 && y + 1 < height {
                grid.set_wall_top(Point::new(x, y + 1), true);
            }
            if x == center.x + 1 && x + 1 < width {
                grid.set_wall_left(Point::new(x + 1, y), true);
            }
        }
    }

    let ghost_exit = Point::new(center.x, center.y - 1);
    grid.set_wall_top(ghost_exit, false);

    for p in [
        center,
        Point::new(center.x - 1, center.y),
        Point::new(center.x + 1, center.y),
        Point::new(center.x, center.y + 1),
    ] {
        grid.set_flag(p, Cell::GHOST_SPAWN, true);
    }
    debug!("Placed ghost house around {} with exit at {}", center, ghost_exit);

    Ok(SpawnPoints { pacman, ghost_exit })
}

/// First wall, in breadth-first order from `start`, that separates an
/// explored cell from one not yet explored.
fn nearest_blocking_wall(grid: &Grid, start: Point) -> Option<Edge> {
    let mut visited = vec![false; grid.width() * grid.height()];
    let mut queue = VecDeque::from([start]);
    visited[grid.index(start)] = true;

    while let Some(cell) = queue.pop_front() {
        for direction in Direction::ALL {
            let next = match direction.offset(cell, grid.width(), grid.height()) {
                Some(next) => next,
                None => continue,
            };
            let index = grid.index(next);
            if !can_move(grid, cell, direction) {
                if !visited[index] {
                    return Some(Edge { cell, direction });
                }
            } else if !visited[index] {
                visited[index] = true;
                queue.push_back(next);
            }
        }
    }
    None
}

/// Break walls one at a time until `start` can reach the perimeter ring.
///
/// Gives up after `max_attempts` iterations; the outcome tells whether the
/// perimeter was reached.
pub fn break_path_to_perimeter(grid: &mut Grid, start: Point, max_attempts: usize) -> RepairOutcome {
    let mut attempts = 0;
    while attempts < max_attempts && !is_reachable_to_perimeter(grid, start) {
        if let Some(wall) = nearest_blocking_wall(grid, start) {
            break_wall(grid, wall.cell, wall.direction);
            debug!(
                "Broke {:?} wall of {} towards perimeter from {}",
                wall.direction, wall.cell, start
            );
        }
        attempts += 1;
    }

    let reached = is_reachable_to_perimeter(grid, start);
    if !reached {
        warn!(
            "{} still cannot reach the perimeter after {} attempts",
            start, attempts
        );
    }
    RepairOutcome { attempts, reached }
}

/// Single pass over all regions: every region sized within `sizes` with
/// exactly one entry gets one random border wall broken.
///
/// Only walls stored in the grid are drawn, so edges facing off the bottom
/// or right side are never picked.
///
/// Regions merged by a broken wall are not examined again.
pub fn fix_dead_ends<R: Rng>(
    grid: &mut Grid,
    sizes: Range<usize>,
    random: &mut R,
) -> DeadEndReport {
    let regions = Regions::label(grid);
    let mut report = DeadEndReport {
        regions: regions.len(),
        ..Default::default()
    };

    for (index, region) in regions.iter().enumerate() {
        if !sizes.contains(&region.len()) {
            continue;
        }
        report.candidates += 1;
        if regions.entries(grid, index).len() != 1 {
            continue;
        }
        let breakable = region
            .borders
            .iter()
            .filter(|edge| can_break(grid, edge.cell, edge.direction))
            .collect_vec();
        if let Some(wall) = breakable.choose(random) {
            if !break_wall(grid, wall.cell, wall.direction) {
                continue;
            }
            report.fixed += 1;
            debug!(
                "Broke {:?} wall of {} to open a {}-cell dead end",
                wall.direction,
                wall.cell,
                region.len()
            );
        }
    }
    report
}

/// Open both ring edges at each playable corner.
pub fn ensure_traversable_corners(grid: &mut Grid) {
    for (corner, directions) in grid.corner_exits() {
        for direction in directions {
            break_wall(grid, corner, direction);
        }
    }
}

/// Clear every wall between two neighbouring cells of the playable ring.
///
/// The outer boundary bits are left alone, so the corridor can be carved
/// after the final border seal.
pub fn create_perimeter_path(grid: &mut Grid) {
    let last = grid.last_playable();
    for x in 1..=last.x {
        grid.set_wall_left(Point::new(x, 0), false);
        grid.set_wall_left(Point::new(x, last.y), false);
    }
    for y in 1..=last.y {
        grid.set_wall_top(Point::new(0, y), false);
        grid.set_wall_top(Point::new(last.x, y), false);
    }
    debug!("Carved perimeter corridor");
}

/// Cells one step inside each corner of the sealed border
fn pellet_corners(grid: &Grid) -> [Point; 4] {
    let last = grid.last_playable();
    [
        Point::new(1, 1),
        Point::new(last.x, 1),
        Point::new(1, last.y),
        last,
    ]
}

/// Put a dot on every cell reachable from `pacman`, swap the corner dots for
/// power pellets and flag unreachable cells as inaccessible.
pub fn add_dots(grid: &mut Grid, pacman: Point) -> DotReport {
    let inaccessible = flag_inaccessible(grid, pacman);

    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let p = Point::new(x, y);
            let cell = grid.cell(p);
            if !cell.has(Cell::INACCESSIBLE) && !cell.is_spawn() {
                grid.set_flag(p, Cell::DOT, true);
            }
        }
    }

    for corner in pellet_corners(grid) {
        let cell = grid.cell(corner);
        if !cell.has(Cell::INACCESSIBLE) && !cell.is_spawn() {
            let cell = grid.cell_mut(corner);
            cell.set(Cell::POWER_PELLET, true);
            cell.set(Cell::DOT, false);
        }
    }

    DotReport {
        dots: grid.count(Cell::DOT),
        pellets: grid.count(Cell::POWER_PELLET),
        inaccessible,
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::connectivity::{is_reachable_to_perimeter, reachable_from, Regions};
    use crate::validation;

    fn walled(width: usize, height: usize) -> Grid {
        generate_random_walls(width, height, 1.0, &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn default_config_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
        let narrow = GeneratorConfig {
            width: 8,
            height: 6,
            ..Default::default()
        };
        assert!(narrow.validate().is_ok());
    }

    #[test]
    fn reject_invalid_config() {
        for config in [
            GeneratorConfig {
                width: 5,
                ..Default::default()
            },
            GeneratorConfig {
                width: 6,
                height: 6,
                ..Default::default()
            },
            GeneratorConfig {
                wall_probability: 1.5,
                ..Default::default()
            },
            GeneratorConfig {
                wall_probability: f64::NAN,
                ..Default::default()
            },
            GeneratorConfig {
                dead_end_sizes: 30..3,
                ..Default::default()
            },
        ] {
            assert!(config.validate().is_err(), "{:?}", config);
            assert!(MapGenerator::new(config, Some(0)).is_err());
        }
    }

    #[test]
    fn random_walls_follow_probability_extremes() {
        let mut random = StdRng::seed_from_u64(3);
        let open = generate_random_walls(18, 12, 0.0, &mut random);
        assert_eq!(open, Grid::new(18, 12));

        let closed = generate_random_walls(18, 12, 1.0, &mut random);
        assert_eq!(closed.count(Cell::WALL_TOP), 18 * 12);
        assert_eq!(closed.count(Cell::WALL_LEFT), 18 * 12);
        assert_eq!(closed.count(!(Cell::WALL_TOP | Cell::WALL_LEFT)), 0);
    }

    #[test]
    #[should_panic]
    fn random_walls_panic_on_nan_probability() {
        generate_random_walls(18, 12, f64::NAN, &mut StdRng::seed_from_u64(3));
    }

    #[test]
    fn sealing_twice_equals_sealing_once() {
        let mut grid = generate_random_walls(18, 12, 0.3, &mut StdRng::seed_from_u64(11));
        seal_borders(&mut grid);
        let once = grid.clone();
        seal_borders(&mut grid);
        assert_eq!(grid, once);
        assert!(validation::unsealed_borders(&grid).is_empty());
    }

    #[test]
    fn spawns_avoid_ghost_house() {
        for seed in 0..50 {
            let mut grid = Grid::new(18, 12);
            let spawns = add_spawn_points(&mut grid, &mut StdRng::seed_from_u64(seed)).unwrap();

            let pacman = spawns.pacman;
            assert!((8..=10).contains(&pacman.y));
            assert!((1..=16).contains(&pacman.x));
            assert!(pacman.x.abs_diff(9) > 2 || pacman.y.abs_diff(6) > 2);
            assert_eq!(grid.find(Cell::PACMAN_SPAWN), vec![pacman]);

            assert_eq!(spawns.ghost_exit, Point::new(9, 5));
            assert!(!grid.cell(spawns.ghost_exit).wall_top());
            assert_eq!(
                grid.find(Cell::GHOST_SPAWN),
                vec![
                    Point::new(8, 6),
                    Point::new(9, 6),
                    Point::new(10, 6),
                    Point::new(9, 7)
                ]
            );
        }
    }

    #[test]
    fn ghost_house_is_walled_except_exit() {
        let mut grid = Grid::new(18, 12);
        add_spawn_points(&mut grid, &mut StdRng::seed_from_u64(1)).unwrap();

        for x in 8..=10 {
            assert_eq!(grid.cell(Point::new(x, 5)).wall_top(), x != 9);
            assert!(grid.cell(Point::new(x, 8)).wall_top());
        }
        for y in 5..=7 {
            assert!(grid.cell(Point::new(8, y)).wall_left());
            assert!(grid.cell(Point::new(11, y)).wall_left());
        }
    }

    #[test]
    fn already_connected_start_needs_no_repair() {
        let mut grid = Grid::new(18, 12);
        seal_borders(&mut grid);
        let before = grid.clone();

        let outcome = break_path_to_perimeter(&mut grid, Point::new(5, 5), 100);
        assert_eq!(
            outcome,
            RepairOutcome {
                attempts: 0,
                reached: true
            }
        );
        assert_eq!(grid, before);
    }

    #[test]
    fn repair_terminates_on_fully_walled_grid() {
        let mut grid = walled(18, 12);
        seal_borders(&mut grid);
        let spawns = add_spawn_points(&mut grid, &mut StdRng::seed_from_u64(5)).unwrap();

        for start in [spawns.pacman, spawns.ghost_exit, Point::new(3, 4)] {
            let outcome = break_path_to_perimeter(&mut grid, start, 100);
            assert!(outcome.attempts <= 100);
            assert_eq!(outcome.reached, is_reachable_to_perimeter(&grid, start));
        }
    }

    #[test]
    fn repair_gives_up_after_attempt_limit() {
        let mut grid = walled(18, 12);
        let start = Point::new(9, 5);

        let outcome = break_path_to_perimeter(&mut grid, start, 3);
        assert_eq!(
            outcome,
            RepairOutcome {
                attempts: 3,
                reached: false
            }
        );
        // Three walls broken, so the start joined three neighbours
        assert_eq!(
            reachable_from(&grid, start).iter().filter(|v| **v).count(),
            4
        );
    }

    #[test]
    fn repair_breaks_nearest_wall_first() {
        let mut grid = walled(7, 7);
        let start = Point::new(3, 3);
        let outcome = break_path_to_perimeter(&mut grid, start, 100);

        // All four walls of the start, then those of (3, 2), then the wall
        // below (3, 4) which touches the bottom ring row
        assert_eq!(
            outcome,
            RepairOutcome {
                attempts: 8,
                reached: true
            }
        );
        for direction in Direction::ALL {
            assert!(can_move(&grid, start, direction));
        }
        assert!(!grid.cell(Point::new(3, 5)).wall_top());
        assert!(grid.cell(Point::new(3, 1)).wall_top());
    }

    #[test]
    fn dead_end_with_single_entry_is_opened() {
        let mut grid = walled(4, 1);
        grid.set_wall_left(Point::new(1, 0), false);
        grid.set_wall_left(Point::new(2, 0), false);

        let report = fix_dead_ends(&mut grid, DEAD_END_SIZES, &mut StdRng::seed_from_u64(9));
        assert_eq!(
            report,
            DeadEndReport {
                regions: 2,
                candidates: 1,
                fixed: 1
            }
        );
    }

    #[test]
    fn dead_end_fix_never_picks_off_grid_edge() {
        // Three of the eight border edges face off the bottom of a single row
        for seed in 0..64 {
            let mut grid = walled(4, 1);
            grid.set_wall_left(Point::new(1, 0), false);
            grid.set_wall_left(Point::new(2, 0), false);
            let before = grid.clone();

            let report =
                fix_dead_ends(&mut grid, DEAD_END_SIZES, &mut StdRng::seed_from_u64(seed));
            assert_eq!(report.fixed, 1, "seed {}", seed);
            assert_ne!(grid, before, "seed {}", seed);
        }
    }

    #[test]
    fn region_with_two_entries_is_kept() {
        let mut grid = walled(5, 1);
        grid.set_wall_left(Point::new(2, 0), false);
        grid.set_wall_left(Point::new(3, 0), false);
        let before = grid.clone();

        let report = fix_dead_ends(&mut grid, DEAD_END_SIZES, &mut StdRng::seed_from_u64(9));
        assert_eq!(report.candidates, 1);
        assert_eq!(report.fixed, 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn regions_outside_size_band_are_ignored() {
        let mut grid = walled(6, 6);
        let before = grid.clone();

        let report = fix_dead_ends(&mut grid, DEAD_END_SIZES, &mut StdRng::seed_from_u64(2));
        assert_eq!(report.regions, 36);
        assert_eq!(report.candidates, 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn perimeter_corridor_forms_a_loop() {
        let mut grid = walled(18, 12);
        seal_borders(&mut grid);
        ensure_traversable_corners(&mut grid);
        create_perimeter_path(&mut grid);

        assert!(validation::unsealed_borders(&grid).is_empty());
        assert!(validation::blocked_corridor_edges(&grid).is_empty());
        assert!(validation::ring_is_connected(&grid));
        assert!(validation::corners_intact(&grid));
        // The interior stays fully walled
        assert!(grid.cell(Point::new(5, 5)).wall_top());
        assert!(grid.cell(Point::new(5, 5)).wall_left());
    }

    #[test]
    fn corner_fixup_opens_ring_edges() {
        let mut grid = walled(18, 12);
        seal_borders(&mut grid);
        assert!(!validation::corners_intact(&grid));

        ensure_traversable_corners(&mut grid);
        assert!(validation::corners_intact(&grid));
        assert!(validation::unsealed_borders(&grid).is_empty());
    }

    #[test]
    fn dots_fill_the_reachable_area() {
        let mut grid = Grid::new(18, 12);
        seal_borders(&mut grid);
        let pacman = Point::new(5, 9);
        grid.set_flag(pacman, Cell::PACMAN_SPAWN, true);

        let report = add_dots(&mut grid, pacman);
        assert_eq!(
            report,
            DotReport {
                dots: 17 * 11 - 1 - 4,
                pellets: 4,
                inaccessible: 18 + 12 - 1
            }
        );
        assert!(grid.has_flag(Point::new(1, 1), Cell::POWER_PELLET));
        assert!(!grid.has_flag(Point::new(1, 1), Cell::DOT));
        assert!(!grid.cell(pacman).has_collectible());
        assert!(grid.has_flag(Point::new(17, 3), Cell::INACCESSIBLE));
        assert!(grid.has_flag(Point::new(4, 11), Cell::INACCESSIBLE));
    }

    #[test]
    fn spawn_on_pellet_corner_keeps_it_empty() {
        let mut grid = Grid::new(8, 8);
        seal_borders(&mut grid);
        let pacman = Point::new(6, 6);
        grid.set_flag(pacman, Cell::PACMAN_SPAWN, true);

        let report = add_dots(&mut grid, pacman);
        assert_eq!(report.pellets, 3);
        assert!(!grid.cell(pacman).has_collectible());
    }

    #[test]
    fn same_seed_same_map() {
        let config = GeneratorConfig::default();
        let a = MapGenerator::new(config.clone(), Some(42)).unwrap().generate().unwrap();
        let b = MapGenerator::new(config, Some(42)).unwrap().generate().unwrap();
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn generated_maps_hold_invariants() {
        for seed in 0..30 {
            let mut generator = MapGenerator::new(GeneratorConfig::default(), Some(seed)).unwrap();
            let map = generator.generate().unwrap();
            let grid = &map.grid;

            assert!(validation::unsealed_borders(grid).is_empty(), "seed {}", seed);
            assert!(validation::blocked_corridor_edges(grid).is_empty());
            assert!(validation::ring_is_connected(grid));
            assert!(validation::corners_intact(grid));
            assert!(validation::collectible_violations(grid).is_empty());
            assert_eq!(grid.find(Cell::PACMAN_SPAWN), vec![map.spawns.pacman]);
            assert_eq!(grid.count(Cell::GHOST_SPAWN), 4);

            let collectible_cells = grid
                .positions()
                .filter(|p| {
                    let cell = grid.cell(*p);
                    !cell.has(Cell::INACCESSIBLE) && !cell.is_spawn()
                })
                .count();
            assert_eq!(
                grid.count(Cell::DOT) + grid.count(Cell::POWER_PELLET),
                collectible_cells
            );

            let exit = map.spawns.ghost_exit;
            assert_eq!(exit, Point::new(9, 5));
            assert!(!grid.cell(exit).wall_top());

            assert!(map.report.player_repair.reached, "seed {}", seed);
            assert!(validation::stranded_cells(grid).is_empty(), "seed {}", seed);
            assert!(map.report.ghost_repair.reached, "seed {}", seed);
            assert!(is_reachable_to_perimeter(grid, exit), "seed {}", seed);

            assert_eq!(
                map.report.residual_dead_ends,
                validation::dead_ends(grid, DEAD_END_SIZES).len()
            );
            assert_eq!(map.report.dots.inaccessible, grid.count(Cell::INACCESSIBLE));
        }
    }

    #[test]
    fn regions_match_dot_reachability() {
        let mut generator = MapGenerator::new(GeneratorConfig::default(), Some(17)).unwrap();
        let map = generator.generate().unwrap();
        let regions = Regions::label(&map.grid);
        let player_region = regions.region_of(map.spawns.pacman);

        for p in map.grid.positions() {
            assert_eq!(
                regions.region_of(p) == player_region,
                !map.grid.has_flag(p, Cell::INACCESSIBLE)
            );
        }
    }

    #[test]
    fn open_board_is_connected_on_first_run() {
        let config = GeneratorConfig {
            wall_probability: 0.0,
            ..Default::default()
        };
        for seed in 0..10 {
            let mut generator = MapGenerator::new(config.clone(), Some(seed)).unwrap();
            let first = generator.generate().unwrap();
            assert_eq!(first.report.status(), MapStatus::Connected, "seed {}", seed);

            let mut generator = MapGenerator::new(config.clone(), Some(seed)).unwrap();
            let map = generator.generate_until_connected(3).unwrap();
            assert!(map.report.is_connected());
            assert_eq!(map.grid, first.grid);
        }
    }

    #[test]
    fn retry_loop_keeps_least_unreachable_map() {
        let runs: Vec<GeneratedMap> = {
            let mut generator = MapGenerator::new(GeneratorConfig::default(), Some(8)).unwrap();
            (0..5).map(|_| generator.generate().unwrap()).collect()
        };
        assert!(runs.iter().all(|map| !map.report.is_connected()));
        let fewest = runs
            .iter()
            .map(|map| map.report.unreachable_playable)
            .min()
            .unwrap();
        let expected = runs
            .iter()
            .find(|map| map.report.unreachable_playable == fewest)
            .unwrap();

        let mut generator = MapGenerator::new(GeneratorConfig::default(), Some(8)).unwrap();
        let map = generator.generate_until_connected(5).unwrap();
        assert_eq!(map.report.unreachable_playable, fewest);
        assert_eq!(map.grid, expected.grid);
        assert!(matches!(
            map.report.status(),
            MapStatus::Degraded { unreachable_cells, .. } if unreachable_cells == fewest
        ));
    }

    #[test]
    fn retry_loop_returns_a_map() {
        let mut generator = MapGenerator::new(GeneratorConfig::default(), Some(8)).unwrap();
        let map = generator.generate_until_connected(5).unwrap();
        assert_eq!(map.grid.count(Cell::PACMAN_SPAWN), 1);
        assert!(generator.generate_until_connected(0).is_err());
    }
}
