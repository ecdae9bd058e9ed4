//! Textual map dump
//!
//! The literal is what the game loads; the statistics are written as `//`
//! comments so the whole report still parses with [Grid::parse_literal].

use std::fmt;

use itertools::Itertools;

use crate::{Cell, Grid};

/// Map as a `const MAP = [...]` array-of-arrays literal.
///
/// [Cell::INACCESSIBLE] is a generator diagnostic and is masked out.
pub fn render_literal(grid: &Grid) -> String {
    let rows = grid
        .rows()
        .map(|row| {
            let values = row
                .iter()
                .map(|cell| format!("{:>2}", cell.bits() & !Cell::INACCESSIBLE))
                .join(",");
            format!("    [{}]", values)
        })
        .join(",\n");
    format!("const MAP = [\n{}\n];\n", rows)
}

/// Collectible and accessibility counts of a map
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct MapStats {
    pub dots: usize,
    pub pellets: usize,
    /// Cells without [Cell::INACCESSIBLE]
    pub accessible: usize,
    pub total: usize,
}

impl MapStats {
    pub fn from_grid(grid: &Grid) -> Self {
        MapStats {
            dots: grid.count(Cell::DOT),
            pellets: grid.count(Cell::POWER_PELLET),
            accessible: grid.width() * grid.height() - grid.count(Cell::INACCESSIBLE),
            total: grid.width() * grid.height(),
        }
    }

    pub fn collectibles(&self) -> usize {
        self.dots + self.pellets
    }

    /// Share of accessible cells, rounded to whole percent
    pub fn accessible_percent(&self) -> u32 {
        (self.accessible as f64 / self.total as f64 * 100.0).round() as u32
    }
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "// Dots: {}", self.dots)?;
        writeln!(f, "// Power pellets: {}", self.pellets)?;
        writeln!(f, "// Collectibles: {}", self.collectibles())?;
        writeln!(
            f,
            "// Accessible cells: {} of {}",
            self.accessible, self.total
        )?;
        write!(f, "// Coverage: {}%", self.accessible_percent())
    }
}

/// Literal followed by the flag legend and statistics.
pub fn render_report(grid: &Grid, cell_size: u32) -> String {
    format!(
        "{}\n\
         // WALL_TOP = {}, WALL_LEFT = {}, DOT = {}, POWER_PELLET = {}\n\
         // PACMAN_SPAWN = {}, GHOST_SPAWN = {}\n\
         // BOARD_WIDTH = {}, BOARD_HEIGHT = {}, CELL_SIZE = {}\n\
         \n\
         {}\n",
        render_literal(grid),
        Cell::WALL_TOP,
        Cell::WALL_LEFT,
        Cell::DOT,
        Cell::POWER_PELLET,
        Cell::PACMAN_SPAWN,
        Cell::GHOST_SPAWN,
        grid.width(),
        grid.height(),
        cell_size,
        MapStats::from_grid(grid)
    )
}
