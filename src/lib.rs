//! Procedurally generated PacMan mazes
//!
//! A maze is a [Grid] of [Cell] bitmasks. Every cell stores only the wall on
//! its own north and west edge; the east and south walls of a cell are the
//! west and north walls of its neighbours. The last column and the last row
//! of the grid are a *virtual* border whose bits close the playable area on
//! the east and south.
//!
//! # Examples
//! ## Generate a map from a fixed seed
//! ```
//! use pacman_mapgen::map_generator::{GeneratorConfig, MapGenerator};
//! use pacman_mapgen::Cell;
//!
//! let mut generator = MapGenerator::new(GeneratorConfig::default(), Some(7)).unwrap();
//! let map = generator.generate().unwrap();
//!
//! assert_eq!(map.grid.count(Cell::PACMAN_SPAWN), 1);
//! println!("{}", pacman_mapgen::export::render_literal(&map.grid));
//! ```
//!
//! ## Read an exported map
//! ```
//! use pacman_mapgen::{Cell, Grid, Point};
//!
//! let literal = "
//! const MAP = [
//!     [ 3, 1, 3],
//!     [18, 0, 2],
//! ];";
//! let grid = Grid::parse_literal(literal).unwrap();
//!
//! assert_eq!((grid.width(), grid.height()), (3, 2));
//! assert!(grid.has_flag(Point::new(0, 1), Cell::PACMAN_SPAWN));
//! ```

use std::fmt;

use anyhow::{anyhow, bail, Context};
use itertools::Itertools;

pub mod connectivity;
pub mod export;
pub mod map_generator;
pub mod validation;

/// Location in the grid
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Movement direction on the grid
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, in the order traversals scan them
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Neighbouring location, if it lies within a `width` x `height` grid
    pub fn offset(self, from: Point, width: usize, height: usize) -> Option<Point> {
        match self {
            Direction::Up => from.y.checked_sub(1).map(|y| Point::new(from.x, y)),
            Direction::Down => (from.y + 1 < height).then(|| Point::new(from.x, from.y + 1)),
            Direction::Left => from.x.checked_sub(1).map(|x| Point::new(x, from.y)),
            Direction::Right => (from.x + 1 < width).then(|| Point::new(from.x + 1, from.y)),
        }
    }

    /// Direction of a single orthogonal step from `from` to `to`
    pub fn between(from: Point, to: Point) -> Option<Self> {
        match (to.x as isize - from.x as isize, to.y as isize - from.y as isize) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Bitmask of the walls and contents of one grid unit
///
/// Bit values are part of the exported map format and must not change.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug)]
pub struct Cell(u8);

impl Cell {
    /// Wall on the north edge
    pub const WALL_TOP: u8 = 1;
    /// Wall on the west edge
    pub const WALL_LEFT: u8 = 2;
    pub const DOT: u8 = 4;
    pub const POWER_PELLET: u8 = 8;
    pub const PACMAN_SPAWN: u8 = 16;
    /// Ghost house cell; several cells carry this flag
    pub const GHOST_SPAWN: u8 = 32;
    /// Diagnostic flag for cells the player cannot reach
    pub const INACCESSIBLE: u8 = 64;

    const KNOWN_BITS: u8 = 127;

    pub const fn from_bits(bits: u8) -> Self {
        Cell(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if any bit of `flag` is set
    pub const fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u8, present: bool) {
        if present {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    pub const fn wall_top(self) -> bool {
        self.has(Self::WALL_TOP)
    }

    pub const fn wall_left(self) -> bool {
        self.has(Self::WALL_LEFT)
    }

    pub const fn is_spawn(self) -> bool {
        self.has(Self::PACMAN_SPAWN | Self::GHOST_SPAWN)
    }

    pub const fn has_collectible(self) -> bool {
        self.has(Self::DOT | Self::POWER_PELLET)
    }
}

/// Fixed-size maze of [Cell]s, stored row-major
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every cell zeroed.
    ///
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "grid must not be empty");
        Grid {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        }
    }

    /// Build grid from raw cell values, one vec per row.
    ///
    /// Returns error, if rows are ragged or a value carries unknown bits.
    pub fn from_rows(rows: &[Vec<u8>]) -> anyhow::Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            bail!("Map has no cells");
        }
        let mut cells = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                bail!("Row {} has {} cells, expected {}", y, row.len(), width);
            }
            for (x, &bits) in row.iter().enumerate() {
                if bits & !Cell::KNOWN_BITS != 0 {
                    bail!("Unknown flag bits in value {} at x={}, y={}", bits, x, y);
                }
                cells.push(Cell::from_bits(bits));
            }
        }
        Ok(Grid {
            width,
            height: rows.len(),
            cells,
        })
    }

    /// Parse the array-of-arrays literal written by [export::render_literal].
    ///
    /// Anything before the first `[` (such as `const MAP =`) and `//`
    /// comments are ignored.
    pub fn parse_literal(text: &str) -> anyhow::Result<Self> {
        let body = text
            .lines()
            .map(|line| line.split("//").next().unwrap_or(""))
            .join("\n");
        let start = body.find('[').context("Map literal has no opening `[`")?;
        let end = body.rfind(']').context("Map literal has no closing `]`")?;
        if end <= start {
            bail!("Map literal brackets are unbalanced");
        }

        let rows = body[start + 1..end]
            .split(']')
            .map(|chunk| chunk.trim_start_matches(|c: char| c == ',' || c.is_whitespace()))
            .filter(|chunk| !chunk.is_empty())
            .enumerate()
            .map(|(y, chunk)| {
                let values = chunk
                    .strip_prefix('[')
                    .ok_or_else(|| anyhow!("Row {} does not start with `[`", y))?;
                values
                    .split(',')
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(|value| {
                        value
                            .parse::<u8>()
                            .with_context(|| format!("Invalid cell value `{}` in row {}", value, y))
                    })
                    .collect::<anyhow::Result<Vec<u8>>>()
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Self::from_rows(&rows)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.x < self.width && p.y < self.height
    }

    /// Row-major index of `p`; panics when out of bounds
    pub(crate) fn index(&self, p: Point) -> usize {
        assert!(
            self.in_bounds(p),
            "{} is outside the {}x{} grid",
            p,
            self.width,
            self.height
        );
        p.y * self.width + p.x
    }

    pub fn cell(&self, p: Point) -> Cell {
        self.cells[self.index(p)]
    }

    pub fn cell_mut(&mut self, p: Point) -> &mut Cell {
        let index = self.index(p);
        &mut self.cells[index]
    }

    pub fn has_flag(&self, p: Point, flag: u8) -> bool {
        self.cell(p).has(flag)
    }

    pub fn set_flag(&mut self, p: Point, flag: u8, present: bool) {
        self.cell_mut(p).set(flag, present)
    }

    pub fn set_wall_top(&mut self, p: Point, present: bool) {
        self.set_flag(p, Cell::WALL_TOP, present)
    }

    pub fn set_wall_left(&mut self, p: Point, present: bool) {
        self.set_flag(p, Cell::WALL_LEFT, present)
    }

    /// All locations in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Point> {
        let width = self.width;
        (0..self.height).flat_map(move |y| (0..width).map(move |x| Point::new(x, y)))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.width)
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.rows()
            .map(|row| row.iter().map(|cell| cell.bits()).collect())
            .collect()
    }

    /// Locations of cells carrying `flag`, row-major
    pub fn find(&self, flag: u8) -> Vec<Point> {
        self.positions().filter(|p| self.has_flag(*p, flag)).collect()
    }

    pub fn count(&self, flag: u8) -> usize {
        self.cells.iter().filter(|cell| cell.has(flag)).count()
    }

    /// Geometric center, rounded down
    pub fn center(&self) -> Point {
        Point::new(self.width / 2, self.height / 2)
    }

    /// Last playable column and row, inside the virtual border
    pub fn last_playable(&self) -> Point {
        Point::new(self.width.saturating_sub(2), self.height.saturating_sub(2))
    }

    /// True unless `p` lies in the virtual border column or row
    pub fn is_playable(&self, p: Point) -> bool {
        p.x + 1 < self.width && p.y + 1 < self.height
    }

    /// True for cells on the outer ring of the playable area
    pub fn is_on_perimeter(&self, p: Point) -> bool {
        let last = self.last_playable();
        self.is_playable(p) && (p.x == 0 || p.y == 0 || p.x == last.x || p.y == last.y)
    }

    /// Top-left, top-right, bottom-left and bottom-right playable corners
    pub fn playable_corners(&self) -> [Point; 4] {
        let last = self.last_playable();
        [
            Point::new(0, 0),
            Point::new(last.x, 0),
            Point::new(0, last.y),
            last,
        ]
    }

    /// Each playable corner with the two directions the ring continues in
    pub fn corner_exits(&self) -> [(Point, [Direction; 2]); 4] {
        let [top_left, top_right, bottom_left, bottom_right] = self.playable_corners();
        [
            (top_left, [Direction::Right, Direction::Down]),
            (top_right, [Direction::Left, Direction::Down]),
            (bottom_left, [Direction::Up, Direction::Right]),
            (bottom_right, [Direction::Up, Direction::Left]),
        ]
    }
}
