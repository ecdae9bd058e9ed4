//! CLI for checking exported maps

use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::bail;
use clap::Parser;
use log::LevelFilter;
use pacman_mapgen::{
    connectivity::flag_inaccessible, export::MapStats, validation::ValidationReport, Cell, Grid,
};
use simple_logger::SimpleLogger;

/// Check that a PacMan map literal is sealed, connected and playable
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Print debug logging
    #[arg(long)]
    debug_logging: bool,

    /// File, where to read the map literal. Use `-` for stdin.
    file: PathBuf,
}

/// Read map from file, print validation report
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.debug_logging {
        SimpleLogger::new().with_level(LevelFilter::max()).init()?;
    }

    let literal = if args.file.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin().lock().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(args.file)?
    };
    let mut grid = Grid::parse_literal(&literal)?;

    let pacman = match grid.find(Cell::PACMAN_SPAWN).as_slice() {
        [pacman] => *pacman,
        [] => bail!("Map has no player spawn"),
        spawns => bail!("Map has {} player spawns", spawns.len()),
    };
    // Exported literals do not carry the inaccessible flag
    flag_inaccessible(&mut grid, pacman);

    println!("Map {}x{}, player spawn at {}", grid.width(), grid.height(), pacman);
    println!("{}", MapStats::from_grid(&grid));
    let report = ValidationReport::run(&grid);
    report.print_report();

    if !report.is_ok() {
        bail!("Map failed validation");
    }
    Ok(())
}
