//! CLI for map generation

use clap::Parser;
use log::LevelFilter;
use pacman_mapgen::export::{render_literal, render_report};
use pacman_mapgen::map_generator::{GeneratorConfig, MapGenerator};
use simple_logger::SimpleLogger;

/// Procedural PacMan map generator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Board width, including the border column
    #[arg(long, default_value_t = 18)]
    width: usize,

    /// Board height, including the border row
    #[arg(long, default_value_t = 12)]
    height: usize,

    /// Rendered cell size in pixels
    #[arg(long, default_value_t = 40)]
    cell_size: u32,

    /// Probability of seeding each wall
    #[arg(long, default_value_t = 0.55)]
    wall_probability: f64,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Regenerate up to this many times until a fully connected map comes out
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Print only the map literal
    #[arg(long)]
    literal_only: bool,

    /// Print debug logging
    #[arg(long)]
    debug_logging: bool,
}

/// Generate map, print literal and statistics
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.debug_logging {
        SimpleLogger::new().with_level(LevelFilter::max()).init()?;
    }

    let config = GeneratorConfig {
        width: args.width,
        height: args.height,
        cell_size: args.cell_size,
        wall_probability: args.wall_probability,
        ..Default::default()
    };
    let mut gen = MapGenerator::new(config, args.seed)?;
    let map = gen.generate_until_connected(args.runs)?;

    if args.literal_only {
        print!("{}", render_literal(&map.grid));
    } else {
        print!("{}", render_report(&map.grid, gen.config().cell_size));
        println!("// Status: {}", map.report.status());
    }
    Ok(())
}
