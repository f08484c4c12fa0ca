// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "tour_console")]
#[command(about = "Walk a panoramic tour from the console", long_about = None)]
pub struct Cli {
    /// Tour file (.toml or .ron)
    #[arg(default_value = "tour_app/assets/sample_tour.toml")]
    pub tour: PathBuf,

    /// Override the resident scene budget
    #[arg(long = "max-loaded")]
    pub max_loaded: Option<usize>,

    /// Override the neighbour preload delay in milliseconds
    #[arg(long = "preload-delay")]
    pub preload_delay_ms: Option<u64>,

    /// Read commands from a file instead of stdin
    #[arg(long, short)]
    pub script: Option<PathBuf>,

    /// Floor to start on; defaults to the first declared scene
    #[arg(long, allow_negative_numbers = true)]
    pub start: Option<i32>,

    /// Scene whose panorama fails to load (repeatable)
    #[arg(long = "broken")]
    pub broken: Vec<String>,

    /// Log engine decisions at debug level
    #[arg(long, short, default_value = "false")]
    pub verbose: bool,
}
