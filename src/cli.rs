use clap::Parser;
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Multi-camera video review console
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Camera roster JSON file (array of camera records)
    #[arg(short = 'r', long = "roster", value_name = "FILE")]
    pub roster: Option<PathBuf>,

    /// Recorded segment list JSON file
    #[arg(short = 's', long = "segments", value_name = "FILE")]
    pub segments: Option<PathBuf>,

    /// Grid size in slots (1, 4, 9 or 16)
    #[arg(short = 'g', long = "grid", value_name = "N")]
    pub grid_size: Option<usize>,

    /// Start reviewing at this instant instead of live (RFC 3339)
    #[arg(long = "at", value_name = "DATETIME")]
    pub start_at: Option<String>,

    /// Stop after N review ticks (0 = run until interrupted)
    #[arg(long = "ticks", value_name = "N", default_value = "0")]
    pub ticks: u64,

    /// Playback speed multiplier
    #[arg(long = "speed", value_name = "X")]
    pub speed: Option<f64>,

    /// Enable debug logging to file (default: vigil.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
