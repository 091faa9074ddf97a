use vigil::cli::Args;
use vigil::config;
use vigil::config::Settings;
use vigil::core::session::ReviewSession;
use vigil::providers::{
    FileRoster, FileSegments, MemoryRoster, MemorySegments, RosterProvider, SegmentProvider,
    StaticTokens,
};
use vigil::transport::NullTransportFactory;

use chrono::{DateTime, Utc};
use clap::Parser;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Ensure directories exist
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Initialize logger based on --log flag
    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file("vigil.log", &path_config));

        let file = std::fs::File::create(&log_path)?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }

    info!("Vigil review console starting...");
    debug!("Command-line args: {:?}", args);

    // Load persisted settings, then apply CLI overrides on top
    let settings_path = config::config_file("vigil.json", &path_config);
    info!("Config path: {}", settings_path.display());
    let mut settings = Settings::load(&settings_path)?;
    if let Some(size) = args.grid_size {
        settings.default_grid_size = size;
    }

    let roster: Arc<dyn RosterProvider> = match &args.roster {
        Some(path) => {
            info!("Roster file: {}", path.display());
            Arc::new(FileRoster::new(path.clone()))
        }
        None => {
            warn!("No roster file provided, starting with an empty roster");
            Arc::new(MemoryRoster(Vec::new()))
        }
    };
    let segments: Arc<dyn SegmentProvider> = match &args.segments {
        Some(path) => {
            info!("Segment file: {}", path.display());
            Arc::new(FileSegments::new(path.clone()))
        }
        None => Arc::new(MemorySegments(Vec::new())),
    };

    let now = Utc::now();
    let mut session = ReviewSession::new(
        settings.clone(),
        roster,
        segments,
        Box::new(StaticTokens::anonymous()),
        Box::new(NullTransportFactory),
        now,
    );

    session.refresh_roster();

    if let Some(ref at) = args.start_at {
        let date: DateTime<Utc> = at.parse()?;
        session.set_date(date, now);
        info!("Reviewing from {}", date);
    }
    if let Some(speed) = args.speed {
        session.set_speed(speed);
    }

    // The review loop. Each pass drains fetch results, advances the
    // timeline and reconciles slot transports.
    let mut roster_seen = false;
    let mut elapsed_ticks: u64 = 0;
    loop {
        let now = Utc::now();
        session.tick(now);

        // First roster arrival fills the grid
        if !roster_seen && !session.cameras().is_empty() {
            roster_seen = true;
            session.assign_all();
            info!(
                "Roster loaded: {} cameras, {} slots occupied",
                session.cameras().len(),
                session.grid().occupied_slots().len()
            );
        }

        let state = session.timeline();
        info!(
            "[{:?}] {} x{} | grid {}/{}",
            session.phase(now),
            state.current_date.format("%Y-%m-%d %H:%M:%S"),
            state.playback_speed,
            session.grid().occupied_slots().len(),
            session.grid().size()
        );
        for slot in session.grid().occupied_slots() {
            let source = session.resolved_source(slot, now);
            debug!("  slot {}: {:?}", slot, source.locator());
        }

        elapsed_ticks += 1;
        if args.ticks > 0 && elapsed_ticks >= args.ticks {
            break;
        }
        std::thread::sleep(Duration::from_millis(settings.tick_ms));
    }

    info!("Review console exiting");
    Ok(())
}
