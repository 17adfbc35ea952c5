use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::process;

use capture_agents::agents::TeamController;
use capture_agents::arena::{Layout, Match};
use capture_agents::config::Config;
use capture_agents::debug_logger::DebugLogger;
use capture_agents::error::Result;
use capture_agents::types::Team;

fn run(config: &Config) -> Result<()> {
    let layout = match &config.arena.layout_path {
        Some(path) => Layout::from_file(path)?,
        None => Layout::default_layout()?,
    };
    info!(
        "Layout {}x{} with {} agents",
        layout.width(),
        layout.height(),
        layout.num_agents()
    );

    let logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path);
    let mut red = TeamController::new(Team::Red, config).with_logger(logger.clone());
    let mut blue = TeamController::new(Team::Blue, config).with_logger(logger);
    let mut rng = StdRng::seed_from_u64(config.arena.seed);

    let report = Match::new(layout, &config.arena).play(&mut red, &mut blue, &mut rng)?;
    info!(
        "Final score {} after {} moves ({} captures), winner: {}",
        report.score,
        report.moves,
        report.captures,
        report.winner.map(|t| format!("{:?}", t)).unwrap_or_else(|| "draw".to_string())
    );
    Ok(())
}

fn main() {
    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    info!("Starting capture match...");

    // An optional first argument names the configuration file
    let config = match env::args().nth(1) {
        Some(path) => Config::from_file(&path).unwrap_or_else(|e| {
            eprintln!("Warning: Could not load {} ({}), using hardcoded defaults", path, e);
            Config::default_hardcoded()
        }),
        None => Config::load_or_default(),
    };

    if let Err(e) = run(&config) {
        error!("Match failed: {}", e);
        process::exit(1);
    }
}
