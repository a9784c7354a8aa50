//! Qmonix Tracker CLI Application
//!
//! This is the command-line demo for the tracker library. It builds a tracker
//! from flags or a session file and then:
//! - Fires single and volume events given on the command line
//! - Replays scripted sessions (start/pause/resume/stop timing events)
//! - Dispatches the collected events to the log or an HTTP endpoint

use anyhow::{Context, Result};
use clap::Parser;
use qmonix_tracker::{Dispatcher, TrackerConfig};
use std::path::PathBuf;

mod config;
mod session;

use config::Step;
use session::Session;

/// Qmonix Tracker - Record events and send them to a collection endpoint
#[derive(Parser, Debug)]
#[command(name = "qmonix-cli")]
#[command(about = "Record telemetry events and dispatch them", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a session file (session.toml) with dispatcher settings and steps
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Post events to this endpoint instead of writing them to the log
    #[arg(short, long, value_name = "URL")]
    endpoint: Option<String>,

    /// HTTP request timeout in milliseconds [default: 30000]
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Fire a single event with this tag (can be repeated)
    #[arg(long, value_name = "TAG")]
    fire: Vec<String>,

    /// Fire a volume event, given as TAG=VOLUME (can be repeated)
    #[arg(long, value_name = "TAG=VOLUME", value_parser = parse_volume)]
    volume: Vec<(String, i64)>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Qmonix Tracker CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using tracker library v{}", qmonix_tracker::VERSION);

    if let Some(config_path) = &args.config {
        session_mode(config_path, &args)?;
    } else if !args.fire.is_empty() || !args.volume.is_empty() {
        quick_mode(&args)?;
    } else {
        // No arguments - show help
        println!("Qmonix Tracker - No events specified");
        println!("\nQuick Start:");
        println!("  qmonix-cli --fire app/start --volume shop/purchase=3");
        println!("  qmonix-cli --fire app/start --endpoint http://demo.qmonix.com/event/");
        println!("\nScripted sessions:");
        println!("  qmonix-cli --config session.toml");
        println!("\nUse --help for more options");
    }

    Ok(())
}

/// Quick mode - fire the events given as flags, then dispatch once
fn quick_mode(args: &Args) -> Result<()> {
    let tracker_config = tracker_config(args, TrackerConfig::new());
    let tracker = tracker_config
        .build_tracker()
        .context("Failed to set up tracker")?;

    let mut steps: Vec<Step> = args
        .fire
        .iter()
        .map(|tag| Step::Fire { tag: tag.clone() })
        .collect();
    steps.extend(args.volume.iter().map(|(tag, volume)| Step::Volume {
        tag: tag.clone(),
        volume: *volume,
    }));
    steps.push(Step::Dispatch);

    run_session(Session::new(tracker), &steps)
}

/// Session mode - replay a scripted session file
fn session_mode(config_path: &PathBuf, args: &Args) -> Result<()> {
    log::info!("Loading session from: {:?}", config_path);
    let session_config = config::load_config(config_path)?;
    log::debug!("Session loaded with {} step(s)", session_config.steps.len());

    let base = TrackerConfig {
        dispatcher: session_config.dispatcher.clone(),
    };
    let tracker = tracker_config(args, base)
        .build_tracker()
        .context("Failed to set up tracker")?;

    run_session(Session::new(tracker), &session_config.steps)
}

fn run_session(mut session: Session, steps: &[Step]) -> Result<()> {
    let result = session.run(steps);

    let running = session.running();
    if !running.is_empty() {
        log::warn!("Timing events never stopped: {}", running.join(", "));
    }
    let pending = session.tracker().dispatcher()?.pending();
    if pending > 0 {
        log::warn!("{} event(s) left undispatched", pending);
    }

    println!("Log:");
    for line in session.log().iter().rev() {
        println!("  {}", line);
    }
    result
}

/// Command line flags override the dispatcher from the session file
fn tracker_config(args: &Args, base: TrackerConfig) -> TrackerConfig {
    let config = match &args.endpoint {
        Some(endpoint) => base.with_http_endpoint(endpoint.clone()),
        None => base,
    };
    match args.timeout_ms {
        Some(timeout_ms) => config.with_timeout_ms(timeout_ms),
        None => config,
    }
}

fn parse_volume(value: &str) -> std::result::Result<(String, i64), String> {
    let (tag, volume) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected TAG=VOLUME, got '{}'", value))?;
    let volume = volume
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("bad volume in '{}': {}", value, e))?;
    Ok((tag.to_string(), volume))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
