//! # HOS Logbook Application Entry Point
//!
//! This binary crate fetches a trip calculation from the backend (or loads a saved
//! one), compiles the daily logs and rest-break markers, and prints them to the
//! terminal.
//!
//! ```text
//! hos-logbook <request.json>                          ask the backend
//! hos-logbook --response <response.json>              render a saved response
//! hos-logbook --timeline <timeline.json> [--cycle-used H] [--miles M]
//!                                                     build logs locally
//! ```


use anyhow::{bail, Context};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// Re-export library types for internal use
pub use hos_log_lib::{config::Config, trip::TripRequest, trip::TripResponse};

use hos_log_lib::daily_log::{build_log_sheets, SheetHeader};
use hos_log_lib::renderer::draw_ascii;
use hos_log_lib::trip_client::TripClient;
use hos_log_lib::TimelineEvent;

/// What the command line asked for.
#[derive(Debug, PartialEq)]
enum Mode {
    Request(PathBuf),
    Response(PathBuf),
    Timeline {
        path: PathBuf,
        cycle_used: f64,
        miles: f64,
    },
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn number_flag(args: &[String], flag: &str) -> anyhow::Result<f64> {
    match flag_value(args, flag) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{flag} expects a number, got {value:?}")),
        None => Ok(0.0),
    }
}

/// Parse arguments, excluding the program name.
fn parse_args(args: &[String]) -> anyhow::Result<Mode> {
    if let Some(path) = flag_value(args, "--response") {
        return Ok(Mode::Response(path.into()));
    }
    if let Some(path) = flag_value(args, "--timeline") {
        return Ok(Mode::Timeline {
            path: path.into(),
            cycle_used: number_flag(args, "--cycle-used")?,
            miles: number_flag(args, "--miles")?,
        });
    }
    match args.first() {
        Some(path) if !path.starts_with("--") => Ok(Mode::Request(path.into())),
        _ => bail!(
            "usage: hos-logbook <request.json> | --response <response.json> | \
             --timeline <timeline.json> [--cycle-used H] [--miles M]"
        ),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Build a renderable trip from a bare timeline, without route geometry.
fn trip_from_timeline(
    timeline: Vec<TimelineEvent>,
    cycle_used: f64,
    miles: f64,
) -> anyhow::Result<TripResponse> {
    let log_sheets = build_log_sheets(&timeline, &SheetHeader::default(), miles, cycle_used)?;
    let mut trip = TripResponse {
        timeline,
        log_sheets,
        ..TripResponse::default()
    };
    trip.route.distance_miles = miles;
    Ok(trip)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let mode = parse_args(&args)?;
    let config = Config::load();

    let trip = match mode {
        Mode::Response(path) => read_json::<TripResponse>(&path)?,
        Mode::Timeline {
            path,
            cycle_used,
            miles,
        } => trip_from_timeline(read_json(&path)?, cycle_used, miles)?,
        Mode::Request(path) => {
            let request: TripRequest = read_json(&path)?;
            let client = TripClient::from_config(&config).context("building HTTP client")?;

            // Create Tokio runtime for async operations
            let rt = tokio::runtime::Runtime::new()?;
            info!(base_url = %config.api.base_url, "requesting trip calculation");
            match rt.block_on(client.calculate_trip(&request)) {
                Ok(trip) => trip,
                Err(e) => {
                    // Surface the classified error verbatim
                    error!("trip calculation failed: {e}");
                    return Err(e.into());
                }
            }
        }
    };

    draw_ascii(&trip, &config);
    Ok(())
}
