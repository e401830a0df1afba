// src/logging.rs

//! Logging setup for `poh` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `-x/--debug` (maximum verbosity)
//! 2. `-v` count: none → error, `-v` → warn, `-vv` → info, `-vvv` → debug
//! 3. `POH_LOG` environment variable (e.g. "info", "debug"), only when no
//!    `-v` was given
//!
//! Logs are sent to STDERR so that stdout carries only the results.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Environment variable consulted when no `-v` flag was given.
pub const LOG_ENV: &str = "POH_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(verbose: u8, debug: bool) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let level = resolve_level(verbose, debug, env.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Pick the effective level from the flags and the environment value.
pub fn resolve_level(verbose: u8, debug: bool, env: Option<&str>) -> Level {
    if debug {
        return Level::DEBUG;
    }
    if verbose == 0 {
        if let Some(level) = env.and_then(parse_level_str) {
            return level;
        }
    }
    match verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
