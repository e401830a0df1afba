// src/render/terminal.rs

//! Terminal geometry.
//!
//! Each dimension is resolved independently: first from the terminal behind
//! the given stream, then from `COLUMNS` / `LINES`. A dimension that stays
//! unknown is reported as `None`, which renderers treat as "unrestricted"
//! (no truncation / no clipping) rather than guessing a number.

use std::io::IsTerminal;

use tracing::debug;

pub const COLUMNS_ENV: &str = "COLUMNS";
pub const LINES_ENV: &str = "LINES";

/// Display size; `None` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermGeometry {
    pub columns: Option<usize>,
    pub lines: Option<usize>,
}

impl TermGeometry {
    pub fn new(columns: Option<usize>, lines: Option<usize>) -> Self {
        Self { columns, lines }
    }
}

/// Resolve the geometry of the terminal behind `stream`.
pub fn resolve<S: IsTerminal>(stream: &S) -> TermGeometry {
    let platform = if stream.is_terminal() {
        match crossterm::terminal::size() {
            Ok(size) => Some(size),
            Err(e) => {
                debug!(error = %e, "terminal size query failed; falling back to environment variables");
                None
            }
        }
    } else {
        debug!("stream is not a tty; falling back to environment variables");
        None
    };

    resolve_with(platform, |key| std::env::var(key).ok())
}

/// Combine a platform answer `(columns, rows)` with environment fallbacks.
pub fn resolve_with<F>(platform: Option<(u16, u16)>, env: F) -> TermGeometry
where
    F: Fn(&str) -> Option<String>,
{
    let (from_tty_cols, from_tty_lines) = match platform {
        Some((cols, rows)) => (positive(cols), positive(rows)),
        None => (None, None),
    };

    let columns = from_tty_cols.or_else(|| from_env(&env, COLUMNS_ENV));
    let lines = from_tty_lines.or_else(|| from_env(&env, LINES_ENV));

    debug!(?columns, ?lines, "terminal dimensions");
    TermGeometry { columns, lines }
}

fn positive(n: u16) -> Option<usize> {
    (n > 0).then_some(n as usize)
}

fn from_env<F>(env: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let parsed = env(key)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0);
    if parsed.is_none() {
        debug!(variable = key, "could not take terminal dimension from environment");
    }
    parsed
}
