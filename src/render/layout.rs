// src/render/layout.rs

//! Summary layouts.
//!
//! A report is made of:
//! - an optional time header (start / end / elapsed),
//! - the command legend (`Commands run:`), listing every command once with
//!   its global number,
//! - the results, either one line per server, grouped by server (default),
//!   or grouped by command (transposed).
//!
//! Unless wide output is requested, every line is then truncated to the
//! terminal width. Rendering is pure: the same input gives the same text.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};

use crate::collect::{Collected, UnitResult};
use crate::commands::{CommandSet, NumberedCommand};
use crate::render::ansi::{paint, paint_if, status_color, truncate_plain, truncate_visible, Color};
use crate::render::body::body_lines;
use crate::render::terminal::TermGeometry;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Display flags for [`render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub one_line: bool,
    pub long_output: bool,
    pub wide_output: bool,
    pub transpose: bool,
    pub color: bool,
    pub geometry: TermGeometry,
}

impl RenderOptions {
    /// Width to truncate to; `None` when wide output is on or the width is
    /// unknown.
    pub fn width(&self) -> Option<usize> {
        if self.wide_output {
            None
        } else {
            self.geometry.columns
        }
    }

    /// Lines kept per stream; `None` when long output is on or the height is
    /// unknown.
    pub fn line_limit(&self) -> Option<usize> {
        if self.long_output {
            None
        } else {
            self.geometry.lines
        }
    }
}

/// Wall-clock span of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn elapsed_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}

/// Render collected results as a report (newline terminated).
pub fn render(
    collected: &Collected,
    commands: &CommandSet,
    opts: &RenderOptions,
    times: Option<&TimeWindow>,
) -> String {
    let mut lines = Vec::new();

    if let Some(window) = times {
        lines.extend(time_header(window, opts.color));
        lines.push(String::new());
    }

    let numbered = commands.numbered();
    if !numbered.is_empty() {
        lines.push(paint_if(opts.color, Color::White, "Commands run:"));
        lines.extend(
            numbered
                .iter()
                .map(|c| format!("  {:4}. {}", c.number, c.printable())),
        );
        lines.push(String::new());
    }

    lines.push(paint_if(opts.color, Color::White, "Results:"));
    if opts.one_line {
        lines.extend(one_line_rows(collected, opts.color));
    } else if opts.transpose {
        lines.extend(by_command_rows(collected, &numbered, opts));
    } else {
        lines.extend(by_server_rows(collected, &numbered, opts));
    }

    if let Some(width) = opts.width() {
        for line in lines.iter_mut() {
            let cut = if opts.color {
                truncate_visible(line, width)
            } else {
                truncate_plain(line, width)
            };
            if let std::borrow::Cow::Owned(cut) = cut {
                *line = cut;
            }
        }
    }

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

fn time_header(window: &TimeWindow, color: bool) -> Vec<String> {
    let start_local = window.start.with_timezone(&Local);
    let end_local = window.end.with_timezone(&Local);
    let tz = start_local.format("%:z").to_string();
    let elapsed = window.elapsed_secs();

    let start = (
        start_local.format(TIMESTAMP_FORMAT).to_string(),
        window.start.format(TIMESTAMP_FORMAT).to_string(),
    );
    let end = (
        end_local.format(TIMESTAMP_FORMAT).to_string(),
        window.end.format(TIMESTAMP_FORMAT).to_string(),
    );

    if !color {
        return vec![
            format!("  Start time = {} {tz} ({} UTC)", start.0, start.1),
            format!("    End time = {} {tz} ({} UTC)", end.0, end.1),
            format!("Elapsed time = {elapsed:.3}s"),
        ];
    }

    let label = |text: &str| format!("{}{text}\x1b[39m", Color::Blue.escape());
    let sep = paint(Color::Black, "=");
    let value = |local: &str| paint(Color::White, &format!("{local} {tz}"));
    let utc = |utc: &str| paint(Color::Black, &format!("({utc} UTC)"));
    vec![
        format!("{} {sep} {} {}", label("  Start time"), value(&start.0), utc(&start.1)),
        format!("{} {sep} {} {}", label("    End time"), value(&end.0), utc(&end.1)),
        format!("{} {sep} {elapsed:.3}s", label("Elapsed time")),
    ]
}

/// `[RETVAL=n]`, green or red when coloured.
fn retval_cell(exit_code: i32, color: bool) -> String {
    paint_if(color, status_color(exit_code), &format!("[RETVAL={exit_code}]"))
}

fn one_line_rows(collected: &Collected, color: bool) -> Vec<String> {
    let Some(widest) = collected.servers().map(|(s, _)| s.chars().count()).max() else {
        return Vec::new();
    };
    let width = widest + 4;

    collected
        .servers()
        .map(|(server, results)| {
            let cells: String = results
                .values()
                .map(|unit| {
                    let cell = format!("{:^5}", format!("[{}]", unit.exit_code));
                    paint_if(color, status_color(unit.exit_code), &cell)
                })
                .collect();
            let first_line = results
                .values()
                .next()
                .and_then(|unit| unit.stdout.text.lines().next())
                .unwrap_or("");
            format!("{server:>width$}:  {cells}  {first_line}")
        })
        .collect()
}

fn by_server_rows(
    collected: &Collected,
    numbered: &[NumberedCommand],
    opts: &RenderOptions,
) -> Vec<String> {
    let legend = legend_by_number(numbered);
    let mut lines = Vec::new();

    for (i, (server, results)) in collected.servers().enumerate() {
        lines.push(format!("  srv#{:<4}- {}", i + 1, server));
        for (number, unit) in results {
            let command = legend.get(number).map(String::as_str).unwrap_or_default();
            lines.push(format!(
                "      cmd#{:<4} {:12} (l#:{}/{}) $ {}",
                number,
                retval_cell(unit.exit_code, opts.color),
                unit.stderr.lines,
                unit.stdout.lines,
                command
            ));
            lines.extend(body_lines(unit, opts.line_limit()));
        }
    }
    lines
}

fn by_command_rows(
    collected: &Collected,
    numbered: &[NumberedCommand],
    opts: &RenderOptions,
) -> Vec<String> {
    let by_command = collected.by_command();
    let mut lines = Vec::new();

    for command in numbered {
        lines.push(format!("  cmd#{:<4}$ {}", command.number, command.printable()));
        let Some(servers) = by_command.get(&command.number) else {
            continue;
        };
        for (i, (server, unit)) in servers.iter().enumerate() {
            lines.push(server_row(i + 1, server, unit, opts.color));
            lines.extend(body_lines(unit, opts.line_limit()));
        }
    }
    lines
}

fn server_row(position: usize, server: &str, unit: &UnitResult, color: bool) -> String {
    format!(
        "      srv#{:<4} {:12} (l#:{}/{}) - {}",
        position,
        retval_cell(unit.exit_code, color),
        unit.stderr.lines,
        unit.stdout.lines,
        server
    )
}

fn legend_by_number(numbered: &[NumberedCommand]) -> BTreeMap<usize, String> {
    numbered.iter().map(|c| (c.number, c.printable())).collect()
}
