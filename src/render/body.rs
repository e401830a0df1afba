// src/render/body.rs

//! Output body shown under each unit in grouped / transposed layouts.

use crate::collect::UnitResult;

pub const STDERR_PREFIX: &str = "      X ";
pub const STDOUT_PREFIX: &str = "      > ";

/// Body lines for one unit: stderr first, then stdout.
///
/// With `limit = Some(n)`, a stream longer than `n` lines is clipped to its
/// last `n` lines between an ellipsis marker and a footer. `None` shows
/// everything. A blank separator follows when the unit produced any output.
pub fn body_lines(unit: &UnitResult, limit: Option<usize>) -> Vec<String> {
    let mut out = Vec::new();
    push_stream(&mut out, STDERR_PREFIX, &unit.stderr.text, limit);
    push_stream(&mut out, STDOUT_PREFIX, &unit.stdout.text, limit);
    if unit.stdout.lines + unit.stderr.lines > 0 {
        out.push(String::new());
    }
    out
}

fn push_stream(out: &mut Vec<String>, prefix: &str, text: &str, limit: Option<usize>) {
    let lines: Vec<&str> = text.lines().collect();
    match limit {
        Some(limit) if lines.len() > limit => {
            out.push(format!("{prefix}..."));
            out.extend(
                lines[lines.len() - limit..]
                    .iter()
                    .map(|line| format!("{prefix}{line}")),
            );
            out.push(format!(
                "{prefix}Output clipped to the last {limit} of {} lines",
                lines.len()
            ));
        }
        _ => out.extend(lines.iter().map(|line| format!("{prefix}{line}"))),
    }
}
