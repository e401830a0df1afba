// src/collect/noise.rs

//! Filters for transport chatter that is not user output.
//!
//! `ssh` connection multiplexing prints `ControlSocket ...` diagnostics on
//! stderr. The collector drops every such line; the raw redirector only
//! drops the "already exists, disabling multiplexing" notice.

use std::sync::LazyLock;

use regex::Regex;

static CONTROL_SOCKET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ControlSocket .*?$").expect("valid ControlSocket pattern"));

const MULTIPLEXING_NOTICE: &str = "already exists, disabling multiplexing";

/// True for a full line (without terminator) starting with `ControlSocket `.
pub fn is_control_socket_line(line: &str) -> bool {
    CONTROL_SOCKET_LINE.is_match(line.trim_end_matches(['\n', '\r']))
}

/// True for the "ControlSocket ... already exists, disabling multiplexing"
/// notice.
pub fn is_multiplexing_notice(line: &str) -> bool {
    line.starts_with("ControlSocket ") && line.contains(MULTIPLEXING_NOTICE)
}

/// Drop ControlSocket lines from a sequence of lines, keeping each
/// remaining line exactly as given (terminators included).
pub fn without_control_socket_lines<'a, I>(lines: I) -> impl Iterator<Item = &'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().filter(|line| !is_control_socket_line(line))
}

/// Captured stderr text with ControlSocket lines removed.
pub fn strip_control_socket_lines(text: &str) -> String {
    without_control_socket_lines(text.split_inclusive('\n')).collect()
}
