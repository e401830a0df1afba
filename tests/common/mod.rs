#![allow(dead_code)]

use std::path::Path;

pub use poh_test_utils::{init_tracing, with_timeout, LocalShellTransport, SERVER_ENV};

use poh::cli::Invocation;
use poh::commands::CommandSet;

/// Invocation for `servers` x positional `commands`, as if stdout were a
/// pipe (long, wide, no colour).
pub fn invocation(servers: &[&str], commands: &[&str]) -> Invocation {
    Invocation {
        servers: servers.iter().map(|s| s.to_string()).collect(),
        commands: CommandSet::positional(commands.iter().copied()),
        long_output: true,
        wide_output: true,
        ..Invocation::default()
    }
}

/// Sorted file names directly under `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
