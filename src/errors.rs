// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::io;

use thiserror::Error;

/// Exit status for usage / validation errors (`EX_USAGE`).
pub const EXIT_USAGE: i32 = 64;

#[derive(Error, Debug)]
pub enum PohError {
    #[error("{0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to start transport for command #{command} on {server}: {source}")]
    Spawn {
        server: String,
        command: usize,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PohError {
    /// Process exit status that corresponds to this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PohError::Usage(_) => EXIT_USAGE,
            _ => 1,
        }
    }

    /// True when the error was caused by the consumer of our output going
    /// away (e.g. `poh ... | head`).
    pub fn is_broken_pipe(&self) -> bool {
        match self {
            PohError::Io(e) => e.kind() == io::ErrorKind::BrokenPipe,
            PohError::Other(e) => e.chain().any(|cause| {
                cause
                    .downcast_ref::<io::Error>()
                    .is_some_and(|io_err| io_err.kind() == io::ErrorKind::BrokenPipe)
            }),
            _ => false,
        }
    }

    /// The message followed by every underlying cause it does not already
    /// spell out, one per line.
    pub fn report(&self) -> String {
        let mut text = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            let msg = err.to_string();
            if !text.contains(&msg) {
                text.push_str("\n  caused by: ");
                text.push_str(&msg);
            }
            cause = err.source();
        }
        text
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PohError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn usage_errors_map_to_ex_usage() {
        let err = PohError::Usage("You must specify at least one server".into());
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert_eq!(PohError::Config("bad".into()).exit_code(), 1);
    }

    #[test]
    fn broken_pipe_is_detected_through_context() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        let wrapped: anyhow::Result<()> = Err(io_err).context("writing report");
        let err = PohError::from(wrapped.unwrap_err());
        assert!(err.is_broken_pipe());

        let other = PohError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!other.is_broken_pipe());
    }

    #[test]
    fn report_reads_like_a_message() {
        let err = PohError::Spawn {
            server: "web1".into(),
            command: 1,
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert_eq!(
            err.report(),
            "failed to start transport for command #1 on web1: No such file or directory"
        );

        let inner = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let wrapped: anyhow::Result<()> = Err(inner).context("creating artifact \"a.1.retval\"");
        let err = PohError::from(wrapped.unwrap_err());
        assert_eq!(err.report(), "creating artifact \"a.1.retval\"\n  caused by: denied");
    }
}
