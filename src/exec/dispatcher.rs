// src/exec/dispatcher.rs

//! Eager, unbounded dispatch of every (server, command) unit.
//!
//! All transport processes are started before any of them is waited on, so
//! every unit runs concurrently as its own OS process. Exit codes are then
//! recorded according to the [`CompletionOrder`] policy. A unit's retval
//! artifact is written only after its process has terminated, so readers
//! never see a partial unit.

use std::fs::File;
use std::io::Write;
use std::process::{ExitStatus, Stdio};

use anyhow::Context;
use tokio::process::Child;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::commands::CommandSet;
use crate::errors::{PohError, Result};
use crate::exec::transport::Transport;
use crate::store::ArtifactStore;
use crate::types::CompletionOrder;

/// Exit recorded for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitExit {
    pub server: String,
    pub command: usize,
    pub code: i32,
}

/// Summary of a finished dispatch, in recording order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub exits: Vec<UnitExit>,
}

impl DispatchReport {
    pub fn units(&self) -> usize {
        self.exits.len()
    }

    pub fn failures(&self) -> usize {
        self.exits.iter().filter(|e| e.code != 0).count()
    }
}

/// A started unit whose exit code has not been recorded yet.
///
/// Owns the retval handle; dropping it on any path closes the file.
struct RunningUnit {
    server: String,
    command: usize,
    retval: File,
    child: Child,
}

/// Run every command on every server and wait for all of them.
///
/// A spawn failure aborts the whole dispatch. Units that were already
/// started keep running; their artifact handles are closed when dropped.
pub async fn dispatch(
    store: &ArtifactStore,
    servers: &[String],
    commands: &CommandSet,
    transport: &dyn Transport,
    order: CompletionOrder,
) -> Result<DispatchReport> {
    let numbered = commands.numbered();
    let mut running = Vec::with_capacity(servers.len() * numbered.len());

    for server in servers {
        for cmd in &numbered {
            let files = store.create_unit(server, cmd.number)?;

            debug!(server = %server, command = cmd.number, "running command");
            let mut process = transport.command(server, &cmd.text);
            process
                .stdin(Stdio::null())
                .stdout(Stdio::from(files.stdout))
                .stderr(Stdio::from(files.stderr));

            let child = process.spawn().map_err(|source| PohError::Spawn {
                server: server.clone(),
                command: cmd.number,
                source,
            })?;

            running.push(RunningUnit {
                server: server.clone(),
                command: cmd.number,
                retval: files.retval,
                child,
            });
        }
    }

    info!(units = running.len(), ?order, "all units started; waiting for completion");

    let mut report = DispatchReport::default();
    match order {
        CompletionOrder::Start => {
            for unit in running {
                report.exits.push(finish_unit(unit).await?);
            }
        }
        CompletionOrder::Finish => {
            let mut pending = JoinSet::new();
            for unit in running {
                pending.spawn(finish_unit(unit));
            }
            while let Some(joined) = pending.join_next().await {
                let exit = joined.context("waiting for a transport process")??;
                report.exits.push(exit);
            }
        }
    }

    info!(
        units = report.units(),
        failures = report.failures(),
        "dispatch finished"
    );
    Ok(report)
}

/// Wait for one unit's process and write its exit code.
async fn finish_unit(mut unit: RunningUnit) -> Result<UnitExit> {
    let status = unit.child.wait().await.with_context(|| {
        format!(
            "waiting for command #{} on {}",
            unit.command, unit.server
        )
    })?;

    let code = exit_code(status);
    if code != 0 {
        debug!(server = %unit.server, command = unit.command, code, "command exited non-zero");
    }

    writeln!(unit.retval, "{code}")
        .and_then(|_| unit.retval.flush())
        .map_err(|e| {
            warn!(server = %unit.server, command = unit.command, error = %e,
                "failed to record exit code");
            e
        })?;

    Ok(UnitExit {
        server: unit.server,
        command: unit.command,
        code,
    })
}

/// Exit code, or the negated signal number for a signalled process.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn exit_codes_and_signals() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        // Killed by SIGKILL.
        assert_eq!(exit_code(ExitStatus::from_raw(9)), -9);
    }

    #[test]
    fn report_counts_failures() {
        let report = DispatchReport {
            exits: vec![
                UnitExit { server: "a".into(), command: 1, code: 0 },
                UnitExit { server: "b".into(), command: 1, code: 2 },
            ],
        };
        assert_eq!(report.units(), 2);
        assert_eq!(report.failures(), 1);
    }
}
