// src/lib.rs

pub mod cli;
pub mod collect;
pub mod commands;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod render;
pub mod store;
pub mod types;

use std::io::{self, Write};

use chrono::Utc;
use tracing::{debug, info};

use crate::cli::Invocation;
use crate::commands::printable;
use crate::config::{resolve_settings, Settings};
use crate::errors::Result;
use crate::exec::{dispatch, transport::config_override, SshTransport, Transport};
use crate::fs::RealFileSystem;
use crate::render::{redirect, render, RedirectOptions, RenderOptions, TermGeometry, TimeWindow};
use crate::store::{prepare_output_dir, ArtifactStore, CleanupPolicy, Disposal, RunDir};

/// Environment variable that silences the symlink-safety warning.
pub const IGNORE_SYMLINK_WARNS_ENV: &str = "POH_IGNORE_SYMLINK_WARNS";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading
/// - dry-run reporting
/// - run directory, dispatch over ssh
/// - report rendering (or raw streaming) to the real stdout / stderr
pub async fn run(invocation: Invocation) -> Result<()> {
    let settings = resolve_settings(invocation.config.as_deref())?;

    if invocation.dry_run {
        return print_dry_run(&invocation, &mut io::stderr().lock());
    }

    let transport = SshTransport::from_section(
        &settings.transport,
        config_override(invocation.ssh_config.clone()),
    );
    let geometry = render::terminal::resolve(&io::stdout());

    // Unlocked handles: tracing on worker threads writes to stderr too.
    execute(
        &invocation,
        &settings,
        &transport,
        geometry,
        &mut io::stdout(),
        &mut io::stderr(),
    )
    .await?;
    Ok(())
}

/// Run every command on every server and write the results.
///
/// The run directory is disposed of even when dispatch or rendering fails.
pub async fn execute(
    invocation: &Invocation,
    settings: &Settings,
    transport: &dyn Transport,
    geometry: TermGeometry,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<Disposal> {
    let output_dir = invocation
        .output_dir
        .as_deref()
        .map(prepare_output_dir)
        .transpose()?;
    let run_dir = RunDir::create(output_dir, invocation.keep_output)?;
    let store = ArtifactStore::on_disk(run_dir.path());

    let outcome = dispatch_and_show(invocation, settings, transport, geometry, &store, out, err).await;

    let policy = CleanupPolicy {
        allow_unsafe_removal: settings.storage.allow_unsafe_removal,
    };
    let disposal = run_dir.dispose(&RealFileSystem, policy);
    outcome?;
    let disposal = disposal?;

    match &disposal {
        Disposal::Kept(dir) => {
            writeln!(out, "\nOutput located at: {}", dir.display())?;
            out.flush()?;
        }
        Disposal::Refused(dir) if warn_about_symlinks() => {
            writeln!(
                err,
                "Not removing temp directory at {dir:?}. Platform susceptible to symlink \
                 attacks. Please remove it manually."
            )?;
        }
        Disposal::Refused(dir) => debug!(path = ?dir, "left run directory in place"),
        Disposal::Removed => {}
    }
    Ok(disposal)
}

async fn dispatch_and_show(
    invocation: &Invocation,
    settings: &Settings,
    transport: &dyn Transport,
    geometry: TermGeometry,
    store: &ArtifactStore,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let start = Utc::now();
    let report = dispatch(
        store,
        &invocation.servers,
        &invocation.commands,
        transport,
        settings.dispatch.completion_order,
    )
    .await?;
    let end = Utc::now();
    info!(units = report.units(), failures = report.failures(), "run complete");

    if invocation.passthrough() {
        let opts = RedirectOptions {
            quiet: invocation.quiet_output,
            transpose: invocation.transpose_output,
            color: invocation.color,
        };
        return redirect(store, &opts, out, err);
    }

    let collected = collect::collect(store, invocation.one_line)?;
    let opts = RenderOptions {
        one_line: invocation.one_line,
        long_output: invocation.long_output,
        wide_output: invocation.wide_output,
        transpose: invocation.transpose_output,
        color: invocation.color,
        geometry,
    };
    let window = TimeWindow { start, end };
    let text = render(&collected, &invocation.commands, &opts, Some(&window));
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Anything but `no` in `POH_IGNORE_SYMLINK_WARNS` silences the warning.
fn warn_about_symlinks() -> bool {
    match std::env::var(IGNORE_SYMLINK_WARNS_ENV) {
        Ok(value) => {
            debug!(value = %value, "symlink warning override set in environment");
            value == "no"
        }
        Err(_) => true,
    }
}

/// Describe what would run, without creating anything.
pub fn print_dry_run(invocation: &Invocation, err: &mut dyn Write) -> Result<()> {
    writeln!(err, "This is a dry-run, not executing commands.")?;
    writeln!(
        err,
        "Would've executed {} commands on {} servers",
        invocation.commands.len(),
        invocation.servers.len()
    )?;

    writeln!(err, "Servers:")?;
    for server in &invocation.servers {
        writeln!(err, "    - {server}")?;
    }
    writeln!(err, "Commands:")?;
    let mut number = 0;
    for (source, commands) in invocation.commands.groups() {
        writeln!(err, "    - {source} ({}):", commands.len())?;
        for text in commands {
            number += 1;
            writeln!(err, "      {number}:$ {}", printable(text))?;
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
