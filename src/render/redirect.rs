// src/render/redirect.rs

//! Raw and quiet output: artifacts are streamed straight to our own stdout
//! and stderr instead of being collected into a report.

use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, BufReader, Write};

use anyhow::Context;
use tracing::debug;

use crate::collect::is_multiplexing_notice;
use crate::errors::Result;
use crate::render::ansi::{paint, status_color, Color};
use crate::store::{Artifact, ArtifactStore};
use crate::types::ArtifactKind;

const EMPTY_OUTPUT: &str = "<EMPTY OUTPUT>";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectOptions {
    /// Copy artifacts verbatim, without prefixes.
    pub quiet: bool,
    /// Order by command first, then server.
    pub transpose: bool,
    pub color: bool,
}

/// Stream every stdout/stderr artifact of a run to `out` / `err`.
///
/// Without `quiet`, each line is prefixed with `server:\t`, ssh
/// multiplexing notices are dropped from stderr, and a unit that produced
/// nothing at all is shown once as `<EMPTY OUTPUT>` on `out`.
pub fn redirect(
    store: &ArtifactStore,
    opts: &RedirectOptions,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let mut artifacts = store.list(ArtifactKind::Stderr)?;
    artifacts.extend(store.list(ArtifactKind::Stdout)?);
    artifacts.sort_by(|a, b| {
        let (a, b) = (&a.key, &b.key);
        let order = if opts.transpose {
            (a.command, &a.server).cmp(&(b.command, &b.server))
        } else {
            (&a.server, a.command).cmp(&(&b.server, b.command))
        };
        order.then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
    });

    if opts.quiet {
        for artifact in &artifacts {
            let dest: &mut dyn Write = match artifact.key.kind {
                ArtifactKind::Stdout => &mut *out,
                _ => &mut *err,
            };
            let mut reader = store.fs().open_read(&artifact.path)?;
            io::copy(&mut reader, dest)
                .with_context(|| format!("copying {:?}", artifact.path))?;
        }
        flush(out, err)?;
        return Ok(());
    }

    let retvals: HashMap<(String, usize), i32> = store
        .list(ArtifactKind::Retval)?
        .into_iter()
        .map(|a| {
            let code = store.read_int(&a.path);
            ((a.key.server, a.key.command), code)
        })
        .collect();

    let mut silent_stderr = HashSet::new();
    for artifact in &artifacts {
        let key = &artifact.key;
        let unit = (key.server.clone(), key.command);
        let label = if opts.color {
            let code = retvals.get(&unit).copied().unwrap_or(-1);
            paint(status_color(code), &key.server)
        } else {
            key.server.clone()
        };

        let empty = store.is_empty(&artifact.path)?;
        match key.kind {
            ArtifactKind::Stderr if empty => {
                silent_stderr.insert(unit);
            }
            ArtifactKind::Stdout if empty => {
                if silent_stderr.contains(&unit) {
                    let marker = if opts.color {
                        paint(Color::Yellow, EMPTY_OUTPUT)
                    } else {
                        EMPTY_OUTPUT.to_string()
                    };
                    writeln!(out, "{label}:\t{marker}")?;
                }
            }
            ArtifactKind::Stderr => write_prefixed(store, artifact, &label, opts.color, err)?,
            _ => write_prefixed(store, artifact, &label, false, out)?,
        }
    }

    flush(out, err)?;
    Ok(())
}

fn write_prefixed(
    store: &ArtifactStore,
    artifact: &Artifact,
    label: &str,
    color: bool,
    dest: &mut dyn Write,
) -> Result<()> {
    let stderr = artifact.key.kind == ArtifactKind::Stderr;
    let reader = BufReader::new(store.fs().open_read(&artifact.path)?);

    for line in reader.split(b'\n') {
        let line = line.with_context(|| format!("reading {:?}", artifact.path))?;
        let line = String::from_utf8_lossy(&line);
        if stderr && is_multiplexing_notice(&line) {
            debug!(server = %artifact.key.server, line = %line,
                "dropping ssh multiplexing notice from stderr");
            continue;
        }
        if color {
            writeln!(dest, "{label}:\t{}", paint(Color::Red, &line))?;
        } else {
            writeln!(dest, "{label}:\t{line}")?;
        }
    }
    Ok(())
}

fn flush(out: &mut dyn Write, err: &mut dyn Write) -> io::Result<()> {
    out.flush()?;
    err.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::sync::Arc;

    fn store_with(files: &[(&str, &str)]) -> ArtifactStore {
        let fs = MockFileSystem::new();
        fs.add_dir("run");
        for (name, content) in files {
            fs.add_file(format!("run/{name}"), *content);
        }
        ArtifactStore::new("run", Arc::new(fs))
    }

    fn fixture() -> ArtifactStore {
        store_with(&[
            ("web1.1.retval", "0\n"),
            ("web1.1.stdout", "hi\nthere\n"),
            ("web1.1.stderr", ""),
            ("web1.2.retval", "0\n"),
            ("web1.2.stdout", ""),
            ("web1.2.stderr", ""),
            ("web2.1.retval", "255\n"),
            ("web2.1.stdout", ""),
            (
                "web2.1.stderr",
                "ControlSocket /tmp/s already exists, disabling multiplexing\nboom\n",
            ),
            ("web2.2.retval", "0\n"),
            ("web2.2.stdout", "ok\n"),
            ("web2.2.stderr", ""),
        ])
    }

    fn run(store: &ArtifactStore, opts: RedirectOptions) -> (String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        redirect(store, &opts, &mut out, &mut err).unwrap();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn raw_output_prefixes_lines_with_server() {
        let (out, err) = run(&fixture(), RedirectOptions::default());
        assert_eq!(out, "web1:\thi\nweb1:\tthere\nweb1:\t<EMPTY OUTPUT>\nweb2:\tok\n");
        assert_eq!(err, "web2:\tboom\n");
    }

    #[test]
    fn transposed_raw_output_orders_by_command() {
        let opts = RedirectOptions { transpose: true, ..RedirectOptions::default() };
        let (out, _) = run(&fixture(), opts);
        assert_eq!(out, "web1:\thi\nweb1:\tthere\nweb1:\t<EMPTY OUTPUT>\nweb2:\tok\n");

        let store = store_with(&[
            ("a.2.retval", "0\n"),
            ("a.2.stdout", "a2\n"),
            ("a.2.stderr", ""),
            ("b.1.retval", "0\n"),
            ("b.1.stdout", "b1\n"),
            ("b.1.stderr", ""),
        ]);
        let (out, _) = run(&store, opts);
        assert_eq!(out, "b:\tb1\na:\ta2\n");
    }

    #[test]
    fn quiet_output_is_verbatim() {
        let opts = RedirectOptions { quiet: true, color: true, ..RedirectOptions::default() };
        let (out, err) = run(&fixture(), opts);
        assert_eq!(out, "hi\nthere\nok\n");
        assert_eq!(
            err,
            "ControlSocket /tmp/s already exists, disabling multiplexing\nboom\n"
        );
    }

    #[test]
    fn colored_labels_follow_exit_code() {
        let opts = RedirectOptions { color: true, ..RedirectOptions::default() };
        let (out, err) = run(&fixture(), opts);
        assert!(out.starts_with("\x1b[32mweb1\x1b[0m:\thi\n"));
        assert!(out.contains("\x1b[33m<EMPTY OUTPUT>\x1b[0m"));
        assert_eq!(err, "\x1b[31mweb2\x1b[0m:\t\x1b[31mboom\x1b[0m\n");
    }

    #[test]
    fn unterminated_last_line_gets_a_newline() {
        let store = store_with(&[
            ("h.1.retval", "0\n"),
            ("h.1.stdout", "no newline"),
            ("h.1.stderr", ""),
        ]);
        let (out, _) = run(&store, RedirectOptions::default());
        assert_eq!(out, "h:\tno newline\n");
    }
}
