// src/collect/mod.rs

//! Reads a finished run back from its artifacts.

pub mod noise;

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::Result;
use crate::store::{ArtifactStore, UNPARSABLE_EXIT_CODE};
use crate::types::ArtifactKind;

pub use noise::{is_multiplexing_notice, strip_control_socket_lines};

/// One captured stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// Full text, or only the first line in one-line mode.
    pub text: String,
    /// Lines in the artifact on disk, whatever `text` holds.
    pub lines: usize,
}

/// Everything captured for one (server, command) unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResult {
    pub exit_code: i32,
    pub stdout: Captured,
    pub stderr: Captured,
}

impl Default for UnitResult {
    fn default() -> Self {
        Self {
            exit_code: UNPARSABLE_EXIT_CODE,
            stdout: Captured::default(),
            stderr: Captured::default(),
        }
    }
}

/// Results keyed by server, then by global command number. Both levels
/// iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    servers: BTreeMap<String, BTreeMap<usize, UnitResult>>,
}

impl Collected {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, server: impl Into<String>, command: usize, result: UnitResult) {
        self.servers
            .entry(server.into())
            .or_default()
            .insert(command, result);
    }

    pub fn get(&self, server: &str, command: usize) -> Option<&UnitResult> {
        self.servers.get(server)?.get(&command)
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Servers in lexicographic order.
    pub fn servers(&self) -> impl Iterator<Item = (&str, &BTreeMap<usize, UnitResult>)> {
        self.servers.iter().map(|(s, r)| (s.as_str(), r))
    }

    /// The same results regrouped by command number, then server.
    pub fn by_command(&self) -> BTreeMap<usize, BTreeMap<&str, &UnitResult>> {
        let mut out: BTreeMap<usize, BTreeMap<&str, &UnitResult>> = BTreeMap::new();
        for (server, results) in &self.servers {
            for (command, result) in results {
                out.entry(*command).or_default().insert(server.as_str(), result);
            }
        }
        out
    }

    fn entry(&mut self, server: &str, command: usize) -> &mut UnitResult {
        self.servers
            .entry(server.to_string())
            .or_default()
            .entry(command)
            .or_default()
    }
}

/// Rebuild the per-unit results of a run.
///
/// With `one_line`, only the first line of stdout/stderr is read; line
/// counts always come from the full files. ControlSocket noise is removed
/// from stderr text.
pub fn collect(store: &ArtifactStore, one_line: bool) -> Result<Collected> {
    let mut collected = Collected::new();
    let mut total_lines = 0;

    for kind in ArtifactKind::ALL {
        let artifacts = store.list(kind)?;
        debug!(kind = %kind, count = artifacts.len(), "reading artifacts");

        for artifact in artifacts {
            let key = &artifact.key;
            let path = &artifact.path;

            if kind == ArtifactKind::Retval {
                collected.entry(&key.server, key.command).exit_code = store.read_int(path);
                continue;
            }

            let lines = store.count_lines(path)?;
            total_lines += lines;
            let text = if one_line {
                store.read_first_line(path)?
            } else {
                store.read_text(path)?
            };

            let unit = collected.entry(&key.server, key.command);
            if kind == ArtifactKind::Stderr {
                unit.stderr = Captured {
                    text: strip_control_socket_lines(&text),
                    lines,
                };
            } else {
                unit.stdout = Captured { text, lines };
            }
        }
    }

    debug!(total_lines, root = ?store.root(), "collected run results");
    Ok(collected)
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

    #[test]
    fn collects_all_three_kinds() {
        let store = store_with(&[
            ("web2.1.retval", "1\n"),
            ("web2.1.stdout", ""),
            ("web2.1.stderr", "boom\n"),
            ("web1.1.retval", "0\n"),
            ("web1.1.stdout", "hi\n"),
            ("web1.1.stderr", ""),
        ]);

        let collected = collect(&store, false).unwrap();
        let servers: Vec<&str> = collected.servers().map(|(s, _)| s).collect();
        assert_eq!(servers, vec!["web1", "web2"]);

        let web1 = collected.get("web1", 1).unwrap();
        assert_eq!(web1.exit_code, 0);
        assert_eq!(web1.stdout, Captured { text: "hi\n".into(), lines: 1 });
        assert_eq!(web1.stderr.lines, 0);

        let web2 = collected.get("web2", 1).unwrap();
        assert_eq!(web2.exit_code, 1);
        assert_eq!(web2.stderr, Captured { text: "boom\n".into(), lines: 1 });
    }

    #[test]
    fn stderr_noise_is_removed_but_counted() {
        let store = store_with(&[
            ("h.1.retval", "255\n"),
            ("h.1.stdout", ""),
            ("h.1.stderr", "ControlSocket /tmp/x.sock exists\nreal error\n"),
        ]);
        let unit = collect(&store, false).unwrap().get("h", 1).cloned().unwrap();
        assert_eq!(unit.stderr.text, "real error\n");
        assert_eq!(unit.stderr.lines, 2);
    }

    #[test]
    fn one_line_mode_keeps_true_counts() {
        let store = store_with(&[
            ("h.1.retval", "0\n"),
            ("h.1.stdout", "first\nsecond\n"),
            ("h.1.stderr", ""),
        ]);
        let unit = collect(&store, true).unwrap().get("h", 1).cloned().unwrap();
        assert_eq!(unit.stdout.text, "first\n");
        assert_eq!(unit.stdout.lines, 2);
    }

    #[test]
    fn garbage_retval_becomes_sentinel() {
        let store = store_with(&[
            ("h.1.retval", "not-a-number\n"),
            ("h.1.stdout", ""),
            ("h.1.stderr", ""),
        ]);
        let unit = collect(&store, false).unwrap().get("h", 1).cloned().unwrap();
        assert_eq!(unit.exit_code, -1);
    }

    #[test]
    fn by_command_transposes() {
        let mut collected = Collected::new();
        collected.insert("b", 2, UnitResult::default());
        collected.insert("a", 2, UnitResult::default());
        collected.insert("a", 1, UnitResult::default());

        let by_cmd = collected.by_command();
        assert_eq!(by_cmd.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(by_cmd[&2].keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn construction_order_does_not_matter() {
        let mut forward = Collected::new();
        let mut backward = Collected::new();
        let units = [("a", 1, 0), ("a", 2, 1), ("b", 1, 2)];
        for (s, c, code) in units {
            forward.insert(s, c, UnitResult { exit_code: code, ..UnitResult::default() });
        }
        for (s, c, code) in units.iter().rev() {
            backward.insert(*s, *c, UnitResult { exit_code: *code, ..UnitResult::default() });
        }
        assert_eq!(forward, backward);
    }
}
