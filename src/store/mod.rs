// src/store/mod.rs

//! On-disk artifact store.
//!
//! Every (server, command) unit owns three files inside the run directory:
//!
//! ```text
//! <server>.<command-number>.retval
//! <server>.<command-number>.stdout
//! <server>.<command-number>.stderr
//! ```
//!
//! Names are parsed back by splitting from the right on two dots, so host
//! names such as `web1.example.com` round-trip. Artifacts are created once
//! per run by the dispatcher and only read afterwards; a rerun into the same
//! directory overwrites them.

pub mod run_dir;

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::fs::{FileSystem, RealFileSystem};
use crate::types::ArtifactKind;

pub use run_dir::{prepare_output_dir, CleanupPolicy, Disposal, RunDir};

/// Exit code substituted when a retval artifact cannot be parsed.
pub const UNPARSABLE_EXIT_CODE: i32 = -1;

/// Stable identity of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactKey {
    pub server: String,
    pub command: usize,
    pub kind: ArtifactKind,
}

impl ArtifactKey {
    pub fn new(server: impl Into<String>, command: usize, kind: ArtifactKind) -> Self {
        Self {
            server: server.into(),
            command,
            kind,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}.{}", self.server, self.command, self.kind)
    }

    /// Parse `<server>.<n>.<kind>`; `None` for anything else.
    pub fn parse(file_name: &str) -> Option<Self> {
        let mut parts = file_name.rsplitn(3, '.');
        let kind = parts.next()?.parse::<ArtifactKind>().ok()?;
        let command = parts.next()?.parse::<usize>().ok()?;
        let server = parts.next()?;
        if server.is_empty() {
            return None;
        }
        Some(Self::new(server, command, kind))
    }
}

/// An artifact found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub key: ArtifactKey,
    pub path: PathBuf,
}

/// Write handles for the three artifacts of one unit.
#[derive(Debug)]
pub struct UnitFiles {
    pub retval: File,
    pub stdout: File,
    pub stderr: File,
}

/// Read/write access to the artifacts of one run directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    /// Store backed by the real filesystem.
    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Arc::new(RealFileSystem))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Open an artifact for writing, truncating what a previous run left.
    ///
    /// Server names that could escape the run directory, or that the
    /// transport would read as an option, are refused.
    pub fn create(&self, key: &ArtifactKey) -> Result<File> {
        if key.server.is_empty()
            || key.server.starts_with('-')
            || key.server.contains(['/', '\\', '\0'])
        {
            bail!("server name {:?} cannot be used in an artifact name", key.server);
        }
        let path = self.path_for(key);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("creating artifact {:?}", path))
    }

    /// Allocate the retval/stdout/stderr triple for one unit.
    pub fn create_unit(&self, server: &str, command: usize) -> Result<UnitFiles> {
        Ok(UnitFiles {
            retval: self.create(&ArtifactKey::new(server, command, ArtifactKind::Retval))?,
            stdout: self.create(&ArtifactKey::new(server, command, ArtifactKind::Stdout))?,
            stderr: self.create(&ArtifactKey::new(server, command, ArtifactKind::Stderr))?,
        })
    }

    /// All artifacts of the given kind, sorted by file name.
    pub fn list(&self, kind: ArtifactKind) -> Result<Vec<Artifact>> {
        let mut found = Vec::new();
        for path in self.fs.read_dir(&self.root)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match ArtifactKey::parse(name) {
                Some(key) if key.kind == kind => found.push(Artifact { key, path }),
                Some(_) => {}
                None => debug!(path = ?path, "ignoring non-artifact entry in run directory"),
            }
        }
        found.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        debug!(kind = %kind, count = found.len(), root = ?self.root, "listed artifacts");
        Ok(found)
    }

    /// Parse the first line as an integer.
    ///
    /// Never fails: unreadable or unparsable content yields
    /// [`UNPARSABLE_EXIT_CODE`].
    pub fn read_int(&self, path: &Path) -> i32 {
        let line = match self.read_first_line(path) {
            Ok(line) => line,
            Err(e) => {
                warn!(path = ?path, error = %e, "could not read number from artifact");
                return UNPARSABLE_EXIT_CODE;
            }
        };
        match line.trim().parse::<i32>() {
            Ok(n) => n,
            Err(e) => {
                debug!(path = ?path, content = %line.trim_end(), error = %e,
                    "tried to read number from artifact but got an error");
                UNPARSABLE_EXIT_CODE
            }
        }
    }

    /// Full contents (lossily decoded as UTF-8).
    pub fn read_text(&self, path: &Path) -> Result<String> {
        self.fs.read_to_string(path)
    }

    /// Only the first line, including its terminator if present. The rest of
    /// the file is never read.
    pub fn read_first_line(&self, path: &Path) -> Result<String> {
        let mut reader = BufReader::new(self.fs.open_read(path)?);
        let mut buf = Vec::new();
        reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("reading first line of {:?}", path))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Exact number of lines in the file; a final unterminated line counts.
    pub fn count_lines(&self, path: &Path) -> Result<usize> {
        let mut reader = self.fs.open_read(path)?;
        let mut buf = [0u8; 8192];
        let mut count = 0;
        let mut last = None;
        loop {
            let n = reader
                .read(&mut buf)
                .with_context(|| format!("counting lines of {:?}", path))?;
            if n == 0 {
                break;
            }
            count += buf[..n].iter().filter(|b| **b == b'\n').count();
            last = Some(buf[n - 1]);
        }
        if matches!(last, Some(b) if b != b'\n') {
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self, path: &Path) -> Result<bool> {
        Ok(self.fs.file_len(path)? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::io::Write;

    fn mock_store() -> (MockFileSystem, ArtifactStore) {
        let fs = MockFileSystem::new();
        fs.add_dir("run");
        let store = ArtifactStore::new("run", Arc::new(fs.clone()));
        (fs, store)
    }

    #[test]
    fn key_round_trips_dotted_host_names() {
        let key = ArtifactKey::new("web1.example.com", 12, ArtifactKind::Stderr);
        assert_eq!(key.file_name(), "web1.example.com.12.stderr");
        assert_eq!(ArtifactKey::parse(&key.file_name()), Some(key));
    }

    #[test]
    fn key_parse_rejects_foreign_names() {
        assert_eq!(ArtifactKey::parse("web1.x.stdout"), None);
        assert_eq!(ArtifactKey::parse("web1.1.log"), None);
        assert_eq!(ArtifactKey::parse(".1.stdout"), None);
        assert_eq!(ArtifactKey::parse("stdout"), None);
    }

    #[test]
    fn read_int_returns_sentinel_on_garbage() {
        let (fs, store) = mock_store();
        fs.add_file("run/a.1.retval", "not-a-number\n");
        fs.add_file("run/a.2.retval", "3\n");
        fs.add_file("run/a.3.retval", "");

        assert_eq!(store.read_int(Path::new("run/a.1.retval")), -1);
        assert_eq!(store.read_int(Path::new("run/a.2.retval")), 3);
        assert_eq!(store.read_int(Path::new("run/a.3.retval")), -1);
        assert_eq!(store.read_int(Path::new("run/missing.1.retval")), -1);
    }

    #[test]
    fn text_first_line_and_counts() {
        let (fs, store) = mock_store();
        fs.add_file("run/a.1.stdout", "a\nb\nc\n");
        fs.add_file("run/a.2.stdout", "no newline");
        fs.add_file("run/a.3.stdout", "");

        let p1 = Path::new("run/a.1.stdout");
        assert_eq!(store.read_text(p1).unwrap(), "a\nb\nc\n");
        assert_eq!(store.read_first_line(p1).unwrap(), "a\n");
        assert_eq!(store.count_lines(p1).unwrap(), 3);

        assert_eq!(store.count_lines(Path::new("run/a.2.stdout")).unwrap(), 1);
        assert_eq!(store.count_lines(Path::new("run/a.3.stdout")).unwrap(), 0);
        assert!(store.is_empty(Path::new("run/a.3.stdout")).unwrap());
    }

    #[test]
    fn list_filters_by_kind_and_sorts() {
        let (fs, store) = mock_store();
        fs.add_file("run/b.1.stdout", "");
        fs.add_file("run/a.2.stdout", "");
        fs.add_file("run/a.1.stdout", "");
        fs.add_file("run/a.1.stderr", "");
        fs.add_file("run/notes.txt", "");

        let names: Vec<String> = store
            .list(ArtifactKind::Stdout)
            .unwrap()
            .into_iter()
            .map(|a| a.key.file_name())
            .collect();
        assert_eq!(names, vec!["a.1.stdout", "a.2.stdout", "b.1.stdout"]);
    }

    #[test]
    fn create_replaces_leftovers_from_an_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::on_disk(dir.path());
        let key = ArtifactKey::new("web1", 1, ArtifactKind::Stdout);

        let mut file = store.create(&key).unwrap();
        file.write_all(b"a\nb\nc\n").unwrap();
        drop(file);

        let mut file = store.create(&key).unwrap();
        file.write_all(b"x\n").unwrap();
        drop(file);

        let path = store.path_for(&key);
        assert_eq!(store.read_text(&path).unwrap(), "x\n");
        assert_eq!(store.count_lines(&path).unwrap(), 1);
    }

    #[test]
    fn create_rejects_path_like_server_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::on_disk(dir.path());
        for server in ["../evil", "-oProxyCommand=touch pwned", ""] {
            let key = ArtifactKey::new(server, 1, ArtifactKind::Stdout);
            assert!(store.create(&key).is_err(), "{server:?} accepted");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
