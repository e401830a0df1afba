// src/store/run_dir.rs

//! Lifecycle of the directory that holds one run's artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::errors::PohError;
use crate::fs::FileSystem;

/// How cleanup treats platforms whose recursive removal is not race-safe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Remove the directory anyway (explicit opt-in).
    pub allow_unsafe_removal: bool,
}

/// What happened to a run directory at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    /// Retention was requested; the caller now owns the directory.
    Kept(PathBuf),
    Removed,
    /// Removal skipped because it could be raced through symlinks.
    Refused(PathBuf),
}

/// Working storage for one run.
#[derive(Debug)]
pub struct RunDir {
    path: PathBuf,
    keep: bool,
}

impl RunDir {
    /// Use a caller-supplied directory, or create a fresh temporary one.
    ///
    /// A caller-supplied directory is always kept.
    pub fn create(output_dir: Option<PathBuf>, keep: bool) -> Result<Self> {
        match output_dir {
            Some(path) => {
                debug!(path = ?path, "using caller-provided output directory");
                Ok(Self { path, keep: true })
            }
            None => {
                let path = tempfile::Builder::new()
                    .prefix("poh.")
                    .tempdir()
                    .context("creating temporary output directory")?
                    .keep();
                debug!(path = ?path, "created temporary directory");
                Ok(Self { path, keep })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory unless it is kept or removal would be unsafe.
    ///
    /// Must only be called once every reader of the run has finished.
    pub fn dispose(self, fs: &dyn FileSystem, policy: CleanupPolicy) -> Result<Disposal> {
        if self.keep {
            return Ok(Disposal::Kept(self.path));
        }

        if !fs.removal_resists_symlink_races() {
            if !policy.allow_unsafe_removal {
                debug!(path = ?self.path, "refusing to remove output directory on this platform");
                return Ok(Disposal::Refused(self.path));
            }
            warn!(path = ?self.path,
                "removing output directory with a removal primitive that is not symlink-race safe");
        }

        debug!(path = ?self.path, "removing output directory");
        fs.remove_dir_all(&self.path)?;
        Ok(Disposal::Removed)
    }
}

/// Validate (and create if needed) a directory requested with `--output-dir`.
///
/// Missing directories are created with mode 0700.
pub fn prepare_output_dir(raw: &str) -> Result<PathBuf, PohError> {
    let path = std::path::absolute(raw)?;

    if path.is_dir() {
        return Ok(path);
    }
    if path.exists() {
        return Err(PohError::Usage(format!(
            "{raw:?} exists and is not a directory."
        )));
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(&path).map_err(|e| {
        warn!(path = ?path, error = %e, "failed to create output directory");
        PohError::Usage(format!("Directory {raw:?} couldn't be created."))
    })?;
    Ok(path)
}
