// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawSettings, Settings};
use crate::errors::Result;

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "POH_CONFIG";

/// Load a settings file and return the raw `RawSettings`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// the checked version.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawSettings = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a settings file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw = load_from_path(&path)?;
    let settings = Settings::try_from(raw)?;
    Ok(settings)
}

/// Pick the settings file: `--config` first, then `POH_CONFIG`.
///
/// Without either, built-in defaults are used.
pub fn resolve_settings(cli_path: Option<&Path>) -> Result<Settings> {
    let path = cli_path.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    });

    match path {
        Some(path) => {
            debug!(path = ?path, "loading settings file");
            load_and_validate(&path)
        }
        None => Ok(Settings::default()),
    }
}
