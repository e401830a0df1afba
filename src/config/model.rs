// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::CompletionOrder;

/// Settings as read from a TOML file.
///
/// ```toml
/// [transport]
/// program = "ssh"
/// config_file = "~/.ssh/poh_config"
/// args = ["-o", "BatchMode=yes"]
///
/// [dispatch]
/// completion_order = "start"
///
/// [storage]
/// allow_unsafe_removal = false
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawSettings {
    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    #[serde(default)]
    pub storage: StorageSection,
}

/// `[transport]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    /// Remote-shell program, invoked as `<program> [args] [-F<cfg>] <host> <cmd>`.
    #[serde(default = "default_program")]
    pub program: String,

    /// Alternate transport configuration file.
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Extra arguments placed before the host name.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "ssh".to_string()
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            config_file: None,
            args: Vec::new(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    #[serde(default)]
    pub completion_order: CompletionOrder,
}

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// Remove run directories even where recursive removal can be raced.
    #[serde(default)]
    pub allow_unsafe_removal: bool,
}

/// Validated settings. Construct through `Settings::try_from(RawSettings)`.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub transport: TransportSection,
    pub dispatch: DispatchSection,
    pub storage: StorageSection,
}

impl Settings {
    pub(crate) fn new_unchecked(raw: RawSettings) -> Self {
        Self {
            transport: raw.transport,
            dispatch: raw.dispatch,
            storage: raw.storage,
        }
    }
}
