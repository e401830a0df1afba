// src/exec/transport.rs

//! How a unit reaches its server.

use std::fmt::Debug;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

use crate::config::TransportSection;

/// Environment variable that overrides the transport config file.
pub const SSH_CONFIG_ENV: &str = "SSH_CONFIG";

/// Builds the process that runs `command` on `server`.
///
/// The dispatcher attaches stdio and spawns it; implementations only decide
/// the program and its arguments.
pub trait Transport: Send + Sync + Debug {
    fn command(&self, server: &str, command: &str) -> Command;
}

/// `ssh`-style remote shell: `<program> [args] [-F<config>] <server> <command>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTransport {
    pub program: String,
    pub args: Vec<String>,
    pub config_file: Option<PathBuf>,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::from_section(&TransportSection::default(), None)
    }
}

impl SshTransport {
    /// Build from settings, letting `config_override` (already resolved from
    /// the CLI / environment) win over the settings file.
    pub fn from_section(section: &TransportSection, config_override: Option<PathBuf>) -> Self {
        Self {
            program: section.program.clone(),
            args: section.args.clone(),
            config_file: config_override.or_else(|| section.config_file.clone()),
        }
    }

    pub fn args_for(&self, server: &str, command: &str) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(cfg) = &self.config_file {
            args.push(format!("-F{}", cfg.display()));
        }
        args.push(server.to_string());
        args.push(command.to_string());
        args
    }
}

impl Transport for SshTransport {
    fn command(&self, server: &str, command: &str) -> Command {
        let args = self.args_for(server, command);
        debug!(program = %self.program, ?args, "building transport command");
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }
}

/// Transport config precedence: CLI flag, then `SSH_CONFIG`.
///
/// `None` means "use whatever the settings file says".
pub fn config_override(cli: Option<PathBuf>) -> Option<PathBuf> {
    cli.or_else(|| {
        std::env::var_os(SSH_CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(cmd: &Command) -> Vec<String> {
        let std_cmd = cmd.as_std();
        std::iter::once(std_cmd.get_program())
            .chain(std_cmd.get_args())
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn default_is_plain_ssh() {
        let t = SshTransport::default();
        assert_eq!(argv(&t.command("web1", "echo hi")), vec!["ssh", "web1", "echo hi"]);
    }

    #[test]
    fn config_file_and_extra_args() {
        let section = TransportSection {
            program: "ssh".into(),
            config_file: Some(PathBuf::from("/etc/poh/ssh_config")),
            args: vec!["-o".into(), "BatchMode=yes".into()],
        };
        let t = SshTransport::from_section(&section, None);
        assert_eq!(
            argv(&t.command("db1", "uptime")),
            vec!["ssh", "-o", "BatchMode=yes", "-F/etc/poh/ssh_config", "db1", "uptime"]
        );
    }

    #[test]
    fn override_beats_settings_file() {
        let section = TransportSection {
            config_file: Some(PathBuf::from("/from/file")),
            ..TransportSection::default()
        };
        let t = SshTransport::from_section(&section, Some(PathBuf::from("/from/cli")));
        assert_eq!(t.config_file, Some(PathBuf::from("/from/cli")));
    }
}
