// src/cli.rs

//! CLI argument parsing using `clap`, and the checks that turn raw arguments
//! into an [`Invocation`].

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::BufRead;
use std::path::PathBuf;

use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use tracing::debug;

use crate::commands::{read_command_file, CommandSet, CommandSource};
use crate::errors::{PohError, Result};

/// Command-line arguments for `poh`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "poh",
    version,
    about = "Run commands on many servers over ssh and summarise the results.",
    after_help = "Positional commands may need to be given after a '--' pseudo-argument."
)]
pub struct CliArgs {
    /// Include debugging information (implies maximum verbosity).
    #[arg(short = 'x', long)]
    pub debug: bool,

    /// Be more verbose (repeatable).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable coloured output. Automatic if stdout is not a terminal.
    #[arg(long)]
    pub no_color: bool,

    /// Group results by command instead of by server.
    #[arg(short = 't', long)]
    pub transpose_output: bool,

    /// Print return codes for every command and the first line of output of
    /// the first one, one line per server.
    #[arg(short = '1', long)]
    pub one_line: bool,

    /// Print every line of output instead of the last ones that fit the
    /// terminal height (or `LINES`).
    #[arg(short = 'L', long, visible_alias = "all-lines")]
    pub long_output: bool,

    /// Don't truncate lines to the terminal width (or `COLUMNS`).
    #[arg(short = 'W', long, visible_alias = "wide-lines")]
    pub wide_output: bool,

    /// Keep the captured stdout, stderr and retval files.
    #[arg(short = 'k', long)]
    pub keep_output: bool,

    /// Directory for the captured files (implies -k).
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Servers to run commands on; comma separated, repeatable. `-` also
    /// reads servers from stdin.
    #[arg(short = 'S', long, value_name = "SERVER", num_args = 1.., value_delimiter = ',', action = ArgAction::Append)]
    pub servers: Vec<String>,

    /// Use the ssh configuration in this file.
    #[arg(short = 'F', long, value_name = "FILE")]
    pub ssh_config: Option<PathBuf>,

    /// Load commands from this file (repeatable).
    #[arg(short = 'f', long, value_name = "CMD_FILE", action = ArgAction::Append)]
    pub commands_from: Vec<PathBuf>,

    /// Command to run on the servers.
    #[arg(value_name = "COMMAND")]
    pub commands: Vec<String>,

    /// Only parse arguments and show what would have been run.
    #[arg(short = 'D', long)]
    pub dry_run: bool,

    /// Send command stdout to stdout and stderr to stderr, each line
    /// prefixed with the server name and a tab.
    #[arg(short = 'r', long)]
    pub raw_output: bool,

    /// Like --raw-output, without the server name prefix.
    #[arg(short = 'q', long)]
    pub quiet_output: bool,

    /// Settings file (TOML). Defaults to `POH_CONFIG` when set.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Parsed arguments plus where positional commands stood relative to the
/// first `-f`.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub args: CliArgs,
    pub positional_first: bool,
}

/// Parse `argv` (including the program name).
pub fn parse_from<I, T>(argv: I) -> std::result::Result<Parsed, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = CliArgs::command().try_get_matches_from(argv)?;
    let args = CliArgs::from_arg_matches(&matches)?;
    Ok(Parsed {
        positional_first: positional_first(&matches),
        args,
    })
}

fn positional_first(matches: &ArgMatches) -> bool {
    let first = |id: &str| matches.index_of(id).unwrap_or(usize::MAX);
    first("commands") < first("commands_from")
}

/// Usage line, shown on usage errors.
pub fn usage() -> String {
    CliArgs::command().render_usage().to_string()
}

/// Whether stdin and stdout are terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtyState {
    pub stdin: bool,
    pub stdout: bool,
}

/// A checked request: who to run what on, and how to show it.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub servers: Vec<String>,
    pub commands: CommandSet,
    pub ssh_config: Option<PathBuf>,
    pub output_dir: Option<String>,
    pub keep_output: bool,
    pub dry_run: bool,
    pub raw_output: bool,
    pub quiet_output: bool,
    pub one_line: bool,
    pub long_output: bool,
    pub wide_output: bool,
    pub transpose_output: bool,
    pub color: bool,
    pub config: Option<PathBuf>,
}

impl Invocation {
    /// Validate parsed arguments.
    ///
    /// `stdin` is read for servers when it is not a terminal or when `-` is
    /// among the servers. All usage problems are reported together.
    pub fn from_parsed(parsed: Parsed, tty: TtyState, stdin: &mut dyn BufRead) -> Result<Self> {
        let Parsed {
            args,
            positional_first,
        } = parsed;

        let mut servers: BTreeSet<String> = args
            .servers
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !tty.stdin || servers.contains("-") {
            servers.remove("-");
            let from_stdin = read_servers(stdin)?;
            debug!(count = from_stdin.len(), "read servers from stdin");
            servers.extend(from_stdin);
        }

        let positional: Vec<String> = args
            .commands
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect();

        let mut problems = Vec::new();
        if servers.is_empty() {
            problems.push("You must specify at least one server");
        }
        if positional.is_empty() && args.commands_from.is_empty() {
            problems.push("You must specify at least one command or cmd_file");
        }
        if !problems.is_empty() {
            return Err(PohError::Usage(problems.join("\n")));
        }

        if let Some(path) = &args.ssh_config {
            if !path.is_file() {
                return Err(PohError::Usage(format!(
                    "can't open ssh config {}: no such file",
                    path.display()
                )));
            }
        }

        let commands = gather_commands(positional, &args.commands_from, positional_first)?;

        let stdout_is_terminal = tty.stdout;
        let invocation = Invocation {
            servers: servers.into_iter().collect(),
            commands,
            ssh_config: args.ssh_config,
            keep_output: args.keep_output || args.output_dir.is_some(),
            output_dir: args.output_dir,
            dry_run: args.dry_run,
            raw_output: args.raw_output,
            quiet_output: args.quiet_output,
            one_line: args.one_line,
            long_output: args.long_output || !stdout_is_terminal,
            wide_output: args.wide_output || !stdout_is_terminal,
            transpose_output: args.transpose_output,
            color: !args.no_color && !args.quiet_output && stdout_is_terminal,
            config: args.config,
        };
        debug!(?invocation, "validated command line arguments");
        Ok(invocation)
    }

    /// Whether artifacts are streamed instead of summarised.
    pub fn passthrough(&self) -> bool {
        self.raw_output || self.quiet_output
    }
}

/// One server per line; `#` lines and blank lines are skipped.
fn read_servers(stdin: &mut dyn BufRead) -> Result<Vec<String>> {
    let mut servers = Vec::new();
    for line in stdin.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        servers.push(line.to_string());
    }
    Ok(servers)
}

fn gather_commands(
    positional: Vec<String>,
    files: &[PathBuf],
    positional_first: bool,
) -> Result<CommandSet> {
    let mut set = CommandSet::new();
    let has_positional = !positional.is_empty();

    if has_positional && positional_first {
        set.push(CommandSource::Positional, positional.clone());
    }
    for path in files {
        set.push(CommandSource::File(path.clone()), read_command_file(path)?);
    }
    if has_positional && !positional_first {
        set.push(CommandSource::Positional, positional);
    }

    debug!(commands = set.len(), files = files.len(), positional_first, "gathered commands");
    Ok(set)
}
