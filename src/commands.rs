// src/commands.rs

//! Commands to run and their global numbering.
//!
//! Commands come from sources (positional arguments, or one file each given
//! with `-f`). Every command is numbered 1..N across all sources, in source
//! order and then file order; that number is what users see and what
//! artifacts are named after.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{PohError, Result};

/// Where a command came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandSource {
    Positional,
    File(PathBuf),
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSource::Positional => f.write_str("command line positional"),
            CommandSource::File(p) => write!(f, "{}", p.display()),
        }
    }
}

/// One command with its identity and global sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedCommand {
    pub number: usize,
    pub source: CommandSource,
    /// 1-based position within its source.
    pub index: usize,
    pub text: String,
}

impl NumberedCommand {
    /// Control characters escaped, trailing newline dropped.
    pub fn printable(&self) -> String {
        printable(&self.text)
    }
}

/// Ordered groups of commands, one group per source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    groups: Vec<(CommandSource, Vec<String>)>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for ad-hoc commands.
    pub fn positional<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        set.push(
            CommandSource::Positional,
            commands.into_iter().map(Into::into).collect(),
        );
        set
    }

    pub fn push(&mut self, source: CommandSource, commands: Vec<String>) {
        self.groups.push((source, commands));
    }

    pub fn groups(&self) -> &[(CommandSource, Vec<String>)] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, cmds)| cmds.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All commands with their global sequence numbers.
    pub fn numbered(&self) -> Vec<NumberedCommand> {
        self.groups
            .iter()
            .flat_map(|(source, cmds)| {
                cmds.iter().enumerate().map(move |(i, text)| (source, i + 1, text))
            })
            .enumerate()
            .map(|(n, (source, index, text))| NumberedCommand {
                number: n + 1,
                source: source.clone(),
                index,
                text: text.clone(),
            })
            .collect()
    }
}

/// Parse the contents of a command file.
///
/// - a backslash followed by a newline joins two lines
/// - blank lines and lines starting with `#` are skipped
/// - each line is shell-tokenized and re-joined with single spaces, and
///   keeps a trailing newline
pub fn parse_command_file(path: &Path, contents: &str) -> Result<Vec<String>> {
    let joined = contents.replace("\\\n", " ");
    let lines: Vec<&str> = joined.lines().collect();

    let mut commands = Vec::new();
    for (lineno, line) in lines.iter().enumerate() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let words = shell_words::split(line).map_err(|e| {
            PohError::Usage(format!(
                "{}: line {}: cannot parse command: {e}",
                path.display(),
                lineno + 1
            ))
        })?;
        commands.push(format!("{}\n", words.join(" ")));
    }

    let blanks = lines.iter().filter(|l| l.is_empty()).count();
    debug!(
        file = %path.display(),
        commands = commands.len(),
        blanks,
        comments = lines.len() - blanks - commands.len(),
        total_lines = lines.len(),
        "parsed command file"
    );
    Ok(commands)
}

/// Read and parse one command file.
pub fn read_command_file(path: &Path) -> Result<Vec<String>> {
    debug!(file = %path.display(), "processing command file");
    let contents = std::fs::read_to_string(path).map_err(|e| {
        PohError::Usage(format!("can't open {}: {e}", path.display()))
    })?;
    parse_command_file(path, &contents)
}

/// Make a command safe to show on one terminal line.
pub fn printable(text: &str) -> String {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x100 && c.is_control() => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c if c.is_control() => out.push_str(&format!("\\u{{{:04x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_is_global_across_sources() {
        let mut set = CommandSet::new();
        set.push(CommandSource::File("a.txt".into()), vec!["uptime\n".into(), "w\n".into()]);
        set.push(CommandSource::Positional, vec!["echo hi".into()]);

        let numbered = set.numbered();
        assert_eq!(set.len(), 3);
        assert_eq!(
            numbered.iter().map(|c| (c.number, c.index)).collect::<Vec<_>>(),
            vec![(1, 1), (2, 2), (3, 1)]
        );
        assert_eq!(numbered[2].source, CommandSource::Positional);
    }

    #[test]
    fn command_file_rules() {
        let contents = "# comment\n\nls   -l  '/tmp/a b'\necho one \\\ntwo\n";
        let cmds = parse_command_file(Path::new("cmds"), contents).unwrap();
        assert_eq!(cmds, vec!["ls -l /tmp/a b\n", "echo one two\n"]);
    }

    #[test]
    fn command_file_tokenize_error_is_usage() {
        let err = parse_command_file(Path::new("cmds"), "echo 'unterminated\n").unwrap_err();
        assert!(matches!(err, PohError::Usage(msg) if msg.contains("cmds: line 1")));
    }

    #[test]
    fn printable_escapes_controls() {
        assert_eq!(printable("echo hi\n"), "echo hi");
        assert_eq!(printable("a\tb\nc\r"), "a\\tb\\nc\\r");
        assert_eq!(printable("bell\x07"), "bell\\x07");
        assert_eq!(printable("back\\slash"), "back\\slash");
        assert_eq!(printable("héllo"), "héllo");
    }
}
