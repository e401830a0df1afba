use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Order in which finished transport processes get their exit code recorded.
///
/// - `Start`: wait for units one at a time, in the order they were started
///   (default). A slow first unit delays recording of later ones, but never
///   their execution.
/// - `Finish`: record each unit as soon as its process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionOrder {
    #[default]
    Start,
    Finish,
}

/// The three artifacts captured for every (server, command) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Retval,
    Stdout,
    Stderr,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Retval,
        ArtifactKind::Stdout,
        ArtifactKind::Stderr,
    ];

    /// File-name suffix used on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Retval => "retval",
            ArtifactKind::Stdout => "stdout",
            ArtifactKind::Stderr => "stderr",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retval" => Ok(ArtifactKind::Retval),
            "stdout" => Ok(ArtifactKind::Stdout),
            "stderr" => Ok(ArtifactKind::Stderr),
            other => Err(format!("unknown artifact kind: {other}")),
        }
    }
}
