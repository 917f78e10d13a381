//! Value types exchanged across capability boundaries.
//!
//! These are plain data: they carry no handles to processes or files and can be
//! cloned and serialized freely.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Target tab for a terminal command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabIndex {
    /// Open a fresh tab for the command.
    #[default]
    New,
    /// Run in the existing tab at this position.
    #[serde(untagged)]
    Existing(usize),
}

impl fmt::Display for TabIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabIndex::New => write!(f, "new"),
            TabIndex::Existing(index) => write!(f, "{index}"),
        }
    }
}

impl FromStr for TabIndex {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("new") {
            return Ok(TabIndex::New);
        }
        s.parse::<usize>()
            .map(TabIndex::Existing)
            .map_err(|_| anyhow!("tab index must be a number or 'new', got '{s}'"))
    }
}

/// One command run in a terminal tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    /// Output captured by the time the call returned (stdout then stderr).
    pub output: String,
    /// `None` while the process is still running or when it was killed.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// A terminal tab and its ordered command history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalTab {
    pub history: Vec<CommandRecord>,
}

/// A browser tab: where it points and the raw HTML it shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserTab {
    pub url: String,
    pub html: String,
}

/// Scoped lint report for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintFileResult {
    pub output: String,
    pub is_ok: bool,
}
