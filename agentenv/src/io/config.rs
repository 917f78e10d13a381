//! Environment configuration stored under `.agentenv/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Location of the config file relative to the workspace root.
pub const CONFIG_RELATIVE_PATH: &str = ".agentenv/config.toml";

/// Environment configuration (TOML).
///
/// Each capability reads only its own section. Missing fields default to
/// values that work for a Python repository checked by trunk and flake8.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvConfig {
    pub filesystem: FileSystemConfig,
    pub terminal: TerminalConfig,
    pub linter: LinterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileSystemConfig {
    /// File and directory names left out of workspace snapshots.
    pub ignore: Vec<String>,

    /// Re-lint a file through the environment after every write.
    pub lint_on_write: bool,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            ignore: [".git", "target", "node_modules", "__pycache__", ".agentenv"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            lint_on_write: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TerminalConfig {
    /// Shell used as `<shell> -c <command>`.
    pub shell: String,

    /// Timeout applied when a caller does not pass one.
    pub default_timeout_ms: u64,

    /// Keep at most this many bytes of each stream per command.
    pub output_limit_bytes: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            default_timeout_ms: 30_000,
            output_limit_bytes: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinterConfig {
    /// Run once when the linter is constructed. Failures are tolerated.
    pub init_command: Vec<String>,

    /// Repository-wide check.
    pub repo_command: Vec<String>,

    /// Scoped single-file check; `-- <path>` is appended after these arguments.
    pub file_command: Vec<String>,

    /// Wall-clock budget per tool invocation.
    pub timeout_secs: u64,

    /// Truncate captured tool output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            init_command: vec!["trunk".to_string(), "init".to_string()],
            repo_command: vec![
                "trunk".to_string(),
                "check".to_string(),
                "--no-progress".to_string(),
            ],
            file_command: vec![
                "flake8".to_string(),
                "--select=E9,F63,F7,F82".to_string(),
                "--show-source".to_string(),
            ],
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl EnvConfig {
    pub fn validate(&self) -> Result<()> {
        if self.terminal.shell.trim().is_empty() {
            return Err(anyhow!("terminal.shell must not be empty"));
        }
        if self.terminal.default_timeout_ms == 0 {
            return Err(anyhow!("terminal.default_timeout_ms must be > 0"));
        }
        if self.terminal.output_limit_bytes == 0 {
            return Err(anyhow!("terminal.output_limit_bytes must be > 0"));
        }
        if self.linter.timeout_secs == 0 {
            return Err(anyhow!("linter.timeout_secs must be > 0"));
        }
        if self.linter.output_limit_bytes == 0 {
            return Err(anyhow!("linter.output_limit_bytes must be > 0"));
        }
        for (name, command) in [
            ("linter.repo_command", &self.linter.repo_command),
            ("linter.file_command", &self.linter.file_command),
        ] {
            if command.is_empty() || command[0].trim().is_empty() {
                return Err(anyhow!("{name} must be a non-empty array"));
            }
        }
        Ok(())
    }
}

/// Path of the config file for a workspace.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_RELATIVE_PATH)
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EnvConfig::default()`.
pub fn load_config(path: &Path) -> Result<EnvConfig> {
    if !path.exists() {
        let cfg = EnvConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EnvConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EnvConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
