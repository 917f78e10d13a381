//! Linter capability backed by external static-analysis tools.
//!
//! Lint tools exit non-zero when they find problems, and sometimes refuse to run
//! at all outside a properly initialized repository. Neither is an error here:
//! every invocation keeps whatever the tool printed and the report helpers in
//! [`crate::core::lint_report`] decide what the caller sees.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::core::lint_report::{normalize_repo_report, scoped_report};
use crate::core::types::LintFileResult;
use crate::io::config::LinterConfig;
use crate::io::process::run_tool;

#[async_trait]
pub trait Linter: Send + Sync {
    /// Full-repository report as unstructured text; empty when there is
    /// nothing to report or the tool declined to run.
    async fn get_output(&self) -> Result<String>;

    /// Report scoped to one file.
    async fn lint_file(&self, path: &str) -> Result<LintFileResult>;
}

/// Linter that never reports anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyLinter;

#[async_trait]
impl Linter for DummyLinter {
    async fn get_output(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn lint_file(&self, _path: &str) -> Result<LintFileResult> {
        Ok(scoped_report(""))
    }
}

/// Linter that shells out to the commands in [`LinterConfig`].
#[derive(Debug, Clone)]
pub struct ToolLinter {
    workdir: PathBuf,
    config: LinterConfig,
}

impl ToolLinter {
    /// Construct the linter and run the configured init command in `workdir`.
    ///
    /// Initialization problems are logged and otherwise ignored: the returned
    /// linter is always usable, though its reports may come back empty.
    #[instrument(skip_all, fields(workdir = %workdir.as_ref().display()))]
    pub async fn initialize(workdir: impl AsRef<Path>, config: LinterConfig) -> Self {
        let linter = Self {
            workdir: workdir.as_ref().to_path_buf(),
            config,
        };
        if linter.config.init_command.is_empty() {
            debug!("no linter init command configured");
            return linter;
        }

        match run_tool(
            linter.config.init_command.clone(),
            linter.workdir.clone(),
            linter.timeout(),
            linter.config.output_limit_bytes,
        )
        .await
        {
            Ok(output) if output.status.success() && !output.timed_out => {
                info!("linter initialized");
            }
            Ok(output) => {
                warn!(
                    exit_code = ?output.status.code(),
                    timed_out = output.timed_out,
                    stderr = %output.stderr_text().trim(),
                    "linter init failed, continuing without it"
                );
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "linter init could not run, continuing without it");
            }
        }
        linter
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Run `argv` and return what it printed, whatever the outcome.
    ///
    /// A tool that cannot be spawned at all yields an empty report.
    async fn capture(&self, argv: Vec<String>) -> String {
        match run_tool(
            argv,
            self.workdir.clone(),
            self.timeout(),
            self.config.output_limit_bytes,
        )
        .await
        {
            Ok(output) => {
                if output.timed_out {
                    warn!(
                        timeout_secs = self.config.timeout_secs,
                        "lint tool timed out, using partial output"
                    );
                } else if !output.status.success() {
                    debug!(exit_code = ?output.status.code(), "lint tool exited non-zero, using its output");
                }
                output.report_text()
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "lint tool could not run");
                String::new()
            }
        }
    }
}

#[async_trait]
impl Linter for ToolLinter {
    #[instrument(skip_all)]
    async fn get_output(&self) -> Result<String> {
        let raw = self.capture(self.config.repo_command.clone()).await;
        Ok(normalize_repo_report(&raw))
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn lint_file(&self, path: &str) -> Result<LintFileResult> {
        let mut argv = self.config.file_command.clone();
        // Paths starting with `-` must not be read as options.
        argv.push("--".to_string());
        argv.push(path.to_string());
        let raw = self.capture(argv).await;
        Ok(scoped_report(&raw))
    }
}
