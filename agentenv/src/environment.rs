//! The environment facade.
//!
//! [`Environment`] owns one backend per capability and forwards every call
//! unchanged. Swapping a backend (say
//! [`DummyTerminal`](crate::io::terminal::DummyTerminal) for [`ShellTerminal`])
//! happens only at construction; nothing downstream inspects which backend it
//! got.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::core::types::{BrowserTab, LintFileResult, TabIndex, TerminalTab};
use crate::io::browser::{Browser, DummyBrowser};
use crate::io::config::EnvConfig;
use crate::io::filesystem::{FileSystem, LocalFileSystem};
use crate::io::linter::{Linter, ToolLinter};
use crate::io::terminal::{ShellTerminal, Terminal};
use crate::io::ui::{CliUserInterface, UserInterface};
use crate::tree::FileSystemTree;

/// One agent session's view of its workspace.
pub struct Environment {
    file_system: Box<dyn FileSystem>,
    browser: Box<dyn Browser>,
    terminal: Box<dyn Terminal>,
    user_interface: Box<dyn UserInterface>,
    linter: Box<dyn Linter>,
}

impl Environment {
    pub fn new(
        file_system: Box<dyn FileSystem>,
        browser: Box<dyn Browser>,
        terminal: Box<dyn Terminal>,
        user_interface: Box<dyn UserInterface>,
        linter: Box<dyn Linter>,
    ) -> Self {
        Self {
            file_system,
            browser,
            terminal,
            user_interface,
            linter,
        }
    }

    /// Local backends for `root`: disk filesystem, shell terminal, stdin/stdout
    /// user interface and tool linter. There is no browser.
    ///
    /// Never fails: a linter whose tools are missing is still constructed.
    pub async fn local(root: &Path, config: &EnvConfig) -> Self {
        info!(root = %root.display(), "building local environment");
        let linter = ToolLinter::initialize(root, config.linter.clone()).await;
        Self::new(
            Box::new(LocalFileSystem::new(root, config.filesystem.clone())),
            Box::new(DummyBrowser),
            Box::new(ShellTerminal::new(root, config.terminal.clone())),
            Box::new(CliUserInterface::new()),
            Box::new(linter),
        )
    }

    pub async fn get_file_system(&self) -> Result<FileSystemTree> {
        self.file_system.get_file_system().await
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.file_system.write_file(self, path, content).await
    }

    pub async fn patch_file(&self, path: &str, diff: &str) -> Result<()> {
        self.file_system.patch_file(self, path, diff).await
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        self.file_system.delete_file(self, path).await
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        self.file_system.read_file(self, path).await
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        self.file_system.exists(path).await
    }

    pub async fn get_browser_state(&self) -> Result<Vec<BrowserTab>> {
        self.browser.get_browser_state().await
    }

    pub async fn open_url(&self, url: &str, tab_index: Option<usize>) -> Result<String> {
        self.browser.open_url(url, tab_index).await
    }

    pub async fn get_terminal_state(&self) -> Result<Vec<TerminalTab>> {
        self.terminal.get_terminal_state().await
    }

    pub async fn run_command(
        &self,
        command: &str,
        tab_index: TabIndex,
        timeout: Option<Duration>,
        is_hard_timeout: bool,
    ) -> Result<String> {
        self.terminal
            .run_command(command, tab_index, timeout, is_hard_timeout)
            .await
    }

    pub async fn show_message(&self, text: &str) -> Result<()> {
        self.user_interface.show_message(text).await
    }

    pub async fn ask_prompt(&self, text: &str) -> Result<String> {
        self.user_interface.ask_prompt(text).await
    }

    pub async fn get_new_messages(&self) -> Result<Vec<String>> {
        self.user_interface.get_new_messages().await
    }

    pub async fn get_lint_output(&self) -> Result<String> {
        self.linter.get_output().await
    }

    pub async fn lint_file(&self, path: &str) -> Result<LintFileResult> {
        self.linter.lint_file(path).await
    }
}
