//! Test-only helpers: snapshot builders, scratch workspaces and capability
//! doubles that record how they were called.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tempfile::TempDir;

use crate::core::types::LintFileResult;
use crate::environment::Environment;
use crate::io::browser::DummyBrowser;
use crate::io::filesystem::FileSystem;
use crate::io::linter::{DummyLinter, Linter};
use crate::io::terminal::DummyTerminal;
use crate::io::ui::QueuedUserInterface;
use crate::tree::FileSystemTree;

/// Directory node with the given children.
pub fn dir(path: &str, children: Vec<FileSystemTree>) -> FileSystemTree {
    FileSystemTree::directory(path, children)
}

/// File node with the given lines.
pub fn file(path: &str, lines: &[&str]) -> FileSystemTree {
    FileSystemTree::file(path, lines.iter().map(|line| line.to_string()).collect())
}

/// Scratch workspace directory removed on drop.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create tempdir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.path().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}

/// A call observed by [`RecordingFileSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCall {
    Snapshot,
    Write {
        path: String,
        content: String,
        env: usize,
    },
    Patch {
        path: String,
        diff: String,
        env: usize,
    },
    Delete {
        path: String,
        env: usize,
    },
    Read {
        path: String,
        env: usize,
    },
    Exists {
        path: String,
    },
}

/// Address of an environment, to check which one a capability was handed.
pub fn env_addr(env: &Environment) -> usize {
    std::ptr::from_ref(env) as usize
}

/// Filesystem double that records every call and optionally fails them all.
#[derive(Default)]
pub struct RecordingFileSystem {
    calls: Arc<Mutex<Vec<FsCall>>>,
    failure: Option<String>,
    snapshot: Option<FileSystemTree>,
    contents: String,
}

impl RecordingFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Return `tree` from `get_file_system`.
    pub fn with_snapshot(mut self, tree: FileSystemTree) -> Self {
        self.snapshot = Some(tree);
        self
    }

    /// Return `contents` from `read_file`.
    pub fn with_contents(mut self, contents: &str) -> Self {
        self.contents = contents.to_string();
        self
    }

    /// Shared handle to the call log, usable after the double is boxed.
    pub fn calls(&self) -> Arc<Mutex<Vec<FsCall>>> {
        self.calls.clone()
    }

    fn record(&self, call: FsCall) -> Result<()> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("call log poisoned"))?
            .push(call);
        match &self.failure {
            Some(message) => bail!("{message}"),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FileSystem for RecordingFileSystem {
    async fn get_file_system(&self) -> Result<FileSystemTree> {
        self.record(FsCall::Snapshot)?;
        Ok(self
            .snapshot
            .clone()
            .unwrap_or_else(|| FileSystemTree::directory(".", Vec::new())))
    }

    async fn write_file(&self, env: &Environment, path: &str, content: &str) -> Result<()> {
        self.record(FsCall::Write {
            path: path.to_string(),
            content: content.to_string(),
            env: env_addr(env),
        })
    }

    async fn patch_file(&self, env: &Environment, path: &str, diff: &str) -> Result<()> {
        self.record(FsCall::Patch {
            path: path.to_string(),
            diff: diff.to_string(),
            env: env_addr(env),
        })
    }

    async fn delete_file(&self, env: &Environment, path: &str) -> Result<()> {
        self.record(FsCall::Delete {
            path: path.to_string(),
            env: env_addr(env),
        })
    }

    async fn read_file(&self, env: &Environment, path: &str) -> Result<String> {
        self.record(FsCall::Read {
            path: path.to_string(),
            env: env_addr(env),
        })?;
        Ok(self.contents.clone())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.record(FsCall::Exists {
            path: path.to_string(),
        })?;
        Ok(true)
    }
}

/// Linter double that returns a fixed scoped result and records linted paths.
pub struct RecordingLinter {
    linted: Arc<Mutex<Vec<String>>>,
    result: LintFileResult,
}

impl RecordingLinter {
    pub fn new(result: LintFileResult) -> Self {
        Self {
            linted: Arc::new(Mutex::new(Vec::new())),
            result,
        }
    }

    pub fn linted(&self) -> Arc<Mutex<Vec<String>>> {
        self.linted.clone()
    }
}

#[async_trait]
impl Linter for RecordingLinter {
    async fn get_output(&self) -> Result<String> {
        Ok(self.result.output.clone())
    }

    async fn lint_file(&self, path: &str) -> Result<LintFileResult> {
        self.linted
            .lock()
            .map_err(|_| anyhow!("lint log poisoned"))?
            .push(path.to_string());
        Ok(self.result.clone())
    }
}

/// Environment around `file_system` with dummy browser, terminal and linter and
/// a queued user interface.
pub fn environment_with(file_system: Box<dyn FileSystem>) -> Environment {
    environment_with_linter(file_system, Box::new(DummyLinter))
}

pub fn environment_with_linter(
    file_system: Box<dyn FileSystem>,
    linter: Box<dyn Linter>,
) -> Environment {
    Environment::new(
        file_system,
        Box::new(DummyBrowser),
        Box::new(DummyTerminal),
        Box::new(QueuedUserInterface::new()),
        linter,
    )
}
