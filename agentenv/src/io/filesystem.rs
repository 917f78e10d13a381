//! Filesystem capability rooted at a workspace directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::environment::Environment;
use crate::io::config::FileSystemConfig;
use crate::tree::FileSystemTree;

/// Path of the workspace root inside its own snapshot.
pub const ROOT_PATH: &str = ".";

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Fresh snapshot of the whole workspace.
    async fn get_file_system(&self) -> Result<FileSystemTree>;

    /// Create or overwrite `path` with `content`.
    ///
    /// `env` is the environment this filesystem belongs to, passed so a write
    /// can trigger work in other capabilities. Implementations must not keep it.
    async fn write_file(&self, env: &Environment, path: &str, content: &str) -> Result<()>;

    /// Apply a unified diff (hunks only, file headers optional) to an existing
    /// file. Fails when the file is missing or a hunk does not match.
    async fn patch_file(&self, env: &Environment, path: &str, diff: &str) -> Result<()>;

    async fn delete_file(&self, env: &Environment, path: &str) -> Result<()>;

    /// Contents of `path`. Bytes that are not valid UTF-8 are replaced with
    /// U+FFFD, the same decoding snapshots use.
    async fn read_file(&self, env: &Environment, path: &str) -> Result<String>;

    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Filesystem on local disk. Relative paths resolve against the workspace root,
/// absolute paths are used as given.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
    config: FileSystemConfig,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>, config: FileSystemConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    async fn lint_after_write(&self, env: &Environment, path: &str) {
        if !self.config.lint_on_write {
            return;
        }
        match env.lint_file(path).await {
            Ok(report) if report.is_ok => debug!("written file lints clean"),
            Ok(report) => warn!(findings = %report.output, "written file has lint findings"),
            Err(err) => warn!(err = %format!("{err:#}"), "lint after write failed"),
        }
    }
}

async fn read_lossy(target: &Path) -> Result<String> {
    let bytes = tokio::fs::read(target)
        .await
        .with_context(|| format!("read {}", target.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    #[instrument(skip_all, fields(root = %self.root.display()))]
    async fn get_file_system(&self) -> Result<FileSystemTree> {
        let root = self.root.clone();
        let ignore = self.config.ignore.clone();
        tokio::task::spawn_blocking(move || snapshot(&root, &ignore))
            .await
            .context("join snapshot task")?
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn write_file(&self, env: &Environment, path: &str, content: &str) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        tokio::fs::write(&target, content)
            .await
            .with_context(|| format!("write {}", target.display()))?;
        debug!(bytes = content.len(), "file written");
        self.lint_after_write(env, path).await;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn patch_file(&self, env: &Environment, path: &str, diff: &str) -> Result<()> {
        let target = self.resolve(path);
        let original = read_lossy(&target).await?;
        let patched = apply_patch(&original, diff).with_context(|| format!("patch {path}"))?;
        tokio::fs::write(&target, &patched)
            .await
            .with_context(|| format!("write {}", target.display()))?;
        debug!(bytes = patched.len(), "file patched");
        self.lint_after_write(env, path).await;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn delete_file(&self, _env: &Environment, path: &str) -> Result<()> {
        let target = self.resolve(path);
        tokio::fs::remove_file(&target)
            .await
            .with_context(|| format!("delete {}", target.display()))
    }

    async fn read_file(&self, _env: &Environment, path: &str) -> Result<String> {
        read_lossy(&self.resolve(path)).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path);
        tokio::fs::try_exists(&target)
            .await
            .with_context(|| format!("check {}", target.display()))
    }
}

fn apply_patch(original: &str, diff: &str) -> Result<String> {
    let patch = diffy::Patch::from_str(diff).context("parse unified diff")?;
    diffy::apply(original, &patch).context("apply unified diff")
}

/// Walk `root` into a tree. Entries are sorted by file name; names listed in
/// `ignore` are skipped along with everything beneath them.
fn snapshot(root: &Path, ignore: &[String]) -> Result<FileSystemTree> {
    let mut open_dirs: Vec<FileSystemTree> = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry, ignore));

    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        // The parent of an entry at depth d is the open directory at index d - 1.
        while open_dirs.len() > entry.depth() {
            close_dir(&mut open_dirs)?;
        }

        let path = relative_path(root, entry.path());
        let file_type = entry.file_type();
        if file_type.is_dir() {
            open_dirs.push(FileSystemTree::directory(path, Vec::new()));
        } else if file_type.is_file() {
            let bytes = fs::read(entry.path())
                .with_context(|| format!("read {}", entry.path().display()))?;
            let lines = String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect();
            attach(&mut open_dirs, FileSystemTree::file(path, lines))?;
        } else {
            debug!(path = %entry.path().display(), "skipping non-regular entry");
        }
    }

    while open_dirs.len() > 1 {
        close_dir(&mut open_dirs)?;
    }
    open_dirs
        .pop()
        .ok_or_else(|| anyhow!("workspace root {} is not a directory", root.display()))
}

fn is_ignored(entry: &DirEntry, ignore: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy();
    ignore.iter().any(|ignored| *ignored == name)
}

fn relative_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ROOT_PATH.to_string(),
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

fn close_dir(open_dirs: &mut Vec<FileSystemTree>) -> Result<()> {
    let dir = open_dirs
        .pop()
        .ok_or_else(|| anyhow!("no open directory to close"))?;
    attach(open_dirs, dir)
}

fn attach(open_dirs: &mut [FileSystemTree], node: FileSystemTree) -> Result<()> {
    let parent = open_dirs
        .last_mut()
        .ok_or_else(|| anyhow!("{} has no parent directory in the snapshot", node.path))?;
    parent.children.get_or_insert_with(Vec::new).push(node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invariants::validate_tree;
    use crate::test_support::TestWorkspace;

    #[test]
    fn snapshot_mirrors_disk_layout_sorted_by_name() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write("src/main.py", "import os\nprint(os.name)\n").expect("write");
        ws.write("README.md", "# demo").expect("write");
        ws.write("src/util/helpers.py", "").expect("write");

        let tree = snapshot(ws.path(), &[]).expect("snapshot");
        assert_eq!(tree.path, ".");
        assert!(tree.is_directory);
        let top: Vec<&str> = tree.child_nodes().iter().map(|n| n.path.as_str()).collect();
        assert_eq!(top, vec!["README.md", "src"]);

        let main = tree.get_by_path("src/main.py").expect("main.py");
        assert_eq!(
            main.content,
            Some(vec!["import os".to_string(), "print(os.name)".to_string()])
        );
        let helpers = tree.get_by_path("src/util/helpers.py").expect("helpers");
        assert_eq!(helpers.content, Some(Vec::new()));
        assert!(validate_tree(&tree).is_empty());
    }

    #[test]
    fn snapshot_skips_ignored_names() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write(".git/HEAD", "ref: refs/heads/main").expect("write");
        ws.write("pkg/__pycache__/mod.pyc", "junk").expect("write");
        ws.write("pkg/mod.py", "x = 1").expect("write");

        let ignore = vec![".git".to_string(), "__pycache__".to_string()];
        let tree = snapshot(ws.path(), &ignore).expect("snapshot");
        assert!(tree.get_by_path(".git").is_none());
        assert!(tree.get_by_path("pkg/__pycache__").is_none());
        assert!(tree.get_by_path("pkg/mod.py").is_some());
    }

    #[test]
    fn empty_directories_have_empty_children() {
        let ws = TestWorkspace::new().expect("workspace");
        fs::create_dir_all(ws.path().join("empty")).expect("mkdir");
        let tree = snapshot(ws.path(), &[]).expect("snapshot");
        let empty = tree.get_by_path("empty").expect("empty dir");
        assert_eq!(empty.children, Some(Vec::new()));
        assert_eq!(empty.content, None);
    }

    #[test]
    fn patch_without_file_headers_applies() {
        let patched = apply_patch("a\nb\nc\n", "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n").expect("apply");
        assert_eq!(patched, "a\nB\nc\n");
    }

    #[test]
    fn patch_with_mismatched_context_is_rejected() {
        let err = apply_patch("a\nb\nc\n", "@@ -1,3 +1,3 @@\n x\n-b\n+B\n c\n")
            .expect_err("context does not match");
        assert!(format!("{err:#}").contains("apply unified diff"));
    }

    #[test]
    fn snapshot_of_missing_root_fails() {
        let ws = TestWorkspace::new().expect("workspace");
        assert!(snapshot(&ws.path().join("missing"), &[]).is_err());
    }
}
