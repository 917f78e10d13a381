use serde::{Deserialize, Serialize};

use crate::core::lookup::find_by_path;

/// Point-in-time snapshot of a workspace file or directory.
///
/// Directories carry `children` and no `content`; files carry `content` (one
/// entry per line) and no `children`. Use [`FileSystemTree::directory`] and
/// [`FileSystemTree::file`] to build nodes that respect this.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSystemTree {
    pub path: String,
    pub is_directory: bool,
    pub content: Option<Vec<String>>,
    pub children: Option<Vec<FileSystemTree>>,
}

impl FileSystemTree {
    pub fn directory(path: impl Into<String>, children: Vec<FileSystemTree>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            content: None,
            children: Some(children),
        }
    }

    pub fn file(path: impl Into<String>, content: Vec<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            content: Some(content),
            children: None,
        }
    }

    /// Depth-first lookup by exact path string. Paths are not normalized.
    pub fn get_by_path(&self, path: &str) -> Option<&FileSystemTree> {
        find_by_path(self, path)
    }

    /// Children in stored order; empty for files.
    pub fn child_nodes(&self) -> &[FileSystemTree] {
        self.children.as_deref().unwrap_or(&[])
    }
}
