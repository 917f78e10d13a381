//! Path lookup over workspace snapshots.

use crate::tree::FileSystemTree;

/// Find the first node whose `path` equals `path` exactly.
///
/// Traversal is depth-first: a parent is visited before its children and
/// children in their stored order. No normalization is applied, so
/// `"src/lib.rs"` and `"./src/lib.rs"` are different keys.
pub fn find_by_path<'a>(node: &'a FileSystemTree, path: &str) -> Option<&'a FileSystemTree> {
    if node.path == path {
        return Some(node);
    }

    for child in node.child_nodes() {
        if let Some(found) = find_by_path(child, path) {
            return Some(found);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dir, file};

    fn sample() -> FileSystemTree {
        dir(
            "",
            vec![
                dir(
                    "src",
                    vec![file("src/lib.rs", &["pub mod a;"]), file("src/a.rs", &[])],
                ),
                file("README.md", &["# readme"]),
            ],
        )
    }

    #[test]
    fn finds_root() {
        let tree = sample();
        assert_eq!(find_by_path(&tree, ""), Some(&tree));
    }

    #[test]
    fn finds_nested_file() {
        let tree = sample();
        let found = find_by_path(&tree, "src/lib.rs").expect("node");
        assert_eq!(found.content, Some(vec!["pub mod a;".to_string()]));
    }

    #[test]
    fn finds_directory_with_children() {
        let tree = sample();
        let found = find_by_path(&tree, "src").expect("node");
        assert!(found.is_directory);
        assert_eq!(found.child_nodes().len(), 2);
    }

    #[test]
    fn missing_path_returns_none() {
        let tree = sample();
        assert!(find_by_path(&tree, "src/missing.rs").is_none());
    }

    #[test]
    fn match_is_exact_string_equality() {
        let tree = sample();
        assert!(find_by_path(&tree, "./src/lib.rs").is_none());
        assert!(find_by_path(&tree, "src/lib.rs/").is_none());
        assert!(find_by_path(&tree, "SRC/lib.rs").is_none());
    }

    #[test]
    fn repeated_lookups_return_equal_results() {
        let tree = sample();
        let first = find_by_path(&tree, "README.md").cloned();
        let second = find_by_path(&tree, "README.md").cloned();
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn parent_is_visited_before_children() {
        // Malformed on purpose: the same path appears at two depths.
        let tree = dir("", vec![dir("x", vec![file("x", &["inner"])])]);
        let found = find_by_path(&tree, "x").expect("node");
        assert!(found.is_directory);
    }
}
