//! Structural invariants of workspace snapshots.

use std::collections::HashSet;

use crate::tree::FileSystemTree;

/// Check snapshot invariants:
/// - Directories have `children` and no `content`
/// - Files have `content` and no `children`
/// - No path appears twice
pub fn validate_tree(root: &FileSystemTree) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    validate_node(root, &mut seen, &mut errors);
    errors
}

fn validate_node<'a>(
    node: &'a FileSystemTree,
    seen: &mut HashSet<&'a str>,
    errors: &mut Vec<String>,
) {
    if !seen.insert(node.path.as_str()) {
        errors.push(format!("duplicate path '{}'", node.path));
    }

    if node.is_directory {
        if node.children.is_none() {
            errors.push(format!("{}: directory must have children", node.path));
        }
        if node.content.is_some() {
            errors.push(format!("{}: directory must not have content", node.path));
        }
    } else {
        if node.content.is_none() {
            errors.push(format!("{}: file must have content", node.path));
        }
        if node.children.is_some() {
            errors.push(format!("{}: file must not have children", node.path));
        }
    }

    for child in node.child_nodes() {
        validate_node(child, seen, errors);
    }
}
