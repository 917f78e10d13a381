//! Normalization of raw linter output into the linter contract.
//!
//! Lint tools exit non-zero whenever they find something, so the raw text is
//! always taken as-is from the captured streams; these helpers only decide
//! what the caller gets to see.

use crate::core::types::LintFileResult;

/// Phrases a repository linter prints when it declines to check anything in the
/// current context (e.g. "Please run trunk upgrade", "trunk check can only be
/// run inside a git repository"). Matched exactly as written.
const REFUSAL_MARKERS: [&str; 2] = ["Please run", "can only"];

/// True if the report is the tool refusing to run rather than a finding.
pub fn is_refusal(raw: &str) -> bool {
    REFUSAL_MARKERS.iter().any(|marker| raw.contains(marker))
}

/// Repository-wide report: refusals become an empty report, anything else is
/// passed through untouched.
///
/// An empty result therefore means either "no findings" or "the tool refused";
/// callers cannot tell the two apart.
pub fn normalize_repo_report(raw: &str) -> String {
    if is_refusal(raw) {
        return String::new();
    }
    raw.to_string()
}

/// Scoped single-file report: trimmed output, ok exactly when nothing is left.
pub fn scoped_report(raw: &str) -> LintFileResult {
    let output = raw.trim().to_string();
    let is_ok = output.is_empty();
    LintFileResult { output, is_ok }
}
