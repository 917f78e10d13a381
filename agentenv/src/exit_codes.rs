//! Stable exit codes for `agentenv` CLI commands.

/// Command succeeded (for `lint FILE`: the scoped report is empty).
pub const OK: i32 = 0;
/// Command failed due to invalid config, unreadable workspace or other errors.
pub const INVALID: i32 = 1;
/// `agentenv lint FILE` produced findings for the file.
pub const LINT_FINDINGS: i32 = 2;
