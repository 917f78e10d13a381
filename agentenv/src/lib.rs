//! Execution environment for an agent acting on a development workspace.
//!
//! An agent observes and acts through five capabilities: a filesystem, a
//! browser, a terminal, a user-facing message channel and a linter. Each
//! capability is a trait with interchangeable backends, and the
//! [`environment::Environment`] facade holds exactly one of each so agent logic
//! never names a concrete backend.
//!
//! - **[`core`]**: Pure, deterministic logic (tree lookup, snapshot invariants,
//!   lint report normalization). No I/O, fully testable in isolation.
//! - **[`io`]**: Capability traits and their backends (dummy, local, tool-invoking).
//!
//! [`tree`] holds the workspace snapshot model shared by both layers.

pub mod core;
pub mod environment;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;

pub use environment::Environment;
pub use tree::FileSystemTree;
