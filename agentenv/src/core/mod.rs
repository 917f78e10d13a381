//! Deterministic, pure logic shared by the environment backends.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! snapshots and raw tool output and return deterministic results suitable
//! for tests.

pub mod invariants;
pub mod lint_report;
pub mod lookup;
pub mod types;
