//! Capability traits and their backends.
//!
//! Every capability is a trait object held by [`crate::Environment`]. Each
//! module pairs the trait with the backends that satisfy it: no-op dummies,
//! local implementations and wrappers around external tools.

pub mod browser;
pub mod config;
pub mod filesystem;
pub mod linter;
pub mod process;
pub mod terminal;
pub mod ui;
