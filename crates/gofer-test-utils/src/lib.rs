//! Shared test helpers.

mod fixtures;

pub use fixtures::{read_tree, Fixture, TempWorkspace};
