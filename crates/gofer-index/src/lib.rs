//! Immutable workspace index plus the capability interfaces the refactoring
//! engine consumes: import graph queries and position resolution.

mod graph;
mod index;
mod resolve;

pub use graph::ImportGraph;
pub use index::WorkspaceIndex;
pub use resolve::{PositionResolver, Resolution, Resolved};
