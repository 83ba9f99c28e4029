//! Package rename: validation, alias conflict resolution and planning.
//!
//! Planning is read-only. A [`RenamePlan`] records the snapshot version it was
//! computed against so the applier can reject it once the workspace moves on.

mod alias;
mod error;
mod plan;
mod prepare;
mod rename_package;

pub use alias::{resolve_aliases, ImportEntry, ImportForm};
pub use error::RenameError;
pub use plan::{ImportRewrite, RenamePlan};
pub use prepare::{analyze_position, RenameTarget};
pub use rename_package::plan_package_rename;
