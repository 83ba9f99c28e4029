//! Live workspace state for package renames.
//!
//! A [`Workspace`] owns the open-document overlay and a series of immutable,
//! versioned [`WorkspaceSnapshot`]s. Planning reads one snapshot; applying a
//! plan, editing a buffer or observing a move publishes the next one.

mod diagnostics;
mod error;
mod journal;
mod reconcile;
mod snapshot;
mod workspace;

pub use diagnostics::{package_diagnostics, workspace_diagnostics, Diagnostic, DiagnosticKind, DiagnosticMap};
pub use error::{ApplyError, WorkspaceError};
pub use reconcile::move_chains;
pub use snapshot::{WorkspaceEvent, WorkspaceSnapshot};
pub use workspace::{PrepareRename, Workspace};

pub use gofer_core::{PathMove, TextEdit, TextRange, TextSize};
pub use gofer_refactor::{RenameError, RenamePlan};
pub use gofer_vfs::FileChange;
