use gofer_core::WorkspaceEdit;
use serde::Serialize;

use crate::RenameTarget;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRewrite {
    pub old_path: String,
    pub new_path: String,
}

/// Everything a package rename changes, computed against one snapshot.
///
/// Text edits are keyed by the path each file will have after the moves run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub base_version: u64,
    pub target: RenameTarget,
    pub new_name: String,
    /// Cascaded import path substitutions, outermost package first.
    pub import_rewrites: Vec<ImportRewrite>,
    pub edit: WorkspaceEdit,
}
