use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::WorkspaceIndex;

/// Answers "which files import this path".
///
/// Results must reflect the snapshot the caller is planning against: a file
/// missing from the answer is an import that will not be rewritten.
pub trait ImportGraph: Send + Sync {
    fn find_importers(&self, import_path: &str) -> BTreeSet<PathBuf>;
}

impl ImportGraph for WorkspaceIndex {
    fn find_importers(&self, import_path: &str) -> BTreeSet<PathBuf> {
        self.importers_of(import_path).cloned().unwrap_or_default()
    }
}
