use std::path::{Path, PathBuf};
use std::sync::Arc;

use gofer_core::PathMove;
use gofer_index::WorkspaceIndex;
use gofer_vfs::{Document, LocalFs, OverlayFs};

use crate::diagnostics::{Diagnostic, DiagnosticMap};

/// One immutable, versioned view of the workspace.
///
/// The open buffers are part of the view: they are exactly the texts the index
/// and diagnostics were computed from.
#[derive(Debug, Clone)]
pub struct WorkspaceSnapshot {
    version: u64,
    index: Arc<WorkspaceIndex>,
    diagnostics: Arc<DiagnosticMap>,
    buffers: Arc<OverlayFs<LocalFs>>,
}

impl WorkspaceSnapshot {
    pub(crate) fn new(
        version: u64,
        index: WorkspaceIndex,
        diagnostics: DiagnosticMap,
        buffers: OverlayFs<LocalFs>,
    ) -> Self {
        Self {
            version,
            index: Arc::new(index),
            diagnostics: Arc::new(diagnostics),
            buffers: Arc::new(buffers),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn index(&self) -> &WorkspaceIndex {
        &self.index
    }

    /// Open buffers over the disk, as of this version.
    pub fn buffers(&self) -> &OverlayFs<LocalFs> {
        &self.buffers
    }

    pub fn document(&self, path: &Path) -> Option<Document> {
        self.buffers.document(path)
    }

    pub fn document_text(&self, path: &Path) -> Option<String> {
        self.buffers.document_text(path)
    }

    pub fn diagnostics(&self) -> &DiagnosticMap {
        &self.diagnostics
    }

    pub fn diagnostics_for(&self, file: &Path) -> &[Diagnostic] {
        self.diagnostics.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Diagnostics of `path` itself or, for a directory, of everything below it.
    pub fn diagnostics_under(&self, path: &Path) -> Vec<Diagnostic> {
        self.diagnostics
            .range(path.to_path_buf()..)
            .take_while(|(file, _)| file.starts_with(path))
            .flat_map(|(_, diags)| diags.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    /// The full diagnostic set of `file`; empty clears earlier results.
    DiagnosticsUpdated {
        file: PathBuf,
        diagnostics: Vec<Diagnostic>,
    },
    PathsMoved {
        moves: Vec<PathMove>,
    },
    PlanApplied {
        version: u64,
        moves: Vec<PathMove>,
        edited_files: Vec<PathBuf>,
    },
}
