use std::path::{Path, PathBuf};

/// A change observed on the file system, typically reported by a watcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileChange {
    Created { path: PathBuf },
    Modified { path: PathBuf },
    Deleted { path: PathBuf },
    /// A file or directory was moved. Directory moves are reported once, not
    /// per contained file.
    Moved { from: PathBuf, to: PathBuf },
}

impl FileChange {
    /// Every path the change touches.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        let (first, second) = match self {
            FileChange::Created { path }
            | FileChange::Modified { path }
            | FileChange::Deleted { path } => (path.as_path(), None),
            FileChange::Moved { from, to } => (from.as_path(), Some(to.as_path())),
        };
        std::iter::once(first).chain(second)
    }
}
