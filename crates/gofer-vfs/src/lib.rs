//! File system access for the workspace: the on-disk tree plus in-memory
//! documents for files open in an editor.

mod change;
mod document;
mod fs;
mod overlay_fs;

pub use change::FileChange;
pub use document::{Document, DocumentError};
pub use fs::{atomic_write, rename_path, FileSystem, LocalFs};
pub use overlay_fs::OverlayFs;
