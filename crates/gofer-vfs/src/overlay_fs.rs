use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gofer_core::{rebase_path, TextEdit};
use parking_lot::Mutex;

use crate::document::{Document, DocumentError};
use crate::fs::FileSystem;

/// A file system overlay that serves in-memory `Document`s before delegating to a base file system.
#[derive(Debug, Clone)]
pub struct OverlayFs<F: FileSystem> {
    base: F,
    docs: Arc<Mutex<HashMap<PathBuf, Document>>>,
}

impl<F: FileSystem> OverlayFs<F> {
    pub fn new(base: F) -> Self {
        Self {
            base,
            docs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn base(&self) -> &F {
        &self.base
    }

    pub fn open(&self, path: PathBuf, text: impl Into<String>, version: i32) {
        self.docs.lock().insert(path, Document::new(text, version));
    }

    pub fn close(&self, path: &Path) -> Option<Document> {
        self.docs.lock().remove(path)
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.docs.lock().contains_key(path)
    }

    pub fn document(&self, path: &Path) -> Option<Document> {
        self.docs.lock().get(path).cloned()
    }

    pub fn document_text(&self, path: &Path) -> Option<String> {
        self.docs.lock().get(path).map(|doc| doc.text().to_owned())
    }

    /// An independent overlay holding a copy of the currently open documents.
    ///
    /// Later changes to either overlay are not seen by the other. Document
    /// texts are shared, so this does not copy buffer contents.
    pub fn fork(&self) -> Self
    where
        F: Clone,
    {
        Self {
            base: self.base.clone(),
            docs: Arc::new(Mutex::new(self.docs.lock().clone())),
        }
    }

    /// Rebinds an open document from `from` to `to`, keeping its content,
    /// version, dirty state and undo history.
    ///
    /// A document already open at `to` is replaced. Returns `true` if a
    /// document was moved.
    pub fn rebind(&self, from: &Path, to: PathBuf) -> bool {
        if from == to {
            return false;
        }
        let mut docs = self.docs.lock();
        let Some(doc) = docs.remove(from) else {
            return false;
        };
        docs.insert(to, doc);
        true
    }

    /// Rebinds every document under directory `from` onto `to`.
    ///
    /// Returns the `(old, new)` pairs that were moved, sorted by old path.
    pub fn rebind_tree(&self, from: &Path, to: &Path) -> Vec<(PathBuf, PathBuf)> {
        let mut docs = self.docs.lock();
        let mut moved: Vec<(PathBuf, PathBuf)> = docs
            .keys()
            .filter_map(|path| Some((path.clone(), rebase_path(path, from, to)?)))
            .filter(|(old, new)| old != new)
            .collect();
        moved.sort();

        let detached: Vec<(PathBuf, Document)> = moved
            .iter()
            .filter_map(|(old, new)| Some((new.clone(), docs.remove(old)?)))
            .collect();
        docs.extend(detached);
        if !moved.is_empty() {
            tracing::debug!(
                target: "gofer.vfs",
                from = %from.display(),
                to = %to.display(),
                documents = moved.len(),
                "rebound open documents"
            );
        }
        moved
    }

    /// Applies edits to an open document and returns its new version.
    pub fn apply_edits(&self, path: &Path, edits: &[TextEdit]) -> Result<i32, DocumentError> {
        let mut docs = self.docs.lock();
        let doc = docs
            .get_mut(path)
            .ok_or_else(|| DocumentError::NotOpen(path.to_path_buf()))?;
        doc.apply_edits(edits)?;
        Ok(doc.version())
    }

    pub fn undo(&self, path: &Path) -> Result<bool, DocumentError> {
        let mut docs = self.docs.lock();
        let doc = docs
            .get_mut(path)
            .ok_or_else(|| DocumentError::NotOpen(path.to_path_buf()))?;
        Ok(doc.undo())
    }

    /// Restores a document snapshot taken with [`OverlayFs::document`].
    pub fn restore(&self, path: PathBuf, doc: Document) {
        self.docs.lock().insert(path, doc);
    }
}

impl<F: FileSystem> FileSystem for OverlayFs<F> {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if let Some(text) = self.document_text(path) {
            return Ok(text);
        }
        self.base.read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_open(path) || self.base.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.base.is_dir(path)
    }

    /// Disk entries plus open documents that only exist in memory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let in_memory: Vec<PathBuf> = self
            .docs
            .lock()
            .keys()
            .filter(|doc| doc.parent() == Some(path))
            .cloned()
            .collect();

        let mut entries = match self.base.read_dir(path) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !in_memory.is_empty() => {
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        entries.extend(in_memory);
        entries.sort();
        entries.dedup();
        Ok(entries)
    }
}
