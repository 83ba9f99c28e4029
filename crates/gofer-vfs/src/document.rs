use std::path::PathBuf;
use std::sync::Arc;

use gofer_core::{apply_text_edits, EditError, TextEdit};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document not open: {}", .0.display())]
    NotOpen(PathBuf),
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// An in-memory document with versioning and an undo history.
///
/// The history travels with the document when it is rebound to another path.
#[derive(Debug, Clone)]
pub struct Document {
    text: Arc<String>,
    version: i32,
    undo: Vec<Arc<String>>,
    dirty: bool,
}

impl Document {
    pub fn new(text: impl Into<String>, version: i32) -> Self {
        Self {
            text: Arc::new(text.into()),
            version,
            undo: Vec::new(),
            dirty: false,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Whether the buffer differs from what was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Applies `edits` atomically: on error the document is unchanged.
    pub fn apply_edits(&mut self, edits: &[TextEdit]) -> Result<(), DocumentError> {
        let next = apply_text_edits(&self.text, edits)?;
        let previous = std::mem::replace(&mut self.text, Arc::new(next));
        self.undo.push(previous);
        self.version += 1;
        self.dirty = true;
        Ok(())
    }

    /// Reverts the most recent edit. Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        self.text = previous;
        self.version += 1;
        self.dirty = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use gofer_core::{TextRange, TextSize};

    #[test]
    fn edits_are_undoable() {
        let mut doc = Document::new("package a\n", 1);
        let edit = TextEdit::new(
            TextRange::new(TextSize::from(8), TextSize::from(9)),
            "b",
        );
        doc.apply_edits(&[edit]).unwrap();
        assert_eq!(doc.text(), "package b\n");
        assert_eq!(doc.version(), 2);
        assert!(doc.is_dirty());

        assert!(doc.undo());
        assert_eq!(doc.text(), "package a\n");
        assert!(!doc.undo());
    }

    #[test]
    fn failed_edit_leaves_document_untouched() {
        let mut doc = Document::new("abc", 7);
        let bad = TextEdit::new(TextRange::new(TextSize::from(1), TextSize::from(10)), "x");
        assert!(doc.apply_edits(&[bad]).is_err());
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.version(), 7);
        assert_eq!(doc.undo_depth(), 0);
    }
}
