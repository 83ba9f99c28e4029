//! Text edit primitives and the canonical workspace edit model.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::{TextRange, TextSize};

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct TextEdit {
    pub range: TextRange,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: TextSize, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(offset), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::new(range, String::new())
    }
}

/// A file or directory move. Directory moves carry their whole subtree.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize)]
pub struct PathMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl PathMove {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Moves plus text edits.
///
/// Text edits are keyed by the path the file has *after* every move has been
/// applied, so consumers apply `moves` first and `text_edits` second.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct WorkspaceEdit {
    pub moves: Vec<PathMove>,
    pub text_edits: BTreeMap<PathBuf, Vec<TextEdit>>,
}

impl WorkspaceEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_move(&mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) {
        self.moves.push(PathMove::new(from, to));
    }

    pub fn add_edit(&mut self, file: impl Into<PathBuf>, edit: TextEdit) {
        self.text_edits.entry(file.into()).or_default().push(edit);
    }

    pub fn edits_for(&self, file: &Path) -> &[TextEdit] {
        self.text_edits.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edited_files(&self) -> impl Iterator<Item = &Path> {
        self.text_edits
            .iter()
            .filter(|(_, edits)| !edits.is_empty())
            .map(|(path, _)| path.as_path())
    }

    /// Sort edits, drop exact duplicates and reject overlapping ranges.
    ///
    /// Bounds are not checked here since the text is not known; see
    /// [`apply_text_edits`].
    pub fn normalize(&mut self) -> Result<(), EditError> {
        self.moves.sort();
        self.moves.dedup();
        self.text_edits.retain(|_, edits| !edits.is_empty());

        for (file, edits) in self.text_edits.iter_mut() {
            edits.sort_by_key(|edit| (edit.range.start(), edit.range.end()));
            edits.dedup();
            for pair in edits.windows(2) {
                let (first, second) = (&pair[0], &pair[1]);
                let both_inserts_at_same_offset = first.range.is_empty()
                    && second.range.is_empty()
                    && first.range.start() == second.range.start();
                if first.range.end() > second.range.start() || both_inserts_at_same_offset {
                    return Err(EditError::OverlappingEdits {
                        file: Some(file.clone()),
                        first: first.range,
                        second: second.range,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EditError {
    #[error("edit range {range:?} is out of bounds for text length {text_len:?}")]
    RangeOutOfBounds { range: TextRange, text_len: TextSize },
    #[error("offset {offset:?} is not a UTF-8 character boundary")]
    InvalidUtf8Boundary { offset: TextSize },
    #[error("overlapping edits{}: {first:?} overlaps {second:?}", display_file(.file))]
    OverlappingEdits {
        file: Option<PathBuf>,
        first: TextRange,
        second: TextRange,
    },
}

fn display_file(file: &Option<PathBuf>) -> String {
    match file {
        Some(file) => format!(" in {}", file.display()),
        None => String::new(),
    }
}

/// Apply a list of edits to a text snapshot.
///
/// Edits are sorted by `(start, end)` and applied from the end of the text
/// backwards, so the input order does not matter.
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut edits = edits.to_vec();
    normalize_text_edits(text, &mut edits)?;

    let mut out = text.to_string();
    for edit in edits.into_iter().rev() {
        let start = u32::from(edit.range.start()) as usize;
        let end = u32::from(edit.range.end()) as usize;
        out.replace_range(start..end, &edit.replacement);
    }
    Ok(out)
}

/// Sort edits and check for overlaps, out-of-bounds ranges and split characters.
pub fn normalize_text_edits(text: &str, edits: &mut Vec<TextEdit>) -> Result<(), EditError> {
    edits.sort_by_key(|e| (e.range.start(), e.range.end()));
    edits.dedup();

    let text_len = TextSize::from(text.len() as u32);
    for edit in edits.iter() {
        if edit.range.end() > text_len {
            return Err(EditError::RangeOutOfBounds {
                range: edit.range,
                text_len,
            });
        }
        for offset in [edit.range.start(), edit.range.end()] {
            if !text.is_char_boundary(u32::from(offset) as usize) {
                return Err(EditError::InvalidUtf8Boundary { offset });
            }
        }
    }

    for pair in edits.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if first.range.end() > second.range.start()
            || (first.range.is_empty()
                && second.range.is_empty()
                && first.range.start() == second.range.start())
        {
            return Err(EditError::OverlappingEdits {
                file: None,
                first: first.range,
                second: second.range,
            });
        }
    }
    Ok(())
}
