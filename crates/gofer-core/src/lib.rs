//! Core shared types for Gofer.
//!
//! Everything here is independent of the Go language model: text ranges, edits,
//! and lexical path arithmetic.

pub mod edit;
pub mod path;
pub mod text;

pub use edit::{apply_text_edits, normalize_text_edits, EditError, PathMove, TextEdit, WorkspaceEdit};
pub use path::{canonicalize_or_self, is_within, normalize_path, rebase_path, relative_path};
pub use text::{LineCol, LineIndex, TextRange, TextSize};
