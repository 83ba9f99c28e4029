//! Text model primitives: sizes, ranges, and line/column conversions.

pub use text_size::{TextRange, TextSize};

/// Zero-based line and byte column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, serde::Serialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Pre-computed line start offsets for a particular text snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    text_len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = Vec::with_capacity(64);
        line_starts.push(TextSize::from(0));
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::from((i + 1) as u32));
            }
        }
        Self {
            line_starts,
            text_len: TextSize::from(text.len() as u32),
        }
    }

    #[inline]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Convert a byte offset to a line/column pair. Offsets past the end are clamped.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        };
        LineCol {
            line: line as u32,
            col: u32::from(offset - self.line_starts[line]),
        }
    }

    /// Convert a line/column pair back to a byte offset.
    ///
    /// Returns `None` when the line does not exist or the column runs past the
    /// end of that line.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let start = *self.line_starts.get(line_col.line as usize)?;
        let end = self
            .line_starts
            .get(line_col.line as usize + 1)
            .map(|next| *next - TextSize::from(1))
            .unwrap_or(self.text_len);
        let offset = start + TextSize::from(line_col.col);
        (offset <= end).then_some(offset)
    }
}
