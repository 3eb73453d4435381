//! In-memory document editor.

use super::DocumentEditor;
use crate::error::EditorError;

/// A document held as a single string.
///
/// Positions are `(line, byte column)`. The position just past a trailing
/// newline is addressable as column 0 of the line after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    text: String,
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn line_starts(&self) -> Vec<usize> {
        std::iter::once(0)
            .chain(self.text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect()
    }

    fn position_to_offset(&self, line: usize, column: usize) -> Result<usize, EditorError> {
        let starts = self.line_starts();
        let start = *starts.get(line).ok_or(EditorError::LineOutOfRange {
            line,
            line_count: starts.len(),
        })?;
        let end = starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);
        let offset = start + column;
        if offset > end || !self.text.is_char_boundary(offset) {
            return Err(EditorError::ColumnOutOfRange { line, column });
        }
        Ok(offset)
    }
}

impl DocumentEditor for TextDocument {
    fn read_full_text(&self) -> Result<String, EditorError> {
        Ok(self.text.clone())
    }

    fn replace_line_range(
        &mut self,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
        new_text: &str,
    ) -> Result<(), EditorError> {
        let start = self.position_to_offset(start_line, start_col)?;
        let end = self.position_to_offset(end_line, end_col)?;
        if end < start {
            return Err(EditorError::ColumnOutOfRange {
                line: end_line,
                column: end_col,
            });
        }
        self.text.replace_range(start..end, new_text);
        Ok(())
    }

    fn get_line(&self, line: usize) -> Result<String, EditorError> {
        self.text
            .lines()
            .nth(line)
            .map(str::to_string)
            .ok_or(EditorError::LineOutOfRange {
                line,
                line_count: self.line_count(),
            })
    }

    fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    fn offset_to_position(&self, offset: usize) -> Result<(usize, usize), EditorError> {
        if offset > self.text.len() {
            return Err(EditorError::OffsetOutOfRange {
                offset,
                len: self.text.len(),
            });
        }
        let before = &self.text[..offset];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        Ok((line, offset - line_start))
    }
}
