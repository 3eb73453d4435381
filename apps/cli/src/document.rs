//! Markdown documents on disk.

use mdcards_core::{DocumentEditor, EditorError, TextDocument};
use std::fs;
use std::path::{Path, PathBuf};

/// A file loaded into memory; edits are written back by [`FileDocument::save`].
#[derive(Debug)]
pub struct FileDocument {
    path: PathBuf,
    inner: TextDocument,
    dirty: bool,
}

impl FileDocument {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EditorError> {
        let path = path.into();
        let text = fs::read_to_string(&path)?;
        Ok(Self {
            path,
            inner: TextDocument::new(text),
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        self.inner.text()
    }

    /// Write the document back if it was edited. Returns whether it was.
    pub fn save(&mut self) -> Result<bool, EditorError> {
        if !self.dirty {
            return Ok(false);
        }
        fs::write(&self.path, self.inner.text())?;
        self.dirty = false;
        tracing::debug!("wrote {}", self.path.display());
        Ok(true)
    }
}

impl DocumentEditor for FileDocument {
    fn read_full_text(&self) -> Result<String, EditorError> {
        self.inner.read_full_text()
    }

    fn replace_line_range(
        &mut self,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
        new_text: &str,
    ) -> Result<(), EditorError> {
        self.inner
            .replace_line_range(start_line, start_col, end_line, end_col, new_text)?;
        self.dirty = true;
        Ok(())
    }

    fn get_line(&self, line: usize) -> Result<String, EditorError> {
        self.inner.get_line(line)
    }

    fn line_count(&self) -> usize {
        self.inner.line_count()
    }

    fn offset_to_position(&self, offset: usize) -> Result<(usize, usize), EditorError> {
        self.inner.offset_to_position(offset)
    }
}
