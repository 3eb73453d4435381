//! Resolving image references against the filesystem.

use mdcards_core::MediaSource;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Looks a reference up next to the document, then under the synced root.
#[derive(Debug, Clone)]
pub struct FsMediaSource {
    document_dir: PathBuf,
    root: Option<PathBuf>,
}

impl FsMediaSource {
    pub fn new(document_dir: impl Into<PathBuf>) -> Self {
        Self {
            document_dir: document_dir.into(),
            root: None,
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn candidates(&self, reference: &str) -> Vec<PathBuf> {
        let reference = Path::new(reference);
        if reference.is_absolute() {
            return vec![reference.to_path_buf()];
        }
        let mut candidates = vec![self.document_dir.join(reference)];
        if let Some(root) = &self.root {
            candidates.push(root.join(reference));
        }
        candidates
    }
}

impl MediaSource for FsMediaSource {
    fn load(&self, reference: &str) -> io::Result<Vec<u8>> {
        let candidates = self.candidates(reference);
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => fs::read(path),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", reference),
            )),
        }
    }
}
