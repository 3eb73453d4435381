//! Common test utilities and fixtures for integration tests.
//!
//! This module provides in-memory collaborators for the sync pass:
//! - MemoryStore, a card store that can be told to go offline or reject
//!   individual creates and updates
//! - MemoryDocument, a document editor that counts its edits
//! - MemoryMedia, a media source backed by a map

#![allow(dead_code)]

pub mod fixtures;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::sync::{Mutex, MutexGuard};

use mdcards_core::{
    CardRecord, CardStore, DocumentEditor, EditorError, MediaSource, NoteId, StoreError,
    TextDocument,
};

/// First id handed out by a fresh [`MemoryStore`].
pub const FIRST_ID: NoteId = 1000;

/// Everything a [`MemoryStore`] has been asked to do.
#[derive(Debug, Default)]
pub struct StoreState {
    pub notes: BTreeMap<NoteId, CardRecord>,
    pub next_id: NoteId,
    pub decks: Vec<String>,
    pub templates_ensured: bool,
    pub media: BTreeMap<String, Vec<u8>>,
    pub deleted: Vec<NoteId>,
    /// Actions in call order.
    pub calls: Vec<&'static str>,
    pub unavailable: bool,
    pub fail_lookup: bool,
    /// Creates whose first field contains one of these are rejected.
    pub reject_creates: Vec<String>,
    /// Updates whose first field contains one of these are rejected.
    pub reject_updates: Vec<String>,
}

/// In-memory card store.
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                next_id: FIRST_ID,
                ..StoreState::default()
            }),
        }
    }

    /// A store whose connectivity check fails.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.state().unavailable = true;
        store
    }

    pub fn rejecting_creates(self, needle: &str) -> Self {
        self.state().reject_creates.push(needle.to_string());
        self
    }

    pub fn rejecting_updates(self, needle: &str) -> Self {
        self.state().reject_updates.push(needle.to_string());
        self
    }

    pub fn failing_lookups(self) -> Self {
        self.state().fail_lookup = true;
        self
    }

    pub fn with_note(self, id: NoteId, record: CardRecord) -> Self {
        self.state().notes.insert(id, CardRecord { id: Some(id), ..record });
        self
    }

    pub fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }
}

impl CardStore for MemoryStore {
    async fn check_connection(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        state.calls.push("version");
        if state.unavailable {
            return Err(StoreError::Unavailable("offline".to_string()));
        }
        Ok(())
    }

    async fn find_existing(&self, ids: &[NoteId]) -> Result<HashSet<NoteId>, StoreError> {
        let mut state = self.state();
        state.calls.push("notesInfo");
        if state.fail_lookup {
            return Err(StoreError::Network("connection reset".to_string()));
        }
        Ok(ids
            .iter()
            .copied()
            .filter(|id| state.notes.contains_key(id))
            .collect())
    }

    async fn create_batch(&self, records: &[CardRecord]) -> Result<Vec<Option<NoteId>>, StoreError> {
        let mut state = self.state();
        state.calls.push("addNotes");
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let first = record.fields()[0].1.to_string();
            if state.reject_creates.iter().any(|needle| first.contains(needle)) {
                ids.push(None);
                continue;
            }
            let id = state.next_id;
            state.next_id += 1;
            state.notes.insert(
                id,
                CardRecord {
                    id: Some(id),
                    ..record.clone()
                },
            );
            ids.push(Some(id));
        }
        Ok(ids)
    }

    async fn update_batch(&self, records: &[CardRecord]) -> Result<Vec<bool>, StoreError> {
        let mut state = self.state();
        state.calls.push("updateNote");
        Ok(records
            .iter()
            .map(|record| match record.id {
                _ if state
                    .reject_updates
                    .iter()
                    .any(|needle| record.fields()[0].1.contains(needle.as_str())) =>
                {
                    false
                }
                Some(id) if state.notes.contains_key(&id) => {
                    state.notes.insert(id, record.clone());
                    true
                }
                _ => false,
            })
            .collect())
    }

    async fn ensure_deck(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        state.calls.push("createDeck");
        if !state.decks.iter().any(|deck| deck == name) {
            state.decks.push(name.to_string());
        }
        Ok(())
    }

    async fn ensure_templates(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        state.calls.push("createModel");
        state.templates_ensured = true;
        Ok(())
    }

    async fn delete_batch(&self, ids: &[NoteId]) -> Result<(), StoreError> {
        let mut state = self.state();
        state.calls.push("deleteNotes");
        for id in ids {
            state.notes.remove(id);
            state.deleted.push(*id);
        }
        Ok(())
    }

    async fn upload_media(&self, filename: &str, bytes: &[u8]) -> Result<bool, StoreError> {
        let mut state = self.state();
        state.calls.push("storeMediaFile");
        state.media.insert(filename.to_string(), bytes.to_vec());
        Ok(true)
    }
}

/// In-memory document that counts the edits applied to it.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    inner: TextDocument,
    pub edits: usize,
}

impl MemoryDocument {
    pub fn new(text: &str) -> Self {
        Self {
            inner: TextDocument::new(text),
            edits: 0,
        }
    }

    pub fn text(&self) -> &str {
        self.inner.text()
    }
}

impl DocumentEditor for MemoryDocument {
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
        self.edits += 1;
        self.inner
            .replace_line_range(start_line, start_col, end_line, end_col, new_text)
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

/// Media source backed by a map of reference to bytes.
#[derive(Debug, Default)]
pub struct MemoryMedia {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryMedia {
    pub fn with_file(mut self, reference: &str, bytes: &[u8]) -> Self {
        self.files.insert(reference.to_string(), bytes.to_vec());
        self
    }
}

impl MediaSource for MemoryMedia {
    fn load(&self, reference: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(reference)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, reference.to_string()))
    }
}
