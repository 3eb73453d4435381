//! Synchronising one document with a card store.
//!
//! The pass runs against three collaborators supplied by the host:
//! a [`CardStore`] (remote, async), a [`DocumentEditor`] over the document
//! being synchronised, and a [`MediaSource`] resolving embedded files. Only
//! one pass per document may run at a time; concurrent passes over the same
//! document are not guarded against.

mod reconciliation;
mod text;

pub use reconciliation::{plan_identifier_edits, reconcile, Assignment, IdentifierEdit, Reconciliation};
pub use text::TextDocument;

use crate::builder::{extract_cards, ExtractContext};
use crate::deletion;
use crate::error::{EditorError, StoreError};
use crate::types::{CardRecord, DeletionMarker, ExtractedCard, MediaRef, NoteId, SyncReport};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Remote store holding notes, decks and note types.
#[allow(async_fn_in_trait)]
pub trait CardStore {
    /// Version/connectivity probe run before anything else.
    async fn check_connection(&self) -> Result<(), StoreError>;

    /// Subset of `ids` the store still holds.
    async fn find_existing(&self, ids: &[NoteId]) -> Result<HashSet<NoteId>, StoreError>;

    /// Create notes, returning assigned ids in input order. `None` marks a
    /// record the store rejected.
    async fn create_batch(&self, records: &[CardRecord]) -> Result<Vec<Option<NoteId>>, StoreError>;

    /// Update notes by id, returning per-record success in input order.
    async fn update_batch(&self, records: &[CardRecord]) -> Result<Vec<bool>, StoreError>;

    async fn ensure_deck(&self, name: &str) -> Result<(), StoreError>;

    async fn ensure_templates(&self) -> Result<(), StoreError>;

    async fn delete_batch(&self, ids: &[NoteId]) -> Result<(), StoreError>;

    async fn upload_media(&self, filename: &str, bytes: &[u8]) -> Result<bool, StoreError>;
}

/// Line/column access to the document being synchronised.
///
/// Columns and offsets are byte based.
pub trait DocumentEditor {
    fn read_full_text(&self) -> Result<String, EditorError>;

    fn replace_line_range(
        &mut self,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
        new_text: &str,
    ) -> Result<(), EditorError>;

    fn get_line(&self, line: usize) -> Result<String, EditorError>;

    fn line_count(&self) -> usize;

    fn offset_to_position(&self, offset: usize) -> Result<(usize, usize), EditorError>;
}

/// Resolves media references written in a document to file contents.
pub trait MediaSource {
    fn load(&self, reference: &str) -> std::io::Result<Vec<u8>>;
}

/// Replace path separators with the store's `::` deck hierarchy separator.
pub fn canonical_deck_name(name: &str) -> String {
    name.replace(['/', '\\'], "::")
}

/// Calculate SHA256 hash of content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run one full synchronisation pass over a document.
///
/// Order: connectivity check, deletions, extraction from the re-read text,
/// note types and decks, media, create/update, identifier write-back. If the
/// store is unreachable the document is left untouched and an empty report
/// is returned. Store failures after that point only lower the counts.
pub async fn synchronize<S, E, M>(
    store: &S,
    editor: &mut E,
    media: &M,
    context: &ExtractContext,
) -> Result<SyncReport, EditorError>
where
    S: CardStore,
    E: DocumentEditor,
    M: MediaSource,
{
    let mut report = SyncReport::default();

    if let Err(e) = store.check_connection().await {
        tracing::warn!("card store unreachable, skipping {}: {}", context.source, e);
        return Ok(report);
    }

    let text = editor.read_full_text()?;
    let markers = deletion::scan_deletions(&text);
    if !markers.is_empty() {
        report.notes_deleted = apply_deletions(store, editor, &markers).await?;
    }

    let text = editor.read_full_text()?;
    let cards = extract_cards(&text, context);
    if cards.is_empty() {
        tracing::debug!("no cards in {}", context.source);
        return Ok(report);
    }

    prepare_store(store, &cards).await;
    report.media_uploaded = upload_media(store, media, &cards).await;

    let outcome = reconcile(store, &cards).await;
    report.cards_created = outcome.created;
    report.cards_updated = outcome.updated;
    report.cards_failed = outcome.failed;

    for edit in &outcome.edits {
        match apply_identifier_edit(editor, edit) {
            Ok(()) => report.identifiers_written += 1,
            Err(e) => tracing::warn!("could not write identifier {:?}: {}", edit, e),
        }
    }

    Ok(report)
}

/// Delete the marked notes, then cut the markers out of the document.
///
/// Markers stay in place when the store refuses the deletion so the next
/// pass retries it.
async fn apply_deletions<S, E>(
    store: &S,
    editor: &mut E,
    markers: &[DeletionMarker],
) -> Result<usize, EditorError>
where
    S: CardStore,
    E: DocumentEditor,
{
    let ids: Vec<NoteId> = markers.iter().map(|marker| marker.note_id).collect();
    // Delete before excising so a failed request leaves the markers to retry.
    if let Err(e) = store.delete_batch(&ids).await {
        tracing::warn!("deleting {} notes failed: {}", ids.len(), e);
        return Ok(0);
    }

    let mut ordered: Vec<&DeletionMarker> = markers.iter().collect();
    ordered.sort_by_key(|marker| std::cmp::Reverse(marker.span.start));
    for marker in ordered {
        let (start_line, start_col) = editor.offset_to_position(marker.span.start)?;
        let (end_line, end_col) = editor.offset_to_position(marker.span.end)?;
        editor.replace_line_range(start_line, start_col, end_line, end_col, "")?;
    }

    tracing::info!("deleted {} notes", ids.len());
    Ok(ids.len())
}

async fn prepare_store<S: CardStore>(store: &S, cards: &[ExtractedCard]) {
    if let Err(e) = store.ensure_templates().await {
        tracing::warn!("could not ensure note types: {}", e);
    }

    let mut decks: Vec<&str> = Vec::new();
    for card in cards {
        let deck = card.record.deck_name.as_str();
        if !decks.contains(&deck) {
            decks.push(deck);
        }
    }
    for deck in decks {
        if let Err(e) = store.ensure_deck(deck).await {
            tracing::warn!("could not ensure deck {}: {}", deck, e);
        }
    }
}

async fn upload_media<S, M>(store: &S, media: &M, cards: &[ExtractedCard]) -> usize
where
    S: CardStore,
    M: MediaSource,
{
    // The store keys media by file name, so only one reference per name
    // can be uploaded.
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let refs: Vec<&MediaRef> = cards
        .iter()
        .flat_map(|card| &card.media)
        .filter(|&media_ref| match seen.get(media_ref.filename.as_str()) {
            Some(&first) => {
                if first != media_ref.reference {
                    tracing::warn!(
                        "media {} and {} share the file name {}, uploading only the first",
                        first,
                        media_ref.reference,
                        media_ref.filename
                    );
                }
                false
            }
            None => {
                seen.insert(media_ref.filename.as_str(), media_ref.reference.as_str());
                true
            }
        })
        .collect();

    let mut uploaded = 0;
    for media_ref in refs {
        let bytes = match media.load(&media_ref.reference) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("media {} not found: {}", media_ref.reference, e);
                continue;
            }
        };
        match store.upload_media(&media_ref.filename, &bytes).await {
            Ok(true) => uploaded += 1,
            Ok(false) => tracing::warn!("store did not accept {}", media_ref.filename),
            Err(e) => tracing::warn!("uploading {} failed: {}", media_ref.filename, e),
        }
    }
    uploaded
}

fn apply_identifier_edit<E: DocumentEditor>(
    editor: &mut E,
    edit: &IdentifierEdit,
) -> Result<(), EditorError> {
    match *edit {
        IdentifierEdit::Insert { line, note_id } => {
            let marker = format!("^{}", note_id);
            let line_count = editor.line_count();
            if line < line_count {
                editor.replace_line_range(line, 0, line, 0, &format!("{}\n", marker))
            } else if line_count == 0 {
                editor.replace_line_range(0, 0, 0, 0, &marker)
            } else {
                let last = line_count - 1;
                let end = editor.get_line(last)?.len();
                editor.replace_line_range(last, end, last, end, &format!("\n{}", marker))
            }
        }
        IdentifierEdit::Replace {
            line,
            start_col,
            end_col,
            note_id,
        } => editor.replace_line_range(line, start_col, line, end_col, &format!("^{}", note_id)),
    }
}
