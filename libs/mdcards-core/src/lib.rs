//! Core library for turning markdown notes into flashcards.
//!
//! Provides:
//! - Block segmentation and card building for markdown documents
//! - Cloze normalization, field splitting and inline HTML formatting
//! - Front matter, header and inline tag handling
//! - `delete ^<id>` marker scanning
//! - Reconciliation of extracted cards against a card store, with
//!   identifier write-back into the document

pub mod builder;
pub mod deletion;
pub mod error;
pub mod frontmatter;
pub mod markup;
pub mod segmenter;
pub mod sync;
pub mod tags;
pub mod types;

pub use builder::{build_card, extract_cards, ExtractContext};
pub use deletion::{remove_markers, scan_deletions};
pub use error::{EditorError, FrontmatterError, StoreError};
pub use frontmatter::{parse_settings, read_settings, DocumentSettings};
pub use segmenter::segment_blocks;
pub use sync::{
    canonical_deck_name, hash_content, plan_identifier_edits, reconcile, synchronize, CardStore,
    DocumentEditor, IdentifierEdit, MediaSource, TextDocument,
};
pub use types::{
    CardBlock, CardContent, CardKind, CardRecord, DeletionMarker, ExtractedCard,
    IdentifierLocation, LineSpan, MediaRef, NoteId, SyncReport, SOURCE_FIELD,
};
