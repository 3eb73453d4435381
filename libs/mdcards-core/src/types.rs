//! Core types for card extraction and synchronisation.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::ops::Range;

/// Identifier assigned to a note by the card store.
pub type NoteId = i64;

/// Name of the backlink field appended to every card.
pub const SOURCE_FIELD: &str = "Source";

/// Contiguous line range of a document that may hold one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardBlock {
    pub body: String,
    /// 0-based index of the first line.
    pub start_line: usize,
    /// 0-based index of the last line (inclusive).
    pub end_line: usize,
}

/// Card template selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    Basic,
    Cloze,
    Reversed,
}

impl CardKind {
    /// Field names in template order, without the trailing `Source` field.
    pub fn field_names(self) -> [&'static str; 2] {
        match self {
            Self::Cloze => ["Text", "Back Extra"],
            Self::Basic | Self::Reversed => ["Front", "Back"],
        }
    }

    /// Note type name used in the card store.
    pub fn template_name(self) -> &'static str {
        match self {
            Self::Basic => "mdcards Basic",
            Self::Reversed => "mdcards Basic (and reversed card)",
            Self::Cloze => "mdcards Cloze",
        }
    }

    pub fn all() -> [CardKind; 3] {
        [Self::Basic, Self::Reversed, Self::Cloze]
    }
}

/// Card content; the field set is fixed by the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardContent {
    Basic { front: String, back: String },
    Reversed { front: String, back: String },
    Cloze { text: String, back_extra: String },
}

impl CardContent {
    pub fn kind(&self) -> CardKind {
        match self {
            Self::Basic { .. } => CardKind::Basic,
            Self::Reversed { .. } => CardKind::Reversed,
            Self::Cloze { .. } => CardKind::Cloze,
        }
    }

    fn values(&self) -> [&str; 2] {
        match self {
            Self::Basic { front, back } | Self::Reversed { front, back } => [front, back],
            Self::Cloze { text, back_extra } => [text, back_extra],
        }
    }
}

/// A normalized card ready to be sent to the card store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    pub id: Option<NoteId>,
    pub deck_name: String,
    pub content: CardContent,
    /// Backlink written into the `Source` field.
    pub source: String,
    pub tags: Vec<String>,
}

impl CardRecord {
    pub fn kind(&self) -> CardKind {
        self.content.kind()
    }

    /// Named fields in template order, `Source` last.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let names = self.kind().field_names();
        let values = self.content.values();
        vec![
            (names[0], values[0]),
            (names[1], values[1]),
            (SOURCE_FIELD, self.source.as_str()),
        ]
    }

    /// Look up a field value by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields()
            .into_iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }
}

struct FieldMap<'a>(&'a CardRecord);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.0.fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (name, value) in fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for CardRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CardRecord", 5)?;
        if let Some(id) = self.id {
            state.serialize_field("id", &id)?;
        } else {
            state.skip_field("id")?;
        }
        state.serialize_field("deckName", &self.deck_name)?;
        state.serialize_field("type", &self.kind())?;
        state.serialize_field("fields", &FieldMap(self))?;
        state.serialize_field("tags", &self.tags)?;
        state.end()
    }
}

/// Inclusive 0-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

/// Where an embedded `^<digits>` identifier sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentifierLocation {
    pub line: usize,
    /// Byte column of the `^`.
    pub start_col: usize,
    /// Byte column just past the last digit.
    pub end_col: usize,
    pub note_id: NoteId,
}

/// Local file referenced from a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MediaRef {
    /// Path exactly as written in the document.
    pub reference: String,
    /// File name the store should hold it under.
    pub filename: String,
}

/// A card record together with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedCard {
    pub record: CardRecord,
    pub span: LineSpan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<IdentifierLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
}

/// `delete ^<id>` marker found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionMarker {
    pub note_id: NoteId,
    /// Byte offsets of the marker line, trailing newline included.
    pub span: Range<usize>,
}

/// Counts reported by one synchronisation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub cards_created: usize,
    pub cards_updated: usize,
    pub cards_failed: usize,
    pub notes_deleted: usize,
    pub media_uploaded: usize,
    pub identifiers_written: usize,
}

impl SyncReport {
    /// Add another pass's counts to these.
    pub fn merge(&mut self, other: &SyncReport) {
        self.cards_created += other.cards_created;
        self.cards_updated += other.cards_updated;
        self.cards_failed += other.cards_failed;
        self.notes_deleted += other.notes_deleted;
        self.media_uploaded += other.media_uploaded;
        self.identifiers_written += other.identifiers_written;
    }
}
