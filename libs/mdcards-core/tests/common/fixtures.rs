//! Test fixtures and factory functions for creating test data.

use mdcards_core::{CardContent, CardRecord, ExtractContext, NoteId};

/// Generate markdown with `num_cards` basic cards separated by blank lines.
///
/// # Arguments
/// * `num_cards` - Number of cards to generate
/// * `first_id` - Identifier of the first card, if cards should carry ids
pub fn sample_md_content(num_cards: usize, first_id: Option<NoteId>) -> String {
    (0..num_cards)
        .map(|i| match first_id {
            Some(first) => format!("Question {}::Answer {}\n^{}\n", i + 1, i + 1, first + i as NoteId),
            None => format!("Question {}::Answer {}\n", i + 1, i + 1),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Context used by most sync tests.
pub fn context() -> ExtractContext {
    ExtractContext::new("Default", "notes/test.md")
}

/// A basic record as the store would hold it.
pub fn basic_record(front: &str, back: &str) -> CardRecord {
    CardRecord {
        id: None,
        deck_name: "Default".to_string(),
        content: CardContent::Basic {
            front: front.to_string(),
            back: back.to_string(),
        },
        source: "notes/test.md".to_string(),
        tags: Vec::new(),
    }
}
