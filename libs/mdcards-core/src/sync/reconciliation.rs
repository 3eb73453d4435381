//! Reconciling extracted cards with the card store.

use super::CardStore;
use crate::types::{CardRecord, ExtractedCard, IdentifierLocation, LineSpan, NoteId};
use std::collections::HashSet;

/// An identifier write-back, in final document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierEdit {
    /// Insert a new `^<id>` line so that it becomes line `line`.
    Insert { line: usize, note_id: NoteId },
    /// Overwrite an existing `^<id>` token in place.
    Replace {
        line: usize,
        start_col: usize,
        end_col: usize,
        note_id: NoteId,
    },
}

/// A note id the store assigned to a card block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub span: LineSpan,
    /// The identifier the block already carried, if any.
    pub existing: Option<IdentifierLocation>,
    pub note_id: NoteId,
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub edits: Vec<IdentifierEdit>,
}

/// Turn id assignments into document edits.
///
/// Edits come out in ascending line order. Every inserted line shifts the
/// blocks below it down by one, so an insertion target is the block's end
/// line plus one plus the number of lines inserted above it. Blocks ending
/// at lines 2, 5 and 9 get their identifiers at lines 3, 7 and 12.
pub fn plan_identifier_edits(assignments: &[Assignment]) -> Vec<IdentifierEdit> {
    let mut ordered: Vec<&Assignment> = assignments.iter().collect();
    ordered.sort_by_key(|assignment| assignment.span.end);

    let mut inserted = 0;
    ordered
        .into_iter()
        .map(|assignment| match assignment.existing {
            Some(location) => IdentifierEdit::Replace {
                line: location.line + inserted,
                start_col: location.start_col,
                end_col: location.end_col,
                note_id: assignment.note_id,
            },
            None => {
                let line = assignment.span.end + 1 + inserted;
                inserted += 1;
                IdentifierEdit::Insert {
                    line,
                    note_id: assignment.note_id,
                }
            }
        })
        .collect()
}

/// Create or update every card in one pass.
///
/// Cards without an id, or whose id the store no longer knows, are created;
/// the rest are updated. Store failures are logged and counted, never
/// returned: a partially failed create still yields edits for the cards that
/// did get an id. If the existence lookup itself fails nothing is sent.
pub async fn reconcile<S: CardStore>(store: &S, cards: &[ExtractedCard]) -> Reconciliation {
    let mut result = Reconciliation::default();
    if cards.is_empty() {
        return result;
    }

    let known_ids: Vec<NoteId> = cards.iter().filter_map(|card| card.record.id).collect();
    let existing: HashSet<NoteId> = if known_ids.is_empty() {
        HashSet::new()
    } else {
        match store.find_existing(&known_ids).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("note lookup failed, skipping {} cards: {}", cards.len(), e);
                result.failed = cards.len();
                return result;
            }
        }
    };

    let (to_update, to_create): (Vec<&ExtractedCard>, Vec<&ExtractedCard>) = cards
        .iter()
        .partition(|card| card.record.id.is_some_and(|id| existing.contains(&id)));

    for card in &to_create {
        if let Some(stale) = card.record.id {
            tracing::debug!("note {} no longer exists, recreating", stale);
        }
    }

    let mut assignments = Vec::new();
    if !to_create.is_empty() {
        let records: Vec<CardRecord> = to_create
            .iter()
            .map(|card| CardRecord {
                id: None,
                ..card.record.clone()
            })
            .collect();
        match store.create_batch(&records).await {
            Ok(ids) => {
                for (idx, card) in to_create.iter().enumerate() {
                    match ids.get(idx).copied().flatten() {
                        Some(note_id) => {
                            result.created += 1;
                            assignments.push(Assignment {
                                span: card.span,
                                existing: card.identifier,
                                note_id,
                            });
                        }
                        None => result.failed += 1,
                    }
                }
            }
            Err(e) => {
                tracing::warn!("creating {} notes failed: {}", records.len(), e);
                result.failed += records.len();
            }
        }
    }

    if !to_update.is_empty() {
        let records: Vec<CardRecord> = to_update.iter().map(|card| card.record.clone()).collect();
        match store.update_batch(&records).await {
            Ok(outcomes) => {
                for idx in 0..records.len() {
                    if outcomes.get(idx).copied().unwrap_or(false) {
                        result.updated += 1;
                    } else {
                        result.failed += 1;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("updating {} notes failed: {}", records.len(), e);
                result.failed += records.len();
            }
        }
    }

    result.edits = plan_identifier_edits(&assignments);
    tracing::info!(
        "{} created, {} updated, {} failed",
        result.created,
        result.updated,
        result.failed
    );
    result
}
