//! Card builder: turns segmented blocks into card records.
//!
//! # Format
//! ```markdown
//! ---
//! deck: Rust
//! ---
//! # Ownership #memory
//!
//! Who frees a value?::Its owner, when it goes out of scope
//! ^1712345678901
//!
//! {{Borrowing}} lends access without moving ownership.
//!
//! Stack:::Heap
//! ```
//!
//! The first block is a Basic card tagged `memory` that is already linked to
//! note `1712345678901`; the second is a Cloze card, the third a Reversed one.

use crate::frontmatter;
use crate::markup::{self, SegmentKind};
use crate::segmenter;
use crate::tags::{self, push_unique, Header};
use crate::types::{
    CardBlock, CardContent, CardRecord, ExtractedCard, IdentifierLocation, LineSpan, MediaRef,
    NoteId,
};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Caller-supplied defaults for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractContext {
    /// Deck used unless the front matter names one.
    pub deck: String,
    /// Tags added to every card.
    pub tags: Vec<String>,
    /// Backlink written into each card's `Source` field.
    pub source: String,
}

impl ExtractContext {
    pub fn new(deck: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            deck: deck.into(),
            tags: Vec::new(),
            source: source.into(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        for tag in tags {
            push_unique(&mut self.tags, tag);
        }
        self
    }
}

fn identifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?:^|\s)\^(\d+)(?:\s|$)").expect("valid identifier regex"))
}

/// Extract every card in `text`.
///
/// Blocks that are not cards are skipped; this never fails.
pub fn extract_cards(text: &str, context: &ExtractContext) -> Vec<ExtractedCard> {
    let settings = frontmatter::read_settings(text);
    let deck = settings.deck.unwrap_or_else(|| context.deck.clone());
    let mut document_tags = context.tags.clone();
    for tag in settings.tags {
        push_unique(&mut document_tags, tag);
    }

    let body_start = frontmatter::body_start_line(text);
    let headers: Vec<Header> = tags::collect_headers(text)
        .into_iter()
        .filter(|header| header.line >= body_start)
        .collect();

    let blocks = segmenter::segment_blocks(text);
    let block_count = blocks.len();
    let cards: Vec<ExtractedCard> = blocks
        .iter()
        .filter_map(|block| {
            let mut card_tags = document_tags.clone();
            for tag in tags::inherited_tags(&headers, block.start_line) {
                push_unique(&mut card_tags, tag);
            }
            build_card(block, &deck, card_tags, &context.source)
        })
        .collect();

    tracing::debug!(
        "extracted {} cards from {} candidate blocks",
        cards.len(),
        block_count
    );
    cards
}

/// Build a card from a single block, or `None` if it is not a card.
pub fn build_card(
    block: &CardBlock,
    deck: &str,
    mut tags: Vec<String>,
    source: &str,
) -> Option<ExtractedCard> {
    let (body, identifier) = take_identifier(block);

    let linked = tags::strip_wiki_links(&body);
    let stripped = tags::strip_hashtags(&linked.text);
    for tag in linked.tags.into_iter().chain(stripped.tags) {
        push_unique(&mut tags, tag);
    }

    let split = markup::split_fields(&stripped.text);
    let mut media: Vec<MediaRef> = Vec::new();
    let mut fields: Vec<String> = Vec::with_capacity(split.fields.len());
    for field in &split.fields {
        let formatted = markup::format_field(field);
        for media_ref in formatted.media {
            if !media.contains(&media_ref) {
                media.push(media_ref);
            }
        }
        fields.push(formatted.html);
    }

    let is_cloze = fields.first().is_some_and(|first| markup::contains_cloze(first));
    let (first, rest) = collapse_fields(fields);
    let content = if is_cloze {
        CardContent::Cloze {
            text: first,
            back_extra: rest,
        }
    } else if !split.has_separator() || first.is_empty() {
        tracing::trace!(
            "lines {}..={} hold no cloze or separator",
            block.start_line,
            block.end_line
        );
        return None;
    } else if split.reversed {
        CardContent::Reversed {
            front: first,
            back: rest,
        }
    } else {
        CardContent::Basic {
            front: first,
            back: rest,
        }
    };

    Some(ExtractedCard {
        record: CardRecord {
            id: identifier.map(|location| location.note_id),
            deck_name: deck.to_string(),
            content,
            source: source.to_string(),
            tags,
        },
        span: LineSpan {
            start: block.start_line,
            end: block.end_line,
        },
        identifier,
        media,
    })
}

/// First field, and every later field joined with `<br>`.
fn collapse_fields(fields: Vec<String>) -> (String, String) {
    let mut fields = fields.into_iter();
    let first = fields.next().unwrap_or_default();
    let rest = fields.collect::<Vec<_>>().join("<br>");
    (first, rest)
}

/// Remove the block's identifier marker from its body.
///
/// A line holding nothing but `^<digits>` wins, the last one if there are
/// several. Otherwise the last inline `^<digits>` token in plain text is
/// used.
fn take_identifier(block: &CardBlock) -> (String, Option<IdentifierLocation>) {
    let body = &block.body;
    let segments = markup::segments(body);
    let in_plain = |offset: usize| {
        segments
            .iter()
            .any(|segment| segment.kind == SegmentKind::Plain && segment.range.contains(&offset))
    };

    let candidates: Vec<(Range<usize>, NoteId)> = identifier_regex()
        .captures_iter(body)
        .filter_map(|caps| {
            let digits = caps.get(1)?;
            let caret = digits.start() - 1;
            if !in_plain(caret) {
                return None;
            }
            let note_id = digits.as_str().parse::<NoteId>().ok().filter(|id| *id > 0)?;
            Some((caret..digits.end(), note_id))
        })
        .collect();

    let chosen = candidates
        .iter()
        .rev()
        .find(|(token, _)| is_standalone(body, token))
        .or_else(|| candidates.last());
    let Some((token, note_id)) = chosen.cloned() else {
        return (body.clone(), None);
    };

    let line_start = body[..token.start].rfind('\n').map_or(0, |idx| idx + 1);
    let location = IdentifierLocation {
        line: block.start_line + body[..token.start].matches('\n').count(),
        start_col: token.start - line_start,
        end_col: token.end - line_start,
        note_id,
    };
    let mut stripped = body.clone();
    stripped.replace_range(token, "");
    (stripped, Some(location))
}

/// Whether `token` is the only non-blank text on its line.
fn is_standalone(body: &str, token: &Range<usize>) -> bool {
    let line_start = body[..token.start].rfind('\n').map_or(0, |idx| idx + 1);
    let line_end = body[token.end..]
        .find('\n')
        .map_or(body.len(), |idx| token.end + idx);
    body[line_start..token.start].trim().is_empty() && body[token.end..line_end].trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CardKind;
    use pretty_assertions::assert_eq;

    fn context() -> ExtractContext {
        ExtractContext::new("Default", "notes/rust.md")
    }

    fn extract(text: &str) -> Vec<ExtractedCard> {
        extract_cards(text, &context())
    }

    #[test]
    fn basic_card_with_hashtag() {
        let cards = extract("What is Rust::A language #rust");
        assert_eq!(cards.len(), 1);
        let record = &cards[0].record;
        assert_eq!(record.kind(), CardKind::Basic);
        assert_eq!(record.field("Front"), Some("What is Rust"));
        assert_eq!(record.field("Back"), Some("A language"));
        assert_eq!(record.field("Source"), Some("notes/rust.md"));
        assert_eq!(record.tags, vec!["rust"]);
        assert_eq!(record.deck_name, "Default");
        assert_eq!(record.id, None);
    }

    #[test]
    fn reversed_card() {
        let cards = extract("Stack:::Heap");
        assert_eq!(cards[0].record.kind(), CardKind::Reversed);
    }

    #[test]
    fn cloze_card() {
        let cards = extract("{Paris} is the capital of France");
        assert_eq!(
            cards[0].record.content,
            CardContent::Cloze {
                text: "{{c1::Paris}} is the capital of France".to_string(),
                back_extra: String::new(),
            }
        );
    }

    #[test]
    fn cloze_with_back_extra() {
        let cards = extract("==Paris== is a capital::Since 987");
        assert_eq!(
            cards[0].record.content,
            CardContent::Cloze {
                text: "{{c1::Paris}} is a capital".to_string(),
                back_extra: "Since 987".to_string(),
            }
        );
    }

    #[test]
    fn block_without_cloze_or_separator_is_dropped() {
        assert!(extract("let set = {").is_empty());
        assert!(extract("::only a back").is_empty());
    }

    #[test]
    fn trailing_identifier_line() {
        let cards = extract("Q::A\n^42\n\nnext");
        let card = &cards[0];
        assert_eq!(card.record.id, Some(42));
        assert_eq!(card.record.field("Back"), Some("A"));
        assert_eq!(card.span, LineSpan { start: 0, end: 1 });
        assert_eq!(
            card.identifier,
            Some(IdentifierLocation {
                line: 1,
                start_col: 0,
                end_col: 3,
                note_id: 42,
            })
        );
    }

    #[test]
    fn inline_identifier() {
        let cards = extract("Q::A ^42");
        let location = cards[0].identifier.unwrap();
        assert_eq!((location.line, location.start_col, location.end_col), (0, 5, 8));
        assert_eq!(cards[0].record.field("Back"), Some("A"));
    }

    #[test]
    fn identifier_line_wins_over_inline_caret() {
        let cards = extract("Raise x to ^3 now::cubed\n^1000");
        let card = &cards[0];
        assert_eq!(card.record.id, Some(1000));
        assert_eq!(card.record.field("Front"), Some("Raise x to ^3 now"));
        assert_eq!(card.record.field("Back"), Some("cubed"));
        assert_eq!(card.identifier.map(|location| location.line), Some(1));
    }

    #[test]
    fn last_inline_identifier_is_used() {
        let cards = extract("x ^2 y::z ^7");
        assert_eq!(cards[0].record.id, Some(7));
        assert_eq!(cards[0].record.field("Front"), Some("x ^2 y"));
    }

    #[test]
    fn indented_fence_keeps_highlights() {
        let cards = extract("Snippet::\n- example:\n  ```\n  ==x==\n  ```");
        assert_eq!(cards[0].record.kind(), CardKind::Basic);
        let back = cards[0].record.field("Back").unwrap_or_default();
        assert!(back.contains("<pre><code>  ==x==</code></pre>"));
        assert!(!back.contains("{{c1::"));
    }

    #[test]
    fn caret_in_code_is_not_an_identifier() {
        let cards = extract("Power::`x ^2 `");
        assert_eq!(cards[0].identifier, None);
    }

    #[test]
    fn extra_fields_join_into_back() {
        let cards = extract("a::b::c");
        assert_eq!(cards[0].record.field("Back"), Some("b<br>c"));
    }

    #[test]
    fn wiki_links_become_tags() {
        let cards = extract("[[Ownership]] means::one [[Value owner|owner]]");
        let record = &cards[0].record;
        assert_eq!(record.field("Front"), Some("Ownership means"));
        assert_eq!(record.field("Back"), Some("one owner"));
        assert_eq!(record.tags, vec!["Ownership", "Value_owner"]);
    }

    #[test]
    fn tags_merge_in_order() {
        let text = "---\ndeck: Langs\ntags: [fm]\n---\n# Rust #lang\n\nQ::A #card #lang";
        let context = context().with_tags(vec!["global".to_string()]);
        let cards = extract_cards(text, &context);
        let record = &cards[0].record;
        assert_eq!(record.deck_name, "Langs");
        assert_eq!(record.tags, vec!["global", "fm", "lang", "card"]);
    }

    #[test]
    fn media_is_collected_across_fields() {
        let cards = extract("![[img/a.png]]::![b](img/a.png) ![[c.jpg]]");
        let names: Vec<_> = cards[0].media.iter().map(|m| m.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.jpg"]);
    }

    #[test]
    fn spans_follow_document_lines() {
        let text = "# Title\n\nOne::1\n\nTwo\n::2\n^7";
        let spans: Vec<_> = extract(text).iter().map(|card| card.span).collect();
        assert_eq!(
            spans,
            vec![LineSpan { start: 2, end: 2 }, LineSpan { start: 4, end: 6 }]
        );
    }
}
