//! `delete ^<id>` markers.
//!
//! A line holding only `delete ^<id>` (any case) asks for note `<id>` to be
//! removed from the store. The line is skipped when the line above ends with
//! `::`, since it is then the back of a card, and inside fenced code.

use crate::types::{DeletionMarker, NoteId};
use regex::Regex;
use std::sync::OnceLock;

fn marker_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^\s*delete\s+\^(\d+)\s*$").expect("valid delete regex"))
}

/// Find every deletion marker in `text`, in document order.
pub fn scan_deletions(text: &str) -> Vec<DeletionMarker> {
    let mut markers = Vec::new();
    let mut offset = 0;
    let mut previous: Option<&str> = None;
    let mut in_code = false;

    for raw in text.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        let start = offset;
        offset += raw.len();

        if line.trim_start().starts_with("```") {
            in_code = !in_code;
        } else if !in_code && !previous.is_some_and(ends_card_front) {
            if let Some(note_id) = marker_regex()
                .captures(line)
                .and_then(|caps| caps[1].parse::<NoteId>().ok())
            {
                markers.push(DeletionMarker {
                    note_id,
                    span: start..offset,
                });
            }
        }
        previous = Some(line);
    }

    markers
}

fn ends_card_front(line: &str) -> bool {
    line.trim_end().ends_with("::")
}

/// Cut every marker out of `text`, last first so earlier spans stay valid.
pub fn remove_markers(text: &str, markers: &[DeletionMarker]) -> String {
    let mut spans: Vec<_> = markers.iter().map(|marker| marker.span.clone()).collect();
    spans.sort_by_key(|span| std::cmp::Reverse(span.start));

    let mut result = text.to_string();
    for span in spans {
        if span.end <= result.len() {
            result.replace_range(span, "");
        }
    }
    result
}
