//! Tag extraction from card text and section headers.
//!
//! Tags come from `#hashtags` and `[[wiki links]]` (image embeds `![[..]]`
//! excluded). Both are only recognised in plain text, never inside code or
//! math spans.

use crate::markup::delimiters::{self, SegmentKind};
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn hashtag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(^|\s)#([\p{L}\p{N}_][\p{L}\p{N}_/-]*)").expect("valid hashtag regex")
    })
}

fn wiki_link_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"!?\[\[([^\[\]\n]+)\]\]").expect("valid wiki link regex"))
}

fn header_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^(#{1,6})[ \t]+(.*)$").expect("valid header regex"))
}

/// Text with markers removed, plus the tags they named.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stripped {
    pub text: String,
    pub tags: Vec<String>,
}

/// Replace `[[target|alias]]` with its display text and collect targets.
pub fn strip_wiki_links(text: &str) -> Stripped {
    let mut tags = Vec::new();
    let text = map_plain(text, |plain| {
        wiki_link_regex()
            .replace_all(plain, |caps: &Captures| {
                let whole = &caps[0];
                if whole.starts_with('!') {
                    return whole.to_string();
                }
                let inner = &caps[1];
                let (target, display) = match inner.split_once('|') {
                    Some((target, alias)) => (target, alias),
                    None => (inner, inner),
                };
                if let Some(tag) = link_tag(target) {
                    push_unique(&mut tags, tag);
                }
                display.trim().to_string()
            })
            .into_owned()
    });
    Stripped { text, tags }
}

/// Remove `#hashtags` and collect them.
pub fn strip_hashtags(text: &str) -> Stripped {
    let mut tags = Vec::new();
    let text = map_plain(text, |plain| {
        hashtag_regex()
            .replace_all(plain, |caps: &Captures| {
                push_unique(&mut tags, caps[2].to_string());
                caps[1].to_string()
            })
            .into_owned()
    });
    Stripped { text, tags }
}

/// Tags named in a piece of text without altering it.
pub fn tags_in(text: &str) -> Vec<String> {
    let mut tags = strip_wiki_links(text).tags;
    for tag in strip_hashtags(text).tags {
        push_unique(&mut tags, tag);
    }
    tags
}

fn link_tag(target: &str) -> Option<String> {
    let target = target.split('#').next().unwrap_or(target).trim();
    if target.is_empty() {
        None
    } else {
        Some(target.split_whitespace().collect::<Vec<_>>().join("_"))
    }
}

/// Apply `f` to plain segments only, copying code and math verbatim.
fn map_plain(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in delimiters::segments(text) {
        let raw = segment.text(text);
        match segment.kind {
            SegmentKind::Plain => out.push_str(&f(raw)),
            SegmentKind::Code | SegmentKind::Math => out.push_str(raw),
        }
    }
    out
}

/// Append `tag` unless it is already present.
pub fn push_unique(tags: &mut Vec<String>, tag: String) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}

/// An ATX section header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub line: usize,
    pub level: usize,
    pub text: String,
}

/// All headers of a document, ignoring `#` lines inside fenced code.
pub fn collect_headers(text: &str) -> Vec<Header> {
    let mut headers = Vec::new();
    let mut in_code = false;
    for (line_idx, line) in text.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
            continue;
        }
        if in_code {
            continue;
        }
        if let Some(caps) = header_regex().captures(line) {
            headers.push(Header {
                line: line_idx,
                level: caps[1].len(),
                text: caps[2].trim().to_string(),
            });
        }
    }
    headers
}

/// Tags inherited by content starting at `line`.
///
/// Walks back from `line`, keeping the nearest header of each strictly
/// smaller level: a deeper header is shadowed by a shallower one between it
/// and the content, but never the other way around.
pub fn inherited_tags(headers: &[Header], line: usize) -> Vec<String> {
    let mut chain = Vec::new();
    let mut ceiling = usize::MAX;
    for header in headers.iter().rev().filter(|header| header.line < line) {
        if header.level < ceiling {
            ceiling = header.level;
            chain.push(header);
            if ceiling == 1 {
                break;
            }
        }
    }

    let mut tags = Vec::new();
    for header in chain.into_iter().rev() {
        for tag in tags_in(&header.text) {
            push_unique(&mut tags, tag);
        }
    }
    tags
}
