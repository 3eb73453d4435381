//! Rewriting cloze shorthand into the canonical `{{cN::text[::hint]}}` form.
//!
//! Recognised forms:
//!
//! | Written              | Canonical                  |
//! |----------------------|----------------------------|
//! | `{word}`, `{{word}}` | `{{c1::word}}`             |
//! | `{{{word}}}`         | `{{c2::word}}`             |
//! | `{word::hint}`       | `{{c1::word::hint}}`       |
//! | `{2:word:hint}`      | `{{c2::word::hint}}`       |
//! | `==word==`           | `{{c1::word}}`             |
//!
//! For brace runs the group is one less than the shorter of the opening and
//! closing runs, never below 1, so unbalanced runs degrade to the smaller
//! count. Text and hints never contain `{`, `}`, `:` or a newline.

use super::delimiters::SegmentKind;
use regex::Regex;
use std::sync::OnceLock;

fn canonical_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?s)\{\{c\d+::.*?\}\}").expect("valid cloze regex"))
}

fn highlight_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"==([^={}\n]+?)==").expect("valid highlight regex"))
}

/// True if `text` holds at least one canonical cloze deletion.
pub fn contains_cloze(text: &str) -> bool {
    canonical_regex().is_match(text)
}

/// Normalize cloze shorthand in one segment of text.
///
/// Plain segments accept every form. Math segments only accept the
/// explicit-number form, since LaTeX grouping braces and `==` are ordinary
/// math there. Code segments are returned unchanged.
pub fn normalize(text: &str, context: SegmentKind) -> String {
    match context {
        SegmentKind::Code => text.to_string(),
        SegmentKind::Math => rewrite_braces(text, false),
        SegmentKind::Plain => {
            let braced = rewrite_braces(text, true);
            highlight_regex()
                .replace_all(&braced, "{{c1::$1}}")
                .into_owned()
        }
    }
}

fn rewrite_braces(text: &str, allow_runs: bool) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];

        if let Some(len) = canonical_len(rest) {
            out.push_str(&rest[..len]);
            rest = &rest[len..];
            continue;
        }

        let matched = explicit_form(rest).or_else(|| {
            if allow_runs {
                brace_run_form(rest)
            } else {
                None
            }
        });

        match matched {
            Some((cloze, consumed)) => {
                out.push_str(&cloze.to_canonical());
                rest = &rest[consumed..];
            }
            None => {
                let run = count_leading(rest, '{');
                out.push_str(&rest[..run]);
                rest = &rest[run..];
            }
        }
    }
    out.push_str(rest);
    out
}

struct Cloze<'a> {
    group: usize,
    text: &'a str,
    hint: Option<&'a str>,
}

impl Cloze<'_> {
    fn to_canonical(&self) -> String {
        match self.hint {
            Some(hint) => format!("{{{{c{}::{}::{}}}}}", self.group, self.text, hint),
            None => format!("{{{{c{}::{}}}}}", self.group, self.text),
        }
    }
}

/// Byte length of an already-canonical cloze at the start of `s`.
fn canonical_len(s: &str) -> Option<usize> {
    let inner = s.strip_prefix("{{c")?;
    let digits = count_leading_digits(inner);
    if digits == 0 || !inner[digits..].starts_with("::") {
        return None;
    }
    canonical_regex()
        .find(s)
        .filter(|found| found.start() == 0)
        .map(|found| found.end())
}

/// `{N:text}` or `{N:text:hint}`.
fn explicit_form(s: &str) -> Option<(Cloze<'_>, usize)> {
    let inner = s.strip_prefix('{')?;
    let digits = count_leading_digits(inner);
    if digits == 0 {
        return None;
    }
    let group: usize = inner[..digits].parse().ok()?;
    let after = inner[digits..].strip_prefix(':')?;
    let text_len = body_len(after);
    if text_len == 0 {
        return None;
    }
    let text = &after[..text_len];
    let tail = &after[text_len..];

    let (hint, tail) = match tail.strip_prefix(':') {
        Some(hinted) => {
            let hint_len = body_len(hinted);
            if hint_len == 0 {
                return None;
            }
            (Some(&hinted[..hint_len]), &hinted[hint_len..])
        }
        None => (None, tail),
    };
    tail.strip_prefix('}')?;

    let consumed = s.len() - tail.len() + 1;
    Some((
        Cloze {
            group: group.max(1),
            text,
            hint,
        },
        consumed,
    ))
}

/// `{text}` wrapped in runs of braces, optionally `{text::hint}`.
fn brace_run_form(s: &str) -> Option<(Cloze<'_>, usize)> {
    let opening = count_leading(s, '{');
    let after = &s[opening..];
    let text_len = body_len(after);
    if text_len == 0 {
        return None;
    }
    let text = &after[..text_len];
    let tail = &after[text_len..];

    let (hint, tail) = match tail.strip_prefix("::") {
        Some(hinted) => {
            let hint_len = body_len(hinted);
            if hint_len == 0 {
                return None;
            }
            (Some(&hinted[..hint_len]), &hinted[hint_len..])
        }
        None => (None, tail),
    };

    // `{c3::x}` is a canonical cloze missing a brace, not new shorthand.
    if hint.is_some() && is_group_marker(text) {
        return None;
    }

    let closing = count_leading(tail, '}');
    if closing == 0 {
        return None;
    }

    let consumed = s.len() - tail.len() + closing;
    let group = opening.min(closing).saturating_sub(1).max(1);
    Some((Cloze { group, text, hint }, consumed))
}

/// Length of the leading run of characters allowed in cloze text or hints.
fn body_len(s: &str) -> usize {
    s.find(|c| matches!(c, '{' | '}' | ':' | '\n'))
        .unwrap_or(s.len())
}

fn count_leading(s: &str, c: char) -> usize {
    s.len() - s.trim_start_matches(c).len()
}

fn is_group_marker(text: &str) -> bool {
    text.strip_prefix('c')
        .is_some_and(|digits| !digits.is_empty() && count_leading_digits(digits) == digits.len())
}

fn count_leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}
