//! Partitioning text into plain, code and math segments.
//!
//! Code spans are fenced blocks (a line starting with ```` ``` ````, after
//! optional spaces or tabs, up to the next ```` ``` ````) and single-backtick inline spans. Math spans are `$$`
//! blocks and single-`$` inline spans. Overlaps are resolved first-wins: the
//! earlier-starting span is kept and any span starting inside it is dropped,
//! so code inside math (or math inside code) is never recognised.
//!
//! Offsets are byte offsets. Every delimiter is ASCII, so all boundaries are
//! valid `str` slice points.

use std::ops::Range;

/// What a segment contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Plain,
    Code,
    Math,
}

/// A half-open byte range of the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub range: Range<usize>,
}

impl Segment {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }
}

/// Ranges of fenced and inline code.
pub fn code_spans(text: &str) -> Vec<Range<usize>> {
    delimited_spans(text, b'`', true)
}

/// Ranges of `$$` block math and `$` inline math.
pub fn math_spans(text: &str) -> Vec<Range<usize>> {
    delimited_spans(text, b'$', false)
}

/// Split `text` into an ordered, gap-free partition of segments.
///
/// Concatenating the segments' text reproduces the input exactly.
pub fn segments(text: &str) -> Vec<Segment> {
    let mut special: Vec<Segment> = code_spans(text)
        .into_iter()
        .map(|range| Segment {
            kind: SegmentKind::Code,
            range,
        })
        .chain(math_spans(text).into_iter().map(|range| Segment {
            kind: SegmentKind::Math,
            range,
        }))
        .collect();
    special.sort_by_key(|segment| segment.range.start);

    let mut result = Vec::with_capacity(special.len() * 2 + 1);
    let mut cursor = 0;
    for segment in special {
        if segment.range.start < cursor {
            // Starts inside an earlier span.
            continue;
        }
        if segment.range.start > cursor {
            result.push(Segment {
                kind: SegmentKind::Plain,
                range: cursor..segment.range.start,
            });
        }
        cursor = segment.range.end;
        result.push(segment);
    }
    if cursor < text.len() {
        result.push(Segment {
            kind: SegmentKind::Plain,
            range: cursor..text.len(),
        });
    }
    result
}

fn delimited_spans(text: &str, marker: u8, block_needs_line_start: bool) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let block_len = if marker == b'`' { 3 } else { 2 };
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != marker || is_escaped(bytes, i) {
            i += 1;
            continue;
        }

        let run = run_length(bytes, i, marker);
        let at_line_start = only_indent_before(bytes, i);

        if run >= block_len {
            if !block_needs_line_start || at_line_start {
                let opener = [marker].repeat(block_len);
                if let Some(close) = find(bytes, i + block_len, &opener) {
                    let end = close + block_len;
                    spans.push(i..end);
                    i = end;
                    continue;
                }
            }
            i += run;
            continue;
        }

        if run == 1 {
            if let Some(end) = inline_close(bytes, i + 1, marker) {
                spans.push(i..end + 1);
                i = end + 1;
                continue;
            }
        }
        // A doubled delimiter that is not a block opener, or an unclosed one.
        i += run;
    }
    spans
}

/// Position of the single closing `marker` for an inline span opened just
/// before `from`. The content must be non-empty and on one line.
fn inline_close(bytes: &[u8], from: usize, marker: u8) -> Option<usize> {
    if from >= bytes.len() || bytes[from] == marker || bytes[from] == b'\n' {
        return None;
    }
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'\n' => return None,
            b if b == marker && !is_escaped(bytes, j) => {
                if bytes.get(j + 1) == Some(&marker) {
                    return None;
                }
                return Some(j);
            }
            _ => j += 1,
        }
    }
    None
}

/// True when `index` is preceded on its line by nothing but spaces or tabs.
fn only_indent_before(bytes: &[u8], index: usize) -> bool {
    let mut k = index;
    while k > 0 && matches!(bytes[k - 1], b' ' | b'\t') {
        k -= 1;
    }
    k == 0 || bytes[k - 1] == b'\n'
}

fn run_length(bytes: &[u8], start: usize, marker: u8) -> usize {
    bytes[start..].iter().take_while(|&&b| b == marker).count()
}

fn is_escaped(bytes: &[u8], index: usize) -> bool {
    index > 0 && bytes[index - 1] == b'\\'
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}
