//! Grouping document lines into candidate card blocks.
//!
//! A block keeps growing while the current line ends with `:`, a fenced code
//! or `$$` math block is open, or the next line continues it (a `::`
//! separator line, a `^<id>` line, or a list item). Blocks whose text holds
//! none of `{`, `}`, `==` or `::` cannot be cards and are dropped here.

use crate::frontmatter;
use crate::types::CardBlock;

/// Split `text` into candidate card blocks, skipping any front matter.
pub fn segment_blocks(text: &str) -> Vec<CardBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let mut segmenter = Segmenter::new();

    for idx in frontmatter::body_start_line(text)..lines.len() {
        segmenter.process_line(idx, lines[idx], lines.get(idx + 1).copied());
    }

    segmenter.finalize()
}

struct Segmenter<'a> {
    buffer: Vec<&'a str>,
    start_line: usize,
    in_code: bool,
    in_math: bool,
    blocks: Vec<CardBlock>,
}

impl<'a> Segmenter<'a> {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            start_line: 0,
            in_code: false,
            in_math: false,
            blocks: Vec::new(),
        }
    }

    fn process_line(&mut self, idx: usize, line: &'a str, next: Option<&str>) {
        let trimmed = line.trim();
        if self.buffer.is_empty() {
            if trimmed.is_empty() {
                return;
            }
            self.start_line = idx;
        }

        self.toggle_fences(trimmed);
        self.buffer.push(line);

        let extends = trimmed.ends_with(':')
            || self.in_code
            || self.in_math
            || next.is_some_and(is_continuation);

        if !extends {
            self.close(idx);
        }
    }

    fn toggle_fences(&mut self, trimmed: &str) {
        if !self.in_math && trimmed.starts_with("```") {
            self.in_code = !self.in_code;
        } else if !self.in_code && trimmed.matches("$$").count() % 2 == 1 {
            self.in_math = !self.in_math;
        }
    }

    fn close(&mut self, end_line: usize) {
        let body = self.buffer.join("\n");
        self.buffer.clear();

        if may_hold_card(&body) {
            self.blocks.push(CardBlock {
                body,
                start_line: self.start_line,
                end_line,
            });
        } else {
            tracing::trace!(
                "skipping lines {}..={}: no card delimiters",
                self.start_line,
                end_line
            );
        }
    }

    fn finalize(mut self) -> Vec<CardBlock> {
        if !self.buffer.is_empty() {
            let end_line = self.start_line + self.buffer.len() - 1;
            self.close(end_line);
        }
        self.blocks
    }
}

fn may_hold_card(body: &str) -> bool {
    body.contains('{') || body.contains('}') || body.contains("==") || body.contains("::")
}

/// Whether `line` continues the block above it.
fn is_continuation(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("::")
        || trimmed.starts_with('^')
        || is_bullet(trimmed)
        || is_numbered(trimmed)
}

fn is_bullet(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    matches!(chars.next(), Some('-' | '*' | '+'))
        && matches!(chars.next(), None | Some(' ' | '\t'))
}

fn is_numbered(trimmed: &str) -> bool {
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let rest = &trimmed[digits..];
    let mut chars = rest.chars();
    matches!(chars.next(), Some('.' | ')')) && matches!(chars.next(), None | Some(' ' | '\t'))
}
