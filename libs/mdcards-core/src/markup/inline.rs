//! Converting one field of lightweight markup into card HTML.

use super::cloze;
use super::delimiters::{self, SegmentKind};
use crate::types::MediaRef;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// HTML for one field plus the local files it embeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatted {
    pub html: String,
    pub media: Vec<MediaRef>,
}

fn bold_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\*\*([^*\n]+?)\*\*|__([^_\n]+?)__").expect("valid bold regex")
    })
}

fn italic_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\*([^*\n]+?)\*|\b_([^_\n]+?)_\b").expect("valid italic regex")
    })
}

fn strike_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"~~([^~\n]+?)~~").expect("valid strikethrough regex"))
}

fn image_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"!\[\[([^\]|\n]+)(?:\|[^\]\n]*)?\]\]|!\[([^\]\n]*)\]\(([^)\s]+)\)")
            .expect("valid image regex")
    })
}

fn link_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").expect("valid link regex"))
}

/// Format a single field.
///
/// Plain segments get cloze normalization, image and link rewriting, then
/// bold, italic and strikethrough in that order. Code and math segments
/// lose their delimiters and are wrapped without any emphasis handling.
/// Newlines become `<br>` only once every segment is rendered, so fenced
/// blocks are detected on the original line structure.
pub fn format_field(text: &str) -> Formatted {
    let mut html = String::with_capacity(text.len() + 32);
    let mut media = Vec::new();

    for segment in delimiters::segments(text) {
        let raw = segment.text(text);
        match segment.kind {
            SegmentKind::Plain => html.push_str(&format_plain(raw, &mut media)),
            SegmentKind::Code => html.push_str(&format_code(raw)),
            SegmentKind::Math => html.push_str(&format_math(raw)),
        }
    }

    Formatted {
        html: html.replace("\r\n", "\n").replace('\n', "<br>"),
        media,
    }
}

fn format_plain(text: &str, media: &mut Vec<MediaRef>) -> String {
    let text = cloze::normalize(text, SegmentKind::Plain);
    let text = image_regex().replace_all(&text, |caps: &Captures| {
        let (reference, alt) = match caps.get(1) {
            Some(target) => (target.as_str().trim(), ""),
            None => (&caps[3], caps.get(2).map_or("", |alt| alt.as_str())),
        };
        image_tag(reference, alt, media)
    });
    let text = link_regex().replace_all(&text, r#"<a href="$2">$1</a>"#);
    let text = bold_regex().replace_all(&text, |caps: &Captures| {
        format!("<b>{}</b>", first_group(caps))
    });
    let text = italic_regex().replace_all(&text, |caps: &Captures| {
        format!("<i>{}</i>", first_group(caps))
    });
    strike_regex()
        .replace_all(&text, "<del>$1</del>")
        .into_owned()
}

fn first_group<'h>(caps: &Captures<'h>) -> &'h str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map_or("", |group| group.as_str())
}

fn image_tag(reference: &str, alt: &str, media: &mut Vec<MediaRef>) -> String {
    let src = if is_remote(reference) {
        reference.to_string()
    } else {
        let filename = file_name(reference).to_string();
        let media_ref = MediaRef {
            reference: reference.to_string(),
            filename: filename.clone(),
        };
        if !media.contains(&media_ref) {
            media.push(media_ref);
        }
        filename
    };
    if alt.is_empty() {
        format!(r#"<img src="{}">"#, src)
    } else {
        format!(r#"<img src="{}" alt="{}">"#, src, html_escape::encode_double_quoted_attribute(alt))
    }
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

fn file_name(reference: &str) -> &str {
    reference
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(reference)
}

fn format_code(raw: &str) -> String {
    if let Some(inner) = raw.strip_prefix("```") {
        let inner = inner.strip_suffix("```").unwrap_or(inner);
        let (language, body) = match inner.split_once('\n') {
            Some((first, rest)) => (first.trim(), rest),
            None => ("", inner),
        };
        // An indented closing fence leaves its indent on the last line.
        let body = body.trim_end_matches([' ', '\t']);
        let body = body.strip_suffix('\n').unwrap_or(body);
        let escaped = html_escape::encode_text(body);
        if language.is_empty() {
            format!("<pre><code>{}</code></pre>", escaped)
        } else {
            format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                language, escaped
            )
        }
    } else {
        let inner = raw.trim_matches('`');
        format!("<code>{}</code>", html_escape::encode_text(inner))
    }
}

fn format_math(raw: &str) -> String {
    if let Some(inner) = raw.strip_prefix("$$") {
        let inner = inner.strip_suffix("$$").unwrap_or(inner);
        format!("\\[{}\\]", cloze::normalize(inner.trim(), SegmentKind::Math))
    } else {
        let inner = raw
            .strip_prefix('$')
            .and_then(|s| s.strip_suffix('$'))
            .unwrap_or(raw);
        format!("\\({}\\)", cloze::normalize(inner, SegmentKind::Math))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn html(text: &str) -> String {
        format_field(text).html
    }

    #[test]
    fn emphasis() {
        assert_eq!(
            html("**bold** and *it* and ~~gone~~"),
            "<b>bold</b> and <i>it</i> and <del>gone</del>"
        );
        assert_eq!(html("__bold__ _it_"), "<b>bold</b> <i>it</i>");
    }

    #[test]
    fn snake_case_is_not_italic() {
        assert_eq!(html("call my_long_name"), "call my_long_name");
    }

    #[test]
    fn inline_code_is_escaped_and_unformatted() {
        assert_eq!(html("use `**a** < b`"), "use <code>**a** &lt; b</code>");
    }

    #[test]
    fn fenced_code_keeps_lines() {
        assert_eq!(
            html("```rust\nlet x = 1;\n==y==\n```"),
            r#"<pre><code class="language-rust">let x = 1;<br>==y==</code></pre>"#
        );
    }

    #[test]
    fn indented_fence_is_left_alone() {
        assert_eq!(
            html("- example:\n  ```\n  ==x==\n  ```"),
            "- example:<br>  <pre><code>  ==x==</code></pre>"
        );
    }

    #[test]
    fn math_delimiters() {
        assert_eq!(html("$a_1 * b_2*$"), "\\(a_1 * b_2*\\)");
        assert_eq!(html("$$\nx^2\n$$"), "\\[x^2\\]");
    }

    #[test]
    fn clozes_are_normalized_outside_code() {
        assert_eq!(
            html("==Paris== is `==not==`"),
            "{{c1::Paris}} is <code>==not==</code>"
        );
    }

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(html("line one\nline two"), "line one<br>line two");
    }

    #[test]
    fn images_are_collected() {
        let formatted = format_field("![[img/cat.png]] and ![dog](../pics/dog.jpg)");
        assert_eq!(
            formatted.html,
            r#"<img src="cat.png"> and <img src="dog.jpg" alt="dog">"#
        );
        let names: Vec<_> = formatted.media.iter().map(|m| m.filename.as_str()).collect();
        assert_eq!(names, vec!["cat.png", "dog.jpg"]);
    }

    #[test]
    fn remote_images_are_not_media() {
        let formatted = format_field("![](https://example.com/a.png)");
        assert_eq!(formatted.html, r#"<img src="https://example.com/a.png">"#);
        assert!(formatted.media.is_empty());
    }

    #[test]
    fn links_become_anchors() {
        assert_eq!(
            html("see [docs](https://doc.rust-lang.org)"),
            r#"see <a href="https://doc.rust-lang.org">docs</a>"#
        );
    }
}
