//! Per-document settings from YAML front matter.
//!
//! ```markdown
//! ---
//! deck: Languages/French
//! tags: [vocab, a1]
//! ---
//! ```

use crate::error::FrontmatterError;
use serde::Deserialize;

/// Deck and tags a document asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSettings {
    pub deck: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    deck: Option<String>,
    tags: Option<TagList>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagList {
    List(Vec<String>),
    Words(String),
}

/// Location of a front matter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Detected {
    /// Line of the opening `---`.
    open: usize,
    /// Line of the closing `---`.
    close: usize,
}

fn detect(lines: &[&str]) -> Option<Detected> {
    let open = lines.iter().position(|line| !line.trim().is_empty())?;
    if lines[open].trim_end() != "---" {
        return None;
    }
    let close = lines[open + 1..]
        .iter()
        .position(|line| matches!(line.trim_end(), "---" | "..."))?;
    Some(Detected {
        open,
        close: open + 1 + close,
    })
}

/// Index of the first line after the front matter, or 0 if there is none.
pub fn body_start_line(text: &str) -> usize {
    let lines: Vec<&str> = text.lines().collect();
    detect(&lines).map_or(0, |found| found.close + 1)
}

/// Parse the front matter of `text`.
///
/// A document without front matter yields default settings.
pub fn parse_settings(text: &str) -> Result<DocumentSettings, FrontmatterError> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(found) = detect(&lines) else {
        return Ok(DocumentSettings::default());
    };
    let yaml = lines[found.open + 1..found.close].join("\n");
    if yaml.trim().is_empty() {
        return Ok(DocumentSettings::default());
    }

    let raw: RawSettings = serde_yaml::from_str(&yaml)?;
    let tags = match raw.tags {
        Some(TagList::List(tags)) => tags,
        Some(TagList::Words(words)) => words.split_whitespace().map(str::to_string).collect(),
        None => Vec::new(),
    };
    Ok(DocumentSettings {
        deck: raw.deck.map(|deck| deck.trim().to_string()).filter(|deck| !deck.is_empty()),
        tags: tags
            .into_iter()
            .map(|tag| tag.trim_start_matches('#').to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
    })
}

/// Like [`parse_settings`], but malformed front matter falls back to the
/// defaults with a warning.
pub fn read_settings(text: &str) -> DocumentSettings {
    parse_settings(text).unwrap_or_else(|e| {
        tracing::warn!("ignoring front matter: {}", e);
        DocumentSettings::default()
    })
}
