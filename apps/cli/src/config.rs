//! Configuration management

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ANKI_URL_VAR: &str = "MDCARDS_ANKI_URL";
pub const DECK_VAR: &str = "MDCARDS_DECK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AnkiConnect endpoint.
    pub anki_url: String,
    /// Deck for documents without a `deck` in their front matter.
    pub deck: String,
    /// Tags added to every card.
    pub tags: Vec<String>,
    /// Backlink stored in each card's `Source` field. `{path}` is the
    /// document path relative to the synced directory, `{name}` its file
    /// stem.
    pub source_template: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            anki_url: "http://127.0.0.1:8765".to_string(),
            deck: "Default".to_string(),
            tags: Vec::new(),
            source_template: "{path}".to_string(),
        }
    }
}

impl Config {
    /// `config.toml` under the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mdcards").join("config.toml"))
    }

    /// Load an explicit config file, or the default one if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_path(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    /// Load config from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CliError::Config(format!("Config file not found: {}", path.display()))
            } else {
                CliError::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&contents)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Serialize the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `MDCARDS_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ANKI_URL_VAR).filter(|url| !url.trim().is_empty()) {
            self.anki_url = url;
        }
        if let Some(deck) = lookup(DECK_VAR).filter(|deck| !deck.trim().is_empty()) {
            self.deck = deck;
        }
    }

    /// Apply command-line flags; extra tags are added to the configured ones.
    pub fn apply_overrides(&mut self, url: Option<String>, deck: Option<String>, tags: Vec<String>) {
        if let Some(url) = url {
            self.anki_url = url;
        }
        if let Some(deck) = deck {
            self.deck = deck;
        }
        for tag in tags {
            let tag = tag.trim_start_matches('#').to_string();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }

    /// Backlink for a document at `relative` (relative to the synced root).
    pub fn source_for(&self, relative: &Path) -> String {
        let path = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let name = relative
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        self.source_template
            .replace("{path}", &path)
            .replace("{name}", &name)
    }
}
