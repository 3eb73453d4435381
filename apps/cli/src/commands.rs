//! Command implementations.

use crate::anki::AnkiConnect;
use crate::cli::CardArgs;
use crate::config::Config;
use crate::document::FileDocument;
use crate::error::{CliError, Result};
use crate::media::FsMediaSource;
use crate::state::SyncState;
use mdcards_core::{extract_cards, hash_content, synchronize, CardStore, ExtractContext, SyncReport};
use std::fs;
use std::path::{Path, PathBuf};

/// A markdown file to sync and the root it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub root: PathBuf,
    /// Path relative to `root`, used for the `Source` backlink.
    pub relative: PathBuf,
}

/// Sync every markdown file under `paths`.
pub async fn sync(config: &Config, paths: &[PathBuf], force: bool) -> Result<SyncReport> {
    let store = AnkiConnect::new(&config.anki_url);
    store.check_connection().await?;

    let mut files = Vec::new();
    for path in paths {
        let found = collect_md_files(path)?;
        if found.is_empty() {
            return Err(CliError::NoDocuments(path.clone()));
        }
        files.extend(found);
    }

    let state_path = SyncState::default_path();
    let mut state = state_path
        .as_deref()
        .map(SyncState::load)
        .unwrap_or_default();

    let mut total = SyncReport::default();
    let mut skipped = 0;
    for file in &files {
        let mut document = FileDocument::open(&file.path)?;
        let key = state_key(&file.path);
        if !force && state.is_unchanged(&key, &hash_content(document.text())) {
            tracing::debug!("{} unchanged since last sync", file.relative.display());
            skipped += 1;
            continue;
        }

        let context = ExtractContext::new(&config.deck, config.source_for(&file.relative))
            .with_tags(config.tags.iter().cloned());
        let media = FsMediaSource::new(file.path.parent().unwrap_or(Path::new(".")))
            .with_root(&file.root);

        let report = synchronize(&store, &mut document, &media, &context).await?;
        document.save()?;
        tracing::info!(
            "{}: {} created, {} updated, {} failed, {} deleted",
            file.relative.display(),
            report.cards_created,
            report.cards_updated,
            report.cards_failed,
            report.notes_deleted
        );

        if report.cards_failed == 0 {
            state.record(key, hash_content(document.text()));
        }
        total.merge(&report);
    }

    if let Some(path) = state_path {
        state.save(&path)?;
    }
    if skipped > 0 {
        tracing::info!("skipped {} unchanged documents", skipped);
    }
    Ok(total)
}

/// Extract the cards of one file as pretty JSON.
pub fn extract(config: &Config, file: &Path) -> Result<String> {
    let text = fs::read_to_string(file)?;
    let relative = file.file_name().map_or_else(|| file.to_path_buf(), PathBuf::from);
    let context = ExtractContext::new(&config.deck, config.source_for(&relative))
        .with_tags(config.tags.iter().cloned());
    let cards = extract_cards(&text, &context);
    Ok(serde_json::to_string_pretty(&cards)?)
}

/// Probe AnkiConnect, returning its version.
pub async fn check(config: &Config) -> Result<u32> {
    let store = AnkiConnect::new(&config.anki_url);
    store.check_connection().await?;
    Ok(store.version().await?)
}

/// Apply per-command flags on top of the loaded configuration.
pub fn apply_card_args(config: &mut Config, url: Option<String>, cards: CardArgs) {
    config.apply_overrides(url, cards.deck, cards.tags);
}

fn state_key(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

/// Collect all .md files under `path` recursively; a file path is returned as is.
pub fn collect_md_files(path: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    if path.is_dir() {
        collect_dir(path, path, &mut files)?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
    } else if path.is_file() {
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let relative = path.file_name().map_or_else(|| path.to_path_buf(), PathBuf::from);
        files.push(SourceFile {
            path: path.to_path_buf(),
            root,
            relative,
        });
    } else {
        return Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    Ok(files)
}

fn collect_dir(base_path: &Path, current_path: &Path, files: &mut Vec<SourceFile>) -> Result<()> {
    for entry in fs::read_dir(current_path)? {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');

        if path.is_dir() {
            if !hidden {
                collect_dir(base_path, &path, files)?;
            }
        } else if path.extension().map(|e| e == "md").unwrap_or(false) {
            let relative = path
                .strip_prefix(base_path)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());
            files.push(SourceFile {
                path,
                root: base_path.to_path_buf(),
                relative,
            });
        }
    }
    Ok(())
}
