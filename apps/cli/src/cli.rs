//! CLI command definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mdcards")]
#[command(about = "Sync flashcards written in markdown notes to Anki", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config dir>/mdcards/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync markdown files or directories to Anki
    Sync {
        /// Files or directories (searched recursively for .md files)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        cards: CardArgs,

        /// AnkiConnect URL
        #[arg(long)]
        url: Option<String>,

        /// Sync documents even if they have not changed since the last sync
        #[arg(short, long)]
        force: bool,
    },

    /// Print the cards of one file as JSON without contacting Anki
    Extract {
        file: PathBuf,

        #[command(flatten)]
        cards: CardArgs,
    },

    /// Check that AnkiConnect is reachable
    Check {
        /// AnkiConnect URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default)]
pub struct CardArgs {
    /// Deck for documents that do not name one in their front matter
    #[arg(short, long)]
    pub deck: Option<String>,

    /// Tag added to every card (repeatable)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_flags() {
        let cli = Cli::parse_from([
            "mdcards", "--verbose", "sync", "notes", "extra.md", "--deck", "Rust", "-t", "a",
            "--tag", "b", "--force",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Sync {
                paths,
                cards,
                url,
                force,
            } => {
                assert_eq!(paths, vec![PathBuf::from("notes"), PathBuf::from("extra.md")]);
                assert_eq!(cards.deck.as_deref(), Some("Rust"));
                assert_eq!(cards.tags, vec!["a", "b"]);
                assert_eq!(url, None);
                assert!(force);
            }
            other => panic!("Expected sync, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_needs_a_path() {
        assert!(Cli::try_parse_from(["mdcards", "sync"]).is_err());
    }
}
