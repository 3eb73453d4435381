pub mod anki;
pub mod cli;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod media;
pub mod state;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::Result;

/// Run one CLI invocation.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();

    match cli.command {
        Commands::Sync {
            paths,
            cards,
            url,
            force,
        } => {
            commands::apply_card_args(&mut config, url, cards);
            tracing::info!("syncing to {}", config.anki_url);
            let report = commands::sync(&config, &paths, force).await?;
            println!(
                "{} created, {} updated, {} failed, {} deleted, {} media uploaded",
                report.cards_created,
                report.cards_updated,
                report.cards_failed,
                report.notes_deleted,
                report.media_uploaded
            );
            Ok(())
        }
        Commands::Extract { file, cards } => {
            commands::apply_card_args(&mut config, None, cards);
            println!("{}", commands::extract(&config, &file)?);
            Ok(())
        }
        Commands::Check { url } => {
            config.apply_overrides(url, None, Vec::new());
            let version = commands::check(&config).await?;
            println!("AnkiConnect {} reachable at {}", version, config.anki_url);
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
