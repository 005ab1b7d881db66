//! Command line of the `notetext-import` binary.

use crate::config::Config;
use clap::{Parser, ValueHint};
use std::path::PathBuf;

/// Import Markdown note documents and print the stored notes as JSON.
#[derive(Debug, Parser)]
#[command(name = "notetext-import", version)]
pub struct Args {
    /// Note documents to import, in order.
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub paths: Vec<PathBuf>,

    /// Write generated note ids back into the imported files.
    #[arg(long)]
    pub update_files: bool,

    /// Tags prepended to every imported note.
    #[arg(long)]
    pub tags: Option<String>,

    /// Deck for notes that do not name one.
    #[arg(long)]
    pub deck: Option<String>,
}

impl Args {
    /// Apply command line overrides on top of the environment configuration.
    pub fn apply(&self, config: &mut Config) {
        if self.update_files {
            config.update_files = true;
        }
        if let Some(tags) = &self.tags {
            config.tags = tags.replace(',', " ").split_whitespace().collect::<Vec<_>>().join(" ");
        }
        if let Some(deck) = &self.deck {
            config.deck = Some(deck.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn paths_are_required() {
        assert!(Args::try_parse_from(["notetext-import"]).is_err());
    }

    #[test]
    fn parses_paths_and_overrides() {
        let args = Args::try_parse_from([
            "notetext-import",
            "--update-files",
            "--tags",
            "cli, batch",
            "--deck",
            "Inbox",
            "a.md",
            "b.md",
        ])
        .unwrap();

        assert_eq!(args.paths, vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);

        let mut config = Config::default();
        args.apply(&mut config);
        assert!(config.update_files);
        assert_eq!(config.tags, "cli batch");
        assert_eq!(config.deck.as_deref(), Some("Inbox"));
    }

    #[test]
    fn no_flags_keep_environment_config() {
        let args = Args::try_parse_from(["notetext-import", "notes.md"]).unwrap();
        let mut config = Config {
            update_files: true,
            deck: Some("Env".to_string()),
            ..Config::default()
        };
        args.apply(&mut config);
        assert!(config.update_files);
        assert_eq!(config.deck.as_deref(), Some("Env"));
    }
}
