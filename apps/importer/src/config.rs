//! Importer configuration read from the environment.

use notetext_core::{ConverterConfig, MathMode, DEFAULT_MODEL};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid math mode in NOTETEXT_MATH_MODE: {0}")]
    InvalidMathMode(String),

    #[error("invalid boolean in {key}: {value}")]
    InvalidFlag { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub converter: ConverterConfig,
    /// Models whose note templates default to Markdown fields.
    pub markdown_models: Vec<String>,
    /// Tags prepended to every imported note.
    pub tags: String,
    /// Deck for notes that do not name one.
    pub deck: Option<String>,
    /// Write generated note ids back into imported files.
    pub update_files: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            converter: ConverterConfig::default(),
            markdown_models: vec![DEFAULT_MODEL.to_string()],
            tags: String::new(),
            deck: None,
            update_files: false,
        }
    }
}

impl Config {
    /// Load configuration from `NOTETEXT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(mode) = lookup("NOTETEXT_MATH_MODE") {
            config.converter.math_mode = mode
                .parse::<MathMode>()
                .map_err(|_| ConfigError::InvalidMathMode(mode))?;
        }

        if let Some(theme) = lookup("NOTETEXT_SYNTAX_THEME") {
            let theme = theme.trim();
            config.converter.syntax_theme = match theme {
                "" | "none" => None,
                theme => Some(theme.to_string()),
            };
        }

        if let Some(models) = lookup("NOTETEXT_MARKDOWN_MODELS") {
            config.markdown_models = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(tags) = lookup("NOTETEXT_TAGS") {
            config.tags = tags.replace(',', " ").split_whitespace().collect::<Vec<_>>().join(" ");
        }

        config.deck = lookup("NOTETEXT_DECK")
            .map(|deck| deck.trim().to_string())
            .filter(|deck| !deck.is_empty());

        if let Some(value) = lookup("NOTETEXT_UPDATE_FILES") {
            config.update_files = parse_bool("NOTETEXT_UPDATE_FILES", &value)?;
        }

        Ok(config)
    }

    pub fn is_markdown_model(&self, model: &str) -> bool {
        self.markdown_models.iter().any(|m| m == model)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
