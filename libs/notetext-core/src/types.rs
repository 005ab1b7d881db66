//! Core types for note documents.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model used when neither the document nor the note names one.
pub const DEFAULT_MODEL: &str = "Basic";

/// Identifier of a note in the collection.
pub type NoteId = i64;

/// Settings read from `key: value` lines before the first note header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    /// Keys without a dedicated slot, in document order.
    pub extra: IndexMap<String, String>,
}

/// One note parsed from a document, before it is committed to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub title: String,
    pub model: String,
    pub tags: String,
    pub markdown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    /// Field bodies in document order.
    pub fields: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
    /// Line of the `#` header that opened this note (1-indexed).
    pub line: usize,
}

impl NoteRecord {
    /// Start a record from the document defaults.
    pub fn from_defaults(title: impl Into<String>, defaults: &Defaults, line: usize) -> Self {
        Self {
            title: title.into(),
            model: defaults
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tags: defaults.tags.clone(),
            markdown: defaults.markdown.unwrap_or(true),
            deck: defaults.deck.clone(),
            nid: defaults.nid.clone(),
            cid: defaults.cid.clone(),
            fields: IndexMap::new(),
            extra: defaults.extra.clone(),
            line,
        }
    }

    /// Whitespace-separated tags.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags.split_whitespace().collect()
    }
}

/// Result of parsing one note document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDocument {
    pub defaults: Defaults,
    pub notes: Vec<NoteRecord>,
}

/// How `$...$` and `$$...$$` spans are written into rendered fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathMode {
    Off,
    Mathjax,
    Latex,
}

impl Default for MathMode {
    fn default() -> Self {
        Self::Mathjax
    }
}

impl MathMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Mathjax => "mathjax",
            Self::Latex => "latex",
        }
    }
}

impl fmt::Display for MathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MathMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "mathjax" => Ok(Self::Mathjax),
            "latex" => Ok(Self::Latex),
            other => Err(format!("unknown math mode: {other}")),
        }
    }
}

/// Settings that affect how fields are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub math_mode: MathMode,
    /// Syntect theme for fenced code. `None` turns highlighting off.
    pub syntax_theme: Option<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            math_mode: MathMode::default(),
            syntax_theme: Some("InspiredGitHub".to_string()),
        }
    }
}

/// Snapshot of a stored note, as handed out by a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteView {
    pub id: NoteId,
    pub model: String,
    pub tags: Vec<String>,
    pub deck: String,
    /// Field name and stored HTML, in model order.
    pub fields: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_fields_keep_document_order() {
        let mut record = NoteRecord::from_defaults("Title", &Defaults::default(), 1);
        record.fields.insert("Front".to_string(), "Q".to_string());
        record.fields.insert("Back".to_string(), "A".to_string());
        record.fields.insert("Front".to_string(), "Q2".to_string());
        assert_eq!(record.fields.keys().collect::<Vec<_>>(), vec!["Front", "Back"]);
        assert_eq!(record.fields.get("Front").map(String::as_str), Some("Q2"));
    }

    #[test]
    fn record_inherits_defaults() {
        let defaults = Defaults {
            model: Some("Cloze".to_string()),
            tags: "a b".to_string(),
            markdown: Some(false),
            ..Default::default()
        };
        let record = NoteRecord::from_defaults("Title", &defaults, 3);
        assert_eq!(record.model, "Cloze");
        assert_eq!(record.tag_list(), vec!["a", "b"]);
        assert!(!record.markdown);
        assert_eq!(record.line, 3);
    }

    #[test]
    fn record_without_defaults_uses_basic_markdown() {
        let record = NoteRecord::from_defaults("Title", &Defaults::default(), 1);
        assert_eq!(record.model, DEFAULT_MODEL);
        assert!(record.markdown);
        assert_eq!(record.deck, None);
    }

    #[test]
    fn math_mode_from_str() {
        assert_eq!("LaTeX".parse::<MathMode>(), Ok(MathMode::Latex));
        assert_eq!("off".parse::<MathMode>(), Ok(MathMode::Off));
        assert!("katex".parse::<MathMode>().is_err());
        assert_eq!(MathMode::default().to_string(), "mathjax");
    }
}
