//! Turning parsed note records into notes a collection can store.

use crate::collection::Collection;
use crate::error::{AssemblyError, CollectionError};
use crate::fields::FieldConverter;
use crate::types::{NoteId, NoteRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Suffix some editors append to field headers of Markdown fields.
const MARKDOWN_SUFFIX: &str = " (markdown)";

/// Which note a record should end up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NoteTarget {
    New,
    Note(NoteId),
    Card(i64),
}

/// Non-fatal problems found while matching a note against its model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelWarning {
    FieldNameMismatch { expected: String, found: String },
    InvalidTarget { key: String, value: String },
    TargetNotFound { target: NoteTarget },
}

/// A note ready for the collection: field values are converted and in model order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledNote {
    pub title: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck: Option<String>,
    pub tags: Vec<String>,
    /// Model field name and stored HTML.
    pub fields: Vec<(String, String)>,
    pub target: NoteTarget,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ModelWarning>,
}

impl AssembledNote {
    pub fn first_field(&self) -> Option<&str> {
        self.fields.first().map(|(_, value)| value.as_str())
    }
}

/// Outcome of committing one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Committed {
    pub id: NoteId,
    /// True if a new note was added rather than an existing one updated.
    pub created: bool,
    pub note: AssembledNote,
}

/// A parsed note with import-time overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteData {
    pub title: String,
    pub model: String,
    pub tags: String,
    pub markdown: bool,
    pub deck: Option<String>,
    pub fields: IndexMap<String, String>,
    pub target: NoteTarget,
    warnings: Vec<ModelWarning>,
}

impl NoteData {
    pub fn from_record(record: &NoteRecord) -> Self {
        let mut warnings = Vec::new();
        let target = resolve_target(record, &mut warnings);

        Self {
            title: record.title.clone(),
            model: record.model.clone(),
            tags: record.tags.clone(),
            markdown: record.markdown,
            deck: record.deck.clone(),
            fields: record.fields.clone(),
            target,
            warnings,
        }
    }

    /// Prepend `extra_tags` and fill in `default_deck` if the note has no deck.
    pub fn with_overrides(mut self, extra_tags: &str, default_deck: Option<&str>) -> Self {
        let extra_tags = extra_tags.trim();
        if !extra_tags.is_empty() {
            self.tags = format!("{extra_tags} {}", self.tags).trim().to_string();
        }
        if self.deck.is_none() {
            self.deck = default_deck.map(str::to_string);
        }
        self
    }

    /// Convert fields and order them after `model_fields`.
    pub fn assemble(
        &self,
        model_fields: &[String],
        converter: &FieldConverter,
    ) -> Result<AssembledNote, AssemblyError> {
        if model_fields.len() != self.fields.len() {
            return Err(AssemblyError::FieldCountMismatch {
                model: self.model.clone(),
                note: self.title.clone(),
                expected: model_fields.len(),
                found: self.fields.len(),
            });
        }

        let mut warnings = self.warnings.clone();
        let texts = self.match_fields(model_fields, &mut warnings);

        let fields = model_fields
            .iter()
            .zip(texts)
            .map(|(name, text)| (name.clone(), converter.to_field(text, self.markdown)))
            .collect();

        Ok(AssembledNote {
            title: self.title.clone(),
            model: self.model.clone(),
            deck: self.deck.clone(),
            tags: self.tags.split_whitespace().map(str::to_string).collect(),
            fields,
            target: self.target,
            warnings,
        })
    }

    /// Field texts in model order.
    ///
    /// Names are compared without the markdown suffix. When every model field
    /// is present (ignoring case) the texts are picked by name. Otherwise they
    /// are taken by position and each differing name is reported.
    fn match_fields<'a>(
        &'a self,
        model_fields: &[String],
        warnings: &mut Vec<ModelWarning>,
    ) -> Vec<&'a str> {
        let named: Vec<(String, &str)> = self
            .fields
            .iter()
            .map(|(name, text)| (clean_field_name(name).to_string(), text.as_str()))
            .collect();

        let by_name: Option<Vec<&str>> = model_fields
            .iter()
            .map(|wanted| {
                named
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
                    .map(|(_, text)| *text)
            })
            .collect();

        if let Some(texts) = by_name {
            return texts;
        }

        for (expected, (found, _)) in model_fields.iter().zip(&named) {
            if expected != found {
                tracing::warn!(
                    note = %self.title,
                    expected = %expected,
                    found = %found,
                    "inconsistent field names"
                );
                warnings.push(ModelWarning::FieldNameMismatch {
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }

        named.iter().map(|(_, text)| *text).collect()
    }
}

fn clean_field_name(name: &str) -> &str {
    name.strip_suffix(MARKDOWN_SUFFIX).unwrap_or(name)
}

fn resolve_target(record: &NoteRecord, warnings: &mut Vec<ModelWarning>) -> NoteTarget {
    let candidates = [
        ("nid", record.nid.as_deref(), NoteTarget::Note as fn(i64) -> NoteTarget),
        ("cid", record.cid.as_deref(), NoteTarget::Card as fn(i64) -> NoteTarget),
    ];

    for (key, value, target) in candidates {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        match value.parse::<i64>() {
            Ok(id) => return target(id),
            Err(_) => {
                tracing::warn!(note = %record.title, key, value, "invalid id, the note will be added as new");
                warnings.push(ModelWarning::InvalidTarget {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    NoteTarget::New
}

/// Assemble `data` against its model and hand it to the collection.
///
/// A target the collection does not know is dropped and the note is added instead.
pub fn commit<C: Collection>(
    data: &NoteData,
    collection: &mut C,
    converter: &FieldConverter,
) -> Result<Committed, AssemblyError> {
    let model_fields = collection.model_fields(&data.model)?;
    let mut note = data.assemble(&model_fields, converter)?;

    match collection.create_or_update_note(&note) {
        Ok(id) => Ok(Committed {
            id,
            created: note.target == NoteTarget::New,
            note,
        }),
        Err(CollectionError::NoteNotFound(_) | CollectionError::CardNotFound(_))
            if note.target != NoteTarget::New =>
        {
            tracing::warn!(note = %note.title, target = ?note.target, "target not found, adding as new note");
            note.warnings.push(ModelWarning::TargetNotFound {
                target: note.target,
            });
            note.target = NoteTarget::New;
            let id = collection.create_or_update_note(&note)?;
            Ok(Committed {
                id,
                created: true,
                note,
            })
        }
        Err(e) => Err(e.into()),
    }
}
