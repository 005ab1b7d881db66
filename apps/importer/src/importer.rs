//! Importing note documents into a collection and exporting them back.

use crate::config::Config;
use crate::error::{ImportError, Result};
use notetext_core::{
    commit, inject_note_ids, parse_source, render_note, render_template, AssemblyError,
    Collection, CollectionError, FieldConverter, ModelWarning, NoteData, NoteId, NoteTarget,
    RenderOptions,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one note of an imported document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedNote {
    pub title: String,
    pub id: NoteId,
    pub created: bool,
    pub target: NoteTarget,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ModelWarning>,
}

/// A note that was left out because the collection already holds its first field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNote {
    pub title: String,
    /// Line of the note header in the source.
    pub line: usize,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub source: String,
    pub notes: Vec<ImportedNote>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<SkippedNote>,
    /// True if new note ids were written back into the source file.
    pub file_updated: bool,
}

impl ImportReport {
    pub fn created(&self) -> usize {
        self.notes.iter().filter(|n| n.created).count()
    }

    pub fn updated(&self) -> usize {
        self.notes.len() - self.created()
    }
}

/// A stored field whose HTML no longer matches its embedded Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InconsistentField {
    pub note: NoteId,
    pub field: String,
}

pub struct Importer<C: Collection> {
    collection: C,
    converter: FieldConverter,
    config: Config,
}

impl<C: Collection> Importer<C> {
    pub fn new(collection: C, config: Config) -> Self {
        let converter = FieldConverter::new(config.converter.clone());
        Self {
            collection,
            converter,
            config,
        }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut C {
        &mut self.collection
    }

    pub fn into_collection(self) -> C {
        self.collection
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Import every note of `content`, naming `source` in errors.
    pub fn import_str(&mut self, content: &str, source: &str) -> Result<ImportReport> {
        self.import_content(content, source).map(|(report, _)| report)
    }

    /// Import a file, writing new note ids back into it if configured to.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<ImportReport> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let source = path.display().to_string();
        let (mut report, new_ids) = self.import_content(&content, &source)?;

        if self.config.update_files && !new_ids.is_empty() {
            let updated = inject_note_ids(&content, &new_ids);
            if updated != content {
                fs::write(path, updated).map_err(|source| ImportError::Io {
                    path: PathBuf::from(path),
                    source,
                })?;
                report.file_updated = true;
                tracing::info!(file = %source, count = new_ids.len(), "wrote note ids");
            }
        }

        Ok(report)
    }

    /// Parse and commit a document.
    ///
    /// Every note is assembled before the first one is committed, so a note that
    /// does not fit its model aborts the import without touching the collection.
    /// A new note whose first field is already stored is skipped and listed in
    /// the report. Returns the report and the header lines of notes that had no id.
    fn import_content(
        &mut self,
        content: &str,
        source: &str,
    ) -> Result<(ImportReport, Vec<(usize, NoteId)>)> {
        let document = parse_source(content, source)?;

        let notes: Vec<(usize, bool, NoteData)> = document
            .notes
            .iter()
            .map(|record| {
                let data = NoteData::from_record(record)
                    .with_overrides(&self.config.tags, self.config.deck.as_deref());
                let had_id = record.nid.is_some() || record.cid.is_some();
                (record.line, had_id, data)
            })
            .collect();

        for (_, _, data) in &notes {
            self.collection
                .model_fields(&data.model)
                .map_err(Into::into)
                .and_then(|fields| data.assemble(&fields, &self.converter))
                .map_err(|e| assembly_error(data, source, e))?;
        }

        let mut report = ImportReport {
            source: source.to_string(),
            notes: Vec::with_capacity(notes.len()),
            duplicates: Vec::new(),
            file_updated: false,
        };
        let mut new_ids = Vec::new();

        for (line, had_id, data) in &notes {
            let committed = match commit(data, &mut self.collection, &self.converter) {
                Ok(committed) => committed,
                Err(AssemblyError::Collection(CollectionError::Duplicate { field })) => {
                    tracing::warn!(
                        note = %data.title,
                        line,
                        field = %field,
                        "duplicate note was not added"
                    );
                    report.duplicates.push(SkippedNote {
                        title: data.title.clone(),
                        line: *line,
                        field,
                    });
                    continue;
                }
                Err(e) => return Err(assembly_error(data, source, e)),
            };

            if !had_id {
                new_ids.push((*line, committed.id));
            }
            tracing::info!(
                note = %data.title,
                id = committed.id,
                created = committed.created,
                "imported note"
            );

            report.notes.push(ImportedNote {
                title: committed.note.title,
                id: committed.id,
                created: committed.created,
                target: data.target,
                warnings: committed.note.warnings,
            });
        }

        Ok((report, new_ids))
    }

    /// Render every note matching `query` into one document.
    pub fn export_notes(&self, query: &str) -> Result<String> {
        let ids = self.collection.find_notes(query)?;
        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            views.push(self.collection.note(id)?);
        }

        let mut decks: Vec<&str> = views.iter().map(|v| v.deck.as_str()).collect();
        decks.sort_unstable();
        decks.dedup();
        let options = RenderOptions {
            show_deck: decks.len() > 1,
        };

        let mut rendered = Vec::with_capacity(views.len());
        for view in &views {
            for (field, html) in &view.fields {
                if self.converter.is_inconsistent(html) {
                    tracing::warn!(
                        id = view.id,
                        field = %field,
                        "field HTML differs from its markdown, exporting the markdown"
                    );
                }
            }
            rendered.push(render_note(view, options));
        }

        Ok(rendered.join("\n"))
    }

    /// Fields of matching notes whose HTML was edited after generation.
    pub fn inconsistent_fields(&self, query: &str) -> Result<Vec<InconsistentField>> {
        let mut found = Vec::new();
        for id in self.collection.find_notes(query)? {
            let view = self.collection.note(id)?;
            for (field, html) in &view.fields {
                if self.converter.is_inconsistent(html) {
                    found.push(InconsistentField {
                        note: id,
                        field: field.clone(),
                    });
                }
            }
        }
        Ok(found)
    }

    /// An empty document for a new note of `model`.
    pub fn template(&self, model: &str, tags: &str) -> Result<String> {
        let fields = self.collection.model_fields(model)?;
        Ok(render_template(
            model,
            self.config.deck.as_deref(),
            tags,
            &fields,
            self.config.is_markdown_model(model),
        ))
    }
}

fn assembly_error(data: &NoteData, source: &str, error: AssemblyError) -> ImportError {
    ImportError::Assembly {
        note: data.title.clone(),
        source_name: source.to_string(),
        source: error,
    }
}
