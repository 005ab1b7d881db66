//! Core note library shared by the importer and other front ends.
//!
//! Provides:
//! - Parser for Markdown note documents
//! - Field converter between editor Markdown and stored HTML, with the source
//!   Markdown embedded for lossless round trips
//! - Math protection for `$...$` and `$$...$$` spans
//! - Note assembly against a collection's models
//! - Rendering stored notes back into documents and writing ids into files

pub mod assembly;
pub mod collection;
pub mod error;
pub mod fields;
pub mod math;
pub mod parser;
pub mod render;
pub mod rewrite;
pub mod types;

pub use assembly::{commit, AssembledNote, Committed, ModelWarning, NoteData, NoteTarget};
pub use collection::Collection;
pub use error::{AssemblyError, CollectionError, ParseError, Result};
pub use fields::{field_to_text, is_markdown_generated, to_markdown, FieldConverter};
pub use parser::{parse, parse_source};
pub use render::{render_note, render_template, RenderOptions};
pub use rewrite::inject_note_ids;
pub use types::{
    ConverterConfig, Defaults, MathMode, NoteDocument, NoteId, NoteRecord, NoteView,
    DEFAULT_MODEL,
};
