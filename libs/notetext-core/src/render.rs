//! Writing stored notes back out as note documents.

use crate::fields::{field_to_text, is_markdown_generated};
use crate::types::NoteView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit a `deck:` line. Only useful when the collection has several decks.
    pub show_deck: bool,
}

/// Render a stored note in the document syntax the parser reads.
///
/// Markdown fields come back as the Markdown they were generated from. If no
/// field was generated from Markdown the note is marked `markdown: false`, so
/// re-importing it keeps the HTML as written.
pub fn render_note(note: &NoteView, options: RenderOptions) -> String {
    let mut lines = vec![
        "# Note".to_string(),
        format!("model: {}", note.model),
        format!("tags: {}", note.tags.join(", ")),
        format!("nid: {}", note.id),
    ];

    if options.show_deck {
        lines.push(format!("deck: {}", note.deck));
    }

    if !note.fields.iter().any(|(_, html)| is_markdown_generated(html)) {
        lines.push("markdown: false".to_string());
    }

    lines.push(String::new());

    for (name, html) in &note.fields {
        lines.push(format!("## {name}"));
        lines.push(field_to_text(html));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// An empty document for one new note of `model`.
pub fn render_template(
    model: &str,
    deck: Option<&str>,
    tags: &str,
    field_names: &[String],
    markdown: bool,
) -> String {
    let mut lines = vec![format!("model: {model}")];

    if let Some(deck) = deck {
        lines.push(format!("deck: {deck}"));
    }
    lines.push(format!("tags: {tags}"));
    if !markdown {
        lines.push("markdown: false".to_string());
    }

    lines.push("\n# Note\n".to_string());
    for name in field_names {
        lines.push(format!("## {name}"));
        lines.push(String::new());
    }

    lines.join("\n") + "\n"
}
