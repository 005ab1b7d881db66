//! Interface to the flashcard collection that stores notes.

use crate::assembly::AssembledNote;
use crate::error::CollectionError;
use crate::types::{NoteId, NoteView};

type Result<T> = std::result::Result<T, CollectionError>;

/// Storage engine holding models, decks and notes.
///
/// Implementations own persistence and scheduling; this crate only creates,
/// updates, finds and reads notes through it.
pub trait Collection {
    /// Field names of a model, in model order.
    fn model_fields(&self, model: &str) -> Result<Vec<String>>;

    /// Add `note`, or update the note its target points at.
    fn create_or_update_note(&mut self, note: &AssembledNote) -> Result<NoteId>;

    /// Notes matching a search query.
    fn find_notes(&self, query: &str) -> Result<Vec<NoteId>>;

    /// Snapshot of one note.
    fn note(&self, id: NoteId) -> Result<NoteView>;
}
