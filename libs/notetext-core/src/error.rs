//! Error types for notetext-core.

use thiserror::Error;

/// Result type alias using ParseError.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that abort parsing of a whole note document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("duplicate field \"{field}\" in note \"{note}\" at line {line} of {source_name}")]
    DuplicateField {
        field: String,
        note: String,
        line: usize,
        source_name: String,
    },
}

/// Errors reported by a collection collaborator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("note not found: {0}")]
    NoteNotFound(i64),

    #[error("card not found: {0}")]
    CardNotFound(i64),

    #[error("duplicate note: first field \"{field}\" already exists")]
    Duplicate { field: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors raised while turning a parsed record into a storable note.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("model {model} expects {expected} fields, note \"{note}\" has {found}")]
    FieldCountMismatch {
        model: String,
        note: String,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Collection(#[from] CollectionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_field_names_source() {
        let error = ParseError::DuplicateField {
            field: "Front".to_string(),
            note: "Note 1".to_string(),
            line: 7,
            source_name: "notes.md".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "duplicate field \"Front\" in note \"Note 1\" at line 7 of notes.md"
        );
    }

    #[test]
    fn collection_error_is_transparent() {
        let error = AssemblyError::from(CollectionError::ModelNotFound("Cloze".to_string()));
        assert_eq!(error.to_string(), "model not found: Cloze");
    }
}
