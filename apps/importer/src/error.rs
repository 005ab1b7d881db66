//! Error handling for the importer.

use notetext_core::{AssemblyError, CollectionError, ParseError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("note \"{note}\" in {source_name}: {source}")]
    Assembly {
        note: String,
        source_name: String,
        #[source]
        source: AssemblyError,
    },

    #[error(transparent)]
    Collection(#[from] CollectionError),
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembly_error_names_note_and_source() {
        let error = ImportError::Assembly {
            note: "Note 2".to_string(),
            source_name: "deck.md".to_string(),
            source: AssemblyError::FieldCountMismatch {
                model: "Basic".to_string(),
                note: "Note 2".to_string(),
                expected: 2,
                found: 3,
            },
        };
        assert_eq!(
            error.to_string(),
            "note \"Note 2\" in deck.md: model Basic expects 2 fields, note \"Note 2\" has 3"
        );
    }

    #[test]
    fn io_error_names_path() {
        let error = ImportError::Io {
            path: PathBuf::from("missing.md"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(error.to_string(), "failed to access missing.md: not found");
    }
}
