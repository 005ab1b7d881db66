//! Shared setup for importer integration tests.

pub mod fixtures;

use std::path::PathBuf;

use notetext_core::ConverterConfig;
use notetext_importer::{Config, Importer, MemoryCollection};
use tempfile::TempDir;

/// Importer over a fresh in-memory collection, with a scratch directory for files.
pub struct TestContext {
    pub importer: Importer<MemoryCollection>,
    dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            importer: Importer::new(MemoryCollection::new(), config),
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Write `content` to a file in the scratch directory.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }
}

/// Configuration without syntax highlighting, so rendered HTML stays short.
pub fn test_config() -> Config {
    Config {
        converter: ConverterConfig {
            syntax_theme: None,
            ..Default::default()
        },
        ..Default::default()
    }
}
