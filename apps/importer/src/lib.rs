pub mod cli;
pub mod collection;
pub mod config;
pub mod error;
pub mod importer;

use clap::Parser;
use notetext_core::{Collection, NoteView};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use cli::Args;
pub use collection::MemoryCollection;
pub use config::{Config, ConfigError};
pub use error::ImportError;
pub use importer::{ImportReport, ImportedNote, Importer, InconsistentField, SkippedNote};

#[derive(Serialize)]
struct Output {
    imports: Vec<ImportReport>,
    notes: Vec<NoteView>,
}

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env()?;
    args.apply(&mut config);
    tracing::debug!(?config, "loaded configuration");

    let mut importer = Importer::new(MemoryCollection::new(), config);
    let mut imports = Vec::with_capacity(args.paths.len());

    for path in &args.paths {
        let report = importer.import_file(path)?;
        tracing::info!(
            file = %path.display(),
            created = report.created(),
            updated = report.updated(),
            "import finished"
        );
        imports.push(report);
    }

    let collection = importer.collection();
    let notes = collection
        .find_notes("")?
        .into_iter()
        .map(|id| collection.note(id))
        .collect::<Result<Vec<_>, _>>()?;

    println!("{}", serde_json::to_string_pretty(&Output { imports, notes })?);

    Ok(())
}
