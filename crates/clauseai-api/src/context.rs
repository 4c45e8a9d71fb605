//! Application context: everything a request needs, built once at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clauseai_ai::{Generator, TextEmbedder};
use clauseai_core::Settings;
use clauseai_store::{ClauseStore, StoreError};
use thiserror::Error;
use tracing::info;

/// Fatal configuration problems. The process must not serve traffic after one.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("rubric not found at {}", .0.display())]
    RubricNotFound(PathBuf),

    #[error("schema not found at {}", .0.display())]
    SchemaNotFound(PathBuf),

    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("index dimension {index} does not match embedder dimension {embedder}")]
    EmbedderMismatch { index: usize, embedder: usize },
}

/// Read-only state shared by every request.
pub struct AppContext {
    settings: Settings,
    store: ClauseStore,
    embedder: Arc<dyn TextEmbedder>,
    generator: Arc<dyn Generator>,
    rubric: String,
    schema: String,
}

impl AppContext {
    /// Read rubric and schema, open the clause store, and wire in the clients.
    pub fn load(
        settings: Settings,
        embedder: Arc<dyn TextEmbedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, StartupError> {
        let rubric = read_policy(&settings.rubric_path, StartupError::RubricNotFound)?;
        let schema = read_policy(&settings.schema_path, StartupError::SchemaNotFound)?;
        let store = ClauseStore::open(&settings.clauses_path, &settings.index_path)?;
        Self::from_parts(settings, store, embedder, generator, rubric, schema)
    }

    pub fn from_parts(
        settings: Settings,
        store: ClauseStore,
        embedder: Arc<dyn TextEmbedder>,
        generator: Arc<dyn Generator>,
        rubric: String,
        schema: String,
    ) -> Result<Self, StartupError> {
        if store.dim() != embedder.dim() {
            return Err(StartupError::EmbedderMismatch {
                index: store.dim(),
                embedder: embedder.dim(),
            });
        }
        info!(
            records = store.len(),
            model = generator.model(),
            top_k = settings.top_k,
            "application context ready"
        );
        Ok(Self {
            settings,
            store,
            embedder,
            generator,
            rubric,
            schema,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &ClauseStore {
        &self.store
    }

    pub fn index_count(&self) -> usize {
        self.store.index_count()
    }

    pub fn embedder(&self) -> &dyn TextEmbedder {
        self.embedder.as_ref()
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn rubric(&self) -> &str {
        &self.rubric
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

fn read_policy(path: &Path, missing: fn(PathBuf) -> StartupError) -> Result<String, StartupError> {
    if !path.exists() {
        return Err(missing(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| StartupError::Read {
        path: path.to_path_buf(),
        source,
    })
}
