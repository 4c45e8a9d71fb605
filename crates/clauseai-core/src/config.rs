//! Runtime settings shared by the API and the CLI.
//!
//! Values are resolved by the binary (flags backed by environment variables)
//! and handed to the application context; nothing here reads the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_CLAUSES_PATH: &str = "data/clauses.jsonl";
pub const DEFAULT_INDEX_PATH: &str = "data/clauses.index";
pub const DEFAULT_RUBRIC_PATH: &str = "rubric.md";
pub const DEFAULT_SCHEMA_PATH: &str = "schema.json";
pub const DEFAULT_EMBED_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";
pub const DEFAULT_TOP_K: usize = 6;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the Ollama-compatible generation backend.
    pub llm_base_url: String,
    pub llm_model: String,
    pub clauses_path: PathBuf,
    pub index_path: PathBuf,
    pub rubric_path: PathBuf,
    pub schema_path: PathBuf,
    /// Retrieval breadth.
    pub top_k: usize,
    /// Whole-request timeout for one generation call.
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            clauses_path: PathBuf::from(DEFAULT_CLAUSES_PATH),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            rubric_path: PathBuf::from(DEFAULT_RUBRIC_PATH),
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            top_k: DEFAULT_TOP_K,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}
