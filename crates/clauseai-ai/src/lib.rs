//! AI layer: sentence embeddings, grounded prompt assembly, LLM generation,
//! and parsing of the model's free-text verdict.

pub mod embedding;
pub mod llm;
pub mod parse;
pub mod prompt;

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
pub use embedder::{Embedder, OnnxEmbedder};

pub use embedding::TextEmbedder;
pub use llm::{GenerationError, Generator, OllamaClient};
pub use parse::{ParseError, parse_assessment};
pub use prompt::{build_prompt, format_evidence};
