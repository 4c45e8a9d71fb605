//! Storage layer: JSONL clause corpus, Arrow IPC vector index, and retrieval.

mod error;
pub use error::StoreError;

pub mod corpus;
pub mod cuad;
pub mod index;
mod store;

pub use corpus::{load_corpus, write_corpus};
pub use index::{FlatL2Index, NO_NEIGHBOR, Neighbor, VectorIndex};
pub use store::{ClauseStore, ScoredClause};
