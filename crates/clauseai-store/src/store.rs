//! The clause store: corpus records paired row-for-row with their vectors.

use std::path::Path;

use clauseai_core::ClauseRecord;
use tracing::{info, warn};

use crate::StoreError;
use crate::corpus::load_corpus;
use crate::index::{FlatL2Index, VectorIndex};

/// A retrieved record with its distance to the query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredClause<'a> {
    pub record: &'a ClauseRecord,
    pub distance: f32,
}

/// Immutable corpus + index pair.
///
/// Construction checks that the index holds exactly one vector per record
/// (and, when the index stores ids, that row `n` belongs to record `n`). A
/// mismatch would silently return the wrong evidence, so it is a hard error.
pub struct ClauseStore {
    records: Vec<ClauseRecord>,
    index: Box<dyn VectorIndex>,
}

impl ClauseStore {
    /// Load the JSONL corpus and its [`FlatL2Index`] artifact.
    pub fn open(corpus_path: &Path, index_path: &Path) -> Result<Self, StoreError> {
        let records = load_corpus(corpus_path)?;
        let index = FlatL2Index::read(index_path)?;
        Self::from_parts(records, index)
    }

    /// Pair already-loaded records with any [`VectorIndex`].
    pub fn from_parts(
        records: Vec<ClauseRecord>,
        index: impl VectorIndex + 'static,
    ) -> Result<Self, StoreError> {
        if index.count() != records.len() {
            return Err(StoreError::CountMismatch {
                index: index.count(),
                records: records.len(),
            });
        }
        if let Some(ids) = index.ids() {
            for (position, (&index_id, record)) in ids.iter().zip(&records).enumerate() {
                if u64::try_from(index_id).ok() != Some(record.id) {
                    return Err(StoreError::IdMismatch {
                        position,
                        index_id,
                        record_id: record.id,
                    });
                }
            }
        }

        info!(
            records = records.len(),
            dim = index.dim(),
            "clause store ready"
        );
        Ok(Self {
            records,
            index: Box::new(index),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Vector count reported by the index (equal to [`len`](Self::len)).
    pub fn index_count(&self) -> usize {
        self.index.count()
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    /// Up to `k` records nearest to `query`, nearest first, with distances.
    ///
    /// Sentinel and out-of-range positions from the index are dropped, so the
    /// result may be shorter than `k`. No re-ranking or thresholding.
    pub fn search_scored(&self, query: &[f32], k: usize) -> Result<Vec<ScoredClause<'_>>, StoreError> {
        let neighbors = self.index.search(query, k)?;

        let mut hits = Vec::with_capacity(neighbors.len());
        for n in neighbors {
            let Some(record) = usize::try_from(n.position)
                .ok()
                .and_then(|pos| self.records.get(pos))
            else {
                if n.position >= 0 {
                    warn!(position = n.position, "index returned out-of-range position");
                }
                continue;
            };
            hits.push(ScoredClause {
                record,
                distance: n.distance,
            });
        }
        Ok(hits)
    }

    /// Owned copies of the [`search_scored`](Self::search_scored) records.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ClauseRecord>, StoreError> {
        Ok(self
            .search_scored(query, k)?
            .into_iter()
            .map(|hit| hit.record.clone())
            .collect())
    }
}
