//! Nearest-neighbour index over clause embeddings.
//!
//! [`VectorIndex`] is the seam the retriever depends on. [`FlatL2Index`] is the
//! bundled implementation: an exact brute-force scan with squared Euclidean
//! distance, persisted as an Arrow IPC file (see
//! [`embedding_index_schema`](clauseai_core::schema::index::embedding_index_schema)).

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, FixedSizeListBuilder, Float32Array, Float32Builder, Int64Array,
    Int64Builder,
};
use arrow::datatypes::DataType;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use clauseai_core::schema::index::{
    EMBEDDING_COLUMN, ID_COLUMN, MODEL_METADATA_KEY, embedding_index_schema,
};
use tracing::info;

use crate::StoreError;

/// Position reported for "no match" when fewer than `k` vectors exist.
pub const NO_NEIGHBOR: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row in the index, or [`NO_NEIGHBOR`].
    pub position: i64,
    pub distance: f32,
}

/// Read-only nearest-neighbour search over fixed-dimension vectors.
///
/// `search` returns neighbours nearest first. Implementations may pad the
/// result with [`NO_NEIGHBOR`] entries; callers must skip them.
pub trait VectorIndex: Send + Sync {
    /// Number of stored vectors.
    fn count(&self) -> usize;

    fn dim(&self) -> usize;

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError>;

    /// Per-row record ids, when the index stores them.
    fn ids(&self) -> Option<&[i64]> {
        None
    }
}

/// Exact L2 index holding every vector in one contiguous buffer.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dim: usize,
    ids: Vec<i64>,
    data: Vec<f32>,
    model: Option<String>,
}

impl FlatL2Index {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            data: Vec::new(),
            model: None,
        }
    }

    /// Record which embedding model produced the vectors.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Name of the embedding model, if the artifact recorded one.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Append a vector for the record with `id`. Rows keep insertion order.
    pub fn add(&mut self, id: i64, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        self.ids.push(id);
        self.data.extend_from_slice(vector);
        Ok(())
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Load an index artifact written by [`write`](Self::write).
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::IndexNotFound(path.to_path_buf()));
        }
        let reader = FileReader::try_new(BufReader::new(File::open(path)?), None)?;
        let schema = reader.schema();

        let emb_field = schema.field_with_name(EMBEDDING_COLUMN).map_err(|_| {
            StoreError::MalformedIndex(format!("missing '{EMBEDDING_COLUMN}' column"))
        })?;
        let dim = match emb_field.data_type() {
            DataType::FixedSizeList(_, d) if *d > 0 => *d as usize,
            other => {
                return Err(StoreError::MalformedIndex(format!(
                    "'{EMBEDDING_COLUMN}' must be a non-empty FixedSizeList<Float32>, got {other:?}"
                )));
            }
        };

        let mut index = Self::new(dim);
        index.model = schema.metadata().get(MODEL_METADATA_KEY).cloned();

        for batch in reader {
            index.append_batch(&batch?)?;
        }

        info!(
            count = index.count(),
            dim,
            path = %path.display(),
            "loaded vector index"
        );
        Ok(index)
    }

    fn append_batch(&mut self, batch: &RecordBatch) -> Result<(), StoreError> {
        let ids = batch
            .column_by_name(ID_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
            .ok_or_else(|| StoreError::MalformedIndex(format!("'{ID_COLUMN}' is not Int64")))?;
        let fsl = batch
            .column_by_name(EMBEDDING_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| {
                StoreError::MalformedIndex(format!("'{EMBEDDING_COLUMN}' is not FixedSizeList"))
            })?;
        let values = fsl
            .values()
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| StoreError::MalformedIndex("embedding values are not Float32".into()))?;

        for row in 0..batch.num_rows() {
            if ids.is_null(row) || fsl.is_null(row) {
                return Err(StoreError::MalformedIndex(format!("null value in row {row}")));
            }
            let offset = fsl.value_offset(row) as usize;
            let vector = &values.values()[offset..offset + self.dim];
            self.add(ids.value(row), vector)?;
        }
        Ok(())
    }

    /// Persist as an Arrow IPC file, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let dim = i32::try_from(self.dim).map_err(|_| StoreError::DimensionMismatch {
            expected: i32::MAX as usize,
            actual: self.dim,
        })?;
        let schema = Arc::new(embedding_index_schema(
            dim,
            self.model.as_deref().unwrap_or_default(),
        ));

        let n = self.count();
        let mut id_builder = Int64Builder::with_capacity(n);
        let mut emb_builder =
            FixedSizeListBuilder::with_capacity(Float32Builder::with_capacity(self.data.len()), dim, n);
        for i in 0..n {
            id_builder.append_value(self.ids[i]);
            emb_builder.values().append_slice(self.row(i));
            emb_builder.append(true);
        }
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(id_builder.finish()), Arc::new(emb_builder.finish())],
        )?;

        let mut writer = FileWriter::try_new(BufWriter::new(File::create(path)?), &schema)?;
        writer.write(&batch)?;
        writer.finish()?;

        info!(count = n, dim = self.dim, path = %path.display(), "wrote vector index");
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn count(&self) -> usize {
        self.ids.len()
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
        if query.len() != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Neighbor> = (0..self.count())
            .map(|i| Neighbor {
                position: i as i64,
                distance: squared_l2(query, self.row(i)),
            })
            .collect();

        // Ties keep row order.
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);

        while hits.len() < k {
            hits.push(Neighbor {
                position: NO_NEIGHBOR,
                distance: f32::INFINITY,
            });
        }
        Ok(hits)
    }

    fn ids(&self) -> Option<&[i64]> {
        Some(&self.ids)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
