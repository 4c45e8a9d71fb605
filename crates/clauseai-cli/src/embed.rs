//! Index build: reads the clause corpus, embeds every text, writes the vector index.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use clauseai_ai::TextEmbedder;
use clauseai_store::{FlatL2Index, VectorIndex, load_corpus};

const EMBED_BATCH_SIZE: usize = 256;

pub struct IndexStats {
    pub rows: usize,
    pub dim: usize,
    pub elapsed_secs: f64,
}

/// Embed `clauses_path` in corpus order and write the artifact to `index_path`.
pub fn build_index(
    embedder: &dyn TextEmbedder,
    clauses_path: &Path,
    index_path: &Path,
) -> anyhow::Result<IndexStats> {
    let start = Instant::now();

    let records = load_corpus(clauses_path).context("reading clause corpus")?;
    let total = records.len();
    eprintln!("  Read {total} clauses from {}", clauses_path.display());

    let mut index = FlatL2Index::new(embedder.dim()).with_model(embedder.model_name());
    let mut processed = 0usize;

    for chunk in records.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<&str> = chunk.iter().map(|r| r.text.as_str()).collect();
        let vectors = embedder
            .encode_batch(&texts)
            .context("generating embeddings")?;
        anyhow::ensure!(
            vectors.len() == chunk.len(),
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            chunk.len()
        );

        for (record, vector) in chunk.iter().zip(&vectors) {
            let id = i64::try_from(record.id)
                .with_context(|| format!("clause id {} does not fit the index", record.id))?;
            index.add(id, vector)?;
        }

        processed += chunk.len();
        eprint!(
            "\r  Embedded {processed}/{total} ({:.1}%)",
            processed as f64 / total as f64 * 100.0
        );
    }
    eprintln!();

    eprintln!("  Writing index...");
    index
        .write(index_path)
        .with_context(|| format!("writing {}", index_path.display()))?;

    Ok(IndexStats {
        rows: index.count(),
        dim: index.dim(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clauseai_core::ClauseRecord;
    use clauseai_store::{ClauseStore, write_corpus};
    use tempfile::TempDir;

    /// Two-dimensional: (length, vowel count).
    struct ShapeEmbedder;

    impl TextEmbedder for ShapeEmbedder {
        fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32])
        }
        fn dim(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "shape"
        }
    }

    fn corpus(n: u64) -> Vec<ClauseRecord> {
        (1..=n)
            .map(|id| {
                serde_json::from_value(serde_json::json!({
                    "id": id,
                    "clause_type": "Insurance",
                    "text": "a".repeat(id as usize),
                }))
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn index_rows_match_corpus() {
        let tmp = TempDir::new().unwrap();
        let clauses = tmp.path().join("clauses.jsonl");
        let index_path = tmp.path().join("clauses.index");
        // Spans more than one batch.
        write_corpus(&clauses, &corpus(300)).unwrap();

        let stats = build_index(&ShapeEmbedder, &clauses, &index_path).unwrap();
        assert_eq!(stats.rows, 300);
        assert_eq!(stats.dim, 2);

        let loaded = FlatL2Index::read(&index_path).unwrap();
        assert_eq!(loaded.model(), Some("shape"));

        let store = ClauseStore::open(&clauses, &index_path).unwrap();
        let hit = store.search(&[42.0, 42.0], 1).unwrap();
        assert_eq!(hit[0].id, 42);
    }

    #[test]
    fn missing_corpus() {
        let tmp = TempDir::new().unwrap();
        let result = build_index(
            &ShapeEmbedder,
            &tmp.path().join("absent.jsonl"),
            &tmp.path().join("clauses.index"),
        );
        assert!(result.is_err());
    }
}
