//! Line-delimited JSON clause corpus.
//!
//! One [`ClauseRecord`] per line. Line order is significant: row `n` of the
//! vector index embeds the record on the `n`-th non-blank line.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use clauseai_core::ClauseRecord;
use tracing::info;

use crate::StoreError;

/// Read every record from a JSONL corpus file, in file order.
///
/// Blank lines are skipped. A malformed line or a repeated `id` fails the
/// whole load.
pub fn load_corpus(path: &Path) -> Result<Vec<ClauseRecord>, StoreError> {
    if !path.exists() {
        return Err(StoreError::CorpusNotFound(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ClauseRecord =
            serde_json::from_str(&line).map_err(|source| StoreError::InvalidRecord {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })?;
        if !seen.insert(record.id) {
            return Err(StoreError::DuplicateId {
                id: record.id,
                line: i + 1,
            });
        }
        records.push(record);
    }

    info!(count = records.len(), path = %path.display(), "loaded clause corpus");
    Ok(records)
}

/// Write records as JSONL, replacing any existing file.
pub fn write_corpus(path: &Path, records: &[ClauseRecord]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(count = records.len(), path = %path.display(), "wrote clause corpus");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_lines(dir: &TempDir, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("clauses.jsonl");
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn loads_in_file_order() {
        let tmp = TempDir::new().unwrap();
        let path = write_lines(
            &tmp,
            &[
                r#"{"id":2,"clause_type":"Insurance","text":"b"}"#,
                r#"{"id":1,"clause_type":"Renewal Term","text":"a"}"#,
            ],
        );
        let records = load_corpus(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 2);
        assert_eq!(records[1].clause_type, "Renewal Term");
    }

    #[test]
    fn skips_blank_lines() {
        let tmp = TempDir::new().unwrap();
        let path = write_lines(&tmp, &[r#"{"id":1}"#, "", "   ", r#"{"id":2}"#, ""]);
        assert_eq!(load_corpus(&path).unwrap().len(), 2);
    }

    #[test]
    fn missing_file() {
        let result = load_corpus(Path::new("/nonexistent/clauses.jsonl"));
        assert!(matches!(result, Err(StoreError::CorpusNotFound(_))));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let tmp = TempDir::new().unwrap();
        let path = write_lines(&tmp, &[r#"{"id":1}"#, "{not json"]);
        match load_corpus(&path) {
            Err(StoreError::InvalidRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected InvalidRecord, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_id_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_lines(&tmp, &[r#"{"id":1}"#, r#"{"id":1}"#]);
        assert!(matches!(
            load_corpus(&path),
            Err(StoreError::DuplicateId { id: 1, line: 2 })
        ));
    }

    #[test]
    fn write_then_load() {
        let tmp = TempDir::new().unwrap();
        let src = write_lines(
            &tmp,
            &[r#"{"id":5,"clause_type":"Governing Law","text":"laws of New York","source":"DocC"}"#],
        );
        let records = load_corpus(&src).unwrap();

        let out = tmp.path().join("nested").join("out.jsonl");
        write_corpus(&out, &records).unwrap();
        let reloaded = load_corpus(&out).unwrap();
        assert_eq!(reloaded, records);
    }
}
