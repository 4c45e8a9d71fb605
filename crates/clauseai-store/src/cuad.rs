//! Offline corpus builder for the CUAD v1 contract-clause dataset.
//!
//! CUAD ships as SQuAD-style JSON: each contract (`data[].title`) has
//! paragraphs whose questions (`qas[].id`) name a clause category after a
//! `__` separator, and whose answers are the annotated clause spans.
//!
//! # Cleaning rules
//!
//! - Clause type: the part of the question id after the last `__`, trimmed.
//! - Text: whitespace collapsed to single spaces.
//! - Quality: spans under 80 chars or 15 words, over 250 words, or over
//!   2000 chars are dropped.
//! - Dedup on `(clause_type, text)`. A span is marked seen before the keyword
//!   check, so a rejected duplicate stays rejected.
//! - Keyword check: categories with a keyword list must mention at least one
//!   keyword (case-insensitive). Other categories pass.
//! - Ids are assigned sequentially from 1 in dataset order.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use clauseai_core::ClauseRecord;
use clauseai_core::text::{normalize_whitespace, word_count};
use serde::Deserialize;
use tracing::info;

use crate::StoreError;

const MIN_CHARS: usize = 80;
const MAX_CHARS: usize = 2000;
const MIN_WORDS: usize = 15;
const MAX_WORDS: usize = 250;

const DEFAULT_NOTE: &str = "Assess scope, symmetry, limitations, notice periods, and any uncapped \
obligations; risk increases with broad, one-sided, or ambiguous language.";

/// Static risk guidance per clause category.
const NOTES_BY_TYPE: &[(&str, &str)] = &[
    (
        "Anti-Assignment",
        "Risk increases if assignment is allowed without consent or if consent is easy to \
         obtain; consent requirements reduce risk.",
    ),
    (
        "Cap On Liability",
        "A clear liability cap reduces risk; check exclusions and whether the cap is mutual.",
    ),
    (
        "Uncapped Liability",
        "High risk if liability is uncapped or if exclusions undermine practical limits.",
    ),
    (
        "Indemnification",
        "Risk increases if indemnity is broad, uncapped, or covers third-party claims \
         without clear limits.",
    ),
    (
        "Governing Law",
        "Risk may arise if governing law or venue is unfavorable or exclusive.",
    ),
    (
        "Termination For Convenience",
        "Risk increases if termination is unilateral or notice is short; mutual termination \
         is more balanced.",
    ),
    (
        "Renewal Term",
        "Auto-renewal and strict notice windows can create lock-in; longer notice periods \
         increase risk.",
    ),
    (
        "Expiration Date",
        "Term length affects flexibility; long initial terms can increase lock-in risk.",
    ),
    (
        "Liquidated Damages",
        "Risk increases if liquidated damages are punitive or poorly justified; check \
         whether it's a penalty in disguise.",
    ),
    (
        "Minimum Commitment",
        "Risk increases with guaranteed minimum purchase/volume obligations and penalties \
         for underperformance.",
    ),
    (
        "Insurance",
        "Check whether coverage requirements are reasonable and whether additional \
         insured/waiver of subrogation are one-sided.",
    ),
    (
        "Warranty Duration",
        "Check whether warranty is short, remedies are limited, and disclaimers are broad.",
    ),
];

/// Display-label overrides for terse CUAD category names.
const DISPLAY_BY_TYPE: &[(&str, &str)] = &[(
    "Rofr/Rofo/Rofn",
    "Right of First Refusal / Offer / Negotiation",
)];

/// Keywords a span must contain to be kept for its category.
const KEYWORDS_BY_TYPE: &[(&str, &[&str])] = &[
    (
        "Renewal Term",
        &["renew", "renewal", "extend", "extension", "term", "automatic"],
    ),
    (
        "Expiration Date",
        &["expire", "expiration", "term", "effective date", "commence"],
    ),
    ("Anti-Assignment", &["assign", "assignment", "transfer"]),
    (
        "Governing Law",
        &["governed by", "laws of", "jurisdiction", "venue"],
    ),
    (
        "Cap On Liability",
        &["liable", "liability", "damages", "consequential", "indirect"],
    ),
    (
        "Limitation of Liability",
        &["liable", "liability", "damages", "consequential", "cap"],
    ),
    (
        "Indemnification",
        &["indemnify", "indemnification", "hold harmless", "defend"],
    ),
    (
        "Confidentiality",
        &["confidential", "confidentiality", "non-disclosure"],
    ),
];

#[derive(Debug, Default, Deserialize)]
pub struct CuadDataset {
    #[serde(default)]
    pub data: Vec<CuadDocument>,
}

#[derive(Debug, Deserialize)]
pub struct CuadDocument {
    #[serde(default = "unknown_title")]
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<CuadParagraph>,
}

#[derive(Debug, Deserialize)]
pub struct CuadParagraph {
    #[serde(default)]
    pub qas: Vec<CuadQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct CuadQuestion {
    #[serde(default = "unknown_id")]
    pub id: String,
    #[serde(default)]
    pub answers: Vec<CuadAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct CuadAnswer {
    #[serde(default)]
    pub text: String,
}

fn unknown_title() -> String {
    "unknown_contract".into()
}

fn unknown_id() -> String {
    "Unknown".into()
}

/// Counters from one [`build_clauses`] run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub spans: usize,
    pub low_quality: usize,
    pub duplicates: usize,
    pub keyword_rejected: usize,
    pub kept: usize,
}

/// Parse a CUAD JSON file.
pub fn read_cuad(path: &Path) -> Result<CuadDataset, StoreError> {
    if !path.exists() {
        return Err(StoreError::CorpusNotFound(path.to_path_buf()));
    }
    let dataset: CuadDataset = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    info!(contracts = dataset.data.len(), path = %path.display(), "read CUAD dataset");
    Ok(dataset)
}

/// Clean, filter and deduplicate CUAD answer spans into corpus records.
pub fn build_clauses(dataset: &CuadDataset) -> (Vec<ClauseRecord>, BuildStats) {
    let mut records = Vec::new();
    let mut stats = BuildStats::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut next_id = 1u64;

    for doc in &dataset.data {
        for para in &doc.paragraphs {
            for qa in &para.qas {
                let clause_type = clause_type_from_id(&qa.id);
                let notes = lookup(NOTES_BY_TYPE, clause_type).unwrap_or(DEFAULT_NOTE);

                for answer in &qa.answers {
                    stats.spans += 1;
                    let text = normalize_whitespace(&answer.text);

                    if is_low_quality_span(&text) {
                        stats.low_quality += 1;
                        continue;
                    }
                    if !seen.insert((clause_type.to_string(), text.clone())) {
                        stats.duplicates += 1;
                        continue;
                    }
                    if !passes_keyword_check(clause_type, &text) {
                        stats.keyword_rejected += 1;
                        continue;
                    }

                    records.push(ClauseRecord {
                        id: next_id,
                        clause_type: clause_type.to_string(),
                        clause_type_display: lookup(DISPLAY_BY_TYPE, clause_type)
                            .unwrap_or(clause_type)
                            .to_string(),
                        text,
                        notes: notes.to_string(),
                        source: doc.title.clone(),
                        cuad_id: qa.id.clone(),
                    });
                    next_id += 1;
                }
            }
        }
    }

    stats.kept = records.len();
    (records, stats)
}

/// `"DocTitle__Renewal Term"` → `"Renewal Term"`.
pub fn clause_type_from_id(raw_id: &str) -> &str {
    match raw_id.rsplit_once("__") {
        Some((_, clause_type)) => clause_type.trim(),
        None => raw_id.trim(),
    }
}

fn is_low_quality_span(text: &str) -> bool {
    let chars = text.chars().count();
    let words = word_count(text);
    chars < MIN_CHARS || words < MIN_WORDS || words > MAX_WORDS || chars > MAX_CHARS
}

fn passes_keyword_check(clause_type: &str, text: &str) -> bool {
    let Some(keywords) = lookup(KEYWORDS_BY_TYPE, clause_type) else {
        return true;
    };
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}
