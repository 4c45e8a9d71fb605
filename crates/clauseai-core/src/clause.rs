//! Clause corpus records and the request/response shapes of the analysis API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Clause type used when a corpus line carries none.
pub const UNKNOWN_CLAUSE_TYPE: &str = "Unknown";

/// Minimum number of characters (after trimming) accepted for `clause_text`.
pub const MIN_CLAUSE_CHARS: usize = 20;

/// One exemplar clause from the reference corpus.
///
/// `id` is the stable identifier written by the corpus builder. The record's
/// *position* in the corpus file is what the vector index refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClauseRecord")]
pub struct ClauseRecord {
    pub id: u64,
    pub clause_type: String,
    /// Human-readable label; falls back to `clause_type`.
    pub clause_type_display: String,
    /// Whitespace-normalised clause excerpt.
    pub text: String,
    /// Static risk guidance for this clause's category.
    pub notes: String,
    /// Title of the contract the excerpt came from.
    pub source: String,
    /// Upstream CUAD question id, kept for traceability.
    pub cuad_id: String,
}

/// Wire form of a corpus line: everything except `id` may be absent.
#[derive(Deserialize)]
struct RawClauseRecord {
    id: u64,
    clause_type: Option<String>,
    clause_type_display: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    cuad_id: String,
}

impl From<RawClauseRecord> for ClauseRecord {
    fn from(raw: RawClauseRecord) -> Self {
        let clause_type = raw
            .clause_type
            .unwrap_or_else(|| UNKNOWN_CLAUSE_TYPE.to_string());
        let clause_type_display = raw
            .clause_type_display
            .unwrap_or_else(|| clause_type.clone());
        Self {
            id: raw.id,
            clause_type,
            clause_type_display,
            text: raw.text,
            notes: raw.notes,
            source: raw.source,
            cuad_id: raw.cuad_id,
        }
    }
}

/// A retrieved exemplar as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: u64,
    pub clause_type: String,
    pub clause_type_display: String,
    pub text: String,
    pub notes: String,
    pub source: String,
    pub cuad_id: String,
}

impl From<&ClauseRecord> for EvidenceItem {
    fn from(r: &ClauseRecord) -> Self {
        Self {
            id: r.id,
            clause_type: r.clause_type.clone(),
            clause_type_display: r.clause_type_display.clone(),
            text: r.text.clone(),
            notes: r.notes.clone(),
            source: r.source.clone(),
            cuad_id: r.cuad_id.clone(),
        }
    }
}

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub clause_text: String,
}

impl AnalyzeRequest {
    /// Trimmed clause text, or an error message when it is too short to analyse.
    pub fn validated_text(&self) -> Result<&str, String> {
        let text = self.clause_text.trim();
        let chars = text.chars().count();
        if chars < MIN_CLAUSE_CHARS {
            return Err(format!(
                "clause_text must be at least {MIN_CLAUSE_CHARS} characters, got {chars}"
            ));
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ();

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// The model's structured verdict, after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub clause_type: String,
    pub risk_level: RiskLevel,
    pub risk_score: i64,
    /// May cite evidence by label, e.g. "(E1)".
    pub reasons: Vec<String>,
    pub safer_rewrite: String,
}

/// Success body of `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub clause_type: String,
    pub risk_level: RiskLevel,
    pub risk_score: i64,
    pub reasons: Vec<String>,
    pub safer_rewrite: String,
    pub evidence: Vec<EvidenceItem>,
}

impl AnalyzeResponse {
    pub fn new(assessment: RiskAssessment, evidence: Vec<EvidenceItem>) -> Self {
        Self {
            clause_type: assessment.clause_type,
            risk_level: assessment.risk_level,
            risk_score: assessment.risk_score,
            reasons: assessment.reasons,
            safer_rewrite: assessment.safer_rewrite,
            evidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_full_line() {
        let line = r#"{"id":7,"clause_type":"Rofr/Rofo/Rofn","clause_type_display":"Right of First Refusal / Offer / Negotiation","text":"Licensee shall have a right of first refusal.","notes":"n","source":"DocA","cuad_id":"DocA__Rofr/Rofo/Rofn"}"#;
        let rec: ClauseRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.id, 7);
        assert_eq!(rec.clause_type, "Rofr/Rofo/Rofn");
        assert_eq!(
            rec.clause_type_display,
            "Right of First Refusal / Offer / Negotiation"
        );
        assert_eq!(rec.source, "DocA");
    }

    #[test]
    fn record_display_falls_back_to_type() {
        let rec: ClauseRecord =
            serde_json::from_str(r#"{"id":1,"clause_type":"Renewal Term","text":"t"}"#).unwrap();
        assert_eq!(rec.clause_type_display, "Renewal Term");
        assert_eq!(rec.notes, "");
        assert_eq!(rec.cuad_id, "");
    }

    #[test]
    fn record_missing_type_is_unknown() {
        let rec: ClauseRecord = serde_json::from_str(r#"{"id":3}"#).unwrap();
        assert_eq!(rec.clause_type, UNKNOWN_CLAUSE_TYPE);
        assert_eq!(rec.clause_type_display, UNKNOWN_CLAUSE_TYPE);
        assert_eq!(rec.text, "");
    }

    #[test]
    fn record_requires_id() {
        let result = serde_json::from_str::<ClauseRecord>(r#"{"clause_type":"Insurance"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn record_serializes_all_fields() {
        let rec: ClauseRecord = serde_json::from_str(r#"{"id":3,"clause_type":"Insurance"}"#).unwrap();
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["clause_type_display"], "Insurance");
        assert_eq!(value["id"], 3);
    }

    #[test]
    fn evidence_passes_fields_through() {
        let rec: ClauseRecord = serde_json::from_str(
            r#"{"id":9,"clause_type":"Governing Law","text":"governed by the laws of Delaware","notes":"venue","source":"DocB","cuad_id":"DocB__Governing Law"}"#,
        )
        .unwrap();
        let ev = EvidenceItem::from(&rec);
        assert_eq!(ev.id, 9);
        assert_eq!(ev.text, rec.text);
        assert_eq!(ev.cuad_id, "DocB__Governing Law");
    }

    #[test]
    fn short_clause_rejected() {
        let req = AnalyzeRequest {
            clause_text: "too short!".into(),
        };
        let err = req.validated_text().unwrap_err();
        assert!(err.contains("at least 20"), "{err}");
    }

    #[test]
    fn padding_does_not_count_towards_length() {
        let req = AnalyzeRequest {
            clause_text: format!("{:>30}", "tiny"),
        };
        assert!(req.validated_text().is_err());
    }

    #[test]
    fn valid_clause_is_trimmed() {
        let req = AnalyzeRequest {
            clause_text: "  The agreement renews automatically each year.\n".into(),
        };
        assert_eq!(
            req.validated_text().unwrap(),
            "The agreement renews automatically each year."
        );
    }

    #[test]
    fn risk_level_parse_is_case_insensitive() {
        assert_eq!("medium".parse::<RiskLevel>(), Ok(RiskLevel::Medium));
        assert_eq!(" HIGH ".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert!("Critical".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn risk_level_serializes_as_label() {
        assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"Low\"");
    }
}
