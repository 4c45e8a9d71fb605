//! Grounded prompt assembly.
//!
//! Evidence is labelled `[E1]`, `[E2]`, … in retrieval order so the model can
//! cite it in `reasons`. Rubric and schema documents are embedded verbatim.

use std::fmt::Write;

use clauseai_core::ClauseRecord;

/// Render retrieved clauses as labelled evidence blocks, separated by blank lines.
pub fn format_evidence(evidence: &[ClauseRecord]) -> String {
    let mut out = String::new();
    for (i, e) in evidence.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "[E{n}] type={ty}\nnotes={notes}\ntext={text}\nsource={source}\n",
            n = i + 1,
            ty = e.clause_type_display,
            notes = e.notes,
            text = e.text,
            source = e.source,
        );
    }
    out
}

/// Compose the single prompt sent to the generation backend.
pub fn build_prompt(
    user_clause: &str,
    rubric_text: &str,
    schema_text: &str,
    evidence: &[ClauseRecord],
) -> String {
    let evidence = format_evidence(evidence);
    format!(
        "You are ClauseAI, an assistant that analyzes contract clauses for legal/commercial risk.
Follow the RUBRIC. Output ONLY valid JSON matching the SCHEMA (no extra keys).

RUBRIC:
{rubric_text}

SCHEMA (return ONLY JSON matching this):
{schema_text}

EVIDENCE (similar clauses + notes):
{evidence}

USER CLAUSE:
{user_clause}

Return ONLY valid JSON. Use exactly these keys:
- clause_type (string)
- risk_level (\"Low\"|\"Medium\"|\"High\")
- risk_score (0-10 integer)
- reasons (list of strings; cite evidence like \"E1\", \"E2\" when used)
- safer_rewrite (string)"
    )
}
