//! Terminal rendering for retrieved clauses and verdicts.

use clauseai_core::AnalyzeResponse;
use clauseai_core::text::bounded_prefix;
use clauseai_store::ScoredClause;

const TEXT_PREVIEW_CHARS: usize = 400;

/// Print one retrieval hit as a vertical card.
pub fn print_evidence_card(rank: usize, hit: &ScoredClause<'_>) {
    let r = hit.record;
    println!("=== [E{rank}] {} (id {}) ===", r.clause_type_display, r.id);
    print_field("distance", &format!("{:.4}", hit.distance));
    print_field("source", &r.source);
    print_field("cuad_id", &r.cuad_id);
    print_field("notes", &r.notes);
    print_field("text", &preview(&r.text));
    println!();
}

/// Human-readable summary of an analysis, followed by its evidence labels.
pub fn print_verdict(resp: &AnalyzeResponse) {
    println!("=== {} ===", resp.clause_type);
    print_field("risk", &format!("{} ({}/10)", resp.risk_level, resp.risk_score));
    println!();

    if !resp.reasons.is_empty() {
        println!("--- Reasons ---");
        for reason in &resp.reasons {
            println!("  - {reason}");
        }
        println!();
    }

    println!("--- Safer rewrite ---");
    println!("  {}", resp.safer_rewrite);
    println!();

    println!("--- Evidence ---");
    for (i, e) in resp.evidence.iter().enumerate() {
        println!("  [E{}] {} ({})", i + 1, e.clause_type_display, e.source);
    }
}

fn print_field(label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    println!("  {label:<10} {value}");
}

fn preview(text: &str) -> String {
    let head = bounded_prefix(text, TEXT_PREVIEW_CHARS);
    if head.len() < text.len() {
        format!("{head}…")
    } else {
        head.to_string()
    }
}
