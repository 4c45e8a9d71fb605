//! Per-request analysis pipeline.
//!
//! `Received → Embedded → Retrieved → Prompted → Generated → Parsed → Responded`,
//! strictly sequential. Any failure ends the request with the last stage
//! reached; nothing is retried.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use clauseai_ai::{GenerationError, ParseError, build_prompt, parse_assessment};
use clauseai_core::text::raw_preview;
use clauseai_core::{AnalyzeRequest, AnalyzeResponse, ClauseRecord, EvidenceItem};
use clauseai_store::StoreError;
use thiserror::Error;
use tracing::{Instrument, debug, info, warn};

use crate::AppContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Embedded,
    Retrieved,
    Prompted,
    Generated,
    Parsed,
    Responded,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Embedded => "embedded",
            Self::Retrieved => "retrieved",
            Self::Prompted => "prompted",
            Self::Generated => "generated",
            Self::Parsed => "parsed",
            Self::Responded => "responded",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AnalyzeErrorKind {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Service not initialized")]
    Uninitialized,

    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("retrieval failed: {0}")]
    Retrieval(StoreError),

    #[error(transparent)]
    Generation(GenerationError),

    #[error(transparent)]
    Parse(ParseError),
}

/// A failed request: where it stopped and why.
///
/// Server-side failures name the stage in their message; client errors and
/// the uninitialized case carry only the kind message.
#[derive(Debug, Error)]
pub struct AnalyzeError {
    /// Last stage reached before the failure.
    pub stage: Stage,
    pub kind: AnalyzeErrorKind,
}

impl fmt::Display for AnalyzeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AnalyzeErrorKind::InvalidRequest(_) | AnalyzeErrorKind::Uninitialized => {
                write!(f, "{}", self.kind)
            }
            _ => write!(f, "{} (stage: {})", self.kind, self.stage),
        }
    }
}

impl AnalyzeError {
    fn at(stage: Stage, kind: AnalyzeErrorKind) -> Self {
        Self { stage, kind }
    }

    pub fn uninitialized() -> Self {
        Self::at(Stage::Received, AnalyzeErrorKind::Uninitialized)
    }

    /// Caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind, AnalyzeErrorKind::InvalidRequest(_))
    }
}

/// Run one request through the full pipeline.
pub async fn analyze(
    ctx: Arc<AppContext>,
    request: AnalyzeRequest,
) -> Result<AnalyzeResponse, AnalyzeError> {
    let clause = request
        .validated_text()
        .map_err(|msg| AnalyzeError::at(Stage::Received, AnalyzeErrorKind::InvalidRequest(msg)))?
        .to_string();

    let span = tracing::info_span!(
        "analyze",
        clause_chars = clause.chars().count(),
        stage = tracing::field::Empty,
        evidence = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );
    let started = Instant::now();

    let result = run(ctx, clause).instrument(span.clone()).await;

    span.record("latency_ms", started.elapsed().as_millis() as u64);
    match &result {
        Ok(resp) => {
            span.record("stage", Stage::Responded.as_str());
            span.record("evidence", resp.evidence.len());
            span.record("outcome", "ok");
            span.in_scope(|| info!(risk_level = %resp.risk_level, "analysis complete"));
        }
        Err(err) => {
            span.record("stage", err.stage.as_str());
            span.record("outcome", "error");
            span.in_scope(|| warn!(stage = %err.stage, error = %err.kind, "analysis failed"));
        }
    }
    result
}

async fn run(ctx: Arc<AppContext>, clause: String) -> Result<AnalyzeResponse, AnalyzeError> {
    // Embedding and the index scan are CPU-bound.
    let (clause, evidence) = {
        let ctx = Arc::clone(&ctx);
        tokio::task::spawn_blocking(move || retrieve(&ctx, clause))
            .await
            .map_err(|e| {
                AnalyzeError::at(Stage::Received, AnalyzeErrorKind::Embedding(e.into()))
            })??
    };
    debug!(evidence = evidence.len(), "retrieved evidence");

    let prompt = build_prompt(&clause, ctx.rubric(), ctx.schema(), &evidence);
    debug!(prompt_chars = prompt.len(), "prompt built");

    let raw = ctx
        .generator()
        .generate(&prompt)
        .await
        .map_err(|e| AnalyzeError::at(Stage::Prompted, AnalyzeErrorKind::Generation(e)))?;
    debug!(raw = raw_preview(&raw), "generation complete");

    let assessment = parse_assessment(&raw)
        .map_err(|e| AnalyzeError::at(Stage::Generated, AnalyzeErrorKind::Parse(e)))?;

    let evidence = evidence.iter().map(EvidenceItem::from).collect();
    Ok(AnalyzeResponse::new(assessment, evidence))
}

fn retrieve(
    ctx: &AppContext,
    clause: String,
) -> Result<(String, Vec<ClauseRecord>), AnalyzeError> {
    let query = ctx
        .embedder()
        .encode(&clause)
        .map_err(|e| AnalyzeError::at(Stage::Received, AnalyzeErrorKind::Embedding(e)))?;
    let evidence = ctx
        .store()
        .search(&query, ctx.settings().top_k)
        .map_err(|e| AnalyzeError::at(Stage::Embedded, AnalyzeErrorKind::Retrieval(e)))?;
    Ok((clause, evidence))
}
