use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clauseai_core::{AnalyzeRequest, AnalyzeResponse, Settings};
use serde::Serialize;

use crate::pipeline::{self, AnalyzeError};
use crate::AppContext;

/// Handler state. `context` is `None` when startup did not complete.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    context: Option<Arc<AppContext>>,
}

impl AppState {
    pub fn ready(context: Arc<AppContext>) -> Self {
        Self {
            settings: Arc::new(context.settings().clone()),
            context: Some(context),
        }
    }

    pub fn uninitialized(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            context: None,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    model: String,
    llm_base_url: String,
    index_count: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn json_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

impl From<AnalyzeError> for ApiError {
    fn from(err: AnalyzeError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        json_error(status, err.to_string())
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        model: state.settings.llm_model.clone(),
        llm_base_url: state.settings.llm_base_url.clone(),
        index_count: state.context.as_ref().map(|c| c.index_count()),
    })
}

async fn analyze(
    State(state): State<AppState>,
    req: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(req) =
        req.map_err(|rej| json_error(StatusCode::UNPROCESSABLE_ENTITY, rej.body_text()))?;

    // Reject bad input before touching the pipeline, even when uninitialized.
    req.validated_text()
        .map_err(|msg| json_error(StatusCode::UNPROCESSABLE_ENTITY, msg))?;

    let Some(ctx) = state.context.clone() else {
        return Err(AnalyzeError::uninitialized().into());
    };

    Ok(Json(pipeline::analyze(ctx, req).await?))
}
