//! Extract and validate the JSON verdict from free-text model output.
//!
//! Models often wrap the object in prose or a code fence. Parsing first tries
//! the whole string, then the span from the first `{` to the last `}`.
//! Anything echoed back in an error is cut to a bounded prefix.

use clauseai_core::schema::response::validate_assessment;
use clauseai_core::text::raw_preview;
use clauseai_core::{RiskAssessment, SchemaError};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("LLM did not return JSON. Raw: {raw_prefix}")]
    NoJson { raw_prefix: String },

    #[error("Invalid JSON from LLM: {error}. Raw: {raw_prefix}")]
    InvalidJson {
        error: serde_json::Error,
        raw_prefix: String,
    },

    #[error("Schema mismatch: {source}. Raw JSON: {object}")]
    Schema {
        source: SchemaError,
        object: String,
    },
}

/// Locate a JSON value in `raw` without interpreting its fields.
pub fn extract_json(raw: &str) -> Result<Value, ParseError> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Ok(value);
    }

    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(no_json(raw));
    };
    if end <= start {
        return Err(no_json(raw));
    }

    debug!(start, end, "falling back to brace-delimited JSON");
    serde_json::from_str(&raw[start..=end]).map_err(|error| ParseError::InvalidJson {
        error,
        raw_prefix: raw_preview(raw).to_string(),
    })
}

/// Full parse: extraction followed by schema validation.
pub fn parse_assessment(raw: &str) -> Result<RiskAssessment, ParseError> {
    let value = extract_json(raw)?;
    validate_assessment(&value).map_err(|source| ParseError::Schema {
        source,
        object: raw_preview(&value.to_string()).to_string(),
    })
}

fn no_json(raw: &str) -> ParseError {
    ParseError::NoJson {
        raw_prefix: raw_preview(raw).to_string(),
    }
}
