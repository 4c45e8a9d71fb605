pub mod clause;
pub mod config;
pub mod schema;
pub mod text;

pub use clause::{
    AnalyzeRequest, AnalyzeResponse, ClauseRecord, EvidenceItem, RiskAssessment, RiskLevel,
};
pub use config::Settings;
pub use schema::response::SchemaError;
