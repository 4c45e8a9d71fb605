//! Request pipeline and HTTP surface.

mod context;
mod http;
pub mod pipeline;

pub use context::{AppContext, StartupError};
pub use http::{AppState, router};
pub use pipeline::{AnalyzeError, AnalyzeErrorKind, Stage, analyze};
