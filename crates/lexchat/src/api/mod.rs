//! HTTP API module.
//!
//! Streaming chat endpoints, PDF text extraction and liveness checks.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
