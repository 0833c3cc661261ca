//! PDF extraction response bodies.

use serde::{Deserialize, Serialize};

/// `200` body of `POST /api/pdf-extract`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub text: String,
    pub filename: String,
    pub pages: u32,
}

/// Error body of `POST /api/pdf-extract`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}
