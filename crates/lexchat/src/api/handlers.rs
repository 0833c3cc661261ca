//! HTTP request handlers.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, instrument, warn};

use lexchat_protocol::{ChatRequest, ExtractResponse, Mode};

use crate::pdf;
use crate::prompts::build_runtime_messages;
use crate::stream::stream_completion;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Frames buffered between the runtime task and the HTTP body.
const FRAME_BUFFER: usize = 32;

/// Multipart field carrying the document.
const PDF_FIELD: &str = "pdf";

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Assistant IA API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// Liveness check. Does not contact the runtime.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub message: &'static str,
    pub model: String,
    pub already_loaded: bool,
}

/// Warm up the configured model once per process.
#[instrument(skip(state))]
pub async fn load_model(State(state): State<AppState>) -> ApiResult<Json<LoadResponse>> {
    if state.is_model_loaded() {
        return Ok(Json(LoadResponse {
            message: "Modèle déjà chargé",
            model: state.model().to_string(),
            already_loaded: true,
        }));
    }

    state.backend.load_model(state.model()).await?;
    state.mark_model_loaded();
    info!(model = %state.model(), "Model loaded");

    Ok(Json(LoadResponse {
        message: "Chargement des ressources...",
        model: state.model().to_string(),
        already_loaded: false,
    }))
}

pub async fn chat(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    stream_mode(state, Mode::Chat, request)
}

pub async fn agent(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    stream_mode(state, Mode::Agent, request)
}

pub async fn resume(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    stream_mode(state, Mode::Resume, request)
}

/// Validate the request, start the completion task and stream its frames.
fn stream_mode(
    state: AppState,
    mode: Mode,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = request.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }

    info!(%mode, messages = request.messages.len(), "Chat request");

    let messages = build_runtime_messages(
        mode,
        request.messages,
        state.config.inference.agent_history_window,
    );
    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(stream_completion(
        state.backend.clone(),
        state.model().to_string(),
        messages,
        tx,
    ));

    let events = ReceiverStream::new(rx)
        .map(|frame| Ok::<_, Infallible>(Event::default().data(frame.to_json())));

    Ok((
        [(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        )],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
        .into_response())
}

/// Extract the text of an uploaded PDF (multipart field `pdf`).
#[instrument(skip(state, multipart))]
pub async fn extract_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ExtractResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_default();
        if !filename.to_lowercase().ends_with(".pdf") {
            warn!(filename = %filename, "Rejected non-PDF upload");
            return Err(ApiError::bad_request("File must be a PDF"));
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        info!(filename = %filename, size = data.len(), "Extracting PDF");

        return match pdf::extract_with_fallback(state.extractor.clone(), data).await {
            Ok(extracted) => Ok(Json(ExtractResponse {
                text: extracted.text,
                filename,
                pages: extracted.pages,
            })),
            Err(e) if e.is_unprocessable() => Err(ApiError::Unprocessable {
                message: "PDF parsing failed".to_string(),
                details: e.to_string(),
                filename: Some(filename),
            }),
            Err(e) => Err(ApiError::Internal {
                message: "Failed to process PDF".to_string(),
                details: Some(e.to_string()),
            }),
        };
    }

    Err(ApiError::bad_request("No PDF file uploaded"))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Uploaded file exceeds the size limit")
    } else {
        ApiError::bad_request(e.body_text())
    }
}
