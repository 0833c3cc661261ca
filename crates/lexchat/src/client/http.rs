//! HTTP client for a lexchat server.

use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, multipart};
use tracing::{debug, warn};
use uuid::Uuid;

use lexchat_protocol::{AttachedFile, ChatRequest, ExtractErrorBody, ExtractResponse, Mode};

use super::ByteStream;
use super::error::{ClientError, ClientResult};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the lexchat HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    /// Base URL of the server (e.g., "http://localhost:8000").
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `true` iff `GET /health` answered with a success status.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Open the event stream of `mode` for `request`.
    pub async fn stream_chat(&self, mode: Mode, request: &ChatRequest) -> ClientResult<ByteStream> {
        let url = format!("{}{}", self.base_url, mode.endpoint());
        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Chat request rejected: {}", body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(ClientError::from)),
        ))
    }

    /// Upload a PDF and return its extracted text as an attachment.
    pub async fn extract_pdf(
        &self,
        filename: impl Into<String>,
        data: Vec<u8>,
    ) -> ClientResult<AttachedFile> {
        let url = format!("{}/api/pdf-extract", self.base_url);
        let part = multipart::Part::bytes(data)
            .file_name(filename.into())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("pdf", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ExtractErrorBody>(&text) {
                Ok(body) => ClientError::Extraction {
                    status: status.as_u16(),
                    error: body.error,
                    details: body.details,
                },
                Err(_) => ClientError::Status {
                    status: status.as_u16(),
                    body: text,
                },
            });
        }

        let body: ExtractResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        Ok(AttachedFile {
            id: Uuid::new_v4().to_string(),
            name: body.filename,
            text: body.text,
            pages: body.pages,
        })
    }
}
