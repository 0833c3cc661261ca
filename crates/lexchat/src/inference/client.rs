//! Runtime HTTP client.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt, future};
use reqwest::Client;
use tokio::io::AsyncBufReadExt;
use tokio_stream::wrappers::LinesStream;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use super::TokenStream;
use super::error::{InferenceError, InferenceResult};
use super::types::{ChatStreamLine, ChatStreamRequest, RuntimeMessage, TokenChunk};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for an Ollama-compatible runtime.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// HTTP client.
    client: Client,
    /// Base URL of the runtime (e.g., "http://localhost:11434").
    base_url: String,
}

impl OllamaClient {
    /// Create a new runtime client.
    ///
    /// Only connection establishment is bounded by `connect_timeout`;
    /// a streamed completion may legitimately run for minutes.
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> InferenceResult<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the runtime is reachable.
    pub async fn health_check(&self) -> InferenceResult<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| InferenceError::ConnectionFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Ok(response.status().is_success())
    }

    /// Preload a model. An empty message list loads without generating.
    pub async fn load_model(&self, model: &str) -> InferenceResult<()> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatStreamRequest {
            model,
            messages: &[],
            stream: false,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::ConnectionFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Self::ensure_success(response).await.map(|_| ())
    }

    /// Start a streaming chat completion.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<RuntimeMessage>,
    ) -> InferenceResult<TokenStream> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatStreamRequest {
            model,
            messages: &messages,
            stream: true,
        };
        debug!(model, messages = messages.len(), "Starting runtime chat stream");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::ConnectionFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let response = Self::ensure_success(response).await?;
        Ok(decode_ndjson(response.bytes_stream()))
    }

    async fn ensure_success(response: reqwest::Response) -> InferenceResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(InferenceError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn parse_line(line: &str) -> InferenceResult<TokenChunk> {
    match serde_json::from_str::<ChatStreamLine>(line) {
        Ok(ChatStreamLine {
            error: Some(message),
            ..
        }) => Err(InferenceError::Runtime(message)),
        Ok(parsed) => Ok(TokenChunk {
            content: parsed.message.map(|m| m.content).unwrap_or_default(),
            done: parsed.done,
        }),
        Err(e) => {
            warn!("Unparseable runtime stream line: {}", e);
            Err(InferenceError::ParseError(e.to_string()))
        }
    }
}

/// Turn a newline-delimited JSON byte stream into token chunks.
///
/// Blank lines are skipped. The stream ends after the first error.
pub fn decode_ndjson<S, E>(inner: S) -> TokenStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let reader = StreamReader::new(inner.map_err(io::Error::other));
    let lines = LinesStream::new(reader.lines());

    let chunks = lines
        .filter_map(|line| async move {
            match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(parse_line(line.trim())),
                Err(e) => Some(Err(InferenceError::from(e))),
            }
        })
        .scan(false, |failed, item| {
            let next = if *failed {
                None
            } else {
                *failed = item.is_err();
                Some(item)
            };
            future::ready(next)
        });

    Box::pin(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_stream(parts: &[&str]) -> impl Stream<Item = Result<Bytes, InferenceError>> + Send + 'static {
        let parts: Vec<Result<Bytes, InferenceError>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        futures::stream::iter(parts)
    }

    #[test]
    fn test_client_creation_trims_base_url() {
        let client = OllamaClient::new("http://localhost:11434/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_decode_ndjson_across_chunk_boundaries() {
        let stream = byte_stream(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Bon\"},\"done\":false}\n{\"mess",
            "age\":{\"role\":\"assistant\",\"content\":\"jour\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\"}",
        ]);
        let chunks: Vec<_> = decode_ndjson(stream).collect().await;
        let chunks: Vec<TokenChunk> = chunks.into_iter().map(|c| c.unwrap()).collect();
        assert_eq!(
            chunks,
            vec![TokenChunk::text("Bon"), TokenChunk::text("jour"), TokenChunk::last("")]
        );
    }

    #[tokio::test]
    async fn test_decode_ndjson_splits_multibyte_chars_safely() {
        let line = "{\"message\":{\"content\":\"é\"},\"done\":false}\n".as_bytes();
        let split = line.iter().position(|b| *b >= 0x80).unwrap() + 1;
        let parts: Vec<Result<Bytes, InferenceError>> = vec![
            Ok(Bytes::copy_from_slice(&line[..split])),
            Ok(Bytes::copy_from_slice(&line[split..])),
        ];
        let chunks: Vec<_> = decode_ndjson(futures::stream::iter(parts)).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().content, "é");
    }

    #[tokio::test]
    async fn test_decode_ndjson_runtime_error_ends_stream() {
        let stream = byte_stream(&[
            "{\"message\":{\"content\":\"a\"},\"done\":false}\n",
            "{\"error\":\"model not found\"}\n",
            "{\"message\":{\"content\":\"b\"},\"done\":false}\n",
        ]);
        let items: Vec<_> = decode_ndjson(stream).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(&items[1], Err(InferenceError::Runtime(m)) if m == "model not found"));
    }

    #[tokio::test]
    async fn test_decode_ndjson_body_error_ends_stream() {
        let parts: Vec<Result<Bytes, InferenceError>> = vec![
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"a\"},\"done\":false}\n")),
            Err(InferenceError::Runtime("connection reset".to_string())),
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"b\"},\"done\":false}\n")),
        ];
        let items: Vec<_> = decode_ndjson(futures::stream::iter(parts)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().content, "a");
        assert!(matches!(items[1], Err(InferenceError::Io(_))));
    }

    #[tokio::test]
    async fn test_decode_ndjson_rejects_garbage() {
        let items: Vec<_> = decode_ndjson(byte_stream(&["not json\n"])).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(InferenceError::ParseError(_))));
    }
}
