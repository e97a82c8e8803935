//! Ollama LLM provider
//!
//! Uses the `/api/chat` endpoint. Streaming responses are newline-delimited
//! JSON objects, one chunk per line, the last carrying `"done": true`.

use std::env;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::http::{check_response, create_client};

use super::TokenStream;

/// Ollama LLM provider
pub struct OllamaLlm {
    client: Client,
    host: String,
    model_name: String,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    content: String,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(model_name: String, host: Option<String>) -> anyhow::Result<Self> {
        let host = host
            .or_else(|| env::var("GLEANER_OLLAMA_HOST").ok())
            .or_else(|| env::var("OLLAMA_HOST").ok())
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let client = create_client();

        info!("Ollama LLM provider: {} @ {}", model_name, host);

        Ok(Self {
            client,
            host,
            model_name,
        })
    }

    fn request(&self, system: &str, prompt: &str, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model_name.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream,
        }
    }

    /// Generate a full response
    pub async fn generate(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let request = self.request(system, prompt, false);

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await?;

        let response = check_response(response, "Ollama").await?;
        let chunk: ChatChunk = response.json().await?;

        if let Some(error) = chunk.error {
            anyhow::bail!("Ollama error: {}", error);
        }

        Ok(chunk.message.map(|m| m.content).unwrap_or_default())
    }

    /// Generate a streaming response
    pub async fn generate_stream(&self, system: &str, prompt: &str) -> anyhow::Result<TokenStream> {
        let request = self.request(system, prompt, true);

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await?;

        let response = check_response(response, "Ollama").await?;
        Ok(Box::pin(NdjsonChatStream::new(response.bytes_stream())))
    }
}

/// Parses an NDJSON chat byte stream into text fragments
///
/// Buffers raw bytes and decodes only complete lines, so a multi-byte UTF-8
/// character split across network chunks is reassembled intact.
struct NdjsonChatStream {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: BytesMut,
    finished: bool,
}

impl NdjsonChatStream {
    fn new(byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: BytesMut::new(),
            finished: false,
        }
    }

    /// Parse one buffered line; None means nothing to emit for it
    fn parse_line(&mut self, line: &str) -> Option<anyhow::Result<String>> {
        if line.trim().is_empty() {
            return None;
        }

        let chunk: ChatChunk = match serde_json::from_str(line) {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!("Skipping unparseable stream chunk: {}", err);
                return None;
            }
        };

        if let Some(error) = chunk.error {
            self.finished = true;
            return Some(Err(anyhow::anyhow!("Ollama error: {}", error)));
        }
        if chunk.done {
            self.finished = true;
        }

        match chunk.message {
            Some(message) if !message.content.is_empty() => Some(Ok(message.content)),
            _ => None,
        }
    }
}

impl Stream for NdjsonChatStream {
    type Item = anyhow::Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
                let line_bytes = self.buffer.split_to(line_end + 1);
                let line = String::from_utf8_lossy(&line_bytes[..line_end]).into_owned();

                if let Some(item) = self.parse_line(&line) {
                    return Poll::Ready(Some(item));
                }
                if self.finished {
                    return Poll::Ready(None);
                }
                continue;
            }

            if self.finished {
                return Poll::Ready(None);
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    self.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(err))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(err.into())));
                }
                Poll::Ready(None) => {
                    // Flush a final unterminated line, if any
                    let remaining = std::mem::take(&mut self.buffer);
                    let remaining = String::from_utf8_lossy(&remaining).into_owned();
                    self.finished = true;
                    if let Some(item) = self.parse_line(&remaining) {
                        return Poll::Ready(Some(item));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};

    #[tokio::test]
    async fn test_ndjson_stream_yields_fragments_in_order() {
        let body = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        );
        let bytes = stream::iter(vec![Ok(Bytes::from(body))]);
        let fragments: Vec<String> = NdjsonChatStream::new(bytes)
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_ndjson_stream_handles_split_chunks() {
        let bytes = stream::iter(vec![
            Ok(Bytes::from("{\"message\":{\"role\":\"assistant\",\"content\":\"partial")),
            Ok(Bytes::from(" line\"},\"done\":true}\n")),
        ]);
        let fragments: Vec<String> = NdjsonChatStream::new(bytes)
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["partial line"]);
    }

    #[tokio::test]
    async fn test_ndjson_stream_reassembles_split_multibyte_char() {
        let body = "{\"message\":{\"role\":\"assistant\",\"content\":\"café\"},\"done\":true}\n";
        // Split in the middle of the two-byte 'é'
        let split = body.find('é').unwrap() + 1;
        let bytes = stream::iter(vec![
            Ok(Bytes::copy_from_slice(&body.as_bytes()[..split])),
            Ok(Bytes::copy_from_slice(&body.as_bytes()[split..])),
        ]);
        let fragments: Vec<String> = NdjsonChatStream::new(bytes)
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["café"]);
    }

    #[tokio::test]
    async fn test_ndjson_stream_surfaces_error_chunk() {
        let body = "{\"error\":\"model not found\"}\n";
        let bytes = stream::iter(vec![Ok(Bytes::from(body))]);
        let mut stream = NdjsonChatStream::new(bytes);
        let first = stream.next().await.unwrap();
        assert!(first.is_err());
        assert!(stream.next().await.is_none());
    }
}
