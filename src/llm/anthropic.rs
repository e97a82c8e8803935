//! Anthropic LLM provider
//!
//! Streaming uses the Messages API server-sent events: `content_block_delta`
//! events carry text fragments, `message_stop` ends the stream.

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

/// Anthropic LLM provider
pub struct AnthropicLlm {
    client: Client,
    api_key: String,
    base_url: String,
    model_name: String,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

impl AnthropicLlm {
    /// Create a new Anthropic LLM provider
    pub fn new(
        model_name: String,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let api_key = api_key
            .or_else(|| env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY not set"))?;

        let base_url = base_url
            .or_else(|| env::var("ANTHROPIC_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.anthropic.com".to_string());

        let client = create_client();

        info!("Anthropic LLM provider: {}", model_name);

        Ok(Self {
            client,
            api_key,
            base_url,
            model_name,
        })
    }

    async fn send(
        &self,
        system: &str,
        prompt: &str,
        stream: bool,
    ) -> anyhow::Result<reqwest::Response> {
        let request = AnthropicRequest {
            model: self.model_name.clone(),
            max_tokens: 1000,
            system: system.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        check_response(response, "Anthropic").await
    }

    /// Generate a full response
    pub async fn generate(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let response = self.send(system, prompt, false).await?;
        let anthropic_response: AnthropicResponse = response.json().await?;

        let content = anthropic_response
            .content
            .iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    block.text.clone()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(content)
    }

    /// Generate a streaming response
    pub async fn generate_stream(&self, system: &str, prompt: &str) -> anyhow::Result<TokenStream> {
        let response = self.send(system, prompt, true).await?;
        Ok(Box::pin(SseChatStream::new(response.bytes_stream())))
    }
}

/// Parses a Messages API SSE byte stream into text fragments
///
/// Buffers raw bytes and decodes only complete events, so a multi-byte UTF-8
/// character split across network chunks is reassembled intact.
struct SseChatStream {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: BytesMut,
    finished: bool,
}

impl SseChatStream {
    fn new(byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: BytesMut::new(),
            finished: false,
        }
    }

    /// Handle one complete SSE event; None means nothing to emit for it
    fn parse_event(&mut self, event_text: &str) -> Option<anyhow::Result<String>> {
        let data = event_text
            .lines()
            .find_map(|line| line.trim().strip_prefix("data:"))?
            .trim();
        if data.is_empty() {
            return None;
        }

        let event: serde_json::Value = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(err) => {
                warn!("Skipping unparseable stream event: {}", err);
                return None;
            }
        };

        match event.get("type").and_then(|t| t.as_str()) {
            Some("content_block_delta") => event
                .pointer("/delta/text")
                .and_then(|t| t.as_str())
                .filter(|text| !text.is_empty())
                .map(|text| Ok(text.to_string())),
            Some("message_stop") => {
                self.finished = true;
                None
            }
            Some("error") => {
                self.finished = true;
                let message = event
                    .pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown stream error");
                Some(Err(anyhow::anyhow!("Anthropic error: {}", message)))
            }
            // message_start, content_block_start/stop, ping, message_delta
            _ => None,
        }
    }
}

impl Stream for SseChatStream {
    type Item = anyhow::Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event_end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
                let event_bytes = self.buffer.split_to(event_end + 2);
                let event_text = String::from_utf8_lossy(&event_bytes[..event_end]).into_owned();

                if let Some(item) = self.parse_event(&event_text) {
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
                Poll::Ready(None) => return Poll::Ready(None),
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
    async fn test_sse_stream_extracts_text_deltas() {
        let body = concat!(
            "event: message_start\ndata: {\"type\":\"message_start\"}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" world\"}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        );
        let bytes = stream::iter(vec![Ok(Bytes::from(body))]);
        let fragments: Vec<String> = SseChatStream::new(bytes)
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_sse_stream_handles_split_events() {
        let bytes = stream::iter(vec![
            Ok(Bytes::from("event: content_block_delta\ndata: {\"type\":\"content_block_")),
            Ok(Bytes::from("delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n")),
        ]);
        let fragments: Vec<String> = SseChatStream::new(bytes)
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["Hi"]);
    }

    #[tokio::test]
    async fn test_sse_stream_reassembles_split_multibyte_char() {
        let body = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"naïve\"}}\n\n";
        // Split in the middle of the two-byte 'ï'
        let split = body.find('ï').unwrap() + 1;
        let bytes = stream::iter(vec![
            Ok(Bytes::copy_from_slice(&body.as_bytes()[..split])),
            Ok(Bytes::copy_from_slice(&body.as_bytes()[split..])),
        ]);
        let fragments: Vec<String> = SseChatStream::new(bytes)
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["naïve"]);
    }

    #[tokio::test]
    async fn test_sse_stream_surfaces_error_event() {
        let body = "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
        let bytes = stream::iter(vec![Ok(Bytes::from(body))]);
        let mut stream = SseChatStream::new(bytes);
        let first = stream.next().await.unwrap();
        assert!(first.is_err());
        assert!(stream.next().await.is_none());
    }
}
