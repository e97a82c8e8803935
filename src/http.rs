//! HTTP utilities shared by the vector store and API providers

use std::time::Duration;

use reqwest::{Client, Response};

/// Create a reqwest client with connection pooling and sensible defaults
///
/// Streaming generation can stay open for a while, so the total timeout is
/// generous; connect failures should still surface quickly.
pub fn create_client() -> Client {
    Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client")
}

/// Check HTTP response status and return a detailed error if not successful
///
/// Extracts error details from the response body for better debugging.
pub async fn check_response(response: Response, service_name: &str) -> anyhow::Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    // Try to extract error message from JSON response
    let error_detail = if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
        // Common API error formats
        json.get("error")
            .and_then(|e| e.get("message").and_then(|m| m.as_str()))
            .or_else(|| json.get("message").and_then(|m| m.as_str()))
            .or_else(|| {
                json.get("status")
                    .and_then(|s| s.get("error"))
                    .and_then(|d| d.as_str())
            })
            .map(|s| s.to_string())
            .unwrap_or(body)
    } else {
        body
    };

    anyhow::bail!("{} API error {}: {}", service_name, status, error_detail)
}
