use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{DaytonaError, Result};

/// Default timeout for a single API request. State waits span many requests
/// and are bounded separately by [`crate::timeout`].
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sent on every request so the service can attribute SDK traffic.
const SOURCE_HEADER: &str = "X-Daytona-Source";
const SOURCE_VALUE: &str = "rust-sdk";

/// Shared HTTP client for the Daytona API. Owns the connection pool, base URL,
/// and API key. Clone is a cheap Arc refcount bump.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpClient {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| DaytonaError::Config(format!("http client: {e}")))?;

        let api_url = api_url.trim_end_matches('/').to_string();
        info!(api_url = %api_url, "http client initialized");

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                api_url,
                api_key: api_key.to_string(),
            }),
        })
    }

    /// Build an authenticated request.
    ///
    /// `path` is appended to the base URL (e.g. `/workspace/{id}`).
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.inner.api_url);
        self.inner
            .client
            .request(method, url)
            .bearer_auth(&self.inner.api_key)
            .header(SOURCE_HEADER, SOURCE_VALUE)
    }
}

/// Send `req` and fail on a non-2xx status, keeping the response body as the
/// error message. `op` names the call in errors.
pub(crate) async fn send(req: reqwest::RequestBuilder, op: &str) -> Result<reqwest::Response> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(DaytonaError::Api {
            status,
            message: format!("{op}: {}", error_message(&body)),
        });
    }
    Ok(resp)
}

/// Decode a JSON body. Payloads that do not match the expected shape are
/// reported as [`DaytonaError::Validation`].
pub(crate) async fn decode<T: DeserializeOwned>(resp: reqwest::Response, op: &str) -> Result<T> {
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| DaytonaError::Validation(format!("{op}: {e}")))
}

/// The API wraps errors as `{"message": ...}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"statusCode":404,"message":"Sandbox not found"}"#),
            "Sandbox not found"
        );
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(""), "");
    }
}
