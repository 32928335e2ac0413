//! Shared HTTP client, headers, and error mapping.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::config::CourierConfig;
use crate::error::{CourierError, Result};

/// Header opting into the Assistants v2 API.
pub const ASSISTANTS_BETA_HEADER: &str = "OpenAI-Beta";
pub const ASSISTANTS_BETA_VALUE: &str = "assistants=v2";

const INVALID_API_KEY_CODE: &str = "invalid_api_key";

/// Build a client honouring the configured connect timeout.
///
/// No overall request timeout is set: streams stay open for as long as the
/// backend keeps producing events, and idle streams are bounded by the session.
pub fn build_client(config: &CourierConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(config.request_timeout())
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| CourierError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Bearer headers plus the Assistants v2 opt-in.
pub fn assistants_headers(api_key: &str) -> HeaderMap {
    let mut headers = bearer_headers(api_key);
    headers.insert(
        ASSISTANTS_BETA_HEADER,
        HeaderValue::from_static(ASSISTANTS_BETA_VALUE),
    );
    headers
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Map a non-success status and its body to a [`CourierError`].
///
/// JSON bodies of the form `{"error": {"message", "code"}}` contribute their
/// message; anything else is passed through verbatim.
pub fn status_to_error(status: u16, body: &str) -> CourierError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    if parsed.as_ref().and_then(|e| e.code.as_deref()) == Some(INVALID_API_KEY_CODE) {
        return CourierError::Authentication("Invalid OpenAI api key.".to_string());
    }

    let message = parsed
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => CourierError::Authentication(message),
        _ => CourierError::api(status, message),
    }
}

/// Turn a non-success response into an error, passing successes through.
pub async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status().as_u16();
    if resp.status().is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_to_error(status, &body))
}
