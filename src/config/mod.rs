//! Configuration (layered: code > env > defaults).

use std::fmt;
use std::time::Duration;

use crate::error::{CourierError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_ASSISTANT_NAME: &str = "Courier Assistant";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 20;
pub const DEFAULT_STREAM_IDLE_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Settings shared by both conversation clients.
///
/// Resolution order:
/// 1. Values set through the `with_*` builders
/// 2. Environment variables (a `.env` file is loaded first when present)
/// 3. Built-in defaults
#[derive(Clone)]
pub struct CourierConfig {
    api_key: Option<String>,
    base_url: String,
    model: String,
    completions_url: Option<String>,
    assistant_name: String,
    max_tool_rounds: usize,
    stream_idle_timeout_ms: u64,
    request_timeout_secs: u64,
}

impl fmt::Debug for CourierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourierConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("completions_url", &self.completions_url)
            .field("assistant_name", &self.assistant_name)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("stream_idle_timeout_ms", &self.stream_idle_timeout_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CourierConfig {
    /// Defaults only; nothing is read from the environment.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            completions_url: None,
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            stream_idle_timeout_ms: DEFAULT_STREAM_IDLE_TIMEOUT_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Load from environment variables (OPENAI_API_KEY, OPENAI_BASE_URL, COURIER_*).
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();

        if let Some(key) = env_string("OPENAI_API_KEY") {
            config.api_key = Some(key);
        }
        if let Some(url) = env_string("OPENAI_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = env_string("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(url) = env_string("COURIER_COMPLETIONS_URL") {
            config.completions_url = Some(url);
        }
        if let Some(name) = env_string("COURIER_ASSISTANT_NAME") {
            config.assistant_name = name;
        }
        if let Some(rounds) = env_number("COURIER_MAX_TOOL_ROUNDS") {
            config.max_tool_rounds = rounds;
        }
        if let Some(ms) = env_number("COURIER_STREAM_IDLE_TIMEOUT_MS") {
            config.stream_idle_timeout_ms = ms;
        }
        if let Some(secs) = env_number("COURIER_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = secs;
        }

        config
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_completions_url(mut self, url: impl Into<String>) -> Self {
        self.completions_url = Some(url.into());
        self
    }

    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Zero disables the idle timeout.
    pub fn with_stream_idle_timeout_ms(mut self, ms: u64) -> Self {
        self.stream_idle_timeout_ms = ms;
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// The API key, or a configuration error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key().ok_or_else(|| {
            CourierError::Configuration("OPENAI_API_KEY is not set".to_string())
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Chat completions endpoint; defaults to `<base_url>/chat/completions`.
    pub fn completions_url(&self) -> String {
        self.completions_url
            .clone()
            .unwrap_or_else(|| format!("{}/chat/completions", self.base_url()))
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        (self.stream_idle_timeout_ms > 0).then(|| Duration::from_millis(self.stream_idle_timeout_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_string(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn env_number<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = env_string(var)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring non-numeric configuration value");
            None
        }
    }
}
