//! OpenAI Assistants v2 backend.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::http::{assistants_headers, build_client, check_status};
use super::{AssistantsBackend, CreateAssistantRequest};
use crate::config::CourierConfig;
use crate::error::Result;
use crate::stream::{decode_byte_stream, EventStream, StreamDecoder};
use crate::types::{RunSummary, Sender, ToolCallResult};

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// [`AssistantsBackend`] over the OpenAI REST API.
#[derive(Debug, Clone)]
pub struct OpenAiAssistantsBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAssistantsBackend {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build from configuration; fails without an API key.
    pub fn from_config(config: &CourierConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(build_client(config)?, api_key, config.base_url()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        debug!(path, "POST");
        let resp = self
            .client
            .post(self.url(path))
            .headers(assistants_headers(&self.api_key))
            .json(body)
            .send()
            .await?;
        check_status(resp).await
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        debug!(path, "GET");
        let resp = self
            .client
            .get(self.url(path))
            .headers(assistants_headers(&self.api_key))
            .send()
            .await?;
        check_status(resp).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!(path, "DELETE");
        let resp = self
            .client
            .delete(self.url(path))
            .headers(assistants_headers(&self.api_key))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn open_stream(&self, path: &str, body: &serde_json::Value) -> Result<EventStream> {
        let resp = self.post_json(path, body).await?;
        Ok(decode_byte_stream(
            resp.bytes_stream(),
            StreamDecoder::assistant_run(),
        ))
    }
}

#[async_trait]
impl AssistantsBackend for OpenAiAssistantsBackend {
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<String> {
        let body = serde_json::to_value(request)?;
        let created: Created = self.post_json("/assistants", &body).await?.json().await?;
        Ok(created.id)
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        self.delete(&format!("/assistants/{assistant_id}")).await
    }

    async fn create_thread(&self) -> Result<String> {
        let created: Created = self.post_json("/threads", &json!({})).await?.json().await?;
        Ok(created.id)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.delete(&format!("/threads/{thread_id}")).await
    }

    async fn create_message(&self, thread_id: &str, role: Sender, content: &str) -> Result<()> {
        let body = json!({ "role": role, "content": content });
        self.post_json(&format!("/threads/{thread_id}/messages"), &body)
            .await?;
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<serde_json::Value>> {
        let list: ListResponse<serde_json::Value> = self
            .get(&format!("/threads/{thread_id}/messages"))
            .await?
            .json()
            .await?;
        Ok(list.data)
    }

    async fn list_runs(&self, thread_id: &str) -> Result<Vec<RunSummary>> {
        let list: ListResponse<RunSummary> = self
            .get(&format!("/threads/{thread_id}/runs"))
            .await?
            .json()
            .await?;
        Ok(list.data)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()> {
        self.post_json(&format!("/threads/{thread_id}/runs/{run_id}/cancel"), &json!({}))
            .await?;
        Ok(())
    }

    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<EventStream> {
        let body = json!({ "assistant_id": assistant_id, "stream": true });
        self.open_stream(&format!("/threads/{thread_id}/runs"), &body)
            .await
    }

    async fn submit_tool_outputs_stream(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<EventStream> {
        let body = json!({ "tool_outputs": outputs, "stream": true });
        self.open_stream(
            &format!("/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &body,
        )
        .await
    }
}
