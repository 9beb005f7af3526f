//! Web search through the Responses API, exposed to the conversation agent
//! as the `web_search` function tool.

use crate::{api_key::ApiKey, tools::Tool, transport::ApiBase};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

pub const DEFAULT_WEB_SEARCH_MODEL: &str = "gpt-4.1";
pub const DEFAULT_WEB_SEARCH_INSTRUCTIONS: &str =
    "Use the built-in web_search tool to answer the user's question. Keep the answer short and concise.";

const TOOL_NAME: &str = "web_search";
const TOOL_DESCRIPTION: &str = "Use this when you need up-to-date external information. \
Input is a single natural-language search query. \
Return a concise answer and include key sources (site name + URL) when helpful. \
If uncertain, state the uncertainty.";

#[derive(Debug, thiserror::Error)]
pub enum WebSearchError {
    #[error("Responses API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Responses API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid web_search arguments: {0}")]
    Arguments(#[from] serde_json::Error),
}

/// Settings shared by every web search request; resolved by the caller.
#[derive(Debug, Clone)]
pub struct WebSearchSettings {
    pub api_base: ApiBase,
    pub model: String,
    pub instructions: String,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            api_base: ApiBase::default(),
            model: DEFAULT_WEB_SEARCH_MODEL.to_string(),
            instructions: DEFAULT_WEB_SEARCH_INSTRUCTIONS.to_string(),
        }
    }
}

/// An authenticated client for the Responses API's built-in web search.
#[derive(Clone)]
pub struct WebSearchClient {
    http: reqwest::Client,
    api_key: ApiKey,
    settings: WebSearchSettings,
}

impl WebSearchClient {
    pub fn new(api_key: ApiKey, settings: WebSearchSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            settings,
        }
    }

    /// Runs `query` and returns the answer text.
    ///
    /// Falls back to the raw JSON payload when the response carries no text.
    pub async fn search(&self, query: &str) -> Result<String, WebSearchError> {
        let payload = self.fetch(query).await?;
        let text = extract_output(&payload);
        if text.is_empty() {
            warn!("Responses API returned no output text; passing raw payload through");
            return Ok(payload.to_string());
        }
        Ok(text)
    }

    async fn fetch(&self, query: &str) -> Result<Value, WebSearchError> {
        let url = self.settings.api_base.join(&["responses"]);
        let body = json!({
            "model": self.settings.model,
            "input": query,
            "instructions": self.settings.instructions,
            "tools": [{ "type": "web_search" }],
            "text": { "format": { "type": "text" } },
        });

        info!(model = %self.settings.model, "Running web search");
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.api_key.bearer())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            return Err(WebSearchError::Api {
                status: status.as_u16(),
                message: error_detail(&raw),
            });
        }
        Ok(resp.json::<Value>().await?)
    }
}

/// `error.message` from an error body, else the body itself.
fn error_detail(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) => v
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| v.to_string()),
        Err(_) => raw.trim().to_string(),
    }
}

/// Picks the answer text out of a Responses API payload.
///
/// Prefers the top-level `output_text`; otherwise joins every non-empty
/// `output_text` content part with a blank line.
pub fn extract_output(payload: &Value) -> String {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        let text = text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
    }

    let parts: Vec<&str> = payload
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|c| c.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|c| c.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    parts.join("\n\n")
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
}

/// The `web_search` function tool given to the conversation agent.
pub struct WebSearchTool {
    client: WebSearchClient,
}

impl WebSearchTool {
    pub fn new(client: WebSearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        TOOL_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "additionalProperties": false,
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A single natural-language search query (e.g., 'latest USD/JPY rate')."
                }
            }
        })
    }

    async fn invoke(&self, arguments: Value) -> anyhow::Result<String> {
        let args: WebSearchArgs =
            serde_json::from_value(arguments).map_err(WebSearchError::from)?;
        Ok(self.client.search(&args.query).await?)
    }
}
