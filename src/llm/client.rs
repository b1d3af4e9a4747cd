use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::StageRequest;

/// Default model when neither `--model` nor `LLM_MODEL` is set
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// A text-generation service: one request in, one reply text out.
///
/// Each call is a single round trip. Timeouts and transport retries, if any,
/// belong to the implementation; the pipeline never retries a failed call.
#[allow(async_fn_in_trait)]
pub trait CompletionService {
    async fn complete(&self, request: &StageRequest) -> Result<String>;

    /// Model name recorded in run logs
    fn model(&self) -> &str;
}

/// Configuration for the Anthropic API client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (from ANTHROPIC_API_KEY env var)
    pub api_key: String,
    /// Model to use
    pub model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
}

impl AnthropicConfig {
    /// Create config from environment variables, with an optional model override
    pub fn from_env(model_override: Option<&str>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;

        let model = match model_override {
            Some(model) => model.to_string(),
            None => std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        };

        Ok(Self::new(api_key, model))
    }

    /// Create with custom settings
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 0.1,
            max_tokens: 4096,
        }
    }
}

/// Anthropic API client, constructed once per process and passed by reference
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Send a message to Claude and get the trimmed text of the first block
    pub async fn send_message(&self, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            system: Some(system.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error: {} - {}", status, body);
        }

        let response: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        // An empty reply is a stage-level failure, not a transport one
        Ok(response
            .content
            .iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default())
    }
}

impl CompletionService for AnthropicClient {
    async fn complete(&self, request: &StageRequest) -> Result<String> {
        self.send_message(&request.system, &request.user).await
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AnthropicConfig::new("key".to_string(), DEFAULT_MODEL.to_string());
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn test_response_text_block() {
        let json = r#"{"content":[{"type":"text","text":"  hello  "}]}"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.content[0].text.trim(), "hello");
    }

    #[test]
    fn test_request_omits_missing_system() {
        let request = AnthropicRequest {
            model: "m".to_string(),
            max_tokens: 10,
            temperature: None,
            system: None,
            messages: vec![],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("temperature").is_none());
    }
}
