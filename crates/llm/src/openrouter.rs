// FILE: crates/llm/src/openrouter.rs
//! OpenRouter chat completions

use crate::client::{decide, log_failure, retry_policy};
use crate::{LlmClient, LlmError, LlmResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shelfwise_network::Client;
use shelfwise_resilience::{retry_async, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    policy: RetryPolicy,
}

impl OpenRouterClient {
    pub fn new(http: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            policy: retry_policy(3),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn call_once(&self, prompt: &str) -> LlmResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.1,
        });
        let bearer = format!("Bearer {}", self.api_key);

        let response: ChatResponse = self
            .http
            .post_json(
                &format!("{}/chat/completions", self.base_url),
                &[
                    ("Authorization", bearer.as_str()),
                    ("HTTP-Referer", "https://github.com/DrTomLLC/Shelfwise"),
                    ("X-Title", "Shelfwise"),
                ],
                &body,
            )
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyResponse("OpenRouter".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        retry_async(&self.policy, || self.call_once(prompt), decide)
            .await
            .inspect_err(|e| log_failure("OpenRouter", e))
    }
}
