// FILE: crates/llm/src/gemini.rs
//! Google Gemini `generateContent`

use crate::client::{decide, log_failure, retry_policy};
use crate::{LlmClient, LlmError, LlmResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shelfwise_network::Client;
use shelfwise_resilience::{retry_async, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeneratedCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeneratedCandidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    policy: RetryPolicy,
}

impl GeminiClient {
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
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.1 },
        });

        let response: GenerateResponse = self
            .http
            .post_json(
                &format!("{}/models/{}:generateContent", self.base_url, self.model),
                &[("x-goog-api-key", self.api_key.as_str())],
                &body,
            )
            .await?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyResponse("Gemini".to_string()))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        retry_async(&self.policy, || self.call_once(prompt), decide)
            .await
            .inspect_err(|e| log_failure("Gemini", e))
    }
}
