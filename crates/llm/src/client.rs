// FILE: crates/llm/src/client.rs
//! The language model seam and the shared 429 retry policy

use crate::prompts::{build_parse_prompt, build_verification_prompt};
use crate::response::{parse_names, parse_verification};
use crate::{
    GeminiClient, LlmError, LlmResult, OpenRouterClient, ParsedName, PromptItem, Verification,
    VerificationRequest,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use shelfwise_config::{LlmConfig, LlmProvider};
use shelfwise_network::{Client, ClientConfig};
use shelfwise_resilience::{RetryDecision, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

static RETRY_IN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"retry in (\d+(?:\.\d+)?)s").expect("valid regex"));

/// Fallback wait per attempt when the server gives no hint
const DEFAULT_BACKOFF: Duration = Duration::from_secs(45);

/// Added to a server-supplied wait
const HINT_PADDING: Duration = Duration::from_secs(5);

/// A text-in, text-out model
///
/// Implementors only provide `complete`; prompt building and response
/// parsing come with the trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends one prompt and returns the raw answer text
    async fn complete(&self, prompt: &str) -> LlmResult<String>;

    /// Parses a batch of folder names with one model call
    ///
    /// The result has one slot per input item.
    async fn parse_names(&self, items: &[PromptItem]) -> LlmResult<Vec<Option<ParsedName>>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_parse_prompt(items);
        let text = self.complete(&prompt).await?;
        parse_names(&text, items.len())
    }

    /// Asks the model to judge a drastic author change
    async fn verify(&self, request: &VerificationRequest) -> LlmResult<Verification> {
        let prompt = build_verification_prompt(request);
        let text = self.complete(&prompt).await?;
        let verification =
            parse_verification(&text, &request.original_author, &request.original_title)?;

        log::info!(
            "Verification result: {} ({}): {}",
            verification.decision.as_str(),
            verification.confidence.as_str(),
            verification.reasoning.chars().take(100).collect::<String>()
        );
        Ok(verification)
    }
}

/// Builds the client for the configured provider
///
/// Fails with `MissingApiKey` when neither the config nor the environment
/// carries a key.
pub fn build_client(config: &LlmConfig) -> LlmResult<Arc<dyn LlmClient>> {
    let api_key = config
        .api_key()
        .ok_or_else(|| LlmError::MissingApiKey(config.provider.to_string()))?;

    let http = Client::with_config(ClientConfig::with_timeout(Duration::from_secs(
        config.request_timeout_secs,
    )))?;
    let policy = retry_policy(config.max_retries);

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::OpenRouter => Arc::new(
            OpenRouterClient::new(http, api_key, config.model()).with_retry_policy(policy),
        ),
        LlmProvider::Gemini => {
            Arc::new(GeminiClient::new(http, api_key, config.model()).with_retry_policy(policy))
        }
    };

    log::debug!("Language model: {} ({})", client.name(), config.model());
    Ok(client)
}

/// `max_retries` retries after the first attempt, 45 s per attempt by default
pub(crate) fn retry_policy(max_retries: usize) -> RetryPolicy {
    RetryPolicy::new(max_retries + 1)
        .with_initial_delay(DEFAULT_BACKOFF)
        .with_max_delay(Duration::from_secs(600))
        .with_linear_backoff()
        .with_hint_padding(HINT_PADDING)
}

/// Server-suggested wait from a "retry in 12.5s" message or `Retry-After`
pub(crate) fn retry_hint(error: &LlmError) -> Option<Duration> {
    let LlmError::Network(network) = error else {
        return None;
    };

    if let Some(body) = network.body() {
        if let Some(caps) = RETRY_IN.captures(body) {
            if let Ok(secs) = caps[1].parse::<f64>() {
                return Some(Duration::from_secs_f64(secs));
            }
        }
    }

    match network {
        shelfwise_network::NetworkError::Status { retry_after, .. } => *retry_after,
        _ => None,
    }
}

/// Only throttled calls are retried
pub(crate) fn decide(error: &LlmError) -> RetryDecision {
    if !error.is_rate_limited() {
        return RetryDecision::Stop;
    }

    match retry_hint(error) {
        Some(hint) => RetryDecision::RetryAfter(hint),
        None => RetryDecision::Retry,
    }
}

/// Logs a provider failure the way users can act on it
pub(crate) fn log_failure(provider: &str, error: &LlmError) {
    match error {
        LlmError::Network(network) => match network.status() {
            Some(status) => log::warn!(
                "{}: {}",
                provider,
                crate::explain_status(status, provider)
            ),
            None => log::error!("{}: {}", provider, network),
        },
        other => log::warn!("{}: {}", provider, other),
    }
}
