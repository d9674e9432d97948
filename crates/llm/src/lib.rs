// FILE: crates/llm/src/lib.rs
//! Language model collaborator
//!
//! Builds the batch parse and verification prompts, sends them to the
//! configured provider and parses whatever comes back as tolerantly as
//! possible. Anything that cannot be read as the expected structure is an
//! error the caller treats as "no result".

mod client;
mod error;
mod gemini;
mod openrouter;
pub mod prompts;
pub mod response;
mod types;

pub use client::{build_client, LlmClient};
pub use error::{explain_status, LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use openrouter::OpenRouterClient;
pub use prompts::{build_parse_prompt, build_verification_prompt, PromptItem, VerificationRequest};
pub use types::{Confidence, Decision, ParsedName, Verification};
