//! Second opinion on drastic author changes

use log::{info, warn};
use shelfwise_content_sources::CandidateResolver;
use shelfwise_core::Candidate;
use shelfwise_llm::{LlmClient, Verification, VerificationRequest};
use std::collections::HashSet;
use std::sync::Arc;

/// A proposed author/title change as seen by the verifier
#[derive(Debug, Clone)]
pub struct ProposedChange<'a> {
    pub original_input: &'a str,
    pub original_author: &'a str,
    pub original_title: &'a str,
    pub proposed_author: &'a str,
    pub proposed_title: &'a str,
}

/// Gathers candidates for both sides of a change and asks the model to judge
pub struct ChangeVerifier {
    resolver: Arc<CandidateResolver>,
    llm: Arc<dyn LlmClient>,
}

impl ChangeVerifier {
    pub fn new(resolver: Arc<CandidateResolver>, llm: Arc<dyn LlmClient>) -> Self {
        Self { resolver, llm }
    }

    /// Candidates for the original and the proposed pair, merged
    async fn gather_candidates(&self, change: &ProposedChange<'_>) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        let queries = [
            (change.original_title, change.original_author),
            (change.proposed_title, change.proposed_author),
        ];
        for (title, author) in queries {
            for candidate in self.resolver.resolve_all(title, Some(author)).await {
                if seen.insert(candidate.dedup_key()) {
                    candidates.push(candidate);
                }
            }
        }
        candidates
    }

    /// Returns `None` when the model could not be asked or did not answer
    pub async fn verify(&self, change: &ProposedChange<'_>) -> Option<Verification> {
        let candidates = self.gather_candidates(change).await;
        info!(
            "Verifying '{}' -> '{}' with {} candidates",
            change.original_author,
            change.proposed_author,
            candidates.len()
        );

        let request = VerificationRequest {
            original_input: change.original_input.to_string(),
            original_author: change.original_author.to_string(),
            original_title: change.original_title.to_string(),
            proposed_author: change.proposed_author.to_string(),
            proposed_title: change.proposed_title.to_string(),
            candidates,
        };

        match self.llm.verify(&request).await {
            Ok(verification) => Some(verification),
            Err(e) => {
                warn!("Verification via {} failed: {}", self.llm.name(), e);
                None
            }
        }
    }
}
