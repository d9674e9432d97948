//! Rename decision engine
//!
//! Turns a parsed name for one queued folder into exactly one of four
//! outcomes: apply the rename, hold it for approval, block it, or leave the
//! folder as it is. Drastic author changes are never applied without a
//! verifier's confirmation and never applied automatically.

use crate::drastic::is_drastic;
use crate::issues::is_multi_book_collection;
use crate::path_builder::{BookIdentity, PathBuilder};
use crate::patterns::{looks_like_person_name, resembles_title};
use crate::series::infer_series;
use crate::structure::{is_multi_book_files, is_series_folder};
use crate::verification::{ChangeVerifier, ProposedChange};
use log::{debug, info, warn};
use shelfwise_config::{LibraryConfig, ProcessingConfig};
use shelfwise_core::EntryStatus;
use shelfwise_llm::{Decision, ParsedName};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A folder as it currently sits in the library
#[derive(Debug, Clone, Copy)]
pub struct CurrentFolder<'a> {
    pub path: &'a Path,
    pub author: &'a str,
    pub title: &'a str,
    /// Library root the folder belongs to
    pub root: &'a Path,
}

/// A rename the engine is willing to propose
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedRename {
    pub identity: BookIdentity,
    pub destination: PathBuf,
    pub drastic: bool,
    /// Recorded on the history row when the rename is held
    pub reason: Option<String>,
}

/// Outcome for one queued folder
#[derive(Debug, Clone, PartialEq)]
pub enum RenameDecision {
    Apply(ProposedRename),
    PendingApproval(ProposedRename),
    Blocked { status: EntryStatus, reason: String },
    VerifiedNoChange,
}

impl RenameDecision {
    pub fn label(&self) -> &'static str {
        match self {
            RenameDecision::Apply(_) => "apply",
            RenameDecision::PendingApproval(_) => "pending_approval",
            RenameDecision::Blocked { .. } => "blocked",
            RenameDecision::VerifiedNoChange => "verified",
        }
    }
}

/// Structural pre-check run before any rename logic
///
/// Series containers, boxed sets, multi-book file sets, reversed
/// title/author pairs and author folders holding loose files are never
/// renamed as one book.
pub fn structural_block(
    path: &Path,
    author: &str,
    title: &str,
    library: &LibraryConfig,
) -> Option<(EntryStatus, String)> {
    if title.trim().is_empty() {
        return Some((
            EntryStatus::LooseFile,
            "Folder is an author folder, not a book".to_string(),
        ));
    }
    if is_multi_book_collection(title) {
        return Some((
            EntryStatus::NeedsSplit,
            "Folder name announces a collection".to_string(),
        ));
    }
    if resembles_title(author) && looks_like_person_name(title) {
        return Some((
            EntryStatus::StructureReversed,
            "Title folder sits above the author folder".to_string(),
        ));
    }
    if is_series_folder(path).unwrap_or(false) {
        return Some((
            EntryStatus::SeriesFolder,
            "Folder holds several numbered books".to_string(),
        ));
    }
    if is_multi_book_files(path, library).unwrap_or(false) {
        return Some((
            EntryStatus::MultiBookFiles,
            "Folder holds files for several books".to_string(),
        ));
    }
    None
}

/// Arbitrates between the folder name, the parse and the verifier
pub struct DecisionEngine {
    library: LibraryConfig,
    auto_fix: bool,
    protect_author_changes: bool,
    verifier: Option<Arc<ChangeVerifier>>,
}

impl DecisionEngine {
    pub fn new(library: LibraryConfig, processing: &ProcessingConfig) -> Self {
        Self {
            library,
            auto_fix: processing.auto_fix,
            protect_author_changes: processing.protect_author_changes,
            verifier: None,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<ChangeVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn library(&self) -> &LibraryConfig {
        &self.library
    }

    fn identity_from(parsed: &ParsedName, current: &CurrentFolder<'_>) -> BookIdentity {
        let mut identity = BookIdentity::new(parsed.author.trim(), parsed.title.trim());
        identity.narrator = parsed.narrator.clone().filter(|n| !n.trim().is_empty());
        identity.year = parsed.year;

        match parsed.series.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(series) => {
                identity.series = Some(series.trim().to_string());
                identity.series_num = parsed.series_num.clone();
            }
            None => {
                let inferred = infer_series(current.author, current.title, &identity.title);
                if let Some(series) = inferred.series {
                    identity.series = Some(series);
                    identity.series_num = inferred.series_num;
                    if let Some(title) = inferred.title.filter(|t| !t.trim().is_empty()) {
                        identity.title = title;
                    }
                }
            }
        }
        identity
    }

    fn destination(&self, root: &Path, identity: &BookIdentity) -> Option<PathBuf> {
        PathBuilder::new(root, &self.library).build(identity)
    }

    /// Decides what to do with one parsed folder name
    pub async fn decide(&self, current: CurrentFolder<'_>, parsed: &ParsedName) -> RenameDecision {
        if parsed.is_empty() {
            debug!("Empty parse for {}", current.path.display());
            return RenameDecision::VerifiedNoChange;
        }

        let mut identity = Self::identity_from(parsed, &current);

        let changed = identity.author != current.author
            || identity.title != current.title
            || identity.narrator.is_some();
        if !changed {
            return RenameDecision::VerifiedNoChange;
        }

        let mut drastic = is_drastic(current.author, &identity.author);
        let mut reason = None;

        if drastic && self.protect_author_changes {
            info!(
                "Drastic author change {} -> {}, verifying",
                current.author, identity.author
            );

            let verification = match &self.verifier {
                Some(verifier) => {
                    let original_input = format!("{}/{}", current.author, current.title);
                    verifier
                        .verify(&ProposedChange {
                            original_input: &original_input,
                            original_author: current.author,
                            original_title: current.title,
                            proposed_author: &identity.author,
                            proposed_title: &identity.title,
                        })
                        .await
                }
                None => None,
            };

            match verification {
                None => {
                    warn!(
                        "Held (verification failed): {} -> {}",
                        current.author, identity.author
                    );
                    return self.hold(current, identity, true, "Verification failed".to_string());
                }
                Some(v) if v.is_verified() || v.decision == Decision::Wrong => {
                    if !v.recommended_author.trim().is_empty() {
                        identity.author = v.recommended_author.trim().to_string();
                    }
                    if !v.recommended_title.trim().is_empty() {
                        identity.title = v.recommended_title.trim().to_string();
                    }
                    drastic = is_drastic(current.author, &identity.author);
                    info!(
                        "{}: {} -> {}",
                        if v.is_verified() { "Verified" } else { "Corrected" },
                        current.author,
                        identity.author
                    );
                    reason = Some(format!("{}: {}", v.decision.as_str(), v.reasoning));
                }
                Some(v) => {
                    warn!(
                        "Held (uncertain): {} -> {}",
                        current.author, identity.author
                    );
                    let reasoning = if v.reasoning.trim().is_empty() {
                        "needs review".to_string()
                    } else {
                        v.reasoning
                    };
                    return self.hold(current, identity, true, format!("Uncertain: {}", reasoning));
                }
            }
        }

        let Some(destination) = self.destination(current.root, &identity) else {
            return RenameDecision::Blocked {
                status: EntryStatus::Error,
                reason: format!(
                    "Unsafe destination for '{} - {}'",
                    identity.author, identity.title
                ),
            };
        };

        if destination == current.path {
            return RenameDecision::VerifiedNoChange;
        }

        let proposal = ProposedRename {
            identity,
            destination,
            drastic,
            reason,
        };
        if self.auto_fix && !drastic {
            RenameDecision::Apply(proposal)
        } else {
            info!(
                "Pending approval: {} -> {} (drastic={})",
                current.author, proposal.identity.author, drastic
            );
            RenameDecision::PendingApproval(proposal)
        }
    }

    fn hold(
        &self,
        current: CurrentFolder<'_>,
        identity: BookIdentity,
        drastic: bool,
        reason: String,
    ) -> RenameDecision {
        match self.destination(current.root, &identity) {
            Some(destination) => RenameDecision::PendingApproval(ProposedRename {
                identity,
                destination,
                drastic,
                reason: Some(reason),
            }),
            None => RenameDecision::Blocked {
                status: EntryStatus::PendingFix,
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shelfwise_content_sources::CandidateResolver;
    use shelfwise_llm::{
        Confidence, LlmClient, LlmError, LlmResult, Verification, VerificationRequest,
    };
    use std::fs;
    use tempfile::TempDir;

    struct FixedVerdict(Option<Verification>);

    #[async_trait]
    impl LlmClient for FixedVerdict {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn complete(&self, _prompt: &str) -> LlmResult<String> {
            Err(LlmError::Malformed("not used".to_string()))
        }

        async fn verify(&self, _request: &VerificationRequest) -> LlmResult<Verification> {
            self.0
                .clone()
                .ok_or_else(|| LlmError::EmptyResponse("fixed".to_string()))
        }
    }

    fn verdict(decision: Decision, author: &str, confidence: Confidence) -> Verification {
        Verification {
            decision,
            recommended_author: author.to_string(),
            recommended_title: "The Hollow Man".to_string(),
            reasoning: "catalog agrees".to_string(),
            confidence,
        }
    }

    fn engine(auto_fix: bool, answer: Option<Verification>) -> DecisionEngine {
        let processing = ProcessingConfig {
            auto_fix,
            ..Default::default()
        };
        let verifier = ChangeVerifier::new(
            Arc::new(CandidateResolver::new(Vec::new())),
            Arc::new(FixedVerdict(answer)),
        );
        DecisionEngine::new(LibraryConfig::default(), &processing).with_verifier(Arc::new(verifier))
    }

    fn parsed(author: &str, title: &str) -> ParsedName {
        ParsedName {
            author: author.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn folder<'a>(root: &'a Path, path: &'a Path, author: &'a str) -> CurrentFolder<'a> {
        CurrentFolder {
            path,
            author,
            title: "The Hollow Man",
            root,
        }
    }

    #[tokio::test]
    async fn test_surname_expansion_is_applied() {
        let root = Path::new("/library");
        let path = root.join("Boyett").join("The Hollow Man");
        let current = folder(root, &path, "Boyett");

        let decision = engine(true, None)
            .decide(current, &parsed("Steven Boyett", "The Hollow Man"))
            .await;
        match decision {
            RenameDecision::Apply(proposal) => {
                assert!(!proposal.drastic);
                assert_eq!(
                    proposal.destination,
                    root.join("Steven Boyett").join("The Hollow Man")
                );
            }
            other => panic!("expected apply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_without_auto_fix_rename_is_held() {
        let root = Path::new("/library");
        let path = root.join("Boyett").join("The Hollow Man");
        let current = folder(root, &path, "Boyett");

        let decision = engine(false, None)
            .decide(current, &parsed("Steven Boyett", "The Hollow Man"))
            .await;
        assert_eq!(decision.label(), "pending_approval");
    }

    #[tokio::test]
    async fn test_unchanged_and_empty_parse_are_verified() {
        let root = Path::new("/library");
        let path = root.join("Frank Herbert").join("Dune");
        let current = CurrentFolder {
            path: &path,
            author: "Frank Herbert",
            title: "Dune",
            root,
        };

        let engine = engine(true, None);
        assert_eq!(
            engine.decide(current, &parsed("Frank Herbert", "Dune")).await,
            RenameDecision::VerifiedNoChange
        );
        assert_eq!(
            engine.decide(current, &parsed("", "Dune")).await,
            RenameDecision::VerifiedNoChange
        );
    }

    #[tokio::test]
    async fn test_drastic_change_with_failed_verification_is_held() {
        let root = Path::new("/library");
        let path = root.join("Steven Boyett").join("The Hollow Man");
        let current = folder(root, &path, "Steven Boyett");

        let decision = engine(true, None)
            .decide(current, &parsed("John Dickson Carr", "The Hollow Man"))
            .await;
        match decision {
            RenameDecision::PendingApproval(proposal) => {
                assert!(proposal.drastic);
                assert_eq!(proposal.reason.as_deref(), Some("Verification failed"));
            }
            other => panic!("expected pending approval, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_uncertain_verdict_is_held_with_reasoning() {
        let root = Path::new("/library");
        let path = root.join("Steven Boyett").join("The Hollow Man");
        let current = folder(root, &path, "Steven Boyett");

        let answer = verdict(Decision::Uncertain, "John Dickson Carr", Confidence::Low);
        let decision = engine(true, Some(answer))
            .decide(current, &parsed("John Dickson Carr", "The Hollow Man"))
            .await;
        match decision {
            RenameDecision::PendingApproval(proposal) => {
                assert_eq!(proposal.reason.as_deref(), Some("Uncertain: catalog agrees"));
            }
            other => panic!("expected pending approval, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_verdict_corrects_the_author() {
        let root = Path::new("/library");
        let path = root.join("Steven Boyett").join("The Hollow Man");
        let current = folder(root, &path, "Steven Boyett");

        let answer = verdict(Decision::Wrong, "Steven R. Boyett", Confidence::High);
        let decision = engine(true, Some(answer))
            .decide(current, &parsed("John Dickson Carr", "The Hollow Man"))
            .await;
        match decision {
            RenameDecision::Apply(proposal) => {
                assert_eq!(proposal.identity.author, "Steven R. Boyett");
                assert!(!proposal.drastic);
            }
            other => panic!("expected apply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirmed_drastic_change_still_needs_approval() {
        let root = Path::new("/library");
        let path = root.join("Steven Boyett").join("The Hollow Man");
        let current = folder(root, &path, "Steven Boyett");

        let answer = verdict(Decision::Correct, "John Dickson Carr", Confidence::High);
        let decision = engine(true, Some(answer))
            .decide(current, &parsed("John Dickson Carr", "The Hollow Man"))
            .await;
        assert_eq!(decision.label(), "pending_approval");
    }

    #[tokio::test]
    async fn test_series_taken_from_original_title() {
        let root = Path::new("/library");
        let path = root
            .join("Brandon Sanderson")
            .join("Mistborn Book 1 - The Final Empire");
        let current = CurrentFolder {
            path: &path,
            author: "Brandon Sanderson",
            title: "Mistborn Book 1 - The Final Empire",
            root,
        };

        let decision = engine(true, None)
            .decide(current, &parsed("Brandon Sanderson", "The Final Empire"))
            .await;
        match decision {
            RenameDecision::Apply(proposal) => {
                assert_eq!(proposal.identity.series.as_deref(), Some("Mistborn"));
                assert_eq!(proposal.identity.series_num.as_deref(), Some("1"));
            }
            other => panic!("expected apply, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_block() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Book 1 - Necroscope")).unwrap();
        fs::create_dir_all(dir.path().join("Book 2 - Wamphyri")).unwrap();

        let library = LibraryConfig::default();
        let blocked = structural_block(dir.path(), "Brian Lumley", "Necroscope", &library);
        assert_eq!(blocked.map(|(s, _)| s), Some(EntryStatus::SeriesFolder));

        let single = TempDir::new().unwrap();
        assert_eq!(
            structural_block(single.path(), "Frank Herbert", "Dune", &library),
            None
        );
    }

    #[test]
    fn test_structural_block_by_name() {
        let dir = TempDir::new().unwrap();
        let library = LibraryConfig::default();
        let status = |author: &str, title: &str| {
            structural_block(dir.path(), author, title, &library).map(|(s, _)| s)
        };

        assert_eq!(
            status("Brian Lumley", "Necroscope Complete Series"),
            Some(EntryStatus::NeedsSplit)
        );
        assert_eq!(
            status("The Hollow Man", "Steven Boyett"),
            Some(EntryStatus::StructureReversed)
        );
        assert_eq!(status("Stephen King", ""), Some(EntryStatus::LooseFile));
        assert_eq!(status("Boyett", "The Hollow Man [128k]"), None);
    }
}
