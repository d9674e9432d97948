// FILE: crates/library/src/processor.rs
//! Draws batches from the queue and carries each item to a decision

use crate::decision::{structural_block, CurrentFolder, DecisionEngine, RenameDecision};
use crate::error::{LibraryError, LibraryResult};
use crate::fixer::{ApplyOutcome, Fixer, RenameRequest};
use crate::folder_hints::gather_folder_hints;
use crate::path_builder::is_within_root;
use crate::worker::StopSignal;
use log::{debug, error, info, warn};
use shelfwise_config::{LibraryConfig, ProcessingConfig};
use shelfwise_content_sources::{CandidateResolver, SearchHints};
use shelfwise_core::{EntryStatus, HistoryStatus, NewHistoryRecord, QueuedEntry};
use shelfwise_database::queries::{entries, history, queue, stats, Counter};
use shelfwise_database::DbPool;
use shelfwise_llm::{LlmClient, ParsedName, PromptItem};
use shelfwise_resilience::RequestBudget;
use std::ops::AddAssign;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Waits used by `process_all`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after every batch
    pub inter_batch: Duration,
    /// Grows with each consecutive budget hit
    pub backoff_unit: Duration,
    pub backoff_cap: Duration,
    /// Pause after a batch that processed nothing
    pub empty_wait: Duration,
    /// Consecutive empty batches tolerated before giving up
    pub max_empty_batches: usize,
}

impl Pacing {
    pub fn from_config(processing: &ProcessingConfig) -> Self {
        Self {
            inter_batch: processing.inter_batch_delay(),
            backoff_unit: Duration::from_secs(300),
            backoff_cap: Duration::from_secs(1800),
            empty_wait: Duration::from_secs(10),
            max_empty_batches: 3,
        }
    }

    /// No waiting at all
    pub fn immediate() -> Self {
        Self {
            inter_batch: Duration::ZERO,
            backoff_unit: Duration::ZERO,
            backoff_cap: Duration::ZERO,
            empty_wait: Duration::ZERO,
            max_empty_batches: 1,
        }
    }

    fn backoff(&self, hits: u32) -> Duration {
        self.backoff_unit.saturating_mul(hits).min(self.backoff_cap)
    }
}

/// Counts for one or more batches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: usize,
    pub fixed: usize,
    pub pending: usize,
    pub verified: usize,
    pub blocked: usize,
    pub conflicts: usize,
    pub errors: usize,
    /// The hourly request budget was spent before the batch could run
    pub budget_exhausted: bool,
}

impl AddAssign<&BatchOutcome> for BatchOutcome {
    fn add_assign(&mut self, other: &BatchOutcome) {
        self.processed += other.processed;
        self.fixed += other.fixed;
        self.pending += other.pending;
        self.verified += other.verified;
        self.blocked += other.blocked;
        self.conflicts += other.conflicts;
        self.errors += other.errors;
    }
}

/// Sleeps in short steps so a stop request is noticed quickly
async fn pause(duration: Duration, stop: &StopSignal) {
    let step = Duration::from_secs(1);
    let mut left = duration;
    while !left.is_zero() && !stop.is_stopped() {
        let chunk = left.min(step);
        tokio::time::sleep(chunk).await;
        left -= chunk;
    }
}

pub struct BatchProcessor {
    pool: DbPool,
    library: LibraryConfig,
    batch_size: usize,
    resolver: Arc<CandidateResolver>,
    llm: Arc<dyn LlmClient>,
    engine: DecisionEngine,
    fixer: Fixer,
    budget: RequestBudget,
    pacing: Pacing,
}

impl BatchProcessor {
    pub fn new(
        pool: DbPool,
        library: LibraryConfig,
        processing: &ProcessingConfig,
        resolver: Arc<CandidateResolver>,
        llm: Arc<dyn LlmClient>,
        engine: DecisionEngine,
    ) -> Self {
        Self {
            fixer: Fixer::new(pool.clone(), library.clone()),
            pool,
            library,
            batch_size: processing.batch_size.max(1),
            resolver,
            llm,
            engine,
            budget: RequestBudget::hourly(processing.max_requests_per_hour),
            pacing: Pacing::from_config(processing),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_budget(mut self, budget: RequestBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn budget(&self) -> &RequestBudget {
        &self.budget
    }

    fn root_for(&self, item: &QueuedEntry) -> Option<PathBuf> {
        self.library
            .library_paths
            .iter()
            .find(|root| item.path.starts_with(root) || is_within_root(&item.path, root))
            .cloned()
    }

    async fn prompt_item(&self, item: &QueuedEntry) -> PromptItem {
        let hints = gather_folder_hints(&item.path, &self.library);
        let search = SearchHints {
            author: hints.author().map(str::to_string),
            title: hints.title().map(str::to_string),
        };

        let mut prompt = PromptItem::new(item.display_name());
        prompt.api_hint = self.resolver.lookup(&item.display_name(), &search).await;
        prompt.folder_hints = hints.format_for_prompt();
        prompt
    }

    /// Processes one batch of at most `limit` items
    ///
    /// Items the parser returned nothing for stay queued. A failed model
    /// call leaves the whole batch queued.
    pub async fn process_queue(&self, limit: Option<usize>) -> LibraryResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        if !self.budget.has_capacity() {
            warn!(
                "Request budget reached: {}/{} this hour",
                self.budget.used(),
                self.budget.max_requests()
            );
            outcome.budget_exhausted = true;
            return Ok(outcome);
        }

        let size = limit.map_or(self.batch_size, |l| l.min(self.batch_size));
        let batch = queue::next_batch(&self.pool, size as i64).await?;
        if batch.is_empty() {
            return Ok(outcome);
        }
        info!("Processing batch of {} items", batch.len());

        let mut to_parse = Vec::new();
        for item in batch {
            let block = structural_block(
                &item.path,
                &item.current_author,
                &item.current_title,
                &self.library,
            );
            match block {
                Some((status, reason)) => {
                    info!("Not renaming {}: {}", item.path.display(), reason);
                    entries::set_status(&self.pool, item.entry_id, status, Some(&reason)).await?;
                    queue::remove_queue_item(&self.pool, item.queue_id).await?;
                    outcome.processed += 1;
                    outcome.blocked += 1;
                }
                None => to_parse.push(item),
            }
        }
        if to_parse.is_empty() {
            return Ok(outcome);
        }

        let mut prompts = Vec::with_capacity(to_parse.len());
        for item in &to_parse {
            debug!("  {}", item.display_name());
            prompts.push(self.prompt_item(item).await);
        }

        if self.budget.try_acquire().is_err() {
            outcome.budget_exhausted = true;
            return Ok(outcome);
        }
        stats::bump(&self.pool, Counter::ApiCalls, 1).await?;

        let results = match self.llm.parse_names(&prompts).await {
            Ok(results) => results,
            Err(e) => {
                error!("Parsing batch via {} failed: {}", self.llm.name(), e);
                return Ok(outcome);
            }
        };

        for (item, parsed) in to_parse.iter().zip(results) {
            let Some(parsed) = parsed else {
                debug!("No answer for {}, left queued", item.display_name());
                continue;
            };

            outcome.processed += 1;
            if let Err(e) = self.handle_item(item, &parsed, &mut outcome).await {
                error!("Error processing {}: {}", item.path.display(), e);
                outcome.errors += 1;
                let message = e.to_string();
                entries::set_status(&self.pool, item.entry_id, EntryStatus::Error, Some(&message))
                    .await?;
                queue::dequeue_entry(&self.pool, item.entry_id).await?;
            }
        }

        info!(
            "Batch done: {} processed, {} fixed, {} pending, {} verified",
            outcome.processed, outcome.fixed, outcome.pending, outcome.verified
        );
        Ok(outcome)
    }

    async fn handle_item(
        &self,
        item: &QueuedEntry,
        parsed: &ParsedName,
        outcome: &mut BatchOutcome,
    ) -> LibraryResult<()> {
        let root = self.root_for(item).ok_or_else(|| LibraryError::OutsideLibrary {
            path: item.path.clone(),
            root: self
                .library
                .library_paths
                .first()
                .cloned()
                .unwrap_or_default(),
        })?;

        let current = CurrentFolder {
            path: &item.path,
            author: &item.current_author,
            title: &item.current_title,
            root: &root,
        };

        match self.engine.decide(current, parsed).await {
            RenameDecision::VerifiedNoChange => {
                entries::set_status(&self.pool, item.entry_id, EntryStatus::Verified, None).await?;
                stats::bump(&self.pool, Counter::Verified, 1).await?;
                info!("Verified OK: {}", item.display_name());
                outcome.verified += 1;
            }
            RenameDecision::Blocked { status, reason } => {
                warn!("Blocked {}: {}", item.display_name(), reason);
                entries::set_status(&self.pool, item.entry_id, status, Some(&reason)).await?;
                outcome.blocked += 1;
            }
            RenameDecision::PendingApproval(proposal) => {
                let record = NewHistoryRecord {
                    entry_id: item.entry_id,
                    old_author: item.current_author.clone(),
                    old_title: item.current_title.clone(),
                    old_path: item.path.clone(),
                    new_author: proposal.identity.author,
                    new_title: proposal.identity.title,
                    new_path: proposal.destination,
                    status: HistoryStatus::PendingFix,
                    error_message: proposal.reason,
                };
                history::record_pending_fix(&self.pool, &record).await?;
                outcome.pending += 1;
            }
            RenameDecision::Apply(proposal) => {
                let request = RenameRequest {
                    entry_id: item.entry_id,
                    old_author: item.current_author.clone(),
                    old_title: item.current_title.clone(),
                    old_path: item.path.clone(),
                    identity: proposal.identity,
                    destination: proposal.destination,
                };
                match self.fixer.apply_new(&request).await? {
                    ApplyOutcome::Applied { .. } => {
                        stats::bump(&self.pool, Counter::Fixed, 1).await?;
                        outcome.fixed += 1;
                    }
                    ApplyOutcome::Conflict { .. } => outcome.conflicts += 1,
                    ApplyOutcome::Failed { .. } => outcome.errors += 1,
                }
            }
        }

        queue::dequeue_entry(&self.pool, item.entry_id).await?;
        Ok(())
    }

    /// Processes batches until the queue is empty or `stop` is raised
    pub async fn process_all(&self, stop: &StopSignal) -> LibraryResult<BatchOutcome> {
        let total = queue::queue_length(&self.pool).await?;
        if total == 0 {
            info!("Queue is empty, nothing to process");
            return Ok(BatchOutcome::default());
        }
        info!(
            "Processing {} queued items, {:?} between batches",
            total, self.pacing.inter_batch
        );

        let mut totals = BatchOutcome::default();
        let mut budget_hits = 0u32;
        let mut empty_batches = 0usize;

        while !stop.is_stopped() {
            if queue::queue_length(&self.pool).await? == 0 {
                break;
            }

            let batch = self.process_queue(None).await?;
            if batch.budget_exhausted {
                budget_hits += 1;
                let wait = self.pacing.backoff(budget_hits);
                info!("Request budget reached, waiting {:?}", wait);
                totals.budget_exhausted = true;
                if wait.is_zero() {
                    break;
                }
                pause(wait, stop).await;
                continue;
            }
            budget_hits = 0;

            if batch.processed == 0 {
                empty_batches += 1;
                if empty_batches >= self.pacing.max_empty_batches {
                    warn!("{} batches in a row made no progress, stopping", empty_batches);
                    break;
                }
                pause(self.pacing.empty_wait, stop).await;
                continue;
            }
            empty_batches = 0;

            totals += &batch;
            pause(self.pacing.inter_batch, stop).await;
        }

        info!(
            "Processing complete: {} processed, {} fixed, {} pending",
            totals.processed, totals.fixed, totals.pending
        );
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_to_cap() {
        let pacing = Pacing::from_config(&ProcessingConfig::default());
        assert_eq!(pacing.backoff(1), Duration::from_secs(300));
        assert_eq!(pacing.backoff(3), Duration::from_secs(900));
        assert_eq!(pacing.backoff(10), Duration::from_secs(1800));
    }

    #[test]
    fn test_default_spacing_follows_budget() {
        let pacing = Pacing::from_config(&ProcessingConfig::default());
        assert_eq!(pacing.inter_batch, Duration::from_secs(120));
    }

    #[test]
    fn test_outcomes_add_up() {
        let mut total = BatchOutcome::default();
        let batch = BatchOutcome {
            processed: 3,
            fixed: 1,
            verified: 2,
            ..Default::default()
        };
        total += &batch;
        total += &batch;
        assert_eq!(total.processed, 6);
        assert_eq!(total.verified, 4);
    }
}
