// FILE: crates/library/src/manager.rs

use crate::classifier::{ClassifiedPath, PathClassifier};
use crate::decision::DecisionEngine;
use crate::error::{LibraryError, LibraryResult};
use crate::fixer::{ApplyOutcome, BulkOutcome, Fixer};
use crate::orphans::{find_orphans, organize_orphans, OrphanGroup};
use crate::path_builder::is_within_root;
use crate::processor::{BatchOutcome, BatchProcessor, Pacing};
use crate::scanner::{LibraryScanner, ScanReport};
use crate::verification::ChangeVerifier;
use crate::worker::StopSignal;
use log::{info, warn};
use shelfwise_config::Config;
use shelfwise_content_sources::{
    build_sources, CandidateResolver, MetadataSource, NameDatabase, SqliteNameDatabase,
};
use shelfwise_core::{
    DailyStats, EntryStatus, HistoryId, HistoryRecord, HistoryStatus, LibraryEntry, LibraryStats,
    QueueId, QueuedEntry,
};
use shelfwise_database::queries::{entries, history, queue, stats};
use shelfwise_database::DbPool;
use shelfwise_llm::{build_client, LlmClient, LlmError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// External services the manager talks to
#[derive(Default)]
pub struct Collaborators {
    pub sources: Vec<Arc<dyn MetadataSource>>,
    /// Without a model the queue can be filled but not processed
    pub llm: Option<Arc<dyn LlmClient>>,
    pub names: Option<Arc<dyn NameDatabase>>,
}

impl Collaborators {
    /// Builds sources, the model client and the name database from config
    ///
    /// A missing API key leaves `llm` empty instead of failing.
    pub fn from_config(config: &Config, pool: &DbPool) -> LibraryResult<Self> {
        let sources = build_sources(&config.providers, Some(pool.clone()))?;

        let llm = match build_client(&config.llm) {
            Ok(client) => Some(client),
            Err(LlmError::MissingApiKey(provider)) => {
                warn!(
                    "No API key for {}; queue processing is unavailable",
                    provider
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        let names: Arc<dyn NameDatabase> = Arc::new(SqliteNameDatabase::new(pool.clone()));
        Ok(Self {
            sources,
            llm,
            names: Some(names),
        })
    }
}

/// Entry point for every library operation
pub struct LibraryManager {
    config: Config,
    pool: DbPool,
    classifier: PathClassifier,
    scanner: LibraryScanner,
    fixer: Fixer,
    processor: Option<BatchProcessor>,
}

impl LibraryManager {
    /// Creates a manager with collaborators built from `config`
    pub fn new(config: Config, pool: DbPool) -> LibraryResult<Self> {
        let collaborators = Collaborators::from_config(&config, &pool)?;
        Ok(Self::with_collaborators(config, pool, collaborators))
    }

    pub fn with_collaborators(config: Config, pool: DbPool, collaborators: Collaborators) -> Self {
        let mut classifier =
            PathClassifier::new(config.processing.series_tie_break, &config.library);
        if let Some(names) = collaborators.names {
            classifier = classifier.with_names(names);
        }

        let resolver = Arc::new(CandidateResolver::new(collaborators.sources));
        info!("Metadata sources: {:?}", resolver.source_names());

        let processor = collaborators.llm.map(|llm| {
            let verifier = ChangeVerifier::new(resolver.clone(), llm.clone());
            let engine = DecisionEngine::new(config.library.clone(), &config.processing)
                .with_verifier(Arc::new(verifier));
            BatchProcessor::new(
                pool.clone(),
                config.library.clone(),
                &config.processing,
                resolver.clone(),
                llm,
                engine,
            )
        });

        Self {
            scanner: LibraryScanner::new(pool.clone(), config.library.clone(), classifier.clone()),
            fixer: Fixer::new(pool.clone(), config.library.clone()),
            classifier,
            processor,
            config,
            pool,
        }
    }

    /// Replaces the waits used by `process_all`
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.processor = self.processor.map(|p| p.with_pacing(pacing));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn can_process(&self) -> bool {
        self.processor.is_some()
    }

    fn processor(&self) -> LibraryResult<&BatchProcessor> {
        self.processor.as_ref().ok_or_else(|| {
            LibraryError::invalid_state("process queue", "no language model is configured")
        })
    }

    fn root_for(&self, path: &Path) -> LibraryResult<&Path> {
        self.config
            .library
            .library_paths
            .iter()
            .find(|root| path.starts_with(root) || is_within_root(path, root))
            .map(PathBuf::as_path)
            .ok_or_else(|| LibraryError::OutsideLibrary {
                path: path.to_path_buf(),
                root: self
                    .config
                    .library
                    .library_paths
                    .first()
                    .cloned()
                    .unwrap_or_default(),
            })
    }

    // Scanning

    pub async fn scan(&self) -> LibraryResult<ScanReport> {
        self.scanner.scan().await
    }

    pub async fn deep_rescan(&self) -> LibraryResult<(usize, i64)> {
        self.scanner.deep_rescan().await
    }

    /// Classifies a path below one of the library roots
    pub async fn classify(&self, path: &Path) -> LibraryResult<ClassifiedPath> {
        let root = self.root_for(path)?;
        self.classifier.classify(path, root).await
    }

    pub async fn entries(&self, status: Option<EntryStatus>) -> LibraryResult<Vec<LibraryEntry>> {
        Ok(entries::list_entries(&self.pool, status).await?)
    }

    // Processing

    pub async fn process_queue(&self, limit: Option<usize>) -> LibraryResult<BatchOutcome> {
        self.processor()?.process_queue(limit).await
    }

    pub async fn process_all(&self, stop: &StopSignal) -> LibraryResult<BatchOutcome> {
        self.processor()?.process_all(stop).await
    }

    pub async fn queue(&self, limit: i64) -> LibraryResult<Vec<QueuedEntry>> {
        Ok(queue::next_batch(&self.pool, limit).await?)
    }

    pub async fn remove_from_queue(&self, queue_id: QueueId) -> LibraryResult<()> {
        self.fixer.remove_from_queue(queue_id).await
    }

    // Review

    pub async fn pending(&self) -> LibraryResult<Vec<HistoryRecord>> {
        Ok(history::list_history(&self.pool, Some(HistoryStatus::PendingFix), i64::MAX).await?)
    }

    pub async fn history(
        &self,
        status: Option<HistoryStatus>,
        limit: i64,
    ) -> LibraryResult<Vec<HistoryRecord>> {
        Ok(history::list_history(&self.pool, status, limit).await?)
    }

    pub async fn recent_history(&self) -> LibraryResult<Vec<HistoryRecord>> {
        self.history(None, self.config.app.recent_history_limit as i64)
            .await
    }

    pub async fn apply_fix(&self, history_id: HistoryId) -> LibraryResult<ApplyOutcome> {
        let outcome = self.fixer.apply_fix(history_id).await?;
        if outcome.is_applied() {
            stats::bump(&self.pool, stats::Counter::Fixed, 1).await?;
        }
        Ok(outcome)
    }

    pub async fn apply_all_pending(&self) -> LibraryResult<BulkOutcome> {
        let outcome = self.fixer.apply_all_pending().await?;
        stats::bump(&self.pool, stats::Counter::Fixed, outcome.applied as i64).await?;
        Ok(outcome)
    }

    pub async fn reject_fix(&self, history_id: HistoryId) -> LibraryResult<()> {
        self.fixer.reject_fix(history_id).await
    }

    pub async fn dismiss_error(&self, history_id: HistoryId) -> LibraryResult<()> {
        self.fixer.dismiss_error(history_id).await
    }

    pub async fn undo(&self, history_id: HistoryId) -> LibraryResult<()> {
        self.fixer.undo(history_id).await
    }

    pub async fn find_drastic_changes(&self) -> LibraryResult<Vec<HistoryRecord>> {
        self.fixer.find_drastic_changes().await
    }

    pub async fn undo_all_drastic(&self) -> LibraryResult<BulkOutcome> {
        self.fixer.undo_all_drastic().await
    }

    // Loose files

    pub fn orphans(&self) -> LibraryResult<Vec<OrphanGroup>> {
        let mut groups = Vec::new();
        for root in &self.config.library.library_paths {
            if root.is_dir() {
                groups.extend(find_orphans(root, &self.config.library)?);
            }
        }
        Ok(groups)
    }

    pub fn organize_orphans(&self, group: &OrphanGroup) -> LibraryResult<PathBuf> {
        let root = self.root_for(&group.author_path)?;
        if group.author_path == root {
            return Err(LibraryError::invalid_state(
                "organize files",
                "files must sit in an author folder",
            ));
        }
        organize_orphans(group)
    }

    /// Organizes every group with a known title
    ///
    /// Returns the number of groups organized and the number that failed.
    pub fn organize_all_orphans(&self) -> LibraryResult<(usize, usize)> {
        let mut organized = 0;
        let mut failed = 0;
        for group in self.orphans()? {
            if group.title == crate::orphans::UNKNOWN_ALBUM {
                continue;
            }
            match self.organize_orphans(&group) {
                Ok(_) => organized += 1,
                Err(e) => {
                    warn!("Could not organize '{}': {}", group.title, e);
                    failed += 1;
                }
            }
        }
        Ok((organized, failed))
    }

    // Maintenance

    pub async fn stats(&self) -> LibraryResult<LibraryStats> {
        Ok(stats::library_stats(&self.pool).await?)
    }

    pub async fn daily_stats(&self, days: i64) -> LibraryResult<Vec<DailyStats>> {
        Ok(stats::recent_days(&self.pool, days).await?)
    }

    pub async fn clear_history(&self) -> LibraryResult<u64> {
        let cleared = history::clear_history(&self.pool).await?;
        info!("History cleared ({} records)", cleared);
        Ok(cleared)
    }

    pub async fn reset_database(&self) -> LibraryResult<()> {
        stats::reset_all(&self.pool).await?;
        warn!("Database reset");
        Ok(())
    }
}
