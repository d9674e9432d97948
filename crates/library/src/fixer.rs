// FILE: crates/library/src/fixer.rs
//! Moves book folders and keeps the audit trail in step
//!
//! A folder is only ever moved into a destination that is missing or an
//! empty directory. The history row and the entry are written in one
//! transaction after the move; if that write fails the folder is moved back.

use crate::drastic::is_drastic;
use crate::error::{LibraryError, LibraryResult};
use crate::path_builder::{is_within_root, BookIdentity, PathBuilder};
use log::{debug, error, info, warn};
use shelfwise_config::LibraryConfig;
use shelfwise_core::{
    AppError, EntryId, EntryStatus, HistoryId, HistoryRecord, HistoryStatus, NewHistoryRecord,
};
use shelfwise_database::queries::{entries, history, queue};
use shelfwise_database::DbPool;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Fixed records checked for drastic changes
pub const DRASTIC_SCAN_LIMIT: i64 = 50;

const UNDONE_MESSAGE: &str = "Manually undone by user";
const AUTO_UNDONE_MESSAGE: &str = "Auto-undone: drastic author change";

/// Result of one rename attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        history_id: HistoryId,
        new_path: PathBuf,
        merged_entry: Option<EntryId>,
    },
    /// Destination holds another book; nothing was moved
    Conflict { path: PathBuf },
    Failed { message: String },
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

/// Totals of a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub applied: usize,
    pub conflicts: usize,
    pub failed: usize,
}

/// Where a folder currently is and what it should become
#[derive(Debug, Clone)]
pub struct RenameRequest {
    pub entry_id: EntryId,
    pub old_author: String,
    pub old_title: String,
    pub old_path: PathBuf,
    pub identity: BookIdentity,
    pub destination: PathBuf,
}

/// Missing, or an empty directory
fn is_free(path: &Path) -> bool {
    if !path.exists() {
        return true;
    }
    path.is_dir()
        && fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push("_temp");
    path.with_file_name(name)
}

/// Moves `from` to `to`, which must be missing or an empty directory
fn move_folder(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        let temp = temp_sibling(to);
        fs::rename(from, &temp)?;
        let placed = fs::remove_dir(to).and_then(|()| fs::rename(&temp, to));
        if let Err(e) = placed {
            fs::rename(&temp, from)?;
            return Err(e);
        }
        Ok(())
    } else {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)
    }
}

/// Removes empty folders left above `old_path`, never `root` itself
fn prune_empty_parents(old_path: &Path, root: &Path) {
    let mut current = old_path.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        let empty = fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !empty || fs::remove_dir(dir).is_err() {
            break;
        }
        debug!("Removed empty folder {}", dir.display());
        current = dir.parent();
    }
}

/// Applies, approves, rejects and undoes renames
#[derive(Clone)]
pub struct Fixer {
    pool: DbPool,
    library: LibraryConfig,
}

impl Fixer {
    pub fn new(pool: DbPool, library: LibraryConfig) -> Self {
        Self { pool, library }
    }

    /// The configured root that contains `path`
    fn root_for(&self, path: &Path) -> Option<PathBuf> {
        self.library
            .library_paths
            .iter()
            .find(|root| path.starts_with(root) || is_within_root(path, root))
            .cloned()
    }

    fn history_record(request: &RenameRequest, new_path: &Path) -> NewHistoryRecord {
        NewHistoryRecord {
            entry_id: request.entry_id,
            old_author: request.old_author.clone(),
            old_title: request.old_title.clone(),
            old_path: request.old_path.clone(),
            new_author: request.identity.author.clone(),
            new_title: request.identity.title.clone(),
            new_path: new_path.to_path_buf(),
            status: HistoryStatus::Fixed,
            error_message: None,
        }
    }

    /// Moves the folder, then records the move; moves it back on failure
    async fn execute(
        &self,
        record: NewHistoryRecord,
        approved: Option<HistoryId>,
        root: Option<&Path>,
    ) -> LibraryResult<ApplyOutcome> {
        if let Err(e) = move_folder(&record.old_path, &record.new_path) {
            let message = format!("Move failed: {}", e);
            error!(
                "Moving {} to {} failed: {}",
                record.old_path.display(),
                record.new_path.display(),
                e
            );
            entries::set_status(&self.pool, record.entry_id, EntryStatus::Error, Some(&message))
                .await?;
            if let Some(id) = approved {
                history::set_history_status(&self.pool, id, HistoryStatus::Error, Some(&message))
                    .await?;
            }
            return Ok(ApplyOutcome::Failed { message });
        }

        match history::apply_rename(&self.pool, &record, approved).await {
            Ok(applied) => {
                if let Some(root) = root {
                    prune_empty_parents(&record.old_path, root);
                }
                info!(
                    "Fixed: {}/{} -> {}/{}",
                    record.old_author, record.old_title, record.new_author, record.new_title
                );
                if let Some(merged) = applied.merged_entry {
                    info!("Merged duplicate entry {} into {}", merged, record.entry_id);
                }
                Ok(ApplyOutcome::Applied {
                    history_id: applied.history_id,
                    new_path: record.new_path,
                    merged_entry: applied.merged_entry,
                })
            }
            Err(e) => {
                error!("Recording rename failed, moving folder back: {}", e);
                if let Err(back) = move_folder(&record.new_path, &record.old_path) {
                    error!(
                        "Could not move {} back to {}: {}",
                        record.new_path.display(),
                        record.old_path.display(),
                        back
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Applies a rename proposed by the decision engine
    ///
    /// When the destination is occupied, each disambiguated alternative is
    /// tried; if none is free the entry is marked `conflict` and nothing on
    /// disk changes.
    pub async fn apply_new(&self, request: &RenameRequest) -> LibraryResult<ApplyOutcome> {
        let root = self.root_for(&request.old_path);

        let destination = if is_free(&request.destination) {
            Some(request.destination.clone())
        } else {
            let alternatives = match &root {
                Some(root) => PathBuilder::new(root, &self.library).disambiguated(&request.identity),
                None => Vec::new(),
            };
            alternatives.into_iter().find(|p| is_free(p))
        };

        let Some(destination) = destination else {
            warn!(
                "Conflict: {} already holds another book",
                request.destination.display()
            );
            let record = NewHistoryRecord {
                status: HistoryStatus::Error,
                error_message: Some(
                    "Destination exists - possible different narrator version".to_string(),
                ),
                ..Self::history_record(request, &request.destination)
            };
            history::insert_history(&self.pool, &record).await?;
            entries::set_status(
                &self.pool,
                request.entry_id,
                EntryStatus::Conflict,
                Some("Destination folder exists with files"),
            )
            .await?;
            queue::dequeue_entry(&self.pool, request.entry_id).await?;
            return Ok(ApplyOutcome::Conflict {
                path: request.destination.clone(),
            });
        };

        let record = Self::history_record(request, &destination);
        self.execute(record, None, root.as_deref()).await
    }

    async fn pending_record(&self, history_id: HistoryId) -> LibraryResult<HistoryRecord> {
        let record = match history::get_history(&self.pool, history_id).await {
            Ok(record) => record,
            Err(AppError::RecordNotFound { .. }) => {
                return Err(LibraryError::HistoryNotFound(history_id))
            }
            Err(e) => return Err(e.into()),
        };
        if record.status != HistoryStatus::PendingFix {
            return Err(LibraryError::invalid_state(
                "apply fix",
                format!("record {} is {}", history_id, record.status.as_str()),
            ));
        }
        Ok(record)
    }

    /// Applies a rename held for approval
    pub async fn apply_fix(&self, history_id: HistoryId) -> LibraryResult<ApplyOutcome> {
        let record = self.pending_record(history_id).await?;

        if !record.old_path.exists() {
            let message = "Source folder no longer exists";
            warn!("{}: {}", message, record.old_path.display());
            history::set_history_status(&self.pool, history_id, HistoryStatus::Error, Some(message))
                .await?;
            entries::set_status(&self.pool, record.entry_id, EntryStatus::Error, Some(message))
                .await?;
            return Ok(ApplyOutcome::Failed {
                message: message.to_string(),
            });
        }

        let root = self.root_for(&record.old_path);
        let inside = root
            .as_deref()
            .is_some_and(|root| record.new_path.starts_with(root) && record.new_path != root);
        if !inside {
            return Err(LibraryError::UnsafePath(record.new_path.display().to_string()));
        }

        if !is_free(&record.new_path) {
            let message = "Destination exists with files";
            history::set_history_status(&self.pool, history_id, HistoryStatus::Error, Some(message))
                .await?;
            entries::set_status(&self.pool, record.entry_id, EntryStatus::Conflict, Some(message))
                .await?;
            return Ok(ApplyOutcome::Conflict {
                path: record.new_path,
            });
        }

        let new_record = NewHistoryRecord {
            entry_id: record.entry_id,
            old_author: record.old_author,
            old_title: record.old_title,
            old_path: record.old_path,
            new_author: record.new_author,
            new_title: record.new_title,
            new_path: record.new_path,
            status: HistoryStatus::Fixed,
            error_message: None,
        };
        self.execute(new_record, Some(history_id), root.as_deref())
            .await
    }

    /// Applies every held rename, oldest first
    pub async fn apply_all_pending(&self) -> LibraryResult<BulkOutcome> {
        let mut pending =
            history::list_history(&self.pool, Some(HistoryStatus::PendingFix), i64::MAX).await?;
        pending.reverse();

        let mut outcome = BulkOutcome::default();
        for record in pending {
            match self.apply_fix(record.id).await {
                Ok(ApplyOutcome::Applied { .. }) => outcome.applied += 1,
                Ok(ApplyOutcome::Conflict { .. }) => outcome.conflicts += 1,
                Ok(ApplyOutcome::Failed { .. }) => outcome.failed += 1,
                Err(e) => {
                    warn!("Applying record {} failed: {}", record.id, e);
                    outcome.failed += 1;
                }
            }
        }
        info!(
            "Applied {} held renames ({} conflicts, {} failed)",
            outcome.applied, outcome.conflicts, outcome.failed
        );
        Ok(outcome)
    }

    /// Discards a held rename and marks the entry verified
    pub async fn reject_fix(&self, history_id: HistoryId) -> LibraryResult<()> {
        let record = self.pending_record(history_id).await?;
        history::delete_history(&self.pool, history_id).await?;
        entries::set_status(&self.pool, record.entry_id, EntryStatus::Verified, None).await?;
        info!(
            "Rejected rename of {}/{}",
            record.old_author, record.old_title
        );
        Ok(())
    }

    /// Clears a failed record and marks the entry verified
    pub async fn dismiss_error(&self, history_id: HistoryId) -> LibraryResult<()> {
        let record = match history::get_history(&self.pool, history_id).await {
            Ok(record) => record,
            Err(AppError::RecordNotFound { .. }) => {
                return Err(LibraryError::HistoryNotFound(history_id))
            }
            Err(e) => return Err(e.into()),
        };
        if record.status != HistoryStatus::Error {
            return Err(LibraryError::invalid_state(
                "dismiss error",
                format!("record {} is {}", history_id, record.status.as_str()),
            ));
        }

        history::delete_history(&self.pool, history_id).await?;
        entries::set_status(&self.pool, record.entry_id, EntryStatus::Verified, None).await?;
        Ok(())
    }

    /// Moves a fixed folder back and protects the entry from rescans
    pub async fn undo(&self, history_id: HistoryId) -> LibraryResult<()> {
        self.undo_with_message(history_id, UNDONE_MESSAGE).await
    }

    async fn undo_with_message(&self, history_id: HistoryId, message: &str) -> LibraryResult<()> {
        let record = match history::get_history(&self.pool, history_id).await {
            Ok(record) => record,
            Err(AppError::RecordNotFound { .. }) => {
                return Err(LibraryError::HistoryNotFound(history_id))
            }
            Err(e) => return Err(e.into()),
        };
        if record.status != HistoryStatus::Fixed {
            return Err(LibraryError::invalid_state(
                "undo",
                format!("record {} is {}", history_id, record.status.as_str()),
            ));
        }
        if !record.new_path.exists() {
            return Err(LibraryError::invalid_state(
                "undo",
                format!("{} no longer exists", record.new_path.display()),
            ));
        }
        if !is_free(&record.old_path) {
            return Err(LibraryError::invalid_state(
                "undo",
                format!("{} is occupied", record.old_path.display()),
            ));
        }

        move_folder(&record.new_path, &record.old_path)?;

        if let Err(e) = history::apply_undo(&self.pool, &record, message).await {
            error!("Recording undo failed, moving folder back: {}", e);
            if let Err(back) = move_folder(&record.old_path, &record.new_path) {
                error!(
                    "Could not move {} back to {}: {}",
                    record.old_path.display(),
                    record.new_path.display(),
                    back
                );
            }
            return Err(e.into());
        }
        if let Some(root) = self.root_for(&record.new_path) {
            prune_empty_parents(&record.new_path, &root);
        }

        info!(
            "Undone: {}/{} restored to {}",
            record.new_author,
            record.new_title,
            record.old_path.display()
        );
        Ok(())
    }

    /// Recent fixed records whose author change counts as drastic
    pub async fn find_drastic_changes(&self) -> LibraryResult<Vec<HistoryRecord>> {
        let fixed =
            history::list_history(&self.pool, Some(HistoryStatus::Fixed), DRASTIC_SCAN_LIMIT)
                .await?;
        Ok(fixed
            .into_iter()
            .filter(|r| is_drastic(&r.old_author, &r.new_author))
            .collect())
    }

    /// Undoes every drastic change found by `find_drastic_changes`
    pub async fn undo_all_drastic(&self) -> LibraryResult<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        for record in self.find_drastic_changes().await? {
            match self.undo_with_message(record.id, AUTO_UNDONE_MESSAGE).await {
                Ok(()) => outcome.applied += 1,
                Err(e) => {
                    warn!("Could not undo record {}: {}", record.id, e);
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Takes an item off the queue and marks its entry verified
    pub async fn remove_from_queue(&self, queue_id: i64) -> LibraryResult<()> {
        let item = match queue::get_queue_item(&self.pool, queue_id).await {
            Ok(item) => item,
            Err(AppError::RecordNotFound { .. }) => {
                return Err(LibraryError::QueueItemNotFound(queue_id))
            }
            Err(e) => return Err(e.into()),
        };
        queue::remove_queue_item(&self.pool, queue_id).await?;
        entries::set_status(&self.pool, item.entry_id, EntryStatus::Verified, None).await?;
        Ok(())
    }
}
