// FILE: crates/library/src/scanner.rs

use crate::classifier::PathClassifier;
use crate::error::LibraryResult;
use crate::issues::{detect_issues, Issue, IssueReport};
use crate::patterns::is_disc_folder;
use crate::structure::{
    audio_files_below, audio_files_in, disc_folder_count, ebook_count, file_name,
    is_multi_book_files, is_series_folder, only_disc_folders, subdirs,
};
use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};
use shelfwise_config::LibraryConfig;
use shelfwise_core::EntryStatus;
use shelfwise_database::queries::{entries, queue, stats, Counter};
use shelfwise_database::DbPool;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bytes hashed per file for duplicate detection
const SIGNATURE_SAMPLE: u64 = 8192;

/// Reason recorded for items queued by a deep rescan
pub const DEEP_RESCAN_REASON: &str = "deep rescan";

/// Totals and findings of one scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Entries created by this scan
    pub scanned: usize,
    /// Entries newly queued
    pub queued: usize,
    /// Folders parked under a structural status, by status name
    pub structural: BTreeMap<String, usize>,
    /// Sets of identical audio files
    pub duplicate_sets: usize,
    /// Every location with at least one issue
    pub issues: BTreeMap<PathBuf, Vec<Issue>>,
}

impl ScanReport {
    fn note(&mut self, path: &Path, issues: impl IntoIterator<Item = Issue>) {
        let slot = self.issues.entry(path.to_path_buf()).or_default();
        for issue in issues {
            if !slot.contains(&issue) {
                slot.push(issue);
            }
        }
        if slot.is_empty() {
            self.issues.remove(path);
        }
    }

    fn count_structural(&mut self, status: EntryStatus) {
        *self.structural.entry(status.to_string()).or_default() += 1;
    }
}

/// Size plus a hash of the leading bytes
fn file_signature(path: &Path) -> Option<String> {
    let size = path.metadata().ok()?.len();
    let mut sample = Vec::new();
    File::open(path)
        .ok()?
        .take(SIGNATURE_SAMPLE)
        .read_to_end(&mut sample)
        .ok()?;

    let digest = Sha256::digest(&sample);
    let hex = format!("{:x}", digest);
    Some(format!("{}_{}", size, &hex[..16]))
}

/// Groups audio files with identical signatures, keyed by containing folder
fn find_duplicates(files: &[PathBuf]) -> (usize, HashMap<PathBuf, Vec<Issue>>) {
    let mut by_signature: HashMap<String, Vec<&PathBuf>> = HashMap::new();
    for file in files {
        if let Some(signature) = file_signature(file) {
            by_signature.entry(signature).or_default().push(file);
        }
    }

    let mut sets = 0;
    let mut by_folder: HashMap<PathBuf, Vec<Issue>> = HashMap::new();
    for paths in by_signature.values().filter(|p| p.len() > 1) {
        sets += 1;
        for path in paths {
            let (Some(parent), Some(name)) = (path.parent(), file_name(path)) else {
                continue;
            };
            by_folder
                .entry(parent.to_path_buf())
                .or_default()
                .push(Issue::DuplicateFile(name.to_string()));
        }
    }
    (sets, by_folder)
}

/// Walks the library roots and fills the queue
pub struct LibraryScanner {
    pool: DbPool,
    library: LibraryConfig,
    classifier: PathClassifier,
}

impl LibraryScanner {
    pub fn new(pool: DbPool, library: LibraryConfig, classifier: PathClassifier) -> Self {
        Self {
            pool,
            library,
            classifier,
        }
    }

    /// Scans every configured root
    ///
    /// Missing roots are skipped with a warning. Settled entries and held
    /// renames are left alone; everything else is re-examined.
    pub async fn scan(&self) -> LibraryResult<ScanReport> {
        info!(
            "Starting library scan of {} roots",
            self.library.library_paths.len()
        );

        let mut report = ScanReport::default();
        for root in &self.library.library_paths {
            if !root.is_dir() {
                warn!("Library path not found: {}", root.display());
                continue;
            }
            self.scan_root(root, &mut report).await?;
        }

        stats::bump(&self.pool, Counter::Scanned, report.scanned as i64).await?;
        stats::bump(&self.pool, Counter::Queued, report.queued as i64).await?;

        info!(
            "Scan complete: {} new, {} queued, {} locations with issues, {} duplicate sets",
            report.scanned,
            report.queued,
            report.issues.len(),
            report.duplicate_sets
        );
        Ok(report)
    }

    async fn scan_root(&self, root: &Path, report: &mut ScanReport) -> LibraryResult<()> {
        info!("Scanning: {}", root.display());

        let all_audio = audio_files_below(root, &self.library);
        debug!("Found {} audio files", all_audio.len());
        let (sets, duplicates) = find_duplicates(&all_audio);
        report.duplicate_sets += sets;
        for (folder, issues) in &duplicates {
            report.note(folder, issues.iter().cloned());
        }

        let loose_in_root = audio_files_in(root, &self.library)?.len();
        if loose_in_root > 0 {
            warn!("{} audio files directly in {}", loose_in_root, root.display());
            report.note(root, [Issue::LooseFiles(loose_in_root)]);
        }

        for author_dir in subdirs(root)? {
            if let Err(e) = self.scan_author(root, &author_dir, &duplicates, report).await {
                error!("Failed to scan {}: {}", author_dir.display(), e);
            }
        }
        Ok(())
    }

    async fn scan_author(
        &self,
        root: &Path,
        author_dir: &Path,
        duplicates: &HashMap<PathBuf, Vec<Issue>>,
        report: &mut ScanReport,
    ) -> LibraryResult<()> {
        let Some(author) = file_name(author_dir) else {
            return Ok(());
        };

        let direct_audio = audio_files_in(author_dir, &self.library)?.len();
        if direct_audio > 0 {
            warn!("Author folder has audio files directly: {}", author);
            report.note(
                author_dir,
                [
                    Issue::AuthorFolderHasAudioFiles,
                    Issue::LooseFiles(direct_audio),
                ],
            );
            self.record_structural(author_dir, author, "", EntryStatus::LooseFile, report)
                .await?;
        }
        if only_disc_folders(author_dir)? {
            report.note(author_dir, [Issue::AuthorFolderOnlyHasDiscFolders]);
        }
        let discs = disc_folder_count(author_dir)?;
        if discs > 0 {
            report.note(author_dir, [Issue::DiscFolders(discs)]);
        }

        for book_dir in subdirs(author_dir)? {
            let Some(title) = file_name(&book_dir) else {
                continue;
            };
            if is_disc_folder(title) {
                continue;
            }

            if is_series_folder(&book_dir)? {
                info!("Series folder: {}", book_dir.display());
                report.note(&book_dir, [Issue::SeriesFolder]);
                self.record_structural(&book_dir, author, title, EntryStatus::SeriesFolder, report)
                    .await?;

                for inner in subdirs(&book_dir)? {
                    let Some(inner_title) = file_name(&inner) else {
                        continue;
                    };
                    if !is_disc_folder(inner_title) {
                        self.scan_book(root, author, &inner, inner_title, duplicates, report)
                            .await?;
                    }
                }
                continue;
            }

            self.scan_book(root, author, &book_dir, title, duplicates, report)
                .await?;
        }
        Ok(())
    }

    /// Examines one book folder and queues it when it has issues
    async fn scan_book(
        &self,
        root: &Path,
        author: &str,
        book_dir: &Path,
        title: &str,
        duplicates: &HashMap<PathBuf, Vec<Issue>>,
        report: &mut ScanReport,
    ) -> LibraryResult<()> {
        if is_multi_book_files(book_dir, &self.library)? {
            info!("Multi-book file set: {}", book_dir.display());
            report.note(book_dir, [Issue::MultiBookFiles]);
            return self
                .record_structural(book_dir, author, title, EntryStatus::MultiBookFiles, report)
                .await;
        }

        let classified = self.classifier.classify(book_dir, root).await?;
        if classified.structure_reversed {
            report.note(book_dir, [Issue::StructureReversed]);
            return self
                .record_structural(book_dir, author, title, EntryStatus::StructureReversed, report)
                .await;
        }

        let mut issues = IssueReport::new(detect_issues(author, title));
        let discs = disc_folder_count(book_dir)?;
        if discs > 0 {
            issues.push(Issue::DiscFolders(discs));
        }
        let ebooks = ebook_count(book_dir, &self.library);
        if ebooks > 0 {
            issues.push(Issue::EbookFiles(ebooks));
        }
        for issue in duplicates.get(book_dir).into_iter().flatten() {
            issues.push(issue.clone());
        }
        report.note(book_dir, issues.issues.iter().cloned());

        let entry_id = match entries::find_entry_by_path(&self.pool, book_dir).await? {
            Some(existing) => {
                if existing.status.is_settled() || existing.status == EntryStatus::PendingFix {
                    return Ok(());
                }
                if existing.status.is_structural() {
                    entries::set_status(&self.pool, existing.id, EntryStatus::Pending, None)
                        .await?;
                }
                existing.id
            }
            None => {
                report.scanned += 1;
                entries::upsert_entry(&self.pool, book_dir, author, title).await?
            }
        };

        if issues.is_empty() {
            return Ok(());
        }

        if issues.contains(&Issue::MultiBookCollection) {
            info!("Needs manual split: {}", book_dir.display());
            entries::set_status(
                &self.pool,
                entry_id,
                EntryStatus::NeedsSplit,
                Some("Folder name announces a collection"),
            )
            .await?;
            report.count_structural(EntryStatus::NeedsSplit);
            return Ok(());
        }

        if queue::enqueue(&self.pool, entry_id, &issues.reason(), issues.priority()).await? {
            debug!("Queued {} ({})", book_dir.display(), issues.reason());
            report.queued += 1;
        }
        Ok(())
    }

    /// Records a folder under a structural status without queueing it
    async fn record_structural(
        &self,
        path: &Path,
        author: &str,
        title: &str,
        status: EntryStatus,
        report: &mut ScanReport,
    ) -> LibraryResult<()> {
        let id = match entries::find_entry_by_path(&self.pool, path).await? {
            Some(existing) if existing.status == EntryStatus::Protected => return Ok(()),
            Some(existing) => existing.id,
            None => {
                report.scanned += 1;
                entries::upsert_entry(&self.pool, path, author, title).await?
            }
        };
        entries::set_status(&self.pool, id, status, None).await?;
        queue::dequeue_entry(&self.pool, id).await?;
        report.count_structural(status);
        Ok(())
    }

    /// Re-queues every entry except protected ones
    ///
    /// Entries are reset and the library is scanned again first, so folders
    /// that are still structurally unsafe get their status back and stay out
    /// of the queue. Returns the number queued and the number of protected
    /// entries kept.
    pub async fn deep_rescan(&self) -> LibraryResult<(usize, i64)> {
        queue::clear_queue(&self.pool).await?;
        let protected = entries::reset_unprotected(&self.pool).await?;

        let report = self.scan().await?;
        let mut queued = report.queued;
        for entry in entries::list_entries(&self.pool, Some(EntryStatus::Pending)).await? {
            if !entry.path.is_dir() {
                debug!("Not re-queueing missing folder {}", entry.path.display());
                continue;
            }
            if queue::enqueue(&self.pool, entry.id, DEEP_RESCAN_REASON, 1).await? {
                queued += 1;
            }
        }

        info!(
            "Deep rescan: queued {} entries ({} protected entries kept)",
            queued, protected
        );
        Ok((queued, protected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_identical_files_are_duplicates() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("Frank Herbert").join("Dune");
        let b = dir.path().join("Herbert").join("Dune");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("dune.m4b"), b"same bytes").unwrap();
        fs::write(b.join("copy.m4b"), b"same bytes").unwrap();
        fs::write(a.join("other.m4b"), b"different").unwrap();

        let files = vec![a.join("dune.m4b"), b.join("copy.m4b"), a.join("other.m4b")];
        let (sets, by_folder) = find_duplicates(&files);
        assert_eq!(sets, 1);
        assert_eq!(
            by_folder.get(&b),
            Some(&vec![Issue::DuplicateFile("copy.m4b".to_string())])
        );
    }

    #[test]
    fn test_signature_includes_size() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.mp3"), b"abc").unwrap();
        fs::write(dir.path().join("b.mp3"), b"abcd").unwrap();
        assert_ne!(
            file_signature(&dir.path().join("a.mp3")),
            file_signature(&dir.path().join("b.mp3"))
        );
        assert_eq!(file_signature(&dir.path().join("missing.mp3")), None);
    }
}
