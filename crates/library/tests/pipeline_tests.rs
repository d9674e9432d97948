// FILE: crates/library/tests/pipeline_tests.rs
//! Scan, process and review against a real folder tree

use async_trait::async_trait;
use shelfwise_config::Config;
use shelfwise_core::{EntryStatus, HistoryStatus};
use shelfwise_database::{create_test_db, queries::entries};
use shelfwise_library::{Collaborators, LibraryManager, StopSignal};
use shelfwise_llm::{LlmClient, LlmError, LlmResult, ParsedName, PromptItem};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Answers parse requests from a fixed table keyed by "author - title"
#[derive(Default)]
struct ScriptedLlm {
    answers: HashMap<String, ParsedName>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn answer(mut self, name: &str, author: &str, title: &str) -> Self {
        self.answers.insert(
            name.to_string(),
            ParsedName {
                author: author.to_string(),
                title: title.to_string(),
                ..Default::default()
            },
        );
        self
    }

    fn answer_with(mut self, name: &str, parsed: ParsedName) -> Self {
        self.answers.insert(name.to_string(), parsed);
        self
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str) -> LlmResult<String> {
        Err(LlmError::Malformed("scripted client has no free text".to_string()))
    }

    async fn parse_names(&self, items: &[PromptItem]) -> LlmResult<Vec<Option<ParsedName>>> {
        let mut seen = self.seen.lock().unwrap();
        Ok(items
            .iter()
            .map(|item| {
                seen.push(item.name.clone());
                self.answers.get(&item.name).cloned()
            })
            .collect())
    }
}

struct Library {
    _dir: TempDir,
    root: PathBuf,
    manager: LibraryManager,
}

async fn library(auto_fix: bool, llm: ScriptedLlm) -> Library {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("library");
    fs::create_dir_all(&root).unwrap();

    let mut config = Config::default();
    config.library.library_paths = vec![root.clone()];
    config.processing.auto_fix = auto_fix;

    let pool = create_test_db().await.unwrap();
    let collaborators = Collaborators {
        llm: Some(Arc::new(llm)),
        ..Default::default()
    };
    Library {
        _dir: dir,
        root,
        manager: LibraryManager::with_collaborators(config, pool, collaborators),
    }
}

fn book(root: &Path, author: &str, title: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let path = root.join(author).join(title);
    fs::create_dir_all(&path).unwrap();
    for (name, data) in files {
        fs::write(path.join(name), data).unwrap();
    }
    path
}

fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
        .collect();
    files.sort();
    files
}

const HOLLOW_MAN: &str = "The Hollow Man [128k]";
const HOLLOW_MAN_NAME: &str = "Boyett - The Hollow Man [128k]";

#[tokio::test]
async fn test_surname_folder_is_renamed_and_undone() {
    let llm = ScriptedLlm::default().answer(HOLLOW_MAN_NAME, "Steven Boyett", "The Hollow Man");
    let lib = library(true, llm).await;
    let old = book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"one")]);

    let report = lib.manager.scan().await.unwrap();
    assert_eq!(report.queued, 1);

    let outcome = lib.manager.process_queue(None).await.unwrap();
    assert_eq!(outcome.fixed, 1);

    let new = lib.root.join("Steven Boyett").join("The Hollow Man");
    assert!(new.join("01.mp3").exists());
    assert!(!old.exists());
    assert!(!lib.root.join("Boyett").exists());

    let history = lib.manager.recent_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, HistoryStatus::Fixed);
    assert_eq!(history[0].new_path, new);

    let entry = entries::get_entry(lib.manager.pool(), history[0].entry_id)
        .await
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Fixed);
    assert_eq!(lib.manager.stats().await.unwrap().queue_length, 0);

    lib.manager.undo(history[0].id).await.unwrap();
    assert!(old.join("01.mp3").exists());
    assert!(!lib.root.join("Steven Boyett").exists());

    let entry = entries::get_entry(lib.manager.pool(), history[0].entry_id)
        .await
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Protected);
    assert_eq!(entry.path, old);

    // Protected entries stay out of the queue on later scans
    let report = lib.manager.scan().await.unwrap();
    assert_eq!(report.queued, 0);
}

#[tokio::test]
async fn test_conflict_leaves_both_folders_untouched() {
    let llm = ScriptedLlm::default().answer(HOLLOW_MAN_NAME, "Steven Boyett", "The Hollow Man");
    let lib = library(true, llm).await;
    let source = book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"source")]);
    let occupied = book(
        &lib.root,
        "Steven Boyett",
        "The Hollow Man",
        &[("01.mp3", b"already here")],
    );
    let before = snapshot(&lib.root);

    lib.manager.scan().await.unwrap();
    let outcome = lib.manager.process_queue(None).await.unwrap();
    assert_eq!(outcome.conflicts, 1);
    assert_eq!(outcome.fixed, 0);

    assert_eq!(snapshot(&lib.root), before);
    assert!(source.exists());
    assert!(occupied.exists());

    let entry = entries::find_entry_by_path(lib.manager.pool(), &source)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Conflict);

    let errors = lib
        .manager
        .history(Some(HistoryStatus::Error), 10)
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
    lib.manager.dismiss_error(errors[0].id).await.unwrap();
    assert!(lib
        .manager
        .history(Some(HistoryStatus::Error), 10)
        .await
        .unwrap()
        .is_empty());

    let entry = entries::get_entry(lib.manager.pool(), entry.id).await.unwrap();
    assert_eq!(entry.status, EntryStatus::Verified);
    assert_eq!(lib.manager.scan().await.unwrap().queued, 0);
    assert_eq!(snapshot(&lib.root), before);
}

#[tokio::test]
async fn test_multi_book_folders_are_never_queued() {
    let llm = ScriptedLlm::default()
        .answer("Brian Lumley - Necroscope Complete Series", "Brian Lumley", "Necroscope")
        .answer("Brian Lumley - Necroscope", "Brian Lumley", "Necroscope I");
    let lib = library(true, llm).await;
    let files = book(
        &lib.root,
        "Brian Lumley",
        "Necroscope",
        &[
            ("Necroscope Book 1.mp3", b"one"),
            ("Necroscope Book 2.mp3", b"two"),
            ("Necroscope Book 3.mp3", b"three"),
        ],
    );
    let boxed = book(
        &lib.root,
        "Brian Lumley",
        "Necroscope Complete Series",
        &[("part1.mp3", b"x")],
    );

    let report = lib.manager.scan().await.unwrap();
    assert_eq!(report.queued, 0);
    assert!(lib.manager.queue(10).await.unwrap().is_empty());

    let pool = lib.manager.pool();
    let files_entry = entries::find_entry_by_path(pool, &files)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(files_entry.status, EntryStatus::MultiBookFiles);
    let boxed_entry = entries::find_entry_by_path(pool, &boxed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(boxed_entry.status, EntryStatus::NeedsSplit);

    // A deep rescan does not bypass the structural checks
    let (queued, _) = lib.manager.deep_rescan().await.unwrap();
    assert_eq!(queued, 0);
    let outcome = lib.manager.process_queue(None).await.unwrap();
    assert_eq!(outcome.fixed, 0);
    assert_eq!(outcome.pending, 0);
    assert!(files.join("Necroscope Book 2.mp3").exists());
    assert!(boxed.join("part1.mp3").exists());
    assert!(lib.manager.pending().await.unwrap().is_empty());

    let boxed_entry = entries::get_entry(pool, boxed_entry.id).await.unwrap();
    assert_eq!(boxed_entry.status, EntryStatus::NeedsSplit);
    let files_entry = entries::get_entry(pool, files_entry.id).await.unwrap();
    assert_eq!(files_entry.status, EntryStatus::MultiBookFiles);
}

#[tokio::test]
async fn test_deep_rescan_keeps_reversed_folder_in_place() {
    let llm = ScriptedLlm::default().answer(
        "The Hollow Man - Steven Boyett",
        "Steven Boyett",
        "The Hollow Man",
    );
    let lib = library(true, llm).await;
    let reversed = book(&lib.root, "The Hollow Man", "Steven Boyett", &[("01.mp3", b"a")]);
    let before = snapshot(&lib.root);

    lib.manager.scan().await.unwrap();
    let (queued, _) = lib.manager.deep_rescan().await.unwrap();
    assert_eq!(queued, 0);
    let outcome = lib.manager.process_queue(None).await.unwrap();
    assert_eq!(outcome.fixed, 0);

    assert_eq!(snapshot(&lib.root), before);
    let entry = entries::find_entry_by_path(lib.manager.pool(), &reversed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::StructureReversed);
}

#[tokio::test]
async fn test_deep_rescan_skips_author_folder_with_loose_files() {
    let lib = library(true, ScriptedLlm::default()).await;
    let author = lib.root.join("Stephen King");
    let it = book(&lib.root, "Stephen King", "It", &[("01.mp3", b"it")]);
    fs::write(author.join("The Stand.mp3"), b"stand").unwrap();

    lib.manager.scan().await.unwrap();
    let (queued, _) = lib.manager.deep_rescan().await.unwrap();
    assert_eq!(queued, 1);

    let queue = lib.manager.queue(10).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].path, it);

    let entry = entries::find_entry_by_path(lib.manager.pool(), &author)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::LooseFile);

    lib.manager.process_queue(None).await.unwrap();
    assert!(author.join("The Stand.mp3").exists());
    assert!(it.join("01.mp3").exists());
}

#[tokio::test]
async fn test_held_rename_can_be_rejected_or_applied() {
    let llm = ScriptedLlm::default()
        .answer(HOLLOW_MAN_NAME, "Steven Boyett", "The Hollow Man")
        .answer("Herbert - Dune 1965", "Frank Herbert", "Dune");
    let lib = library(false, llm).await;
    let hollow = book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"a")]);
    let dune = book(&lib.root, "Herbert", "Dune 1965", &[("01.mp3", b"b")]);

    lib.manager.scan().await.unwrap();
    let outcome = lib.manager.process_queue(None).await.unwrap();
    assert_eq!(outcome.pending, 2);
    assert!(hollow.exists());
    assert!(dune.exists());

    let pending = lib.manager.pending().await.unwrap();
    assert_eq!(pending.len(), 2);
    let hollow_fix = pending.iter().find(|r| r.old_path == hollow).unwrap();
    let dune_fix = pending.iter().find(|r| r.old_path == dune).unwrap();

    lib.manager.reject_fix(hollow_fix.id).await.unwrap();
    assert!(hollow.exists());
    let entry = entries::get_entry(lib.manager.pool(), hollow_fix.entry_id)
        .await
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Verified);

    let applied = lib.manager.apply_fix(dune_fix.id).await.unwrap();
    assert!(applied.is_applied());
    assert!(lib.root.join("Frank Herbert").join("Dune").join("01.mp3").exists());
    assert!(lib.manager.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_drastic_changes_can_be_undone_in_bulk() {
    let llm = ScriptedLlm::default()
        .answer(HOLLOW_MAN_NAME, "John Dickson Carr", "The Hollow Man")
        .answer("Herbert - Dune 1965", "Frank Herbert", "Dune");
    let lib = library(false, llm).await;
    let hollow = book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"a")]);
    let dune = book(&lib.root, "Herbert", "Dune 1965", &[("01.mp3", b"b")]);

    lib.manager.scan().await.unwrap();
    lib.manager.process_queue(None).await.unwrap();
    let bulk = lib.manager.apply_all_pending().await.unwrap();
    assert_eq!(bulk.applied, 2);
    assert!(!hollow.exists());
    assert!(!dune.exists());

    let drastic = lib.manager.find_drastic_changes().await.unwrap();
    assert_eq!(drastic.len(), 1);
    assert_eq!(drastic[0].new_author, "John Dickson Carr");

    let undone = lib.manager.undo_all_drastic().await.unwrap();
    assert_eq!(undone.applied, 1);
    assert_eq!(undone.failed, 0);

    assert!(hollow.join("01.mp3").exists());
    assert!(!lib.root.join("John Dickson Carr").exists());
    assert!(lib.root.join("Frank Herbert").join("Dune").join("01.mp3").exists());

    let record = lib
        .manager
        .history(Some(HistoryStatus::Undone), 10)
        .await
        .unwrap();
    assert_eq!(record.len(), 1);
    assert!(record[0].error_message.is_some());
    let entry = entries::get_entry(lib.manager.pool(), record[0].entry_id)
        .await
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Protected);
    assert!(lib.manager.find_drastic_changes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_occupied_destination_falls_back_to_narrator_folder() {
    let llm = ScriptedLlm::default().answer_with(
        HOLLOW_MAN_NAME,
        ParsedName {
            author: "Steven Boyett".to_string(),
            title: "The Hollow Man".to_string(),
            narrator: Some("Kevin Pariseau".to_string()),
            year: Some(1977),
            ..Default::default()
        },
    );
    let lib = library(true, llm).await;
    let source = book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"source")]);
    let occupied = book(
        &lib.root,
        "Steven Boyett",
        "The Hollow Man (1977) (Kevin Pariseau)",
        &[("01.mp3", b"already here")],
    );

    lib.manager.scan().await.unwrap();
    let outcome = lib.manager.process_queue(None).await.unwrap();
    assert_eq!(outcome.fixed, 1);
    assert_eq!(outcome.conflicts, 0);

    let alternative = lib
        .root
        .join("Steven Boyett")
        .join("The Hollow Man (Kevin Pariseau)");
    assert_eq!(fs::read(alternative.join("01.mp3")).unwrap(), b"source");
    assert_eq!(fs::read(occupied.join("01.mp3")).unwrap(), b"already here");
    assert!(!source.exists());

    let fixed = lib
        .manager
        .history(Some(HistoryStatus::Fixed), 10)
        .await
        .unwrap();
    assert_eq!(fixed.len(), 1);
    assert_eq!(fixed[0].new_path, alternative);
}

#[tokio::test]
async fn test_undo_after_merging_stale_entry() {
    let llm = ScriptedLlm::default().answer(HOLLOW_MAN_NAME, "Steven Boyett", "The Hollow Man");
    let lib = library(true, llm).await;
    let old = book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"source")]);
    let stale = book(&lib.root, "Steven Boyett", "The Hollow Man", &[("01.mp3", b"gone")]);

    lib.manager.scan().await.unwrap();
    assert_eq!(lib.manager.entries(None).await.unwrap().len(), 2);
    fs::remove_dir_all(lib.root.join("Steven Boyett")).unwrap();

    let outcome = lib.manager.process_queue(None).await.unwrap();
    assert_eq!(outcome.fixed, 1);
    assert_eq!(fs::read(stale.join("01.mp3")).unwrap(), b"source");

    let history = lib.manager.recent_history().await.unwrap();
    assert_eq!(history.len(), 1);
    let entries_left = lib.manager.entries(None).await.unwrap();
    assert_eq!(entries_left.len(), 1);
    assert_eq!(entries_left[0].id, history[0].entry_id);
    assert_eq!(entries_left[0].path, stale);

    lib.manager.undo(history[0].id).await.unwrap();
    assert_eq!(fs::read(old.join("01.mp3")).unwrap(), b"source");
    assert!(!lib.root.join("Steven Boyett").exists());

    let pool = lib.manager.pool();
    assert!(entries::find_entry_by_path(pool, &stale).await.unwrap().is_none());
    let entry = entries::get_entry(pool, history[0].entry_id).await.unwrap();
    assert_eq!(entry.status, EntryStatus::Protected);
    assert_eq!(entry.path, old);
}

#[tokio::test]
async fn test_failed_undo_leaves_folder_at_new_path() {
    let llm = ScriptedLlm::default().answer(HOLLOW_MAN_NAME, "Steven Boyett", "The Hollow Man");
    let lib = library(true, llm).await;
    let old = book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"a")]);

    lib.manager.scan().await.unwrap();
    lib.manager.process_queue(None).await.unwrap();
    let history = lib.manager.recent_history().await.unwrap();
    let new = history[0].new_path.clone();

    entries::delete_entry(lib.manager.pool(), history[0].entry_id)
        .await
        .unwrap();
    assert!(lib.manager.undo(history[0].id).await.is_err());

    assert!(new.join("01.mp3").exists());
    assert!(!old.exists());
    let history = lib.manager.recent_history().await.unwrap();
    assert_eq!(history[0].status, HistoryStatus::Fixed);
}

#[tokio::test]
async fn test_unsafe_answer_never_leaves_the_root() {
    let llm = ScriptedLlm::default().answer(HOLLOW_MAN_NAME, "../../..", "../escape");
    let lib = library(true, llm).await;
    book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"a")]);

    lib.manager.scan().await.unwrap();
    let outcome = lib.manager.process_queue(None).await.unwrap();
    assert_eq!(outcome.fixed, 0);

    let outside: Vec<_> = fs::read_dir(lib.root.parent().unwrap())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name())
        .collect();
    assert_eq!(outside, vec![std::ffi::OsString::from("library")]);
    assert!(lib.root.join("Boyett").join(HOLLOW_MAN).join("01.mp3").exists());
}

#[tokio::test]
async fn test_classification_is_stable() {
    let lib = library(false, ScriptedLlm::default()).await;
    let path = book(&lib.root, "Frank Herbert", "Dune", &[("01.mp3", b"a")]);

    let first = lib.manager.classify(&path).await.unwrap();
    let second = lib.manager.classify(&path).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.detected_author.as_deref(), Some("Frank Herbert"));
    assert_eq!(first.detected_title.as_deref(), Some("Dune"));
}

#[tokio::test]
async fn test_process_all_drains_the_queue() {
    let llm = ScriptedLlm::default().answer(HOLLOW_MAN_NAME, "Steven Boyett", "The Hollow Man");
    let lib = library(true, llm).await;
    let manager = lib
        .manager
        .with_pacing(shelfwise_library::Pacing::immediate());
    book(&lib.root, "Boyett", HOLLOW_MAN, &[("01.mp3", b"a")]);

    manager.scan().await.unwrap();
    let totals = manager.process_all(&StopSignal::new()).await.unwrap();
    assert_eq!(totals.fixed, 1);
    assert_eq!(manager.stats().await.unwrap().queue_length, 0);
    assert_eq!(manager.stats().await.unwrap().today.fixed, 1);
}
