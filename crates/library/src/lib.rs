//! Shelfwise library engine
//!
//! Classifies audiobook folders, detects naming problems, decides on
//! corrected names and moves folders safely within the library roots.
//! Every change is recorded in history so it can be reviewed or undone.

pub mod classifier;
pub mod decision;
pub mod drastic;
pub mod error;
pub mod fixer;
pub mod folder_hints;
pub mod issues;
pub mod manager;
pub mod metadata;
pub mod orphans;
pub mod path_builder;
pub mod patterns;
pub mod processor;
pub mod scanner;
pub mod series;
pub mod structure;
pub mod verification;
pub mod worker;

pub use classifier::{Certainty, ClassifiedPath, PathClassifier, Role, Segment};
pub use decision::{CurrentFolder, DecisionEngine, ProposedRename, RenameDecision};
pub use drastic::is_drastic;
pub use error::{LibraryError, LibraryResult};
pub use fixer::{ApplyOutcome, BulkOutcome, Fixer};
pub use issues::{detect_issues, Issue, IssueReport};
pub use manager::{Collaborators, LibraryManager};
pub use orphans::OrphanGroup;
pub use path_builder::{build_path, BookIdentity, PathBuilder};
pub use processor::{BatchOutcome, BatchProcessor, Pacing};
pub use scanner::{LibraryScanner, ScanReport};
pub use verification::{ChangeVerifier, ProposedChange};
pub use worker::{StopSignal, Worker};
