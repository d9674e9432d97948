//! Database query operations organized by table

pub mod entries;
pub mod history;
pub mod names;
pub mod queue;
pub mod stats;

// Re-export commonly used query functions
pub use entries::{
    count_entries, find_entry_by_path, get_entry, list_entries, set_status, upsert_entry,
};
pub use history::{apply_rename, get_history, list_history, record_pending_fix, AppliedRename};
pub use queue::{enqueue, next_batch, queue_length, remove_queue_item};
pub use stats::{bump, library_stats, Counter};
