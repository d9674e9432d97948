// FILE: crates/cli/src/commands.rs

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use console::style;
use shelfwise_config::{Config, ConfigManager};
use shelfwise_content_sources::{NameDatabase, SqliteNameDatabase};
use shelfwise_core::{HistoryRecord, HistoryStatus};
use shelfwise_library::{ApplyOutcome, BulkOutcome, LibraryManager, PathClassifier, Worker};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MASK: &str = "********";

/// Create the config file and database
pub async fn init(configs: &ConfigManager, db_path: &Path) -> Result<()> {
    let created = configs
        .initialize()
        .context("Failed to write default config")?;
    shelfwise_database::open(db_path)
        .await
        .context("Failed to initialize database")?;

    if created {
        println!(
            "{} Config written to {}",
            style("✓").green().bold(),
            configs.config_path().display()
        );
    } else {
        println!("Config already exists at {}", configs.config_path().display());
    }
    println!("Database ready at {}", db_path.display());
    println!("Add your audiobook folders to library.library_paths, then run 'scan'.");
    Ok(())
}

/// Config copy that is safe to print
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    for secret in [
        &mut config.llm.openrouter_api_key,
        &mut config.llm.gemini_api_key,
        &mut config.providers.google_books_api_key,
        &mut config.providers.hardcover_token,
    ] {
        if secret.is_some() {
            *secret = Some(MASK.to_string());
        }
    }
    config
}

/// Print the config path or the effective config
pub fn show_config(configs: &ConfigManager, config: &Config, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand_name() {
        Some("path") => println!("{}", configs.config_path().display()),
        _ => {
            let text =
                toml::to_string_pretty(&redacted(config)).context("Failed to render config")?;
            println!("{}", text);
        }
    }
    Ok(())
}

/// Scan every library root
pub async fn scan(manager: &LibraryManager) -> Result<()> {
    let report = manager.scan().await.context("Scan failed")?;

    println!("\n{}", style("Scan Complete").bold().cyan());
    println!("{}", "=".repeat(60));
    println!("New folders:     {}", style(report.scanned).bold());
    println!("Queued:          {}", style(report.queued).bold());
    println!("Duplicate sets:  {}", report.duplicate_sets);
    for (status, count) in &report.structural {
        println!("  {:<22} {}", status, count);
    }
    if !report.issues.is_empty() {
        println!("\n{} locations with issues", style(report.issues.len()).yellow());
    }
    Ok(())
}

/// Re-queue everything except protected folders
pub async fn rescan(manager: &LibraryManager) -> Result<()> {
    let (queued, protected) = manager.deep_rescan().await.context("Rescan failed")?;
    println!(
        "{} Queued {} folders ({} protected folders left alone)",
        style("✓").green().bold(),
        queued,
        protected
    );
    Ok(())
}

/// Process one batch, a limited number of items, or the whole queue
pub async fn process(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    let outcome = if matches.get_flag("all") {
        let stop = shelfwise_library::StopSignal::new();
        let signal = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal.stop();
            }
        });
        manager.process_all(&stop).await
    } else {
        manager
            .process_queue(matches.get_one::<usize>("limit").copied())
            .await
    }
    .context("Processing failed")?;

    println!("\n{}", style("Processing Results").bold().cyan());
    println!("{}", "=".repeat(60));
    println!("Processed:   {}", outcome.processed);
    println!("Fixed:       {}", style(outcome.fixed).green());
    println!("Pending:     {}", style(outcome.pending).yellow());
    println!("Verified:    {}", outcome.verified);
    println!("Blocked:     {}", outcome.blocked);
    println!("Conflicts:   {}", outcome.conflicts);
    println!("Errors:      {}", outcome.errors);
    if outcome.budget_exhausted {
        println!(
            "\n{} Hourly request budget reached; try again later.",
            style("!").yellow().bold()
        );
    }
    Ok(())
}

/// Show the next queued folders
pub async fn show_queue(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    let limit = matches.get_one::<i64>("limit").copied().unwrap_or(20);
    let items = manager.queue(limit).await.context("Failed to read queue")?;
    let total = manager.stats().await?.queue_length;

    if items.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    println!("\n{} of {} queued", style(items.len()).bold().cyan(), total);
    println!("{}", "=".repeat(80));
    for item in items {
        println!(
            "[{}] p{} {}",
            item.queue_id,
            item.priority,
            style(item.display_name()).bold()
        );
        if !item.reason.is_empty() {
            println!("      {}", style(truncate(&item.reason, 70)).dim());
        }
    }
    Ok(())
}

/// Show renames waiting for approval
pub async fn show_pending(manager: &LibraryManager) -> Result<()> {
    let records = manager.pending().await.context("Failed to read history")?;
    if records.is_empty() {
        println!("No renames waiting for approval.");
        return Ok(());
    }

    println!("\n{} Pending Renames", style(records.len()).bold().cyan());
    println!("{}", "=".repeat(80));
    for record in &records {
        print_record(record);
    }
    println!("\nUse 'apply <id>', 'apply --all' or 'reject <id>'.");
    Ok(())
}

/// Show recent history
pub async fn show_history(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    let limit = matches.get_one::<i64>("limit").copied().unwrap_or(20);
    let records = manager
        .history(None, limit)
        .await
        .context("Failed to read history")?;
    if records.is_empty() {
        println!("No history yet.");
        return Ok(());
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

/// Apply one held rename or all of them
pub async fn apply(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("all") {
        let outcome = manager.apply_all_pending().await?;
        print_bulk("Applied", &outcome);
        return Ok(());
    }

    let id = required_id(matches)?;
    match manager.apply_fix(id).await? {
        ApplyOutcome::Applied { new_path, .. } => println!(
            "{} Renamed to {}",
            style("✓").green().bold(),
            new_path.display()
        ),
        ApplyOutcome::Conflict { path } => println!(
            "{} {} already holds another book; nothing was moved",
            style("!").yellow().bold(),
            path.display()
        ),
        ApplyOutcome::Failed { message } => bail!("Rename failed: {}", message),
    }
    Ok(())
}

/// Reject a held rename
pub async fn reject(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    let id = required_id(matches)?;
    manager.reject_fix(id).await?;
    println!(
        "{} Rejected; the folder is marked verified",
        style("✓").green().bold()
    );
    Ok(())
}

/// Dismiss an error record
pub async fn dismiss(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    let id = required_id(matches)?;
    manager.dismiss_error(id).await?;
    println!("{} Error dismissed", style("✓").green().bold());
    Ok(())
}

/// Undo an applied rename
pub async fn undo(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    let id = required_id(matches)?;
    manager.undo(id).await?;
    println!(
        "{} Moved back; the folder is now protected from renames",
        style("✓").green().bold()
    );
    Ok(())
}

/// List or undo applied renames that replaced the author
pub async fn drastic(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("undo-all") {
        let outcome = manager.undo_all_drastic().await?;
        print_bulk("Undone", &outcome);
        return Ok(());
    }

    let records = manager.find_drastic_changes().await?;
    if records.is_empty() {
        println!("No drastic author changes found.");
        return Ok(());
    }
    println!(
        "\n{} renames replaced the author",
        style(records.len()).bold().red()
    );
    println!("{}", "=".repeat(80));
    for record in &records {
        print_record(record);
    }
    Ok(())
}

/// Drop one folder from the queue
pub async fn remove(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    let id = required_id(matches)?;
    manager.remove_from_queue(id).await?;
    println!("{} Removed from queue", style("✓").green().bold());
    Ok(())
}

/// List loose files, optionally moving them into book folders
pub fn orphans(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("organize") {
        let (organized, failed) = manager.organize_all_orphans()?;
        println!(
            "{} Organized {} groups ({} failed)",
            style("✓").green().bold(),
            organized,
            failed
        );
        return Ok(());
    }

    let groups = manager.orphans()?;
    if groups.is_empty() {
        println!("No loose audio files found.");
        return Ok(());
    }
    for group in &groups {
        println!(
            "{} / {} ({} files)",
            style(&group.author).bold(),
            group.title,
            group.files.len()
        );
    }
    Ok(())
}

/// Show library statistics
pub async fn show_stats(manager: &LibraryManager) -> Result<()> {
    let stats = manager.stats().await.context("Failed to read stats")?;

    println!("\n{}", style("Library Statistics").bold().cyan());
    println!("{}", "=".repeat(60));
    println!("Folders tracked: {}", style(stats.total_entries).bold());
    println!("Queued:          {}", stats.queue_length);
    for (status, count) in &stats.entries_by_status {
        println!("  {:<20} {}", status, count);
    }
    if !stats.history_by_status.is_empty() {
        println!("\nHistory:");
        for (status, count) in &stats.history_by_status {
            println!("  {:<20} {}", status, count);
        }
    }
    println!(
        "\nToday: {} scanned, {} queued, {} fixed, {} verified, {} model calls",
        stats.today.scanned,
        stats.today.queued,
        stats.today.fixed,
        stats.today.verified,
        stats.today.api_calls
    );
    Ok(())
}

/// Run the background worker in the foreground until Ctrl-C
pub async fn run_worker(manager: LibraryManager) -> Result<()> {
    if !manager.can_process() {
        println!(
            "{} No model configured; the worker will scan but not process",
            style("!").yellow().bold()
        );
    }

    let worker = Worker::new();
    worker.start(Arc::new(manager));
    println!("Worker running. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    worker.stop();
    println!("Stopping worker...");
    Ok(())
}

/// Print the roles assigned to each folder of a path
pub async fn classify(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<PathBuf>("path")
        .ok_or_else(|| anyhow::anyhow!("Path is required"))?;

    let classified = match matches.get_one::<PathBuf>("root") {
        Some(root) => {
            let config = manager.config();
            let names: Arc<dyn NameDatabase> =
                Arc::new(SqliteNameDatabase::new(manager.pool().clone()));
            PathClassifier::new(config.processing.series_tie_break, &config.library)
                .with_names(names)
                .classify(path, root)
                .await?
        }
        None => manager.classify(path).await?,
    };

    println!("\n{}", style(path.display()).bold());
    for segment in &classified.segments {
        println!("  {:<14} {}", style(segment.role).cyan(), segment.name);
    }
    println!();
    print_field("Author", classified.detected_author.as_deref());
    print_field("Title", classified.detected_title.as_deref());
    print_field("Series", classified.detected_series.as_deref());
    print_field("Number", classified.series_num.as_deref());
    println!("  Confidence: {:?}", classified.confidence);
    if classified.structure_reversed {
        println!("  {}", style("Author and title folders look swapped").yellow());
    }
    if classified.db_lookup_failed {
        println!("  {}", style("Name database unavailable").yellow());
    }
    let tags = classified.issue_tags();
    if !tags.is_empty() {
        println!("  Issues: {}", tags.join(", "));
    }
    Ok(())
}

/// Wipe entries, queue, history and stats
pub async fn reset(manager: &LibraryManager, matches: &ArgMatches) -> Result<()> {
    if !matches.get_flag("yes") {
        bail!("Refusing to reset without --yes");
    }
    manager.reset_database().await?;
    println!("{} Database reset", style("✓").green().bold());
    Ok(())
}

fn required_id(matches: &ArgMatches) -> Result<i64> {
    matches
        .get_one::<i64>("id")
        .copied()
        .ok_or_else(|| anyhow::anyhow!("ID is required"))
}

fn print_field(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("  {}: {}", label, value);
    }
}

fn status_label(status: HistoryStatus) -> console::StyledObject<&'static str> {
    let label = status.as_str();
    match status {
        HistoryStatus::Fixed => style(label).green(),
        HistoryStatus::PendingFix => style(label).yellow(),
        HistoryStatus::Error => style(label).red(),
        HistoryStatus::Undone => style(label).dim(),
    }
}

fn print_record(record: &HistoryRecord) {
    println!(
        "\n[{}] {} {}",
        record.id,
        status_label(record.status),
        record.created_at
    );
    println!("  {} - {}", record.old_author, record.old_title);
    println!(
        "  {} {} - {}",
        style("→").bold(),
        style(&record.new_author).bold(),
        record.new_title
    );
    if let Some(message) = &record.error_message {
        println!("  {}", style(truncate(message, 76)).dim());
    }
}

fn print_bulk(verb: &str, outcome: &BulkOutcome) {
    println!(
        "{} {} {}, {} conflicts, {} failed",
        style("✓").green().bold(),
        verb,
        outcome.applied,
        outcome.conflicts,
        outcome.failed
    );
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests;
