// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::style;
use shelfwise_config::{Config, ConfigManager};
use shelfwise_core::AppError;
use shelfwise_library::LibraryManager;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

fn limit_arg(default: &'static str) -> Arg {
    Arg::new("limit")
        .short('n')
        .long("limit")
        .value_name("N")
        .help("Maximum number of items")
        .value_parser(clap::value_parser!(i64).range(1..))
        .default_value(default)
}

fn id_arg(help: &'static str) -> Arg {
    Arg::new("id")
        .required(true)
        .value_name("ID")
        .help(help)
        .value_parser(clap::value_parser!(i64))
}

pub(crate) fn build_cli() -> Command {
    Command::new("shelfwise")
        .version(env!("CARGO_PKG_VERSION"))
        .author("DrTomLLC")
        .about("Audiobook library organizer: finds misnamed folders and renames them safely")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml")
                .global(true),
        )
        .arg(
            Arg::new("database")
                .short('d')
                .long("database")
                .value_name("PATH")
                .help("Path to the database file, overriding the config")
                .global(true),
        )
        .subcommand(Command::new("init").about("Create the config file and the database"))
        .subcommand(
            Command::new("config")
                .about("Inspect the configuration")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the config file location")),
        )
        .subcommand(Command::new("scan").about("Scan the library and queue folders with issues"))
        .subcommand(
            Command::new("rescan").about("Re-queue every folder except protected ones"),
        )
        .subcommand(
            Command::new("process")
                .about("Run queued folders through the model")
                .arg(
                    Arg::new("all")
                        .short('a')
                        .long("all")
                        .help("Keep processing until the queue is empty")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("N")
                        .help("Process at most N items")
                        .value_parser(clap::value_parser!(usize))
                        .conflicts_with("all"),
                ),
        )
        .subcommand(
            Command::new("queue")
                .about("Show the next queued folders")
                .arg(limit_arg("20")),
        )
        .subcommand(Command::new("pending").about("Show renames waiting for approval"))
        .subcommand(
            Command::new("history")
                .about("Show recent history")
                .arg(limit_arg("20")),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply a held rename")
                .arg(
                    Arg::new("id")
                        .value_name("ID")
                        .help("History record to apply")
                        .value_parser(clap::value_parser!(i64))
                        .required_unless_present("all"),
                )
                .arg(
                    Arg::new("all")
                        .short('a')
                        .long("all")
                        .help("Apply every held rename")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("id"),
                ),
        )
        .subcommand(
            Command::new("reject")
                .about("Reject a held rename")
                .arg(id_arg("History record to reject")),
        )
        .subcommand(
            Command::new("dismiss")
                .about("Dismiss an error record")
                .arg(id_arg("History record to dismiss")),
        )
        .subcommand(
            Command::new("undo")
                .about("Move a renamed folder back")
                .arg(id_arg("History record to undo")),
        )
        .subcommand(
            Command::new("drastic")
                .about("List applied renames that replaced the author")
                .arg(
                    Arg::new("undo-all")
                        .long("undo-all")
                        .help("Undo all of them")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Drop a folder from the queue")
                .arg(id_arg("Queue item to remove")),
        )
        .subcommand(
            Command::new("orphans")
                .about("List loose audio files in author folders")
                .arg(
                    Arg::new("organize")
                        .long("organize")
                        .help("Move each group into its own book folder")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("stats").about("Show library statistics"))
        .subcommand(Command::new("worker").about("Run scan and processing cycles until Ctrl-C"))
        .subcommand(
            Command::new("classify")
                .about("Show how a folder path is read")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_name("PATH")
                        .help("Book folder to classify")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .value_name("ROOT")
                        .help("Library root the path lives under")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("reset")
                .about("Delete all entries, queue items, history and stats")
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .help("Confirm the reset")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn config_manager(dir: Option<&String>) -> Result<ConfigManager> {
    let manager = match dir {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    };
    manager.context("Failed to locate config directory")
}

async fn open_manager(config: Config, db_path: &std::path::Path) -> Result<LibraryManager> {
    let pool = shelfwise_database::open(db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    LibraryManager::new(config, pool).context("Failed to set up library")
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(build_cli().get_matches()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            if let Some(cause) = e.chain().find_map(|c| c.downcast_ref::<AppError>()) {
                eprintln!("{}", cause.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(matches: ArgMatches) -> Result<()> {
    let configs = config_manager(matches.get_one::<String>("config-dir"))?;
    let config = configs
        .load_with_env_overrides()
        .context("Failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.to_string()),
    )
    .init();

    let db_path = matches
        .get_one::<String>("database")
        .map(PathBuf::from)
        .unwrap_or_else(|| configs.database_path(&config));

    match matches.subcommand() {
        Some(("init", _)) => commands::init(&configs, &db_path).await,
        Some(("config", sub)) => commands::show_config(&configs, &config, sub),
        Some((name, sub)) => {
            let manager = open_manager(config, &db_path).await?;
            match name {
                "scan" => commands::scan(&manager).await,
                "rescan" => commands::rescan(&manager).await,
                "process" => commands::process(&manager, sub).await,
                "queue" => commands::show_queue(&manager, sub).await,
                "pending" => commands::show_pending(&manager).await,
                "history" => commands::show_history(&manager, sub).await,
                "apply" => commands::apply(&manager, sub).await,
                "reject" => commands::reject(&manager, sub).await,
                "dismiss" => commands::dismiss(&manager, sub).await,
                "undo" => commands::undo(&manager, sub).await,
                "drastic" => commands::drastic(&manager, sub).await,
                "remove" => commands::remove(&manager, sub).await,
                "orphans" => commands::orphans(&manager, sub),
                "stats" => commands::show_stats(&manager).await,
                "worker" => commands::run_worker(manager).await,
                "classify" => commands::classify(&manager, sub).await,
                "reset" => commands::reset(&manager, sub).await,
                _ => {
                    build_cli().print_help()?;
                    Ok(())
                }
            }
        }
        None => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
