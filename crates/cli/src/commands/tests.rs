use super::*;
use crate::build_cli;
use shelfwise_database::create_test_db;
use shelfwise_library::Collaborators;
use tempfile::TempDir;

async fn manager(root: &Path) -> LibraryManager {
    let pool = create_test_db().await.unwrap();
    let mut config = Config::default();
    config.library.library_paths = vec![root.to_path_buf()];
    LibraryManager::with_collaborators(config, pool, Collaborators::default())
}

fn parse(args: &[&str]) -> clap::ArgMatches {
    build_cli()
        .try_get_matches_from(std::iter::once("shelfwise").chain(args.iter().copied()))
        .unwrap()
}

#[test]
fn test_cli_definition_is_consistent() {
    build_cli().debug_assert();
}

#[test]
fn test_apply_takes_id_or_all() {
    let matches = parse(&["apply", "7"]);
    let (_, sub) = matches.subcommand().unwrap();
    assert_eq!(required_id(sub).unwrap(), 7);

    let matches = parse(&["apply", "--all"]);
    let (_, sub) = matches.subcommand().unwrap();
    assert!(sub.get_flag("all"));

    assert!(build_cli()
        .try_get_matches_from(["shelfwise", "apply"])
        .is_err());
}

#[test]
fn test_process_all_conflicts_with_limit() {
    assert!(build_cli()
        .try_get_matches_from(["shelfwise", "process", "--all", "--limit", "3"])
        .is_err());

    let matches = parse(&["process", "--limit", "3"]);
    let (_, sub) = matches.subcommand().unwrap();
    assert_eq!(sub.get_one::<usize>("limit"), Some(&3));
}

#[test]
fn test_redacted_config_hides_secrets() {
    let mut config = Config::default();
    config.llm.openrouter_api_key = Some("sk-secret".to_string());
    config.providers.hardcover_token = Some("token".to_string());

    let shown = redacted(&config);
    assert_eq!(shown.llm.openrouter_api_key.as_deref(), Some(MASK));
    assert_eq!(shown.providers.hardcover_token.as_deref(), Some(MASK));
    assert_eq!(shown.llm.gemini_api_key, None);

    let text = toml::to_string_pretty(&shown).unwrap();
    assert!(!text.contains("sk-secret"));
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("The Hollow Man", 3), "The...");
}

#[tokio::test]
async fn test_reset_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path()).await;

    let matches = parse(&["reset"]);
    let (_, sub) = matches.subcommand().unwrap();
    assert!(reset(&manager, sub).await.is_err());

    let matches = parse(&["reset", "--yes"]);
    let (_, sub) = matches.subcommand().unwrap();
    reset(&manager, sub).await.unwrap();
}

#[tokio::test]
async fn test_commands_on_empty_library() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path()).await;

    scan(&manager).await.unwrap();
    show_pending(&manager).await.unwrap();
    show_stats(&manager).await.unwrap();

    let matches = parse(&["queue"]);
    let (_, sub) = matches.subcommand().unwrap();
    show_queue(&manager, sub).await.unwrap();

    let matches = parse(&["undo", "42"]);
    let (_, sub) = matches.subcommand().unwrap();
    assert!(undo(&manager, sub).await.is_err());
}

#[tokio::test]
async fn test_classify_with_explicit_root() {
    let dir = TempDir::new().unwrap();
    let manager = manager(dir.path()).await;
    let book = dir.path().join("Frank Herbert").join("Dune");
    std::fs::create_dir_all(&book).unwrap();

    let book_arg = book.to_string_lossy().into_owned();
    let root_arg = dir.path().to_string_lossy().into_owned();
    let matches = parse(&["classify", &book_arg, "--root", &root_arg]);
    let (_, sub) = matches.subcommand().unwrap();
    classify(&manager, sub).await.unwrap();
}
