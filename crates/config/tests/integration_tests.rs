//! Integration tests for the configuration system

use shelfwise_config::{
    AppConfig, Config, ConfigManager, ConfigSection, LibraryConfig, LlmConfig, LlmProvider,
    NamingMode, ProcessingConfig, ProvidersConfig, SeriesTieBreak, CONFIG_VERSION,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let created = manager.initialize()?;
    assert!(created);

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);

    let mut modified = config.clone();
    modified.processing.auto_fix = true;
    modified.library.naming = NamingMode::SeriesGrouped;
    modified.library.series_grouping = true;
    manager.save(&modified)?;

    let reloaded = manager.load()?;
    assert!(reloaded.processing.auto_fix);
    assert_eq!(reloaded.library.naming, NamingMode::SeriesGrouped);

    manager.reset()?;
    let after_reset = manager.load()?;
    assert_eq!(after_reset, Config::default());

    Ok(())
}

#[test]
fn test_invalid_config_is_not_saved() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    manager.save(&Config::default())?;
    assert!(manager.validate()?.is_empty());

    let mut invalid = Config::default();
    invalid.library.naming = NamingMode::Custom;
    invalid.library.custom_template = "{author}/{publisher}/{title}".to_string();
    assert!(manager.save(&invalid).is_err());

    // The file on disk is still the last valid one
    assert_eq!(manager.load()?, Config::default());

    Ok(())
}

#[test]
fn test_atomic_save_keeps_backup() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let config = Config::default();
    manager.save(&config)?;
    manager.save(&config)?;

    let backup_path = manager.config_path().with_extension("toml.backup");
    assert!(backup_path.exists());

    Ok(())
}

#[test]
fn test_all_sections_default_are_valid() {
    assert!(AppConfig::default().validate().is_ok());
    assert!(LibraryConfig::default().validate().is_ok());
    assert!(ProcessingConfig::default().validate().is_ok());
    assert!(ProvidersConfig::default().validate().is_ok());
    assert!(LlmConfig::default().validate().is_ok());
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_hand_written_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    std::fs::write(
        manager.config_path(),
        r#"
version = 1

[library]
library_paths = ["/srv/audiobooks", "/mnt/books"]
naming = "custom"
custom_template = "{author}/{series}/{series_num} - {title}"

[processing]
auto_fix = true
series_tie_break = "leave_unknown"

[llm]
provider = "gemini"
"#,
    )?;

    let config = manager.load()?;
    assert_eq!(config.library.library_paths.len(), 2);
    assert_eq!(config.library.naming, NamingMode::Custom);
    assert_eq!(
        config.processing.series_tie_break,
        SeriesTieBreak::LeaveUnknown
    );
    assert_eq!(config.llm.provider, LlmProvider::Gemini);
    assert_eq!(config.llm.model(), "gemini-2.0-flash");
    assert_eq!(config.processing.batch_size, 3);

    Ok(())
}

#[test]
fn test_graceful_degradation_on_corrupt_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    std::fs::write(manager.config_path(), "[library\nnaming = ")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_serialization_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let mut original = Config::default();
    original.library.library_paths = vec![PathBuf::from("/home/user/audiobooks")];
    original.providers.google_books_api_key = Some("key".to_string());

    let toml_string = toml::to_string(&original)?;
    let deserialized: Config = toml::from_str(&toml_string)?;
    assert_eq!(original, deserialized);
    Ok(())
}

#[test]
fn test_multiple_validation_errors_collected() {
    let mut config = Config::default();
    config.processing.batch_size = 0;
    config.processing.scan_interval_hours = 0;
    config.llm.max_retries = 50;

    let errors = config.validate().expect_err("three invalid fields");
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_default_audio_extensions() {
    let config = Config::default();
    for ext in ["mp3", "m4a", "m4b", "flac", "ogg", "opus"] {
        assert!(config.library.is_audio_extension(ext), "{ext} missing");
    }
}
