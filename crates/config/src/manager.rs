//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Main configuration manager
///
/// This is the primary interface for loading, saving, and managing configuration.
/// It handles file paths, defaults, and validation.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager using the default platform directories
    ///
    /// - Linux: `~/.config/shelfwise/`
    /// - macOS: `~/Library/Application Support/shelfwise/`
    /// - Windows: `%APPDATA%\shelfwise\`
    pub fn new() -> ConfigResult<Self> {
        let dirs = Self::project_dirs()?;
        let mut manager = Self::with_directory(dirs.config_dir().to_path_buf())?;
        manager.data_dir = dirs.data_dir().to_path_buf();
        Ok(manager)
    }

    /// Creates a config manager with a custom config directory
    ///
    /// The same directory is used for data files.
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let config_path = config_dir.join("config.toml");
        let persistence = ConfigPersistence::new(config_path);

        Ok(Self {
            persistence,
            data_dir: config_dir.clone(),
            config_dir,
        })
    }

    fn project_dirs() -> ConfigResult<ProjectDirs> {
        ProjectDirs::from("", "", "shelfwise").ok_or_else(|| ConfigError::PathResolutionError {
            reason: "Could not determine user config directory".to_string(),
        })
    }

    /// Returns the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Returns the data directory path
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Resolves the database path, anchoring relative paths in the data dir
    pub fn database_path(&self, config: &Config) -> PathBuf {
        if config.app.database_path.is_absolute() {
            config.app.database_path.clone()
        } else {
            self.data_dir.join(&config.app.database_path)
        }
    }

    /// Loads the configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file is corrupted, returns an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    ///
    /// Errors are logged but the function always returns a valid config.
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Saves the configuration to file
    ///
    /// This performs validation before saving and uses atomic writes
    /// to prevent corruption.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Updates the configuration using a closure
    ///
    /// This loads the current config, applies the update function,
    /// and saves the result atomically.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use shelfwise_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.processing.auto_fix = true;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Generates a default config file if one doesn't exist
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.persistence.generate_default()?;
        Ok(true)
    }

    /// Resets the configuration to defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    ///
    /// Returns all validation errors found, or Ok if valid.
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the config and applies environment variable overrides
    ///
    /// Variables follow the pattern `SHELFWISE_SECTION_FIELD`, for example
    /// `SHELFWISE_PROCESSING_AUTO_FIX=true`.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(db_path) = lookup("SHELFWISE_APP_DATABASE_PATH") {
        config.app.database_path = PathBuf::from(db_path);
    }

    if let Some(paths) = lookup("SHELFWISE_LIBRARY_PATHS") {
        config.library.library_paths = std::env::split_paths(&paths).collect();
    }

    if let Some(value) = lookup("SHELFWISE_PROCESSING_AUTO_FIX") {
        match value.parse::<bool>() {
            Ok(v) => config.processing.auto_fix = v,
            Err(_) => log::warn!("Ignoring SHELFWISE_PROCESSING_AUTO_FIX={}", value),
        }
    }

    if let Some(value) = lookup("SHELFWISE_PROCESSING_BATCH_SIZE") {
        match value.parse::<usize>() {
            Ok(v) => config.processing.batch_size = v,
            Err(_) => log::warn!("Ignoring SHELFWISE_PROCESSING_BATCH_SIZE={}", value),
        }
    }

    if let Some(value) = lookup("SHELFWISE_PROCESSING_MAX_REQUESTS_PER_HOUR") {
        match value.parse::<usize>() {
            Ok(v) => config.processing.max_requests_per_hour = v,
            Err(_) => log::warn!(
                "Ignoring SHELFWISE_PROCESSING_MAX_REQUESTS_PER_HOUR={}",
                value
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn setup_test_manager() -> (TempDir, ConfigManager) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())
            .expect("Failed to create manager");
        (temp_dir, manager)
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let (_temp_dir, manager) = setup_test_manager();
        let config = manager.load_or_default();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let (_temp_dir, manager) = setup_test_manager();

        let mut config = Config::default();
        config.processing.max_requests_per_hour = 60;

        manager.save(&config).expect("Should save config");
        let loaded = manager.load().expect("Should load config");

        assert_eq!(loaded.processing.max_requests_per_hour, 60);
    }

    #[test]
    fn test_update() {
        let (_temp_dir, manager) = setup_test_manager();
        manager.save(&Config::default()).expect("Should save");

        manager
            .update(|config| {
                config.processing.auto_fix = true;
            })
            .expect("Should update");

        let loaded = manager.load().expect("Should load");
        assert!(loaded.processing.auto_fix);
    }

    #[test]
    fn test_initialize_creates_file() {
        let (_temp_dir, manager) = setup_test_manager();

        let created = manager.initialize().expect("Should initialize");
        assert!(created);
        assert!(manager.config_path().exists());
    }

    #[test]
    fn test_initialize_with_existing_file() {
        let (_temp_dir, manager) = setup_test_manager();
        manager.save(&Config::default()).expect("Should save");

        let created = manager.initialize().expect("Should initialize");
        assert!(!created);
    }

    #[test]
    fn test_reset() {
        let (_temp_dir, manager) = setup_test_manager();

        let mut config = Config::default();
        config.processing.batch_size = 9;
        manager.save(&config).expect("Should save");

        manager.reset().expect("Should reset");

        let loaded = manager.load().expect("Should load");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_validate_invalid_config() {
        let (_temp_dir, manager) = setup_test_manager();

        let mut config = Config::default();
        config.processing.batch_size = 0;
        manager
            .save(&config)
            .expect_err("Should not save invalid config");
    }

    #[test]
    fn test_database_path_relative_to_data_dir() {
        let (temp_dir, manager) = setup_test_manager();
        let config = Config::default();
        assert_eq!(
            manager.database_path(&config),
            temp_dir.path().join("shelfwise.db")
        );
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SHELFWISE_PROCESSING_AUTO_FIX", "true"),
            ("SHELFWISE_PROCESSING_BATCH_SIZE", "not-a-number"),
            ("SHELFWISE_APP_DATABASE_PATH", "/var/lib/shelfwise.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| vars.get(name).map(|v| v.to_string()));

        assert!(config.processing.auto_fix);
        assert_eq!(config.processing.batch_size, 3);
        assert_eq!(
            config.app.database_path,
            PathBuf::from("/var/lib/shelfwise.db")
        );
    }

    #[test]
    fn test_config_file_path() {
        let (_temp_dir, manager) = setup_test_manager();
        assert!(manager.config_path().ends_with("config.toml"));
    }
}
