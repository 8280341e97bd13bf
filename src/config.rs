//! Configuration system for drover
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (DROVER_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::executor::ExecutorConfig;

/// Upper bound for `executor.worker_threads`
const MAX_WORKER_THREADS: usize = 1024;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DroverConfig {
    /// Worker pool settings
    pub executor: ExecutorSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Maximum tasks running in parallel (0 = one per CPU)
    pub worker_threads: usize,

    /// Name given to worker threads
    pub thread_name: String,

    /// Idle time before a worker thread exits, in milliseconds
    pub thread_keep_alive_ms: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            thread_name: "drover-worker".to_string(),
            thread_keep_alive_ms: 10_000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl ExecutorSettings {
    /// Resolve into the runtime executor configuration
    pub fn executor_config(&self) -> ExecutorConfig {
        let worker_threads = if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        };

        ExecutorConfig {
            worker_threads,
            thread_name: self.thread_name.clone(),
            thread_keep_alive: Duration::from_millis(self.thread_keep_alive_ms),
        }
    }
}

impl DroverConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::find_config_file(config_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })?;
        info!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            Some(PathBuf::from("drover.toml")),
            dirs::config_dir().map(|p| p.join("drover").join("drover.toml")),
            dirs::home_dir().map(|p| p.join(".drover").join("drover.toml")),
            Some(PathBuf::from("/etc/drover/drover.toml")),
        ];

        for path in search_paths.into_iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Some(n) = env_parse("DROVER_WORKER_THREADS") {
            self.executor.worker_threads = n;
        }
        if let Ok(val) = std::env::var("DROVER_THREAD_NAME") {
            self.executor.thread_name = val;
        }
        if let Some(n) = env_parse("DROVER_THREAD_KEEP_ALIVE_MS") {
            self.executor.thread_keep_alive_ms = n;
        }

        if let Ok(val) = std::env::var("DROVER_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("DROVER_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("DROVER_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.executor.worker_threads > MAX_WORKER_THREADS {
            return Err(Error::config_field_invalid(
                "executor.worker_threads",
                format!("worker_threads must not exceed {}", MAX_WORKER_THREADS),
            ));
        }
        if self.executor.thread_name.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "executor.thread_name",
                "thread_name cannot be empty",
            ));
        }
        if self.executor.thread_keep_alive_ms == 0 {
            return Err(Error::config_field_invalid(
                "executor.thread_keep_alive_ms",
                "thread_keep_alive_ms must be greater than 0",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|val| val.parse().ok())
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Write a commented default configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".drover")
                .join("drover.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# drover configuration

[executor]
# Maximum tasks running in parallel (0 = one per CPU)
worker_threads = 0

# Name given to worker threads
thread_name = "drover-worker"

# Idle time before a worker thread exits (milliseconds)
thread_keep_alive_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (uncomment to enable file logging)
# file = "~/.drover/logs/drover.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Use JSON format for logs
json_format = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = DroverConfig::default();
        assert_eq!(config.executor.worker_threads, 0);
        assert_eq!(config.executor.thread_name, "drover-worker");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_executor_config_resolves_cpu_count() {
        let settings = ExecutorSettings::default();
        let resolved = settings.executor_config();
        assert_eq!(resolved.worker_threads, num_cpus::get());
        assert_eq!(resolved.thread_keep_alive, Duration::from_secs(10));

        let settings = ExecutorSettings {
            worker_threads: 3,
            thread_keep_alive_ms: 250,
            ..Default::default()
        };
        let resolved = settings.executor_config();
        assert_eq!(resolved.worker_threads, 3);
        assert_eq!(resolved.thread_keep_alive, Duration::from_millis(250));
    }

    #[test]
    fn test_env_override() {
        env::set_var("DROVER_THREAD_NAME", "env-worker");
        env::set_var("DROVER_THREAD_KEEP_ALIVE_MS", "1234");
        env::set_var("DROVER_LOG_JSON", "1");

        let mut config = DroverConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.executor.thread_name, "env-worker");
        assert_eq!(config.executor.thread_keep_alive_ms, 1234);
        assert!(config.logging.json_format);

        env::remove_var("DROVER_THREAD_NAME");
        env::remove_var("DROVER_THREAD_KEEP_ALIVE_MS");
        env::remove_var("DROVER_LOG_JSON");
    }

    #[test]
    fn test_validation_too_many_workers() {
        let mut config = DroverConfig::default();
        config.executor.worker_threads = MAX_WORKER_THREADS + 1;
        match config.validate() {
            Err(Error::ConfigValidation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("executor.worker_threads"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_empty_thread_name() {
        let mut config = DroverConfig::default();
        config.executor.thread_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_keep_alive() {
        let mut config = DroverConfig::default();
        config.executor.thread_keep_alive_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = DroverConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = DroverConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: DroverConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.executor.thread_name, parsed.executor.thread_name);
        assert_eq!(config.logging.max_files, parsed.logging.max_files);
    }

    #[test]
    fn test_default_template_parses_and_validates() {
        let config: DroverConfig = toml::from_str(&generate_default_config()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.executor.thread_keep_alive_ms, 10_000);
    }

    #[test]
    fn test_parse_config_file() {
        let config_str = r#"
[executor]
worker_threads = 6
thread_name = "ingest"

[logging]
level = "debug"
"#;

        let config: DroverConfig = toml::from_str(config_str).unwrap();

        assert_eq!(config.executor.worker_threads, 6);
        assert_eq!(config.executor.thread_name, "ingest");
        assert_eq!(config.executor.thread_keep_alive_ms, 10_000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = DroverConfig::load(Some("/nonexistent/drover.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drover.toml");
        fs::write(&path, "[executor\nworker_threads = ").unwrap();

        let err = DroverConfig::load(path.to_str()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("drover.toml");
        let path_str = path.to_str().unwrap();

        let written = init_config(Some(path_str), false).unwrap();
        assert_eq!(written, path);
        assert!(init_config(Some(path_str), false).is_err());
        assert!(init_config(Some(path_str), true).is_ok());
    }
}
