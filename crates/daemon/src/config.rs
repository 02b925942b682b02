//! Configuration management for Indexfo.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/indexfo/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::navigator::DEFAULT_ENTRY_THRESHOLD;
use crate::files::transfer::{ConflictPolicy, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("root must not be empty")]
    EmptyRoot,

    #[error("chunk_size must be between 1 and {max}, got {got}")]
    InvalidChunkSize { got: u32, max: u32 },

    #[error("entry_threshold must be greater than 0, got {0}")]
    InvalidEntryThreshold(usize),

    #[error("max_upload_bytes must be greater than 0 when set, got {0}")]
    InvalidMaxUploadBytes(u64),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for Indexfo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Shared root and logging.
    pub server: ServerConfig,

    /// Directory listing behavior.
    pub listing: ListingConfig,

    /// Download and upload settings.
    pub transfer: TransferConfig,
}

/// Shared root and logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory exposed to clients.
    pub root: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Optional file that receives log output in addition to stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("cdnData"),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Directory listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListingConfig {
    /// Entry count above which a listing is streamed unsorted.
    pub entry_threshold: usize,

    /// Whether dot-files are listed.
    pub show_hidden: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
            show_hidden: true,
        }
    }
}

/// Download and upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransferConfig {
    /// Maximum bytes read or written per chunk.
    pub chunk_size: u32,

    /// Upload size limit in bytes; unlimited when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<u64>,

    /// What to do when an upload's name is already taken.
    pub on_conflict: ConflictPolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_upload_bytes: None,
            on_conflict: ConflictPolicy::Reject,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("indexfo")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - INDEXFO_ROOT: Override the shared root directory
    /// - INDEXFO_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - INDEXFO_MAX_UPLOAD_BYTES: Override the upload size limit
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("INDEXFO_ROOT") {
            if !root.is_empty() {
                tracing::info!(root = %root, "Overriding root from environment");
                self.server.root = PathBuf::from(root);
            }
        }

        if let Ok(level) = std::env::var("INDEXFO_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!(level = %level, "Overriding log_level from environment");
                self.server.log_level = level;
            }
        }

        if let Ok(limit) = std::env::var("INDEXFO_MAX_UPLOAD_BYTES") {
            if !limit.is_empty() {
                match limit.parse::<u64>() {
                    Ok(bytes) => {
                        tracing::info!(bytes, "Overriding max_upload_bytes from environment");
                        self.transfer.max_upload_bytes = Some(bytes);
                    }
                    Err(e) => {
                        tracing::warn!(value = %limit, error = %e, "Ignoring invalid INDEXFO_MAX_UPLOAD_BYTES");
                    }
                }
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRoot);
        }

        if self.transfer.chunk_size == 0 || self.transfer.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize {
                got: self.transfer.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }

        if self.listing.entry_threshold == 0 {
            return Err(ConfigError::InvalidEntryThreshold(self.listing.entry_threshold));
        }

        if let Some(0) = self.transfer.max_upload_bytes {
            return Err(ConfigError::InvalidMaxUploadBytes(0));
        }

        let level = self.server.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!(path = ?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!(path = ?path, "Configuration saved");
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var("INDEXFO_ROOT");
        std::env::remove_var("INDEXFO_LOG_LEVEL");
        std::env::remove_var("INDEXFO_MAX_UPLOAD_BYTES");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.root, PathBuf::from("cdnData"));
        assert_eq!(config.server.log_level, "info");
        assert!(config.server.log_file.is_none());
        assert_eq!(config.listing.entry_threshold, 10_000);
        assert!(config.listing.show_hidden);
        assert_eq!(config.transfer.chunk_size, 64 * 1024);
        assert!(config.transfer.max_upload_bytes.is_none());
        assert_eq!(config.transfer.on_conflict, ConflictPolicy::Reject);
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[server]
log_level = "debug"

[transfer]
on_conflict = "rename"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.transfer.on_conflict, ConflictPolicy::Rename);
        // Other values should be defaults
        assert_eq!(config.server.root, PathBuf::from("cdnData"));
        assert_eq!(config.transfer.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[server]
root = "/srv/share"
log_level = "trace"
log_file = "/var/log/indexfo.log"

[listing]
entry_threshold = 500
show_hidden = false

[transfer]
chunk_size = 131072
max_upload_bytes = 52428800
on_conflict = "overwrite"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.server.root, PathBuf::from("/srv/share"));
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(
            config.server.log_file,
            Some(PathBuf::from("/var/log/indexfo.log"))
        );
        assert_eq!(config.listing.entry_threshold, 500);
        assert!(!config.listing.show_hidden);
        assert_eq!(config.transfer.chunk_size, 131072);
        assert_eq!(config.transfer.max_upload_bytes, Some(52428800));
        assert_eq!(config.transfer.on_conflict, ConflictPolicy::Overwrite);
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[server
log_level = "debug"
"#;
        let err = Config::from_toml(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_unknown_policy() {
        let toml = r#"
[transfer]
on_conflict = "merge"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_to_toml() {
        let toml = Config::default().to_toml().unwrap();

        assert!(toml.contains("[server]"));
        assert!(toml.contains("[listing]"));
        assert!(toml.contains("[transfer]"));
        assert!(toml.contains("on_conflict = \"reject\""));
        assert!(!toml.contains("max_upload_bytes"));
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut original = Config::default();
        original.server.log_file = Some(PathBuf::from("indexfo.log"));
        original.listing.show_hidden = false;
        original.transfer.max_upload_bytes = Some(1024);
        original.transfer.on_conflict = ConflictPolicy::Rename;

        let loaded = Config::from_toml(&original.to_toml().unwrap()).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.server.root = temp_dir.path().to_path_buf();
        original.listing.entry_threshold = 42;

        original.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid [ toml").unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("indexfo"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    #[serial]
    fn test_env_override_root_and_level() {
        clear_env();
        std::env::set_var("INDEXFO_ROOT", "/tmp/shared");
        std::env::set_var("INDEXFO_LOG_LEVEL", "debug");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.server.root, PathBuf::from("/tmp/shared"));
        assert_eq!(config.server.log_level, "debug");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_max_upload_bytes() {
        clear_env();
        std::env::set_var("INDEXFO_MAX_UPLOAD_BYTES", "2048");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.transfer.max_upload_bytes, Some(2048));

        std::env::set_var("INDEXFO_MAX_UPLOAD_BYTES", "lots");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert!(config.transfer.max_upload_bytes.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        clear_env();
        std::env::set_var("INDEXFO_ROOT", "");
        std::env::set_var("INDEXFO_LOG_LEVEL", "");
        std::env::set_var("INDEXFO_MAX_UPLOAD_BYTES", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_unset_does_not_override() {
        clear_env();

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_root() {
        let mut config = Config::default();
        config.server.root = PathBuf::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyRoot));
    }

    #[test]
    fn test_validate_chunk_size() {
        let mut config = Config::default();

        config.transfer.chunk_size = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize { got: 0, max: MAX_CHUNK_SIZE })
        );

        config.transfer.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(config.validate().is_err());

        config.transfer.chunk_size = MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());

        config.transfer.chunk_size = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_entry_threshold_zero() {
        let mut config = Config::default();
        config.listing.entry_threshold = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidEntryThreshold(0)));
    }

    #[test]
    fn test_validate_max_upload_bytes_zero() {
        let mut config = Config::default();
        config.transfer.max_upload_bytes = Some(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxUploadBytes(0)));

        config.transfer.max_upload_bytes = Some(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();

        for level in ["trace", "debug", "info", "warn", "error", "DEBUG"] {
            config.server.log_level = level.to_string();
            assert!(config.validate().is_ok(), "{level} should be accepted");
        }

        config.server.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }
}
