//! WolfDrop Configuration
//!
//! This module provides configuration structures for the WolfDrop
//! file server.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Commented configuration file written by `wolfdrop init`
pub const CONFIG_TEMPLATE: &str = r#"# WolfDrop Configuration
# Generated configuration file

[storage]
# Directory holding uploaded files (created on startup if missing)
root = "/var/lib/wolfdrop/files"
# Sync uploads to disk before they replace the previous file
fsync = true

[api]
bind_address = "0.0.0.0:8080"
cors_enabled = false
# Largest accepted upload request
max_upload_mb = 512

[logging]
level = "info"
# pretty or compact
format = "pretty"
"#;

/// Main WolfDrop configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WolfDropConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the stored files (created at startup if absent)
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Use fsync before publishing an upload (slower but safer)
    #[serde(default = "default_true")]
    pub fsync: bool,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP bind address
    #[serde(default = "default_api_address")]
    pub bind_address: String,

    /// Enable CORS
    #[serde(default)]
    pub cors_enabled: bool,

    /// Maximum upload request body in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_storage_root() -> PathBuf {
    PathBuf::from("/var/lib/wolfdrop/files")
}

fn default_true() -> bool {
    true
}

fn default_api_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_upload_mb() -> u64 {
    512
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            fsync: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_api_address(),
            cors_enabled: false,
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ApiConfig {
    /// Get the upload body limit in bytes
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

impl WolfDropConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: WolfDropConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.storage.root.as_os_str().is_empty() {
            return Err(crate::Error::Config("storage.root cannot be empty".into()));
        }

        if self.api.bind_address.is_empty() {
            return Err(crate::Error::Config("api.bind_address cannot be empty".into()));
        }

        if self.api.max_upload_mb == 0 {
            return Err(crate::Error::Config("api.max_upload_mb must be at least 1".into()));
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(crate::Error::Config(format!(
                    "logging.format must be \"pretty\" or \"compact\", got \"{}\"",
                    other
                )));
            }
        }

        Ok(())
    }

    /// Get the storage root directory
    pub fn storage_root(&self) -> &Path {
        &self.storage.root
    }

    /// Render this configuration as a TOML document
    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
