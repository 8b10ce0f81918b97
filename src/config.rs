//! Configuration management for the migrator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-migrator.toml)
//! - Environment variables (SCHEMA_MIGRATOR__*)
//!
//! ## Example config file (schema-migrator.toml):
//! ```toml
//! [registry]
//! url = "https://registry.internal:8081"
//! username = "migrator"
//! verify_tls = true
//! force_mode = true
//!
//! [import]
//! root = "./export"
//! context = "team-a"
//!
//! [export]
//! dir = "./export"
//! output_format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the migrator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigratorConfig {
    /// Registry connection settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Import settings
    #[serde(default)]
    pub import: ImportConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Registry connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry REST API
    #[serde(default)]
    pub url: Option<String>,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Verify the server's TLS certificate and hostname
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Send `force=true` with mode changes so non-empty subjects can enter IMPORT
    #[serde(default = "default_true")]
    pub force_mode: bool,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Import configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory tree produced by an export
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Context every imported subject is placed under
    #[serde(default)]
    pub context: Option<String>,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the subject tree is written to
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,

    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("export")
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            verify_tls: true,
            force_mode: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
            output_format: OutputFormat::Pretty,
        }
    }
}

impl MigratorConfig {
    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-migrator.toml",
            ".schema-migrator.toml",
            "config/schema-migrator.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-migrator") {
            let xdg_config = config_dir.config_dir().join("schema-migrator.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SCHEMA_MIGRATOR__REGISTRY__URL and friends
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_MIGRATOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Registry URL, which has no sensible default
    pub fn registry_url(&self) -> Result<&str, ConfigError> {
        self.registry
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::NotFound("registry.url".to_string()))
    }
}
