//! TOML-based configuration for panelql.
//!
//! Supports a config file (panelql.toml) with environment variable expansion
//! for the executor command and its arguments.
//!
//! Example configuration:
//! ```toml
//! [query]
//! dialect = "duckdb"            # duckdb | postgres | mysql
//! staging_table = "panelql_page"
//!
//! [transport]
//! command = "${PANELQL_EXECUTOR}"
//! args = ["--db", "$DATA_DIR/expeditions.ddb"]
//!
//! [dashboard]
//! page_size = 100
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::dialect::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Statement generation.
    pub query: QuerySettings,

    /// Executor process.
    pub transport: TransportSettings,

    /// Dashboard defaults.
    pub dashboard: DashboardSettings,
}

/// Statement generation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Target SQL dialect.
    pub dialect: Dialect,

    /// Temporary table used for staged pagination.
    pub staging_table: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            staging_table: "panelql_page".to_string(),
        }
    }
}

/// Executor process settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Executor binary (supports ${ENV_VAR} expansion).
    pub command: String,

    /// Executor arguments (support ${ENV_VAR} expansion).
    pub args: Vec<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            command: "panelql-executor".to_string(),
            args: Vec::new(),
        }
    }
}

impl TransportSettings {
    /// Get the command with environment variables expanded.
    pub fn resolved_command(&self) -> Result<PathBuf, SettingsError> {
        expand_env_vars(&self.command).map(PathBuf::from)
    }

    /// Get the arguments with environment variables expanded.
    pub fn resolved_args(&self) -> Result<Vec<String>, SettingsError> {
        self.args.iter().map(|a| expand_env_vars(a)).collect()
    }
}

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Default page size for paginated panels.
    pub page_size: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PANELQL_CONFIG`
    /// 2. `./panelql.toml`
    /// 3. `~/.config/panelql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("PANELQL_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("panelql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("panelql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Settings::default())
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.query.staging_table.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "query.staging_table must not be empty".to_string(),
            ));
        }
        if self.dashboard.page_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "dashboard.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&ch) = chars.peek() {
            if braced && ch == '}' {
                chars.next();
                break;
            }
            if !braced && !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            var_name.push(ch);
            chars.next();
        }

        if var_name.is_empty() && !braced {
            result.push('$');
            continue;
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
