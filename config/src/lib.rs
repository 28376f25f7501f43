use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SqlAgentConfig {
    pub database: DatabaseConfig,
    pub ai: AIConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// When false the database is opened read-only and every write is rejected by SQLite.
    pub allow_writes: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("patient_records.db"),
            allow_writes: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AIConfig {
    pub model: String,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            model: "Qwen/Qwen3-4B".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// One agent owning both database tools
    #[default]
    Single,
    /// A coordinator delegating to a schema agent and an operation agent
    Multi,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub mode: AgentMode,
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mode: AgentMode::Single,
            max_tool_rounds: 8,
        }
    }
}

impl SqlAgentConfig {
    /// `$HOME/.config/sqlagent/config.toml`, if `HOME` is set.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        let home_dir = std::env::var("HOME").ok()?;
        Some(PathBuf::from(format!("{home_dir}/.config/sqlagent/config.toml")))
    }

    /// Reads the config at the default location, falling back to defaults when the
    /// file is missing or unreadable.
    #[must_use]
    pub fn get_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return SqlAgentConfig::default();
        };

        Self::load(path).unwrap_or_default()
    }

    /// Reads the config at `path`. Missing sections and keys take their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid TOML for this layout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_file = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&config_file).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
