//! Interpretation of the driver config string.
//!
//! The registry hands the driver an opaque string. It is read as:
//!
//! - a path ending in `.json`, `.yaml`, or `.yml` → a settings file
//!   deserialized into [`SqliteConfig`];
//! - `:memory:` → a private in-memory database;
//! - `sqlite://<path>` or any other non-empty string → a database file.
//!
//! # Example settings file
//!
//! ```yaml
//! path: data/app.db
//! pool_size: 8
//! busy_timeout_ms: 5000
//! foreign_keys: true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqliteError};

/// Database path meaning "in-memory database".
pub const MEMORY: &str = ":memory:";

const DEFAULT_POOL_SIZE: u32 = 4;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Resolved SQLite driver settings.
///
/// # Examples
///
/// ```
/// use sqlstore_sqlite::SqliteConfig;
///
/// let config = SqliteConfig::parse("sqlite://data/app.db").unwrap();
/// assert_eq!(config.path.to_str(), Some("data/app.db"));
/// assert_eq!(config.pool_size, 4);
///
/// let memory = SqliteConfig::parse(":memory:").unwrap();
/// assert!(memory.is_memory());
/// assert_eq!(memory.effective_pool_size(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`.
    pub path: PathBuf,
    /// Maximum pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// How long a connection waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Enables `PRAGMA foreign_keys` on every connection.
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_foreign_keys() -> bool {
    true
}

impl SqliteConfig {
    /// Creates settings for a database path with default tuning.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }

    /// Interprets a driver config string.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidConfig`] for an empty string, an
    /// unreadable or malformed settings file, or settings with an empty path
    /// or a zero pool size.
    pub fn parse(config: &str) -> Result<Self> {
        let config = config.trim();
        if config.is_empty() {
            return Err(SqliteError::InvalidConfig(
                "config string is empty".to_string(),
            ));
        }

        let settings = if is_settings_file(Path::new(config)) {
            Self::load(Path::new(config))?
        } else {
            Self::new(config.strip_prefix("sqlite://").unwrap_or(config))
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Loads a JSON or YAML settings file.
    ///
    /// A relative `path` inside the file is resolved against the file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SqliteError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        let mut settings: Self = if yaml {
            serde_yaml::from_str(&text).map_err(|e| invalid_file(path, e))?
        } else {
            serde_json::from_str(&text).map_err(|e| invalid_file(path, e))?
        };

        if !settings.is_memory() && settings.path.is_relative() {
            if let Some(base) = path.parent() {
                settings.path = base.join(&settings.path);
            }
        }
        Ok(settings)
    }

    /// Returns `true` for an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY
    }

    /// Pool size actually used; in-memory databases share one connection.
    pub fn effective_pool_size(&self) -> u32 {
        if self.is_memory() { 1 } else { self.pool_size }
    }

    /// Returns the busy timeout as a [`Duration`].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(SqliteError::InvalidConfig(
                "database path is empty".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(SqliteError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_settings_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "yaml" | "yml")
    )
}

fn invalid_file(path: &Path, err: impl std::fmt::Display) -> SqliteError {
    SqliteError::InvalidConfig(format!("malformed settings file {}: {err}", path.display()))
}
