//! Server configuration
//!
//! Loaded from a TOML file when one exists, with every field optional:
//!
//! ```toml
//! bind_address = "0.0.0.0:8000"
//! data_dir = "/var/lib/facedeck"
//! static_dir = "/srv/facedeck/static"
//! username = "dave"
//! password = "india"
//! session_ttl_minutes = 30
//! cors_allowed_origins = ["*"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    pub bind_address: String,
    /// Holds the database and the uploads directory
    pub data_dir: PathBuf,
    /// Built frontend; served at `/` when it contains `index.html`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    /// The single login account
    pub username: String,
    pub password: String,
    /// Token lifetime in minutes; 0 keeps tokens until restart
    pub session_ttl_minutes: i64,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
    /// Cards returned by a study request without an explicit limit
    pub default_study_limit: usize,
    /// `["*"]` allows any origin
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            data_dir: default_data_dir(),
            static_dir: None,
            username: "dave".to_string(),
            password: "india".to_string(),
            session_ttl_minutes: 30,
            max_upload_bytes: 25 * 1024 * 1024,
            default_study_limit: 10,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

/// Get the default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("facedeck"))
        .unwrap_or_else(|| PathBuf::from("facedeck-data"))
}

/// Config file looked up when none is given on the command line
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("facedeck").join("config.toml"))
}

impl ServerConfig {
    /// Load from `path`, or from the default location if that file exists
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("flashcards.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        if self.session_ttl_minutes > 0 {
            chrono::Duration::try_minutes(self.session_ttl_minutes)
        } else {
            None
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == "*")
    }
}
