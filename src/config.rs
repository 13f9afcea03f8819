use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::services::NamingScheme;

/// Upload ceiling applied when nothing else is configured (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default)]
    pub naming: NamingScheme,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_db_path() -> String {
    "data/filedepot.db".to_string()
}

fn default_upload_path() -> String {
    "uploads".to_string()
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_path: default_upload_path(),
            max_upload_bytes: default_max_upload_bytes(),
            naming: NamingScheme::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        tracing::info!(
            "Storage config: upload_path={}, max_upload_bytes={}, naming={:?}",
            config.storage.upload_path,
            config.storage.max_upload_bytes,
            config.storage.naming
        );
        Ok(config)
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from conf.ini or config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["conf.ini", "config.toml", "data/conf.ini", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config = Self::from_toml_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: FD_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("FD_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("FD_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("FD_CONF_SERVER_CORS_ORIGINS") {
            self.server.cors_origins = split_list(&val);
        }

        if let Ok(val) = env::var("FD_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        if let Ok(val) = env::var("FD_CONF_STORAGE_UPLOAD_PATH") {
            self.storage.upload_path = val;
        }
        if let Ok(val) = env::var("FD_CONF_STORAGE_MAX_UPLOAD_BYTES") {
            if let Ok(bytes) = val.parse() {
                self.storage.max_upload_bytes = bytes;
            }
        }
        if let Ok(val) = env::var("FD_CONF_STORAGE_NAMING") {
            match val.parse() {
                Ok(naming) => self.storage.naming = naming,
                Err(e) => tracing::warn!("Ignoring FD_CONF_STORAGE_NAMING: {}", e),
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        fs::create_dir_all(&self.storage.upload_path)?;

        Ok(())
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
