//! Configuration for Silo

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiloConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub lifecycle: LifecycleWorkerConfig,
}

impl Default for SiloConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            lifecycle: LifecycleWorkerConfig::default(),
        }
    }
}

impl SiloConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InternalError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::InternalError(format!("Failed to parse config: {}", e)))
    }

    /// Build a config from defaults overlaid with environment variables.
    /// CLI flags are applied on top of the result by the caller.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SILO_BIND_ADDRESS") {
            config.server.bind_address = addr;
        }
        if let Ok(port) = std::env::var("SILO_PORT") {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }
        let mut explicit_db_url = false;
        if let Ok(dir) = std::env::var("SILO_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("SILO_DATABASE_URL") {
            config.database.url = url;
            explicit_db_url = true;
        }
        if !explicit_db_url {
            config.database.url = DatabaseConfig::default_url_for(&config.storage.data_dir);
        }
        // AWS_* env vars are the conventional fallback for credentials; SILO_*
        // takes precedence when both are set.
        if let Ok(key) = std::env::var("AWS_ACCESS_KEY_ID") {
            config.auth.root_access_key = key;
        }
        if let Ok(secret) = std::env::var("AWS_SECRET_ACCESS_KEY") {
            config.auth.root_secret_key = secret;
        }
        if let Ok(key) = std::env::var("SILO_ROOT_ACCESS_KEY") {
            config.auth.root_access_key = key;
        }
        if let Ok(secret) = std::env::var("SILO_ROOT_SECRET_KEY") {
            config.auth.root_secret_key = secret;
        }
        if let Ok(region) = std::env::var("AWS_REGION") {
            config.auth.region = region;
        }
        if let Ok(region) = std::env::var("SILO_REGION") {
            config.auth.region = region;
        }
        if let Ok(level) = std::env::var("SILO_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(interval) = std::env::var("SILO_LIFECYCLE_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse() {
                config.lifecycle.scan_interval_secs = secs;
            }
        }

        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub max_object_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            max_object_size: crate::MAX_OBJECT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Default database URL derived from a data directory, used when no
    /// explicit `SILO_DATABASE_URL` override is present.
    pub fn default_url_for(data_dir: &std::path::Path) -> String {
        format!("sqlite://{}/metadata.sqlite?mode=rwc", data_dir.display())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url_for(&PathBuf::from("./data")),
            max_connections: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub root_access_key: String,
    pub root_secret_key: String,
    /// SigV4 region this server answers to. Clients embed their own region
    /// in the credential scope; this is only used for presigned URL generation.
    pub region: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            root_access_key: "admin".to_string(),
            root_secret_key: "password".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Lifecycle janitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleWorkerConfig {
    pub enabled: bool,
    /// Interval between sweeps in seconds
    pub scan_interval_secs: u64,
}

impl Default for LifecycleWorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 60,
        }
    }
}
