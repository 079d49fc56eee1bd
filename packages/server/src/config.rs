use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. `"*"` allows any origin.
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the raw image files.
    pub upload_dir: PathBuf,
    /// JSON file holding the metadata array. Keep it outside `upload_dir`.
    pub ledger_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Per-file size limit in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Maximum number of `photos` parts per request.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Extensions accepted for upload, compared case-insensitively.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_file_size() -> u64 {
    15 * 1024 * 1024
}
fn default_max_files() -> usize {
    10
}
fn default_allowed_extensions() -> Vec<String> {
    ["jpeg", "jpg", "png", "gif", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let port = std::env::var("PORT").ok();
        Self::load_with(port.as_deref(), env_source())
    }

    /// Layer defaults, `config/config.toml`, `env` and finally `port`, which
    /// wins over everything else.
    fn load_with(port: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let port = port
            .map(|p| p.parse::<u16>())
            .transpose()
            .map_err(|e| ConfigError::Message(format!("invalid PORT: {e}")))?
            .map(i64::from);

        let s = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("server.cors.allow_origins", vec!["*"])?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.upload_dir", "./uploads")?
            .set_default("storage.ledger_path", "./data/metadata.json")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            .add_source(env)
            .set_override_option("server.port", port)?
            .build()?;

        s.try_deserialize()
    }
}

/// Overrides from the environment, e.g. `SNAPMAP__STORAGE__UPLOAD_DIR`.
fn env_source() -> Environment {
    Environment::with_prefix("SNAPMAP")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("server.cors.allow_origins")
        .with_list_parse_key("upload.allowed_extensions")
        .try_parsing(true)
}
