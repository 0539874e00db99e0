use crate::error::CatalogError;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::warn;

/// Optional config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/catalog.toml";

const ENV_PREFIX: &str = "CATALOG";

/// Which record store the service runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// In-process actors; data is lost on shutdown.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    /// When false the index is never probed and every listing scans.
    #[serde(default = "default_search_enabled")]
    pub search_enabled: bool,
    /// Minimum catalog size maintained at startup.
    #[serde(default = "default_seed_target")]
    pub seed_target: usize,
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
    /// Mailbox size of the in-memory store and index actors.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_index_name() -> String {
    "products-index".to_string()
}

fn default_search_enabled() -> bool {
    true
}

fn default_seed_target() -> usize {
    100_000
}

fn default_scan_batch_size() -> usize {
    1000
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            index_name: default_index_name(),
            search_enabled: default_search_enabled(),
            seed_target: default_seed_target(),
            scan_batch_size: default_scan_batch_size(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

impl CatalogConfig {
    /// Loads `config/catalog.toml` (optional) overlaid by `CATALOG__*` variables.
    pub fn load() -> Result<Self, CatalogError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Like [`CatalogConfig::load`] with a different file.
    ///
    /// A file that exists but cannot be parsed is reported and skipped; the environment
    /// still applies.
    pub fn load_from(path: &str) -> Result<Self, CatalogError> {
        let settings = match Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(env_source())
            .build()
        {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path, error = %err, "Failed to load config file, falling back to env");
                Config::builder().add_source(env_source()).build()?
            }
        };
        Ok(settings.try_deserialize()?)
    }

    /// Parses TOML text without consulting the environment.
    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
