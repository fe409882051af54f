use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ForkifyConfig {
    /// Base URL of the recipes resource, with trailing slash
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Developer key sent as the `key` query parameter
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Search results shown per page
    #[serde(default = "default_results_per_page")]
    pub results_per_page: usize,
    /// Directory holding the persisted bookmarks
    pub storage_dir: Option<PathBuf>,
}

impl Default for ForkifyConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            timeout: default_timeout(),
            results_per_page: default_results_per_page(),
            storage_dir: None,
        }
    }
}

// Default value functions
fn default_api_url() -> String {
    "https://forkify-api.herokuapp.com/api/v2/recipes/".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_results_per_page() -> usize {
    10
}

impl ForkifyConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with FORKIFY__ prefix
    /// 2. forkify.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: FORKIFY__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// API key from config, falling back to `FORKIFY_API_KEY`
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("FORKIFY_API_KEY").ok())
            .filter(|key| !key.is_empty())
    }

    /// Where bookmarks live when no directory is configured
    pub fn resolved_storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("forkify"))
                .unwrap_or_else(|| PathBuf::from(".forkify"))
        })
    }
}

/// Load configuration from file and environment variables
///
/// See [`ForkifyConfig::load`] for the precedence rules.
pub fn load_config() -> Result<ForkifyConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("forkify").required(false))
        // Use double underscore for nested keys: FORKIFY__RESULTS_PER_PAGE
        .add_source(
            Environment::with_prefix("FORKIFY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
