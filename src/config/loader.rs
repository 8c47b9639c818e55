//! Configuration loader for YAML files and the process environment

use super::{ApiConfig, Config, ConfigError, StorageConfig};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    ///
    /// String values are expanded with `${VAR}` / `${VAR:-default}` while
    /// deserializing. Only the API section is validated here; the storage
    /// section is validated when the storage probe asks for it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file without validating any section
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load configuration from environment variables
    ///
    /// Recognized variables: `BASE_URL`, `TEST_USER`, `TEST_PASSWORD` and
    /// `OSS_ACCESS_KEY_ID`, `OSS_ACCESS_KEY_SECRET`, `OSS_BUCKET_NAME`,
    /// `OSS_REGION`, `OSS_ENDPOINT`, `OSS_PATH_STYLE`.
    pub fn from_env() -> Result<Config, ConfigError> {
        let config = Self::read_env();
        config.validate()?;
        Ok(config)
    }

    /// Read the process environment without validating any section
    pub fn read_env() -> Config {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// Nothing is validated; callers pick which sections they need.
    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut api = ApiConfig::new(var("TEST_PASSWORD").unwrap_or_default());
        if let Some(base_url) = var("BASE_URL") {
            api.base_url = base_url;
        }
        if let Some(username) = var("TEST_USER") {
            api.username = username;
        }
        let storage_vars: Vec<Option<String>> = StorageConfig::ENV_NAMES
            .iter()
            .map(|&name| var(name))
            .collect();
        let storage = if storage_vars.iter().all(Option::is_none) {
            None
        } else {
            let mut values = storage_vars.into_iter().map(Option::unwrap_or_default);
            Some(StorageConfig {
                access_key_id: values.next().unwrap_or_default(),
                access_key_secret: values.next().unwrap_or_default(),
                bucket: values.next().unwrap_or_default(),
                region: values.next().unwrap_or_default(),
                endpoint: var("OSS_ENDPOINT"),
                path_style: var("OSS_PATH_STYLE").is_some_and(|v| v == "true" || v == "1"),
            })
        };

        Config { api, storage }
    }
}
