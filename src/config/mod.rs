//! Configuration module for the workflow verifier
//!
//! Configuration comes either from the process environment (`BASE_URL`,
//! `TEST_USER`, `TEST_PASSWORD`, `OSS_*`) or from a YAML file whose string
//! values may reference environment variables. Either way it is validated
//! before any network call is made and then handed to the workflow and the
//! storage probe as an explicit value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// # Examples
///
/// ```ignore
/// std::env::set_var("TEST_USER", "alice");
/// assert_eq!(expand_env_vars("${TEST_USER}"), "alice");
/// assert_eq!(expand_env_vars("${MISSING:-admin}"), "admin");
/// ```
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);
    result
}

fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

fn deserialize_opt_with_env<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(|s| expand_env_vars(&s)))
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// A value still holding an unexpanded `${VAR}` placeholder counts as unset.
fn is_unset(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || (trimmed.starts_with("${") && trimmed.ends_with('}'))
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigLoader::from_env()
    }

    /// Validate the API section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()
    }

    /// Storage configuration, failing if the `OSS_*` settings were never provided
    pub fn require_storage(&self) -> Result<&StorageConfig, ConfigError> {
        let storage = self.storage.as_ref().ok_or_else(|| {
            ConfigError::Missing(
                StorageConfig::ENV_NAMES
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
            )
        })?;
        storage.validate()?;
        Ok(storage)
    }
}

/// File-service API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(
        default = "default_base_url",
        deserialize_with = "deserialize_with_env"
    )]
    pub base_url: String,

    #[serde(
        default = "default_username",
        deserialize_with = "deserialize_with_env"
    )]
    pub username: String,

    /// Required for the workflow; left empty for a storage-only run
    #[serde(default, deserialize_with = "deserialize_with_env")]
    pub password: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for the unauthenticated probe request
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,

    /// Page size used while paging for a folder's numeric id
    #[serde(default = "default_resolve_page_size")]
    pub resolve_page_size: u32,

    #[serde(default = "default_auth_probe_page_size")]
    pub auth_probe_page_size: u32,

    #[serde(default = "default_expiry")]
    pub url_expiry_secs: u64,

    #[serde(default = "default_expiry")]
    pub share_expiry_secs: u64,
}

impl ApiConfig {
    /// API config with defaults for everything but the password
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            username: default_username(),
            password: password.into(),
            request_timeout_secs: default_request_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            list_page_size: default_list_page_size(),
            resolve_page_size: default_resolve_page_size(),
            auth_probe_page_size: default_auth_probe_page_size(),
            url_expiry_secs: default_expiry(),
            share_expiry_secs: default_expiry(),
        }
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if is_unset(&self.password) {
            missing.push("TEST_PASSWORD".to_string());
        }
        if is_unset(&self.username) {
            missing.push("TEST_USER".to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        if !is_valid_http_url(&self.base_url) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid base URL '{}': must start with http:// or https://",
                self.base_url
            )));
        }

        if self.request_timeout_secs == 0 || self.probe_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "Timeouts must be greater than zero".into(),
            ));
        }

        for (name, size) in [
            ("list_page_size", self.list_page_size),
            ("resolve_page_size", self.resolve_page_size),
            ("auth_probe_page_size", self.auth_probe_page_size),
        ] {
            if size == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8888".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_list_page_size() -> u32 {
    50
}

fn default_resolve_page_size() -> u32 {
    100
}

fn default_auth_probe_page_size() -> u32 {
    10
}

fn default_expiry() -> u64 {
    600
}

/// Object storage (OSS) configuration for the capability probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(deserialize_with = "deserialize_with_env")]
    pub access_key_id: String,

    #[serde(deserialize_with = "deserialize_with_env")]
    pub access_key_secret: String,

    #[serde(deserialize_with = "deserialize_with_env")]
    pub bucket: String,

    /// OSS region, e.g. `oss-cn-hangzhou`
    #[serde(deserialize_with = "deserialize_with_env")]
    pub region: String,

    /// Endpoint override; defaults to `https://<region>.aliyuncs.com`
    #[serde(default, deserialize_with = "deserialize_opt_with_env")]
    pub endpoint: Option<String>,

    /// Address the bucket in the path instead of the host name
    #[serde(default)]
    pub path_style: bool,
}

impl StorageConfig {
    pub(crate) const ENV_NAMES: [&'static str; 4] = [
        "OSS_ACCESS_KEY_ID",
        "OSS_ACCESS_KEY_SECRET",
        "OSS_BUCKET_NAME",
        "OSS_REGION",
    ];

    /// Endpoint URL the probe talks to
    pub fn endpoint(&self) -> String {
        match self.endpoint.as_deref() {
            Some(endpoint) if !is_unset(endpoint) => endpoint.trim_end_matches('/').to_string(),
            _ => format!("https://{}.aliyuncs.com", self.region),
        }
    }

    /// Validate that every required setting is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<String> = Self::ENV_NAMES
            .iter()
            .zip([
                &self.access_key_id,
                &self.access_key_secret,
                &self.bucket,
                &self.region,
            ])
            .filter(|(_, value)| is_unset(value))
            .map(|(name, _)| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        if let Some(endpoint) = self.endpoint.as_deref() {
            if !is_unset(endpoint) && !is_valid_http_url(endpoint) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid storage endpoint '{}': must start with http:// or https://",
                    endpoint
                )));
            }
        }

        Ok(())
    }
}
