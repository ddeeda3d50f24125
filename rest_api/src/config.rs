// rest_api/src/config.rs

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

/// Represents the configuration for the REST API server itself.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RestApiConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub cors: CorsConfig,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        RestApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8082, // Default REST API port
            database_path: "prescriptions.db".to_string(),
            cors: CorsConfig::default(),
        }
    }
}

/// Cross-origin policy. A list containing `"*"` means any origin, method, or
/// header; that is the default for all three. tower-http refuses to combine
/// credentials with any wildcard, so `allow_credentials` only takes effect
/// when origins, methods, and headers are all explicit.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        CorsConfig {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec!["*".to_string()],
            allow_headers: vec!["*".to_string()],
            allow_credentials: false,
        }
    }
}

impl CorsConfig {
    /// True when any of the origin, method, or header lists is the wildcard.
    pub fn has_wildcard(&self) -> bool {
        [&self.allow_origins, &self.allow_methods, &self.allow_headers]
            .iter()
            .any(|list| list.iter().any(|entry| entry == "*"))
    }
}

// Wrapper struct to match the 'rest_api:' key in the YAML config.
#[derive(Debug, Deserialize)]
struct RestApiConfigWrapper {
    rest_api: RestApiConfig,
}

/// Loads the REST API configuration from `rest_api_config.yaml`.
///
/// Falls back to the built-in defaults when no config file exists, so the
/// service runs out of the box.
pub fn load_rest_api_config(config_file_path: Option<PathBuf>) -> Result<RestApiConfig> {
    let path_to_use = config_file_path.unwrap_or_else(|| PathBuf::from("rest_api_config.yaml"));

    if !path_to_use.exists() {
        return Ok(RestApiConfig::default());
    }

    let config_content = fs::read_to_string(&path_to_use)
        .map_err(|e| anyhow::anyhow!("Failed to read REST API config file {}: {}", path_to_use.display(), e))?;

    let wrapper: RestApiConfigWrapper = serde_yaml2::from_str(&config_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse REST API config file {}: {}", path_to_use.display(), e))?;

    Ok(wrapper.rest_api)
}
