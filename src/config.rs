use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Caption languages to try, in order of preference
    pub languages: Vec<String>,
    /// Use the first available track when none of `languages` exist
    pub fallback_to_any_language: bool,
    /// Upper bound on one caption fetch, in seconds
    pub timeout_secs: u64,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    /// Append logs here instead of writing to stderr
    pub log_file: Option<PathBuf>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per client within one window
    pub requests: u32,
    pub window_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            languages: vec!["en".to_string()],
            fallback_to_any_language: false,
            timeout_secs: 10,
            cors_origins: Vec::new(),
            log_file: None,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 30,
            window_secs: 60,
        }
    }
}

impl Config {
    /// Load config from `path`, or ~/.config/ytx-api/config.toml if not given.
    /// A missing default file yields the defaults; a missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
        }

        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Fetch timeout, never shorter than one second
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytx-api")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
host = "127.0.0.1"
port = 8080
languages = ["es", "en"]
fallback_to_any_language = true
timeout_secs = 5
cors_origins = ["https://example.com"]

[rate_limit]
requests = 10
window_secs = 30
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.languages, vec!["es", "en"]);
        assert!(config.fallback_to_any_language);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.cors_origins, vec!["https://example.com"]);
        assert_eq!(config.rate_limit.requests, 10);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.languages, vec!["en"]);
        assert!(config.cors_origins.is_empty());
        assert!(config.log_file.is_none());
        assert_eq!(config.rate_limit.requests, 30);
    }

    #[test]
    fn test_parse_partial_rate_limit() {
        let toml_str = r#"
[rate_limit]
requests = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rate_limit.requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let path = std::env::temp_dir().join("ytx-api-test-does-not-exist.toml");
        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_load_explicit_file() {
        let path = std::env::temp_dir().join(format!("ytx-api-test-valid-{}.toml", std::process::id()));
        std::fs::write(&path, "port = 8081").unwrap();
        let result = Config::load(Some(path.as_path()));
        std::fs::remove_file(&path).unwrap();
        assert_eq!(result.unwrap().port, 8081);
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config: Config = toml::from_str("timeout_secs = 0").unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let path = std::env::temp_dir().join(format!("ytx-api-test-invalid-{}.toml", std::process::id()));
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        let result = Config::load(Some(path.as_path()));
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
