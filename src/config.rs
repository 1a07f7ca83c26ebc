//! Environment-based configuration for the engine.
//!
//! The original deployment read everything from platform environment
//! variables, so the config surface stays env-first here: `.env` is
//! loaded by `main` via dotenvy, then `Config::from_env()` snapshots
//! the process environment into an explicit struct that is passed to
//! the gateway and producer. No ambient globals.
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Runtime configuration, read once at startup.
///
/// Secrets are held as `SecretString` and the custom `Debug` impl masks
/// them to prevent leakage in logs, error messages, and debug output.
#[derive(Clone)]
pub struct Config {
    /// Shared secret callers must present (`?api_key=` or bearer token).
    pub engine_api_key: SecretString,

    /// Gemini credential. Absent means scoring requests will fail with
    /// a structured error; the gateway still reports the load status.
    pub gemini_api_key: Option<SecretString>,

    /// Base URL of the WordPress site exposing the feed-list endpoint.
    pub wordpress_site_url: String,

    /// Gemini model name used for scoring.
    pub gemini_model: String,

    /// Gemini API base URL. Overridable for tests.
    pub gemini_base_url: String,

    /// Maximum number of feeds fetched concurrently.
    pub feed_concurrency: usize,

    /// Per-feed request timeout.
    pub feed_timeout: Duration,

    /// How many newest entries to take from each feed.
    pub articles_per_feed: usize,

    /// Producer schedule in minutes. 0 = run only when the cron route
    /// (or `--run-once`) triggers it.
    pub refresh_interval_minutes: u64,

    /// Listen address for the HTTP server.
    pub bind_addr: String,

    /// Path of the SQLite file backing the analysis cache.
    pub database_path: String,
}

/// Mask credentials in Debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("engine_api_key", &"[REDACTED]")
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("wordpress_site_url", &self.wordpress_site_url)
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("feed_concurrency", &self.feed_concurrency)
            .field("feed_timeout", &self.feed_timeout)
            .field("articles_per_feed", &self.articles_per_feed)
            .field("refresh_interval_minutes", &self.refresh_interval_minutes)
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .finish()
    }
}

impl Config {
    pub const DEFAULT_GEMINI_MODEL: &'static str = "gemini-1.5-flash";
    pub const DEFAULT_GEMINI_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_FEED_CONCURRENCY: usize = 20;
    pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_ARTICLES_PER_FEED: usize = 1;
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";
    pub const DEFAULT_DATABASE_PATH: &'static str = "ribbonline.db";

    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary lookup function.
    ///
    /// Tests pass a closure over a map instead of mutating the process
    /// environment (env mutation races across parallel test threads).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let engine_api_key = get("ENGINE_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::from)
            .ok_or(ConfigError::Missing("ENGINE_API_KEY"))?;

        let gemini_api_key = get("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::from);

        let wordpress_site_url = get("WORDPRESS_SITE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("WORDPRESS_SITE_URL"))?;
        validate_http_url("WORDPRESS_SITE_URL", &wordpress_site_url)?;
        // Trailing slash would double up when the wp-json path is appended
        let wordpress_site_url = wordpress_site_url.trim_end_matches('/').to_string();

        let gemini_base_url = match get("GEMINI_BASE_URL") {
            Some(v) if !v.trim().is_empty() => {
                validate_http_url("GEMINI_BASE_URL", &v)?;
                v.trim_end_matches('/').to_string()
            }
            _ => Self::DEFAULT_GEMINI_BASE_URL.to_string(),
        };

        let config = Self {
            engine_api_key,
            gemini_api_key,
            wordpress_site_url,
            gemini_model: get("GEMINI_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url,
            feed_concurrency: parse_number(
                "FEED_CONCURRENCY",
                get("FEED_CONCURRENCY"),
                Self::DEFAULT_FEED_CONCURRENCY,
                1,
            )?,
            feed_timeout: Duration::from_secs(parse_number(
                "FEED_TIMEOUT_SECS",
                get("FEED_TIMEOUT_SECS"),
                Self::DEFAULT_FEED_TIMEOUT_SECS,
                1,
            )?),
            articles_per_feed: parse_number(
                "ARTICLES_PER_FEED",
                get("ARTICLES_PER_FEED"),
                Self::DEFAULT_ARTICLES_PER_FEED,
                1,
            )?,
            refresh_interval_minutes: parse_number(
                "REFRESH_INTERVAL_MINUTES",
                get("REFRESH_INTERVAL_MINUTES"),
                0,
                0,
            )?,
            bind_addr: get("BIND_ADDR")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_string()),
            database_path: get("DATABASE_PATH")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_DATABASE_PATH.to_string()),
        };

        tracing::info!(
            site = %config.wordpress_site_url,
            model = %config.gemini_model,
            concurrency = config.feed_concurrency,
            gemini_key_loaded = config.gemini_api_key.is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

fn validate_http_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(value).map_err(|e| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected an http(s) URL".to_string(),
        });
    }
    Ok(())
}

fn parse_number<T>(
    key: &'static str,
    raw: Option<String>,
    default: T,
    min: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Copy,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => {
            let parsed = v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                value: v.clone(),
                reason: e.to_string(),
            })?;
            if parsed < min {
                return Err(ConfigError::Invalid {
                    key,
                    value: v,
                    reason: "value below minimum".to_string(),
                });
            }
            Ok(parsed)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("ENGINE_API_KEY", "sekrit"),
            ("WORDPRESS_SITE_URL", "https://example.com"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_minimal_env_uses_defaults() {
        let config = load(&base_vars()).unwrap();
        assert_eq!(config.wordpress_site_url, "https://example.com");
        assert_eq!(config.gemini_model, Config::DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini_base_url, Config::DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.feed_concurrency, 20);
        assert_eq!(config.feed_timeout, Duration::from_secs(10));
        assert_eq!(config.articles_per_feed, 1);
        assert_eq!(config.refresh_interval_minutes, 0);
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_missing_engine_key_rejected() {
        let mut vars = base_vars();
        vars.remove("ENGINE_API_KEY");
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ENGINE_API_KEY")));
    }

    #[test]
    fn test_missing_site_url_rejected() {
        let mut vars = base_vars();
        vars.remove("WORDPRESS_SITE_URL");
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WORDPRESS_SITE_URL")));
    }

    #[test]
    fn test_site_url_trailing_slash_trimmed() {
        let mut vars = base_vars();
        vars.insert("WORDPRESS_SITE_URL", "https://example.com/");
        let config = load(&vars).unwrap();
        assert_eq!(config.wordpress_site_url, "https://example.com");
    }

    #[test]
    fn test_non_http_site_url_rejected() {
        let mut vars = base_vars();
        vars.insert("WORDPRESS_SITE_URL", "ftp://example.com");
        let err = load(&vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "WORDPRESS_SITE_URL",
                ..
            }
        ));
    }

    #[test]
    fn test_numeric_overrides() {
        let mut vars = base_vars();
        vars.insert("FEED_CONCURRENCY", "5");
        vars.insert("FEED_TIMEOUT_SECS", "30");
        vars.insert("ARTICLES_PER_FEED", "3");
        vars.insert("REFRESH_INTERVAL_MINUTES", "15");
        let config = load(&vars).unwrap();
        assert_eq!(config.feed_concurrency, 5);
        assert_eq!(config.feed_timeout, Duration::from_secs(30));
        assert_eq!(config.articles_per_feed, 3);
        assert_eq!(config.refresh_interval_minutes, 15);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut vars = base_vars();
        vars.insert("FEED_CONCURRENCY", "twenty");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut vars = base_vars();
        vars.insert("FEED_CONCURRENCY", "0");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_empty_value_falls_back_to_default() {
        let mut vars = base_vars();
        vars.insert("GEMINI_MODEL", "  ");
        vars.insert("FEED_CONCURRENCY", "");
        let config = load(&vars).unwrap();
        assert_eq!(config.gemini_model, Config::DEFAULT_GEMINI_MODEL);
        assert_eq!(config.feed_concurrency, 20);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let mut vars = base_vars();
        vars.insert("GEMINI_API_KEY", "super-secret-gemini-key");
        let config = load(&vars).unwrap();

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("sekrit"));
        assert!(!debug_output.contains("super-secret-gemini-key"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
