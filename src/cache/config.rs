//! Configuration for the cache system

use crate::cache::keys::DEPENDENCY_NAMESPACE;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Environment variable names read by [`CacheConfig::from_env`]
pub const ENV_REDIS_URL: &str = "CLEVER_CACHE_REDIS_URL";
pub const ENV_KEY_PREFIX: &str = "CLEVER_CACHE_KEY_PREFIX";
pub const ENV_DEFAULT_TTL_SECS: &str = "CLEVER_CACHE_DEFAULT_TTL_SECS";
pub const ENV_TTL_JITTER: &str = "CLEVER_CACHE_TTL_JITTER";
pub const ENV_GC_INTERVAL_SECS: &str = "CLEVER_CACHE_GC_INTERVAL_SECS";
pub const ENV_AUTO_GC: &str = "CLEVER_CACHE_AUTO_GC";

/// Configuration for the dependency cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL
    pub redis_url: String,

    /// Prefix applied to every entry key (not to dependency keys)
    pub key_prefix: String,

    /// TTL used by `set_with_default_ttl`
    pub default_ttl: Duration,

    /// TTL jitter factor (0.0 - 1.0) applied to the default TTL
    /// Spreads expiry of entries written together
    pub ttl_jitter: f64,

    /// Run garbage collection in the background
    pub enable_auto_gc: bool,

    /// Interval between background garbage-collection passes
    pub gc_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: String::new(),
            // 24 hours
            default_ttl: Duration::from_secs(24 * 60 * 60),
            ttl_jitter: 0.0,
            enable_auto_gc: false,
            // Collect every 5 minutes
            gc_interval: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            redis_url: env::var(ENV_REDIS_URL).unwrap_or(defaults.redis_url),
            key_prefix: env::var(ENV_KEY_PREFIX).unwrap_or(defaults.key_prefix),
            default_ttl: match env_parse::<u64>(ENV_DEFAULT_TTL_SECS)? {
                Some(secs) => Duration::from_secs(secs),
                None => defaults.default_ttl,
            },
            ttl_jitter: env_parse::<f64>(ENV_TTL_JITTER)?.unwrap_or(defaults.ttl_jitter),
            enable_auto_gc: env_parse::<bool>(ENV_AUTO_GC)?.unwrap_or(defaults.enable_auto_gc),
            gc_interval: match env_parse::<u64>(ENV_GC_INTERVAL_SECS)? {
                Some(secs) => Duration::from_secs(secs),
                None => defaults.gc_interval,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.redis_url.is_empty() {
            return Err(CacheError::ConfigError("redis_url must not be empty".to_string()));
        }

        if self.key_prefix.starts_with(DEPENDENCY_NAMESPACE) {
            return Err(CacheError::ConfigError(format!(
                "key_prefix must not start with the dependency namespace {:?}",
                DEPENDENCY_NAMESPACE
            )));
        }

        if self.default_ttl < Duration::from_secs(1) {
            return Err(CacheError::ConfigError(
                "default_ttl must be at least one second".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.gc_interval.is_zero() {
            return Err(CacheError::ConfigError(
                "gc_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate the default TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 {
            return self.default_ttl;
        }

        let base_secs = self.default_ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::ConfigError(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    redis_url: Option<String>,
    key_prefix: Option<String>,
    default_ttl: Option<Duration>,
    ttl_jitter: Option<f64>,
    enable_auto_gc: Option<bool>,
    gc_interval: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Set the Redis connection URL
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Set the namespace prefix for entry keys
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set default TTL for cache entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Enable or disable background garbage collection
    pub fn enable_auto_gc(mut self, enable: bool) -> Self {
        self.enable_auto_gc = Some(enable);
        self
    }

    /// Set garbage-collection interval
    pub fn gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            redis_url: self.redis_url.unwrap_or(defaults.redis_url),
            key_prefix: self.key_prefix.unwrap_or(defaults.key_prefix),
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            enable_auto_gc: self.enable_auto_gc.unwrap_or(defaults.enable_auto_gc),
            gc_interval: self.gc_interval.unwrap_or(defaults.gc_interval),
        }
    }
}

/// Preset configurations for common use cases
impl CacheConfig {
    /// Short-lived query results over rapidly changing data
    pub fn realtime() -> Self {
        Self {
            default_ttl: Duration::from_secs(300), // 5 minutes
            ttl_jitter: 0.15,
            enable_auto_gc: true,
            gc_interval: Duration::from_secs(60),
            ..Default::default()
        }
    }

    /// Results refreshed roughly once a day
    pub fn daily() -> Self {
        Self {
            default_ttl: Duration::from_secs(23 * 3600), // 23 hours
            ttl_jitter: 0.10,
            enable_auto_gc: true,
            gc_interval: Duration::from_secs(3600),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(86_400));
        assert_eq!(config.key_prefix, "");
        assert!(!config.enable_auto_gc);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut invalid = CacheConfig::default();
        invalid.ttl_jitter = 1.5;
        assert!(invalid.validate().is_err());

        let mut invalid = CacheConfig::default();
        invalid.key_prefix = "deps:app".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = CacheConfig::default();
        invalid.default_ttl = Duration::from_millis(200);
        assert!(invalid.validate().is_err());

        let mut invalid = CacheConfig::default();
        invalid.gc_interval = Duration::ZERO;
        assert!(invalid.validate().is_err());

        let mut invalid = CacheConfig::default();
        invalid.redis_url = String::new();
        assert!(matches!(invalid.validate(), Err(CacheError::ConfigError(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .redis_url("redis://cache:6379/2")
            .key_prefix(":1:")
            .default_ttl(Duration::from_secs(600))
            .enable_auto_gc(true)
            .build();

        assert_eq!(config.redis_url, "redis://cache:6379/2");
        assert_eq!(config.key_prefix, ":1:");
        assert_eq!(config.default_ttl, Duration::from_secs(600));
        assert!(config.enable_auto_gc);
        assert_eq!(config.gc_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_ttl_with_jitter() {
        let config = CacheConfig {
            default_ttl: Duration::from_secs(3600),
            ttl_jitter: 0.1,
            ..Default::default()
        };

        let ttl = config.ttl_with_jitter();
        assert!(ttl.as_secs_f64() >= 3600.0 - 360.0);
        assert!(ttl.as_secs_f64() <= 3600.0 + 360.0);

        let exact = CacheConfig::default();
        assert_eq!(exact.ttl_with_jitter(), exact.default_ttl);
    }

    #[test]
    fn test_preset_configs() {
        assert_eq!(CacheConfig::realtime().default_ttl, Duration::from_secs(300));
        assert_eq!(CacheConfig::daily().default_ttl, Duration::from_secs(23 * 3600));
        assert!(CacheConfig::realtime().validate().is_ok());
        assert!(CacheConfig::daily().validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        env::set_var(ENV_KEY_PREFIX, "env:");
        env::set_var(ENV_DEFAULT_TTL_SECS, "120");
        env::set_var(ENV_AUTO_GC, "true");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.key_prefix, "env:");
        assert_eq!(config.default_ttl, Duration::from_secs(120));
        assert!(config.enable_auto_gc);

        env::set_var(ENV_DEFAULT_TTL_SECS, "soon");
        assert!(matches!(CacheConfig::from_env(), Err(CacheError::ConfigError(_))));

        env::remove_var(ENV_KEY_PREFIX);
        env::remove_var(ENV_DEFAULT_TTL_SECS);
        env::remove_var(ENV_AUTO_GC);
    }
}
