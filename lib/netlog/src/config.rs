//! Client configuration types.

use std::time::Duration;

use url::Url;

use crate::{LogLevel, Result};

/// Name of a client built without an explicit tag.
pub const DEFAULT_TAG: &str = "default";

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout duration.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Base URL that relative paths are resolved against.
    pub base_url: Option<Url>,
    /// Name of this client instance, used to tell traces apart.
    pub tag: String,
    /// Initial traffic logging level.
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            base_url: None,
            tag: DEFAULT_TAG.to_owned(),
            log_level: LogLevel::None,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Resolve `path` against the base URL.
    ///
    /// Absolute URLs are returned as-is; without a base URL, `path` must be
    /// absolute.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidUrl`] if the result is not a valid URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        let url = match &self.base_url {
            Some(base) => base.join(path)?,
            None => Url::parse(path)?,
        };
        Ok(url)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    base_url: Option<Url>,
    tag: Option<String>,
    log_level: Option<LogLevel>,
}

impl From<ClientConfig> for ClientConfigBuilder {
    fn from(config: ClientConfig) -> Self {
        Self {
            timeout: Some(config.timeout),
            connect_timeout: Some(config.connect_timeout),
            pool_idle_per_host: Some(config.pool_idle_per_host),
            pool_idle_timeout: Some(config.pool_idle_timeout),
            base_url: config.base_url,
            tag: Some(config.tag),
            log_level: Some(config.log_level),
        }
    }
}

impl ClientConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set the client tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the initial logging level.
    #[must_use]
    pub const fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            base_url: self.base_url.or(defaults.base_url),
            tag: self.tag.unwrap_or(defaults.tag),
            log_level: self.log_level.unwrap_or(defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::Error;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        check!(config.timeout == Duration::from_secs(30));
        check!(config.connect_timeout == Duration::from_secs(10));
        check!(config.pool_idle_per_host == 32);
        check!(config.tag == "default");
        check!(config.log_level == LogLevel::None);
        check!(config.base_url.is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_per_host(16)
            .tag("payments")
            .log_level(LogLevel::Headers)
            .build();

        check!(config.timeout == Duration::from_secs(60));
        check!(config.connect_timeout == Duration::from_secs(5));
        check!(config.pool_idle_per_host == 16);
        check!(config.tag == "payments");
        check!(config.log_level == LogLevel::Headers);
    }

    #[test]
    fn resolves_paths() {
        let config = ClientConfig::builder()
            .base_url(Url::parse("https://api.example.com/v1/").expect("valid URL"))
            .build();

        check!(config.url("users/42").expect("url").as_str() == "https://api.example.com/v1/users/42");
        check!(config.url("/health").expect("url").as_str() == "https://api.example.com/health");
        check!(config.url("https://other.example.com/x").expect("url").as_str() == "https://other.example.com/x");
    }

    #[test]
    fn relative_path_needs_base() {
        let_assert!(Err(Error::InvalidUrl(_)) = ClientConfig::default().url("users/42"));
    }
}
