//! Configuration management for dav-replica
//!
//! The server list and public URL override are loaded once at startup and
//! shared by reference with every pool and adapter. Sources are merged with
//! clear precedence:
//!
//! 1. Environment variables (highest priority, `DAV_REPLICA_` prefix)
//! 2. `./config.toml` (development)
//! 3. `~/.config/dav-replica/{service}/config.toml` (user config, XDG)
//! 4. `/etc/dav-replica/{service}/config.toml` (system config)
//! 5. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! public_url = "http://public.example.com"
//! request_timeout_ms = 30000
//!
//! [[servers]]
//! url = "http://webdav1.example.com"
//!
//! [[servers]]
//! url = "http://webdav2.example.com"
//! timeout_ms = 10000
//! username = "uploader"
//! password = "secret"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use dav_replica::config::StorageConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = StorageConfig::load_for_service("my-app")?;
//! config.validate()?;
//!
//! let primary = &config.servers[0].url;
//! # Ok(())
//! # }
//! ```

use crate::error::{StorageError, StorageResult};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One remote WebDAV endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerDescriptor {
    /// Base URL; storage paths are appended to it
    pub url: String,

    /// Request timeout for this server, overriding the global one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// HTTP basic auth user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// HTTP basic auth password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ServerDescriptor {
    /// Creates a descriptor with only a base URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            username: None,
            password: None,
        }
    }

    /// Sets a per-server request timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets HTTP basic credentials
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Effective request timeout, falling back to the global setting
    #[must_use]
    pub fn request_timeout(&self, config: &StorageConfig) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(config.request_timeout_ms))
    }
}

/// Complete dav-replica configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Ordered server list; the first entry is the primary
    pub servers: Vec<ServerDescriptor>,

    /// Base URL that replaces the primary's in public URLs (CDN, load balancer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Default request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            public_url: None,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
        }
    }
}

impl StorageConfig {
    /// Creates a configuration for the given server URLs, in pool order
    #[must_use]
    pub fn with_servers<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            servers: urls.into_iter().map(ServerDescriptor::new).collect(),
            ..Self::default()
        }
    }

    /// Sets the public URL override
    #[must_use]
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    /// Load configuration for a specific service
    ///
    /// Searches for configuration in XDG-compliant locations with precedence:
    /// 1. Environment variables (`DAV_REPLICA_*`, use `__` for nesting)
    /// 2. `./config.toml`
    /// 3. `~/.config/dav-replica/{service_name}/config.toml`
    /// 4. `/etc/dav-replica/{service_name}/config.toml`
    /// 5. Defaults
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - A configuration file cannot be read or parsed
    /// - Configuration values fail type conversion
    pub fn load_for_service(service_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new()
            // 5. Start with defaults (lowest priority)
            .merge(Toml::string(&toml::to_string(&Self::default())?));

        // 4. System config: /etc/dav-replica/{service_name}/config.toml
        let system_config = PathBuf::from("/etc/dav-replica")
            .join(service_name)
            .join("config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        // 3. User config: ~/.config/dav-replica/{service_name}/config.toml
        let user_config = Self::recommended_path(service_name);
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        // 2. Local config: ./config.toml
        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        // 1. Environment variables (highest priority, double underscore for nesting)
        figment = figment.merge(Env::prefixed("DAV_REPLICA_").split("__").lowercase(true));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - The file contains invalid TOML syntax
    /// - Configuration values fail type conversion
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DAV_REPLICA_").split("__").lowercase(true))
            .extract()?;

        Ok(config)
    }

    /// Get the recommended XDG config path for a service
    #[must_use]
    pub fn recommended_path(service_name: &str) -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| {
                config_dir
                    .join("dav-replica")
                    .join(service_name)
                    .join("config.toml")
            },
        )
    }

    /// Checks that the configuration can drive a server pool
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotConfigured`] when no servers are listed
    /// - [`StorageError::InvalidUrl`] when a server URL or the public URL
    ///   is not an absolute http(s) URL
    pub fn validate(&self) -> StorageResult<()> {
        if self.servers.is_empty() {
            return Err(StorageError::NotConfigured(
                "at least one WebDAV server is required".to_string(),
            ));
        }

        for server in &self.servers {
            validate_base_url(&server.url)?;
        }

        if let Some(public_url) = &self.public_url {
            validate_base_url(public_url)?;
        }

        Ok(())
    }

    /// Connect timeout as a [`Duration`]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Accepts absolute `http` and `https` URLs only
pub(crate) fn validate_base_url(url: &str) -> StorageResult<()> {
    let parsed =
        reqwest::Url::parse(url).map_err(|e| StorageError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(StorageError::InvalidUrl(format!(
            "{url}: unsupported scheme {scheme}"
        ))),
    }
}
