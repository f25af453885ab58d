//! Client configuration.

use std::env;
use std::time::Duration;

use crate::error::{DropboxError, Result};

/// Default RPC endpoint root.
pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com/2";

/// Default content (upload/download) endpoint root.
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com/2";

/// Default size of the pipe between a write handle and its upload (1MB).
pub const DEFAULT_PIPE_CAPACITY: usize = 1024 * 1024;

/// Environment variable holding the access token.
pub const TOKEN_ENV: &str = "DROPBOX_ACCESS_TOKEN";

/// Environment variable holding an optional proxy URL.
pub const PROXY_ENV: &str = "DROPBOX_PROXY";

/// Configuration passed explicitly into [`Client::new`](crate::Client::new).
#[derive(Clone)]
pub struct Config {
    /// OAuth2 bearer token
    pub access_token: String,
    /// RPC endpoint root
    pub api_url: String,
    /// Content endpoint root
    pub content_url: String,
    /// Optional HTTP/SOCKS proxy URL
    pub proxy: Option<String>,
    /// Timeout for JSON RPC calls (not applied to streaming transfers)
    pub request_timeout: Duration,
    /// Bytes buffered between a write handle and its upload (default: 1MB)
    pub pipe_capacity: usize,
    /// Matches requested per search page (default: 100)
    pub search_page_size: u64,
}

impl Config {
    /// Create a configuration with default endpoints for `access_token`.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            content_url: DEFAULT_CONTENT_URL.to_string(),
            proxy: None,
            request_timeout: Duration::from_secs(30),
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            search_page_size: 100,
        }
    }

    /// Build a configuration from `DROPBOX_ACCESS_TOKEN` and `DROPBOX_PROXY`.
    pub fn from_env() -> Result<Self> {
        let token = env::var(TOKEN_ENV)
            .map_err(|_| DropboxError::InvalidConfig(format!("{} is not set", TOKEN_ENV)))?;

        let mut config = Self::new(token);
        if let Ok(proxy) = env::var(PROXY_ENV) {
            if !proxy.is_empty() {
                config.proxy = Some(proxy);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_content_url(mut self, url: impl Into<String>) -> Self {
        self.content_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity;
        self
    }

    pub fn with_search_page_size(mut self, size: u64) -> Self {
        self.search_page_size = size;
        self
    }

    /// Check the configuration for values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(DropboxError::InvalidConfig(
                "access token is empty".to_string(),
            ));
        }
        if self.pipe_capacity == 0 {
            return Err(DropboxError::InvalidConfig(
                "pipe capacity must be non-zero".to_string(),
            ));
        }
        if self.search_page_size == 0 {
            return Err(DropboxError::InvalidConfig(
                "search page size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

// Keep the token out of debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .field("proxy", &self.proxy)
            .field("request_timeout", &self.request_timeout)
            .field("pipe_capacity", &self.pipe_capacity)
            .field("search_page_size", &self.search_page_size)
            .finish()
    }
}
