//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://socialmedia-backend-zng2.onrender.com/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAGE_SIZE: u32 = 9;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_STATE_DIR_NAME: &str = ".blogsphere";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Listing behavior knobs shared by every [`crate::state::listing::ListingQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingConfig {
    /// Items requested per page; a full page implies more may follow.
    pub page_size: u32,
    /// Quiet period after the last search keystroke before fetching.
    pub search_debounce: Duration,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend API base URL without a trailing slash.
    pub api_url: String,
    pub timeouts: HttpTimeouts,
    pub listing: ListingConfig,
    /// Directory holding the persisted session file.
    pub state_dir: PathBuf,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `BLOG_API_URL`: backend base URL (default [`DEFAULT_API_URL`])
    /// - `BLOG_REQUEST_TIMEOUT_SECS`: default 30
    /// - `BLOG_CONNECT_TIMEOUT_SECS`: default 10
    /// - `BLOG_PAGE_SIZE`: default 9, must be at least 1
    /// - `BLOG_SEARCH_DEBOUNCE_MS`: default 500
    /// - `BLOG_STATE_DIR`: default `$HOME/.blogsphere`
    ///
    /// # Errors
    ///
    /// Returns an error if `BLOG_PAGE_SIZE` is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = normalize_api_url(
            &std::env::var("BLOG_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        );
        let timeouts = HttpTimeouts {
            request_secs: env_parse("BLOG_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("BLOG_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        let page_size = env_parse("BLOG_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::Invalid { var: "BLOG_PAGE_SIZE", message: "must be at least 1".into() });
        }
        let listing = ListingConfig {
            page_size,
            search_debounce: Duration::from_millis(env_parse("BLOG_SEARCH_DEBOUNCE_MS", DEFAULT_SEARCH_DEBOUNCE_MS)),
        };

        let state_dir = std::env::var_os("BLOG_STATE_DIR")
            .map_or_else(default_state_dir, PathBuf::from);

        Ok(Self { api_url, timeouts, listing, state_dir })
    }

    /// Replace the API URL, normalizing it the same way as the env var.
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = normalize_api_url(api_url);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeouts: HttpTimeouts::default(),
            listing: ListingConfig::default(),
            state_dir: default_state_dir(),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn normalize_api_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(DEFAULT_STATE_DIR_NAME)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
