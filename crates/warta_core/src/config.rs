use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Process-wide settings, built once at startup and handed to the
/// orchestrator, registry and transports.
#[derive(Debug, Clone)]
pub struct Config {
    pub retry: RetryConfig,
    /// Time allowed for one window, retries included.
    pub window_budget: Duration,
    /// Time allowed for a whole API request.
    pub request_budget: Duration,
    /// Pause between consecutive windows of a multi-window run.
    pub window_pause: Duration,
    /// Upper bound on in-flight content fetches per listing.
    pub content_concurrency: usize,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Names or paths tried in order when looking for a headless browser.
    pub executables: Vec<String>,
    pub render_timeout: Duration,
    /// How often the page is checked for the ready element while rendering.
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: String,
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            window_budget: Duration::from_secs(120),
            request_budget: Duration::from_secs(300),
            window_pause: Duration::ZERO,
            content_concurrency: 1,
            http: HttpConfig::default(),
            browser: BrowserConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_secs(3),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executables: ["brave", "brave-browser", "chromium-browser", "chromium", "google-chrome"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            render_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            path: PathBuf::from("articles.db"),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.retry.attempts == 0 {
            return Err(Error::Config("retry attempts must be at least 1".into()));
        }
        if self.content_concurrency == 0 {
            return Err(Error::Config("content concurrency must be at least 1".into()));
        }
        if self.window_budget.is_zero() || self.request_budget.is_zero() {
            return Err(Error::Config("time budgets must be greater than zero".into()));
        }
        Ok(())
    }
}
