//! Headless-browser rendering for sources that build their result lists with
//! scripts. Pages are driven over the DevTools protocol: navigate, wait until
//! the ready element is visible, then read back the final markup.
//!
//! The protocol client lives behind the `browser` feature. Without it a
//! renderer is never discovered and rendered pages fail with a configuration
//! error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warta_core::config::BrowserConfig;
use warta_core::{Error, Result};

use crate::normalizer::parse_selector;

#[derive(Debug, Clone)]
pub struct BrowserRenderer {
    executable: PathBuf,
    render_timeout: Duration,
    poll_interval: Duration,
}

impl BrowserRenderer {
    pub fn new(executable: PathBuf, render_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            executable,
            render_timeout,
            poll_interval,
        }
    }

    /// Looks for the first usable browser in `config.executables`.
    pub fn discover(config: &BrowserConfig) -> Option<Self> {
        if !cfg!(feature = "browser") {
            warn!("Built without the browser feature, rendered sources will fail");
            return None;
        }

        match find_executable(&config.executables) {
            Some(executable) => {
                info!(browser = %executable.display(), "🌐 Headless browser found");
                Some(Self::new(executable, config.render_timeout, config.poll_interval))
            }
            None => {
                warn!(
                    candidates = ?config.executables,
                    "No headless browser found, rendered sources will fail"
                );
                None
            }
        }
    }

    /// Loads `url` and returns its markup once an element matching `ready`
    /// is visible. Launch, navigation and waiting all share the render
    /// timeout.
    pub async fn render(&self, url: &str, ready: &str, cancel: &CancellationToken) -> Result<String> {
        parse_selector(ready)?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(self.render_timeout, self.load(url, ready)) => match result {
                Ok(result) => result,
                Err(_) => Err(Error::fetch(url, format!("timed out waiting for '{}'", ready))),
            },
        }
    }
}

#[cfg(feature = "browser")]
mod cdp {
    use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
    use futures::StreamExt;
    use tracing::debug;
    use warta_core::{Error, Result};

    use super::BrowserRenderer;

    impl BrowserRenderer {
        pub(super) async fn load(&self, url: &str, ready: &str) -> Result<String> {
            let config = LaunchConfig::builder()
                .chrome_executable(&self.executable)
                .request_timeout(self.render_timeout)
                .build()
                .map_err(Error::Config)?;

            let (mut browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| Error::fetch(url, format!("failed to start browser: {}", e)))?;
            let events = tokio::spawn(async move { while handler.next().await.is_some() {} });

            let result = self.wait_visible(&browser, url, ready).await;

            if let Err(e) = browser.close().await {
                debug!(error = %e, "Browser did not close cleanly");
            }
            events.abort();
            result
        }

        async fn wait_visible(&self, browser: &Browser, url: &str, ready: &str) -> Result<String> {
            let page = browser.new_page(url).await.map_err(|e| Error::fetch(url, e))?;
            let check = visibility_check(ready)?;

            loop {
                let visible: bool = page
                    .evaluate(check.as_str())
                    .await
                    .map_err(|e| Error::fetch(url, e))?
                    .into_value()
                    .map_err(|e| Error::fetch(url, e))?;
                if visible {
                    break;
                }
                debug!(%url, %ready, "Ready element not visible yet");
                tokio::time::sleep(self.poll_interval).await;
            }

            page.content().await.map_err(|e| Error::fetch(url, e))
        }
    }

    /// Script answering whether any element matching `ready` is laid out and
    /// not hidden by computed style.
    pub(super) fn visibility_check(ready: &str) -> Result<String> {
        let selector = serde_json::to_string(ready)?;
        Ok(format!(
            "Array.from(document.querySelectorAll({selector})).some((el) => {{ \
               const style = window.getComputedStyle(el); \
               const box = el.getBoundingClientRect(); \
               return style.display !== 'none' && style.visibility !== 'hidden' \
                 && box.width > 0 && box.height > 0; \
             }})"
        ))
    }
}

#[cfg(not(feature = "browser"))]
impl BrowserRenderer {
    async fn load(&self, _url: &str, _ready: &str) -> Result<String> {
        Err(Error::Config("built without headless browser support".into()))
    }
}

pub fn find_executable(candidates: &[String]) -> Option<PathBuf> {
    let search_path = std::env::var_os("PATH");

    candidates.iter().find_map(|candidate| {
        let path = Path::new(candidate);
        if path.components().count() > 1 {
            return path.is_file().then(|| path.to_path_buf());
        }
        search_path.as_ref().and_then(|dirs| {
            std::env::split_paths(dirs)
                .map(|dir| dir.join(candidate))
                .find(|full| full.is_file())
        })
    })
}
