//! Page retrieval: plain HTTP for server-rendered sources, a headless browser
//! for sources that assemble their markup client-side.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use warta_core::config::{Config, HttpConfig};
use warta_core::{Error, Result};

use crate::render::BrowserRenderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderingStrategy {
    /// Direct HTTP GET of server-rendered markup.
    Static,
    /// Load the page in a headless browser and wait until `ready` is visible.
    Rendered { ready: String },
}

impl RenderingStrategy {
    pub fn rendered(ready: &str) -> Self {
        RenderingStrategy::Rendered {
            ready: ready.to_string(),
        }
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Returns the final markup of `url`. Implementations must give up with
    /// [`Error::Cancelled`] as soon as `cancel` fires.
    async fn fetch(
        &self,
        url: &str,
        strategy: &RenderingStrategy,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| Error::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(url, status.as_u16()));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !is_markup(content_type) {
                return Err(Error::fetch(url, format!("unsupported content type {}", content_type)));
            }
        }

        response.text().await.map_err(|e| Error::fetch(url, e))
    }
}

fn is_markup(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/") || mime == "application/xhtml+xml"
}

/// The shared transport handed to every source: one HTTP client and, when a
/// browser could be found, one renderer.
#[derive(Debug, Clone)]
pub struct Transport {
    http: HttpFetcher,
    browser: Option<BrowserRenderer>,
}

impl Transport {
    pub fn new(http: HttpFetcher, browser: Option<BrowserRenderer>) -> Self {
        Self { http, browser }
    }

    pub fn from_config(config: &Config) -> Result<Arc<Self>> {
        let http = HttpFetcher::new(&config.http)?;
        let browser = BrowserRenderer::discover(&config.browser);
        Ok(Arc::new(Self::new(http, browser)))
    }

    pub fn has_browser(&self) -> bool {
        self.browser.is_some()
    }
}

#[async_trait]
impl PageSource for Transport {
    async fn fetch(
        &self,
        url: &str,
        strategy: &RenderingStrategy,
        cancel: &CancellationToken,
    ) -> Result<String> {
        match strategy {
            RenderingStrategy::Static => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    result = self.http.get(url) => result,
                }
            }
            RenderingStrategy::Rendered { ready } => match &self.browser {
                Some(browser) => browser.render(url, ready, cancel).await,
                None => Err(Error::Config(format!(
                    "no headless browser available to render {}",
                    url
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&HttpConfig {
            timeout: Duration::from_secs(5),
            user_agent: "warta-test".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_is_markup() {
        assert!(is_markup("text/html; charset=utf-8"));
        assert!(is_markup("application/xhtml+xml"));
        assert!(!is_markup("video/mp4"));
        assert!(!is_markup("image/jpeg"));
    }

    #[tokio::test]
    async fn test_get_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/search").header("user-agent", "warta-test");
                then.status(200)
                    .header("content-type", "text/html; charset=utf-8")
                    .body("<html><body><article>hi</article></body></html>");
            })
            .await;

        let body = fetcher().get(&server.url("/search")).await.unwrap();
        mock.assert_async().await;
        assert!(body.contains("<article>hi</article>"));
    }

    #[tokio::test]
    async fn test_get_non_success_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone");
                then.status(503);
            })
            .await;

        let err = fetcher().get(&server.url("/gone")).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { status: Some(503), .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_get_rejects_media() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/clip");
                then.status(200).header("content-type", "video/mp4").body("....");
            })
            .await;

        let err = fetcher().get(&server.url("/clip")).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { status: None, .. }));
    }

    #[tokio::test]
    async fn test_transport_cancelled() {
        let transport = Transport::new(fetcher(), None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = transport
            .fetch("http://127.0.0.1:9/never", &RenderingStrategy::Static, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_transport_without_browser() {
        let transport = Transport::new(fetcher(), None);
        let err = transport
            .fetch(
                "http://127.0.0.1:9/rendered",
                &RenderingStrategy::rendered("div.ready"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.is_retryable());
    }
}
