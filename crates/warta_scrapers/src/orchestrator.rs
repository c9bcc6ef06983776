//! Drives one extraction request: validation, source resolution, window
//! splitting, per-window budgets and retries.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use warta_core::{Article, ArticleStorage, Config, Error, InsertSummary, Result, SearchQuery};

use crate::fetch::Transport;
use crate::registry::SourceRegistry;
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::window::{DateWindows, ExtractionWindow, WindowMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub source: String,
    pub query: SearchQuery,
    pub mode: WindowMode,
}

impl ExtractionRequest {
    pub fn new(source: impl Into<String>, query: SearchQuery, mode: WindowMode) -> Self {
        Self {
            source: source.into(),
            query,
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WindowStatus {
    Completed { articles: usize, attempts: u32 },
    Failed { attempts: u32, error: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    pub window: ExtractionWindow,
    #[serde(flatten)]
    pub status: WindowStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub articles: Vec<Article>,
    pub windows: Vec<WindowReport>,
    /// What the per-window store calls did; all zero when nothing was stored.
    pub stored: InsertSummary,
}

impl ExtractionReport {
    pub fn completed(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| matches!(w.status, WindowStatus::Completed { .. }))
            .count()
    }

    pub fn failed_windows(&self) -> impl Iterator<Item = &WindowReport> {
        self.windows
            .iter()
            .filter(|w| !matches!(w.status, WindowStatus::Completed { .. }))
    }
}

pub struct ExtractionOrchestrator {
    registry: Arc<SourceRegistry>,
    retry: RetryPolicy,
    window_budget: Duration,
    window_pause: Duration,
}

impl ExtractionOrchestrator {
    pub fn new(registry: Arc<SourceRegistry>, retry: RetryPolicy, window_budget: Duration) -> Self {
        Self {
            registry,
            retry,
            window_budget,
            window_pause: Duration::ZERO,
        }
    }

    pub fn with_window_pause(mut self, pause: Duration) -> Self {
        self.window_pause = pause;
        self
    }

    /// Builds the shared transport, the standard registry and the policies
    /// described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let transport = Transport::from_config(config)?;
        if !transport.has_browser() {
            warn!("Rendered sources (kompas) will fail until a headless browser is installed");
        }
        let registry = SourceRegistry::with_concurrency(transport, config.content_concurrency)?;

        Ok(Self::new(
            Arc::new(registry),
            RetryPolicy::from_config(&config.retry),
            config.window_budget,
        )
        .with_window_pause(config.window_pause))
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub async fn execute(&self, cancel: &CancellationToken, request: &ExtractionRequest) -> Result<Vec<Article>> {
        Ok(self.execute_report(cancel, request).await?.articles)
    }

    /// Runs every window of `request` and reports how each one ended.
    /// Only invalid input fails the call; failed windows are recorded and
    /// skipped.
    pub async fn execute_report(
        &self,
        cancel: &CancellationToken,
        request: &ExtractionRequest,
    ) -> Result<ExtractionReport> {
        self.run(cancel, request, None).await
    }

    /// Like [`execute_report`](Self::execute_report), but each completed
    /// window is written to `storage` before the next one starts. A failed
    /// write is logged and counted; the run goes on.
    pub async fn execute_into(
        &self,
        cancel: &CancellationToken,
        request: &ExtractionRequest,
        storage: &dyn ArticleStorage,
    ) -> Result<ExtractionReport> {
        self.run(cancel, request, Some(storage)).await
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        request: &ExtractionRequest,
        storage: Option<&dyn ArticleStorage>,
    ) -> Result<ExtractionReport> {
        let query = &request.query;
        query.validate()?;
        let scraper = self.registry.resolve(&request.source)?;
        let text = query.text.trim();
        if text.is_empty() {
            return Err(Error::InvalidQuery("query must not be empty".into()));
        }

        let source = scraper.source_metadata().name;
        let windows = DateWindows::new(query.from, query.to, request.mode);
        info!(%source, query = %text, windows = windows.len(), "🚀 Starting extraction");

        let mut report = ExtractionReport::default();
        for (index, window) in windows.enumerate() {
            if cancel.is_cancelled() {
                report.windows.push(WindowReport {
                    window,
                    status: WindowStatus::Cancelled,
                });
                continue;
            }

            if index > 0 && !self.window_pause.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        report.windows.push(WindowReport { window, status: WindowStatus::Cancelled });
                        continue;
                    }
                    _ = tokio::time::sleep(self.window_pause) => {}
                }
            }

            let token = cancel.child_token();
            let timer = tokio::spawn({
                let token = token.clone();
                let budget = self.window_budget;
                async move {
                    tokio::time::sleep(budget).await;
                    token.cancel();
                }
            });

            let mut attempts = 0;
            let outcome = self
                .retry
                .run(&token, || {
                    attempts += 1;
                    scraper.search(&token, text, window.from, window.to)
                })
                .await;
            timer.abort();

            let status = match outcome {
                RetryOutcome::Succeeded { value, attempts } => {
                    info!(%source, %window, articles = value.len(), attempts, "✅ Window completed");
                    let count = value.len();
                    if let (Some(storage), false) = (storage, value.is_empty()) {
                        report.stored.merge(store_window(storage, source, &window, &value).await);
                    }
                    report.articles.extend(value);
                    WindowStatus::Completed {
                        articles: count,
                        attempts,
                    }
                }
                RetryOutcome::Exhausted { error, attempts } => {
                    warn!(%source, %window, attempts, error = %error, "❌ Window failed, moving on");
                    WindowStatus::Failed {
                        attempts,
                        error: error.to_string(),
                    }
                }
                RetryOutcome::Cancelled if !cancel.is_cancelled() => {
                    warn!(
                        %source,
                        %window,
                        attempts,
                        budget_secs = self.window_budget.as_secs(),
                        "⏱️ Window budget exceeded, moving on"
                    );
                    WindowStatus::Failed {
                        attempts,
                        error: format!("window budget of {:?} exceeded", self.window_budget),
                    }
                }
                RetryOutcome::Cancelled => {
                    warn!(%source, %window, "Window cancelled");
                    WindowStatus::Cancelled
                }
            };
            report.windows.push(WindowReport { window, status });
        }

        info!(
            %source,
            articles = report.articles.len(),
            completed = report.completed(),
            windows = report.windows.len(),
            "🏁 Extraction finished"
        );
        Ok(report)
    }
}

async fn store_window(
    storage: &dyn ArticleStorage,
    source: &str,
    window: &ExtractionWindow,
    articles: &[Article],
) -> InsertSummary {
    match storage.insert_many(articles).await {
        Ok(summary) => {
            info!(
                %source,
                %window,
                inserted = summary.inserted,
                duplicates = summary.duplicates,
                failed = summary.failed,
                "💾 Window stored"
            );
            summary
        }
        Err(e) => {
            error!(%source, %window, error = %e, "Failed to store window, continuing");
            InsertSummary {
                failed: articles.len(),
                ..InsertSummary::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{day, FakePages};

    const DETIK_LISTING: &str = r#"
        <div class="list-content">
          <article><h3>Satu</h3><a href="https://news.detik.com/1">1</a></article>
          <article><h3>Dua</h3><a href="https://news.detik.com/2">2</a></article>
        </div>
    "#;

    fn orchestrator(pages: FakePages) -> (ExtractionOrchestrator, Arc<FakePages>) {
        let pages = Arc::new(pages);
        let registry = SourceRegistry::standard(pages.clone()).unwrap();
        let orchestrator = ExtractionOrchestrator::new(
            Arc::new(registry),
            RetryPolicy::immediate(2),
            Duration::from_secs(30),
        );
        (orchestrator, pages)
    }

    fn request(source: &str, from: &str, to: &str, mode: WindowMode) -> ExtractionRequest {
        ExtractionRequest::new(source, SearchQuery::new("ekonomi", day(from), day(to)), mode)
    }

    #[tokio::test]
    async fn test_invalid_range_touches_nothing() {
        let (orchestrator, pages) = orchestrator(FakePages::new());
        let err = orchestrator
            .execute(
                &CancellationToken::new(),
                &request("not-a-source", "2015-01-02", "2015-01-01", WindowMode::Whole),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidRange { .. }));
        assert_eq!(pages.hits("https://www.detik.com/search/searchall"), 0);
    }

    #[tokio::test]
    async fn test_unknown_source_and_empty_query() {
        let (orchestrator, _) = orchestrator(FakePages::new());
        let err = orchestrator
            .execute(
                &CancellationToken::new(),
                &request("tempo", "2015-01-01", "2015-01-01", WindowMode::Whole),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSource(_)));

        let blank = ExtractionRequest::new(
            "detik",
            SearchQuery::new("   ", day("2015-01-01"), day("2015-01-01")),
            WindowMode::Whole,
        );
        let err = orchestrator.execute(&CancellationToken::new(), &blank).await.unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_whole_range_single_window() {
        let pages = FakePages::new()
            .page("https://www.detik.com/search/searchall", DETIK_LISTING)
            .page("https://news.detik.com/1", "<div class='detail__body-text'>Isi satu</div>")
            .page("https://news.detik.com/2", "<div class='detail__body-text'>Isi dua</div>");
        let (orchestrator, pages) = orchestrator(pages);

        let report = orchestrator
            .execute_report(
                &CancellationToken::new(),
                &request("detik", "2015-01-01", "2015-01-30", WindowMode::Whole),
            )
            .await
            .unwrap();

        assert_eq!(report.articles.len(), 2);
        assert_eq!(report.windows.len(), 1);
        assert_eq!(
            report.windows[0].status,
            WindowStatus::Completed {
                articles: 2,
                attempts: 1
            }
        );
        assert_eq!(pages.hits("https://www.detik.com/search/searchall"), 1);
    }

    #[tokio::test]
    async fn test_failed_windows_do_not_abort_the_run() {
        let (orchestrator, pages) = orchestrator(FakePages::new().failing("https://www.detik.com/search/searchall", 503));

        let report = orchestrator
            .execute_report(
                &CancellationToken::new(),
                &request("indonesia/detik", "2015-01-01", "2015-01-03", WindowMode::Daily),
            )
            .await
            .unwrap();

        assert!(report.articles.is_empty());
        assert_eq!(report.windows.len(), 3);
        assert_eq!(report.completed(), 0);
        assert_eq!(report.failed_windows().count(), 3);
        assert!(report
            .windows
            .iter()
            .all(|w| matches!(w.status, WindowStatus::Failed { attempts: 2, .. })));
        // two attempts per day
        assert_eq!(pages.hits("https://www.detik.com/search/searchall"), 6);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (orchestrator, pages) = orchestrator(FakePages::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = orchestrator
            .execute_report(&cancel, &request("kompas", "2015-01-01", "2015-01-02", WindowMode::Daily))
            .await
            .unwrap();

        assert!(report.articles.is_empty());
        assert!(report.windows.iter().all(|w| w.status == WindowStatus::Cancelled));
        assert_eq!(pages.hits("https://search.kompas.com/search"), 0);
    }

    #[tokio::test]
    async fn test_missing_browser_is_not_retried() {
        let http = crate::fetch::HttpFetcher::new(&warta_core::config::HttpConfig::default()).unwrap();
        let transport = Arc::new(Transport::new(http, None));
        let registry = SourceRegistry::standard(transport).unwrap();
        let orchestrator = ExtractionOrchestrator::new(
            Arc::new(registry),
            RetryPolicy::immediate(3),
            Duration::from_secs(30),
        );

        let report = orchestrator
            .execute_report(
                &CancellationToken::new(),
                &request("kompas", "2015-01-01", "2015-01-01", WindowMode::Whole),
            )
            .await
            .unwrap();

        assert!(matches!(
            &report.windows[0].status,
            WindowStatus::Failed { attempts: 1, error } if error.starts_with("Configuration error")
        ));
    }

    #[test]
    fn test_report_serialization() {
        let report = WindowReport {
            window: ExtractionWindow {
                from: day("2015-01-01"),
                to: day("2015-01-01"),
            },
            status: WindowStatus::Failed {
                attempts: 2,
                error: "Parse error: blank".into(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["attempts"], 2);
        assert_eq!(json["window"]["from"], "2015-01-01");
    }
}
