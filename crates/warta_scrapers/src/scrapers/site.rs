//! The listing → content extraction shared by every source.
//!
//! A source is described by a [`SiteProfile`]: how to build its search URL,
//! which selectors pick entries out of the result list, how pages are fetched
//! and which rules extract the article body. [`SiteScraper`] runs the two
//! phases against that profile:
//!
//! 1. **Listing**: fetch the search page and turn each result entry into a
//!    skeletal [`Article`]. Entries without a title or link are dropped.
//! 2. **Content**: fetch each article page and fill `content`. Failures here
//!    are logged and leave the article in place with empty content.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use warta_core::{parse_day, start_of_day, Article, Error, Result};

use crate::fetch::{PageSource, RenderingStrategy};
use crate::normalizer::{collapse_whitespace, element_text, parse_selector, ContentNormalizer, ExtractionRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEndpoint {
    pub base_url: String,
    pub query_param: String,
    pub from_param: String,
    pub to_param: String,
    /// `chrono` format used for both dates.
    pub date_format: String,
    pub extra: Vec<(String, String)>,
}

impl SearchEndpoint {
    pub fn new(base_url: &str, query_param: &str, from_param: &str, to_param: &str, date_format: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            query_param: query_param.to_string(),
            from_param: from_param.to_string(),
            to_param: to_param.to_string(),
            date_format: date_format.to_string(),
            extra: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.extra.push((name.to_string(), value.to_string()));
        self
    }

    pub fn url(&self, query: &str, from: NaiveDate, to: NaiveDate) -> Result<Url> {
        let from = from.format(&self.date_format).to_string();
        let to = to.format(&self.date_format).to_string();

        let mut params = vec![
            (self.query_param.as_str(), query),
            (self.from_param.as_str(), from.as_str()),
            (self.to_param.as_str(), to.as_str()),
        ];
        params.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        Ok(Url::parse_with_params(&self.base_url, &params)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSelectors {
    pub container: String,
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    /// Element carrying the entry's publication time (`datetime` attribute or text).
    pub date: Option<String>,
}

impl ListingSelectors {
    pub fn new(container: &str, title: &str, link: &str) -> Self {
        Self {
            container: container.to_string(),
            title: title.to_string(),
            link: link.to_string(),
            summary: None,
            date: None,
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub source: String,
    pub endpoint: SearchEndpoint,
    pub listing: ListingSelectors,
    /// When set, a listing page without a match is treated as unrecognized markup.
    pub listing_frame: Option<String>,
    pub listing_strategy: RenderingStrategy,
    pub content_strategy: RenderingStrategy,
    pub content_rules: Vec<ExtractionRule>,
    /// URL fragments of pages that never carry article text (videos, photo galleries).
    pub excluded_markers: Vec<String>,
    pub politeness: Duration,
    pub concurrency: usize,
}

impl SiteProfile {
    pub fn with_politeness(mut self, politeness: Duration) -> Self {
        self.politeness = politeness;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_frame(mut self, frame: &str) -> Self {
        self.listing_frame = Some(frame.to_string());
        self
    }
}

#[derive(Debug, Error)]
pub enum ContentFailure {
    #[error("excluded media page")]
    ExcludedMedia,
    #[error("{0}")]
    Fetch(Error),
    #[error("no text matched any extraction rule")]
    Empty,
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
struct CompiledListing {
    frame: Option<Selector>,
    container: Selector,
    title: Selector,
    link: Selector,
    summary: Option<Selector>,
    date: Option<Selector>,
}

impl CompiledListing {
    fn compile(profile: &SiteProfile) -> Result<Self> {
        let listing = &profile.listing;
        Ok(Self {
            frame: profile.listing_frame.as_deref().map(parse_selector).transpose()?,
            container: parse_selector(&listing.container)?,
            title: parse_selector(&listing.title)?,
            link: parse_selector(&listing.link)?,
            summary: listing.summary.as_deref().map(parse_selector).transpose()?,
            date: listing.date.as_deref().map(parse_selector).transpose()?,
        })
    }

    fn entry(&self, entry: ElementRef<'_>, base: &Url, fallback: DateTime<Utc>) -> Option<Article> {
        let title = joined_text(entry, &self.title);
        let href = entry
            .select(&self.link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .unwrap_or_default();

        if title.is_empty() || href.is_empty() {
            return None;
        }
        let url = base.join(href).ok()?;

        let summary = self
            .summary
            .as_ref()
            .map(|selector| joined_text(entry, selector))
            .unwrap_or_default();
        let date = self
            .date
            .as_ref()
            .and_then(|selector| entry.select(selector).next())
            .and_then(entry_date)
            .unwrap_or(fallback);

        Some(Article::listed(title, url.to_string(), summary, date))
    }
}

fn joined_text(entry: ElementRef<'_>, selector: &Selector) -> String {
    let parts: Vec<String> = entry
        .select(selector)
        .map(|el| collapse_whitespace(&element_text(el)))
        .filter(|text| !text.is_empty())
        .collect();
    parts.join(" ")
}

fn entry_date(element: ElementRef<'_>) -> Option<DateTime<Utc>> {
    let raw = element
        .value()
        .attr("datetime")
        .map(str::to_string)
        .unwrap_or_else(|| element_text(element));
    let raw = raw.trim();

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_day(raw).ok().map(start_of_day))
}

/// Spaces request starts at least `gap` apart, also when several content
/// fetches are in flight.
struct Pacer {
    gap: Duration,
    next: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(gap: Duration) -> Self {
        Self {
            gap,
            next: Mutex::new(None),
        }
    }

    /// Returns false when cancelled while waiting for the slot.
    async fn wait(&self, cancel: &CancellationToken) -> bool {
        if self.gap.is_zero() {
            return !cancel.is_cancelled();
        }

        let slot = {
            let mut next = self.next.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |at| at.max(now));
            *next = Some(slot + self.gap);
            slot
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep_until(slot) => true,
        }
    }
}

pub struct SiteScraper {
    profile: SiteProfile,
    listing: CompiledListing,
    normalizer: ContentNormalizer,
    pages: Arc<dyn PageSource>,
}

impl SiteScraper {
    pub fn new(profile: SiteProfile, pages: Arc<dyn PageSource>) -> Result<Self> {
        let listing = CompiledListing::compile(&profile)?;
        let normalizer = ContentNormalizer::new(&profile.content_rules)?;
        Ok(Self {
            profile,
            listing,
            normalizer,
            pages,
        })
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    pub async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Article>> {
        let source = self.profile.source.as_str();
        let url = self.profile.endpoint.url(query, from, to)?;

        info!(%source, %query, %from, %to, "🔎 Fetching listing");
        let html = self
            .pages
            .fetch(url.as_str(), &self.profile.listing_strategy, cancel)
            .await?;

        let mut articles = self.parse_listing(&html, &url, from)?;
        if articles.is_empty() {
            info!(%source, %from, %to, "No articles listed");
            return Ok(articles);
        }

        self.fill_content(&mut articles, cancel).await;
        Ok(articles)
    }

    /// Turns a listing page into skeletal articles. Entries missing a title
    /// or a link are skipped without a trace.
    pub fn parse_listing(&self, html: &str, base: &Url, day: NaiveDate) -> Result<Vec<Article>> {
        let source = self.profile.source.as_str();
        if html.trim().is_empty() {
            return Err(Error::Parse(format!("{}: empty listing response", source)));
        }

        let document = Html::parse_document(html);
        if let Some(frame) = &self.listing.frame {
            if document.select(frame).next().is_none() {
                return Err(Error::Parse(format!(
                    "{}: listing page does not contain the result list",
                    source
                )));
            }
        }

        let fallback = start_of_day(day);
        let mut candidates = 0;
        let mut articles = Vec::new();
        for entry in document.select(&self.listing.container) {
            candidates += 1;
            if let Some(article) = self.listing.entry(entry, base, fallback) {
                articles.push(article);
            }
        }

        debug!(%source, candidates, kept = articles.len(), "Parsed listing");
        Ok(articles)
    }

    async fn fill_content(&self, articles: &mut [Article], cancel: &CancellationToken) {
        let source = self.profile.source.as_str();
        let total = articles.len();
        let pacer = Pacer::new(self.profile.politeness);
        let pacer = &pacer;

        let fills: Vec<_> = articles
            .iter_mut()
            .map(|article| self.fill_one(article, pacer, cancel))
            .collect();
        let outcomes: Vec<bool> = stream::iter(fills)
            .buffer_unordered(self.profile.concurrency.max(1))
            .collect()
            .await;
        let filled = outcomes.into_iter().filter(|filled| *filled).count();

        if cancel.is_cancelled() {
            warn!(%source, filled, total, "Content phase cancelled");
        } else {
            info!(%source, filled, total, "✨ Content phase finished");
        }
    }

    async fn fill_one(&self, article: &mut Article, pacer: &Pacer, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        match self.fetch_content(&article.url, pacer, cancel).await {
            Ok(content) => {
                article.content = content;
                true
            }
            Err(ContentFailure::Cancelled) => {
                debug!(url = %article.url, "Content fetch cancelled");
                false
            }
            Err(failure) => {
                warn!(
                    source = %self.profile.source,
                    url = %article.url,
                    reason = %failure,
                    "⚠️ Content fetch failed, keeping article without content"
                );
                false
            }
        }
    }

    async fn fetch_content(
        &self,
        url: &str,
        pacer: &Pacer,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, ContentFailure> {
        if self.is_excluded(url) {
            return Err(ContentFailure::ExcludedMedia);
        }
        if !pacer.wait(cancel).await {
            return Err(ContentFailure::Cancelled);
        }

        let html = match self
            .pages
            .fetch(url, &self.profile.content_strategy, cancel)
            .await
        {
            Ok(html) => html,
            Err(Error::Cancelled) => return Err(ContentFailure::Cancelled),
            Err(e) => return Err(ContentFailure::Fetch(e)),
        };

        let content = self.normalizer.normalize(&html);
        if content.is_empty() {
            return Err(ContentFailure::Empty);
        }
        Ok(content)
    }

    fn is_excluded(&self, url: &str) -> bool {
        self.profile
            .excluded_markers
            .iter()
            .any(|marker| url.contains(marker.as_str()))
    }
}
