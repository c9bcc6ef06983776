use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use warta_core::{Article, Result};

use super::REGION;
use crate::fetch::{PageSource, RenderingStrategy};
use crate::normalizer::ExtractionRule;
use crate::scrapers::{ListingSelectors, Scraper, SearchEndpoint, SiteProfile, SiteScraper, SourceMetadata};

pub struct DetikScraper {
    site: SiteScraper,
}

impl DetikScraper {
    const SEARCH_URL: &'static str = "https://www.detik.com/search/searchall";

    pub fn new(pages: Arc<dyn PageSource>) -> Result<Self> {
        Self::with_profile(pages, Self::profile())
    }

    pub fn with_profile(pages: Arc<dyn PageSource>, profile: SiteProfile) -> Result<Self> {
        Ok(Self {
            site: SiteScraper::new(profile, pages)?,
        })
    }

    /// Server-rendered search results; the body moved from
    /// `detail__body-text` to `detail__body` on some templates.
    pub fn profile() -> SiteProfile {
        SiteProfile {
            source: "Detik".to_string(),
            endpoint: SearchEndpoint::new(Self::SEARCH_URL, "query", "fromdatex", "todatex", "%d/%m/%Y")
                .with_param("result_type", "relevansi"),
            listing: ListingSelectors::new("article", "h3", "a").with_summary("p"),
            listing_frame: Some("div.list-content".to_string()),
            listing_strategy: RenderingStrategy::Static,
            content_strategy: RenderingStrategy::Static,
            content_rules: vec![
                ExtractionRule::text("div.detail__body-text"),
                ExtractionRule::text("div.detail__body"),
            ],
            excluded_markers: Vec::new(),
            politeness: Duration::from_millis(300),
            concurrency: 1,
        }
    }
}

#[async_trait]
impl Scraper for DetikScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "Detik",
            emoji: "📰",
            region: REGION,
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["detik"]
    }

    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Article>> {
        self.site.search(cancel, query, from, to).await
    }
}
