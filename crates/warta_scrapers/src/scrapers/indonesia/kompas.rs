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

pub struct KompasScraper {
    site: SiteScraper,
}

impl KompasScraper {
    const SEARCH_URL: &'static str = "https://search.kompas.com/search";

    pub fn new(pages: Arc<dyn PageSource>) -> Result<Self> {
        Self::with_profile(pages, Self::profile())
    }

    pub fn with_profile(pages: Arc<dyn PageSource>, profile: SiteProfile) -> Result<Self> {
        Ok(Self {
            site: SiteScraper::new(profile, pages)?,
        })
    }

    /// Results come from an embedded custom-search widget, so both the
    /// listing and the article pages need a browser.
    pub fn profile() -> SiteProfile {
        SiteProfile {
            source: "Kompas".to_string(),
            endpoint: SearchEndpoint::new(Self::SEARCH_URL, "q", "start_date", "end_date", "%Y-%m-%d")
                .with_param("site_id", "all"),
            listing: ListingSelectors::new("div.gsc-webResult", "a.gs-title", "a.gs-title")
                .with_summary("div.gs-bidi-start-align"),
            listing_frame: Some("div.gsc-results".to_string()),
            listing_strategy: RenderingStrategy::rendered("div.gsc-webResult"),
            content_strategy: RenderingStrategy::rendered("div.read__content"),
            content_rules: vec![
                ExtractionRule::blocks("div.read__content", "p").excluding("strong", "Baca juga"),
                ExtractionRule::blocks("body", "p").excluding("strong", "Baca juga"),
            ],
            excluded_markers: vec!["video.kompas.com".to_string(), "foto.kompas.com".to_string()],
            politeness: Duration::from_millis(300),
            concurrency: 1,
        }
    }
}

#[async_trait]
impl Scraper for KompasScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "Kompas",
            emoji: "🧭",
            region: REGION,
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["kompas"]
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
