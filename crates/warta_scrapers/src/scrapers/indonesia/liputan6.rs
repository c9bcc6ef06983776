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

pub struct Liputan6Scraper {
    site: SiteScraper,
}

impl Liputan6Scraper {
    const SEARCH_URL: &'static str = "https://www.liputan6.com/search";

    pub fn new(pages: Arc<dyn PageSource>) -> Result<Self> {
        Self::with_profile(pages, Self::profile())
    }

    pub fn with_profile(pages: Arc<dyn PageSource>, profile: SiteProfile) -> Result<Self> {
        Ok(Self {
            site: SiteScraper::new(profile, pages)?,
        })
    }

    pub fn profile() -> SiteProfile {
        SiteProfile {
            source: "Liputan6".to_string(),
            endpoint: SearchEndpoint::new(Self::SEARCH_URL, "q", "from_date", "to_date", "%d/%m/%Y")
                .with_param("order", "latest")
                .with_param("type", "all"),
            listing: ListingSelectors::new(
                "article.articles--iridescent-list--item",
                "h4.articles--iridescent-list--text-item__title",
                "a",
            )
            .with_summary("p.articles--iridescent-list--text-item__summary")
            .with_date("time.articles--iridescent-list--text-item__time"),
            listing_frame: Some("div.articles--iridescent-list".to_string()),
            listing_strategy: RenderingStrategy::Static,
            content_strategy: RenderingStrategy::Static,
            content_rules: vec![ExtractionRule::text("div.article-content-body__item-content")],
            excluded_markers: Vec::new(),
            politeness: Duration::from_millis(300),
            concurrency: 1,
        }
    }
}

#[async_trait]
impl Scraper for Liputan6Scraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "Liputan6",
            emoji: "📺",
            region: REGION,
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["liputan6"]
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
