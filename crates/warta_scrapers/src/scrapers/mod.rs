use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use warta_core::{Article, Result};

pub mod indonesia;
pub mod site;

use indonesia::detik::DetikScraper;
use indonesia::kompas::KompasScraper;
use indonesia::liputan6::Liputan6Scraper;

pub use site::{ContentFailure, ListingSelectors, SearchEndpoint, SiteProfile, SiteScraper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub emoji: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    pub name: &'static str,
    pub emoji: &'static str,
    pub region: Region,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the display metadata of the news source
    fn source_metadata(&self) -> SourceMetadata;

    /// Returns the identifiers this source is registered under
    fn cli_names(&self) -> Vec<&str> {
        vec![]
    }

    /// Runs the listing search for `query` between `from` and `to` (inclusive)
    /// and fills each listed article's content.
    ///
    /// Only a failed listing fetch or unrecognized listing markup fails the
    /// call; per-article content failures leave `content` empty.
    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Article>>;
}

/// Enum that holds all built-in sources
pub enum ScraperType {
    Detik(DetikScraper),
    Kompas(KompasScraper),
    Liputan6(Liputan6Scraper),
}

#[async_trait]
impl Scraper for ScraperType {
    fn source_metadata(&self) -> SourceMetadata {
        match self {
            ScraperType::Detik(s) => s.source_metadata(),
            ScraperType::Kompas(s) => s.source_metadata(),
            ScraperType::Liputan6(s) => s.source_metadata(),
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        match self {
            ScraperType::Detik(s) => s.cli_names(),
            ScraperType::Kompas(s) => s.cli_names(),
            ScraperType::Liputan6(s) => s.cli_names(),
        }
    }

    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Article>> {
        match self {
            ScraperType::Detik(s) => s.search(cancel, query, from, to).await,
            ScraperType::Kompas(s) => s.search(cancel, query, from, to).await,
            ScraperType::Liputan6(s) => s.search(cancel, query, from, to).await,
        }
    }
}
