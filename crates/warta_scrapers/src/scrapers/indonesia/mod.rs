use std::sync::Arc;

use warta_core::Result;

use crate::fetch::PageSource;
use crate::scrapers::{Region, ScraperType};

pub mod detik;
pub mod kompas;
pub mod liputan6;

pub use detik::DetikScraper;
pub use kompas::KompasScraper;
pub use liputan6::Liputan6Scraper;

pub const REGION: Region = Region {
    name: "indonesia",
    emoji: "🇮🇩",
};

/// Returns every Indonesian source wired to the shared page source, each
/// allowed `concurrency` in-flight content fetches.
pub fn get_scrapers(pages: Arc<dyn PageSource>, concurrency: usize) -> Result<Vec<ScraperType>> {
    Ok(vec![
        ScraperType::Detik(DetikScraper::with_profile(
            pages.clone(),
            DetikScraper::profile().with_concurrency(concurrency),
        )?),
        ScraperType::Kompas(KompasScraper::with_profile(
            pages.clone(),
            KompasScraper::profile().with_concurrency(concurrency),
        )?),
        ScraperType::Liputan6(Liputan6Scraper::with_profile(
            pages,
            Liputan6Scraper::profile().with_concurrency(concurrency),
        )?),
    ])
}
