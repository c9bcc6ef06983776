pub mod cli;
pub mod fetch;
pub mod logging;
pub mod normalizer;
pub mod orchestrator;
pub mod registry;
pub mod render;
pub mod retry;
pub mod scrapers;
pub mod window;

#[cfg(test)]
mod test_support;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use fetch::{HttpFetcher, PageSource, RenderingStrategy, Transport};
pub use normalizer::{ContentNormalizer, ExtractionRule};
pub use orchestrator::{
    ExtractionOrchestrator, ExtractionReport, ExtractionRequest, WindowReport, WindowStatus,
};
pub use registry::{SourceEntry, SourceRegistry};
pub use retry::{RetryOutcome, RetryPolicy};
pub use scrapers::Scraper;
pub use window::{DateWindows, ExtractionWindow, WindowMode};

pub mod prelude {
    pub use super::scrapers::Scraper;
    pub use super::{ExtractionOrchestrator, ExtractionRequest, WindowMode};
    pub use warta_core::{Article, Error, Result, SearchQuery};
}
