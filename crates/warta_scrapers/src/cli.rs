use chrono::NaiveDate;
use clap::{Args, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warta_core::{parse_day, ArticleStorage, Result, SearchQuery};

use crate::orchestrator::{ExtractionOrchestrator, ExtractionReport, ExtractionRequest, WindowStatus};
use crate::registry::SourceRegistry;
use crate::window::WindowMode;

#[derive(Args, Debug)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Search a source for articles published in a date range
    Search {
        /// Source to search (e.g. detik or indonesia/detik)
        #[arg(short, long)]
        source: String,
        /// Search keywords
        #[arg(short, long)]
        query: String,
        /// First day of the range (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        from: NaiveDate,
        /// Last day of the range, inclusive (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        to: NaiveDate,
        /// Query one day at a time instead of the whole range at once
        #[arg(long)]
        daily: bool,
        /// Print the articles as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// List available sources
    Sources,
}

impl ScraperCommands {
    pub fn is_daily(&self) -> bool {
        matches!(self, ScraperCommands::Search { daily: true, .. })
    }
}

pub async fn handle_command(
    args: ScraperArgs,
    orchestrator: &ExtractionOrchestrator,
    storage: &dyn ArticleStorage,
    cancel: &CancellationToken,
) -> Result<()> {
    match args.command {
        ScraperCommands::Search {
            source,
            query,
            from,
            to,
            daily,
            json,
        } => {
            let mode = if daily { WindowMode::Daily } else { WindowMode::Whole };
            let request = ExtractionRequest::new(source, SearchQuery::new(query, from, to), mode);
            info!(source = %request.source, days = request.query.days(), ?mode, "🦗 Searching");
            // stored window by window, before the next one starts
            let report = orchestrator.execute_into(cancel, &request, storage).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report.articles)?);
            } else {
                print_report(&report);
            }

            let stored = report.stored;
            info!(
                inserted = stored.inserted,
                duplicates = stored.duplicates,
                failed = stored.failed,
                "💾 Stored articles"
            );
        }
        ScraperCommands::Sources => print_sources(orchestrator.registry()),
    }
    Ok(())
}

fn print_report(report: &ExtractionReport) {
    for article in &report.articles {
        let marker = if article.has_content() { "📰" } else { "📄" };
        println!("{} {} - {}", marker, article.title, article.url);
    }
    for window in &report.windows {
        match &window.status {
            WindowStatus::Completed { .. } => {}
            WindowStatus::Failed { attempts, error } => {
                warn!(window = %window.window, attempts, %error, "Window produced no articles");
            }
            WindowStatus::Cancelled => warn!(window = %window.window, "Window cancelled"),
        }
    }
    println!(
        "Found {} articles in {}/{} windows",
        report.articles.len(),
        report.completed(),
        report.windows.len()
    );
}

fn print_sources(registry: &SourceRegistry) {
    println!("Available sources:");
    for source in registry.sources() {
        println!("  {}/{}  {} {}", source.region, source.id, source.emoji, source.name);
    }
}
