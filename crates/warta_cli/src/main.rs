use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warta_core::config::{BrowserConfig, Config, HttpConfig, RetryConfig, StorageConfig, DEFAULT_USER_AGENT};
use warta_scrapers::logging::init_logging;
use warta_scrapers::{handle_command, ExtractionOrchestrator, ScraperArgs, ScraperCommands};
use warta_web::AppState;

mod duration;

use duration::HumanDuration;

/// Pause between days in `--daily` runs unless one is given explicitly.
const DAILY_WINDOW_PAUSE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Search Indonesian news sources and store what they publish", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "WARTA_STORAGE", default_value = "memory", global = true)]
    storage: String,

    /// SQLite database file
    #[arg(long, env = "WARTA_DB_PATH", default_value = "articles.db", global = true)]
    db_path: PathBuf,

    /// Attempts per window, the first one included
    #[arg(long, env = "WARTA_RETRY_ATTEMPTS", default_value_t = 2, global = true)]
    retry_attempts: u32,

    #[arg(long, env = "WARTA_RETRY_DELAY", default_value = "3s", global = true)]
    retry_delay: HumanDuration,

    /// Time allowed for one window, retries included
    #[arg(long, env = "WARTA_WINDOW_BUDGET", default_value = "2m", global = true)]
    window_budget: HumanDuration,

    /// Time allowed for one API request
    #[arg(long, env = "WARTA_REQUEST_BUDGET", default_value = "5m", global = true)]
    request_budget: HumanDuration,

    /// Pause between windows (defaults to 5s with --daily, none otherwise)
    #[arg(long, env = "WARTA_WINDOW_PAUSE", global = true)]
    window_pause: Option<HumanDuration>,

    #[arg(long, env = "WARTA_HTTP_TIMEOUT", default_value = "15s", global = true)]
    http_timeout: HumanDuration,

    #[arg(long, env = "WARTA_USER_AGENT", default_value = DEFAULT_USER_AGENT, global = true, hide_default_value = true)]
    user_agent: String,

    /// In-flight content fetches per listing
    #[arg(long, env = "WARTA_CONCURRENCY", default_value_t = 1, global = true)]
    concurrency: usize,

    /// Headless browser to try before the built-in list
    #[arg(long, env = "WARTA_BROWSER", global = true)]
    browser: Option<String>,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, env = "WARTA_LOG", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Scraper(ScraperCommands),
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "WARTA_ADDR", default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let daily = matches!(&self.command, Commands::Scraper(command) if command.is_daily());
        let window_pause = match self.window_pause {
            Some(pause) => pause.0,
            None if daily => DAILY_WINDOW_PAUSE,
            None => Duration::ZERO,
        };

        let mut browser = BrowserConfig::default();
        if let Some(preferred) = &self.browser {
            browser.executables.insert(0, preferred.clone());
        }

        Config {
            retry: RetryConfig {
                attempts: self.retry_attempts,
                delay: self.retry_delay.0,
            },
            window_budget: self.window_budget.0,
            request_budget: self.request_budget.0,
            window_pause,
            content_concurrency: self.concurrency,
            http: HttpConfig {
                timeout: self.http_timeout.0,
                user_agent: self.user_agent.clone(),
            },
            browser,
            storage: StorageConfig {
                backend: self.storage.clone(),
                path: self.db_path.clone(),
            },
        }
    }
}

fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing up");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.config();
    config.validate()?;

    let cancel = CancellationToken::new();
    shutdown_on_ctrl_c(cancel.clone());

    let storage = warta_storage::create_storage(&config.storage).await?;
    info!(backend = %config.storage.backend, "💾 Storage initialized");

    let orchestrator = ExtractionOrchestrator::from_config(&config)?;
    info!(sources = ?orchestrator.registry().names(), "🦗 Sources registered");

    match cli.command {
        Commands::Scraper(command) => {
            handle_command(ScraperArgs { command }, &orchestrator, storage.as_ref(), &cancel).await?;
        }
        Commands::Serve { addr } => {
            let state = AppState::new(Arc::new(orchestrator), storage, config.request_budget);
            warta_web::serve(addr, state, cancel).await?;
        }
    }

    Ok(())
}
