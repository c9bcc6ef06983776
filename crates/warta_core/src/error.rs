use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid date range: {to} is before {from}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport failure or non-success status while fetching a page.
    #[error("Fetch error for {url}: {}", describe_fetch(.status, .cause))]
    Fetch {
        url: String,
        status: Option<u16>,
        cause: String,
    },

    /// Listing markup did not match any structure the source is known to serve.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn describe_fetch(status: &Option<u16>, cause: &str) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => cause.to_string(),
    }
}

impl Error {
    pub fn fetch(url: impl Into<String>, cause: impl ToString) -> Self {
        Error::Fetch {
            url: url.into(),
            status: None,
            cause: cause.to_string(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Error::Fetch {
            url: url.into(),
            status: Some(status),
            cause: format!("unexpected status {status}"),
        }
    }

    /// Listing-phase failures are worth another attempt; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch { .. } | Error::Parse(_))
    }

    /// True for errors caused by the caller's input rather than by a source.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidRange { .. }
                | Error::UnknownSource(_)
                | Error::InvalidQuery(_)
                | Error::InvalidDate(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
