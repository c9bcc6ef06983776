use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Date format accepted from callers (`2015-01-31`).
pub const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub content: String,
    pub date: DateTime<Utc>,
}

impl Article {
    /// Skeletal record produced by the listing phase; `content` is filled later.
    pub fn listed(title: String, url: String, summary: String, date: DateTime<Utc>) -> Self {
        Self {
            title,
            url,
            summary,
            content: String::new(),
            date,
        }
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            text: text.into(),
            from,
            to,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.to < self.from {
            return Err(Error::InvalidRange {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DAY_FORMAT)
        .map_err(|_| Error::InvalidDate(input.to_string()))
}

/// Midnight UTC of the given day.
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}
