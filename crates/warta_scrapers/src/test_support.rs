use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use warta_core::{parse_day, Error, Result};

use crate::fetch::{PageSource, RenderingStrategy};

pub fn day(s: &str) -> NaiveDate {
    parse_day(s).unwrap()
}

enum Reply {
    Page(String),
    Status(u16),
}

/// In-memory [`PageSource`]. URLs are matched exactly first, then without
/// their query string; anything unknown answers 404.
#[derive(Default)]
pub struct FakePages {
    replies: HashMap<String, Reply>,
    hits: Mutex<HashMap<String, usize>>,
}

impl FakePages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.replies.insert(url.to_string(), Reply::Page(body.to_string()));
        self
    }

    pub fn failing(mut self, url: &str, status: u16) -> Self {
        self.replies.insert(url.to_string(), Reply::Status(status));
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        let hits = self.hits.lock().unwrap();
        hits.iter()
            .filter(|(requested, _)| strip_query(requested) == url || requested.as_str() == url)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn body(&self, url: &str) -> Option<String> {
        match self.replies.get(url) {
            Some(Reply::Page(body)) => Some(body.clone()),
            _ => None,
        }
    }
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[async_trait]
impl PageSource for FakePages {
    async fn fetch(
        &self,
        url: &str,
        _strategy: &RenderingStrategy,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let reply = self
            .replies
            .get(url)
            .or_else(|| self.replies.get(strip_query(url)));
        match reply {
            Some(Reply::Page(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(Error::status(url, *status)),
            None => Err(Error::status(url, 404)),
        }
    }
}
