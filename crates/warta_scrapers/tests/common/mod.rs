use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::subscriber::DefaultGuard;
use warta_core::{parse_day, Article, ArticleStorage, Error, InsertSummary, Result};
use warta_scrapers::{PageSource, RenderingStrategy};

pub fn day(s: &str) -> NaiveDate {
    parse_day(s).unwrap()
}

#[derive(Debug, Clone)]
pub enum Reply {
    Page(String),
    Status(u16),
    /// Never answers; returns only once the request is cancelled.
    Hang,
}

/// Page source answering each URL from a script. Replies are consumed in
/// order and the last one repeats; unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedPages {
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
    trip: Mutex<Option<(String, CancellationToken)>>,
}

impl ScriptedPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, url: &str, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.reply(url, Reply::Page(body.to_string()))
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.reply(url, Reply::Status(status))
    }

    pub fn hang(self, url: &str) -> Self {
        self.reply(url, Reply::Hang)
    }

    /// Cancels `token` right after `url` has been answered.
    pub fn cancel_after(self, url: &str, token: &CancellationToken) -> Self {
        *self.trip.lock().unwrap() = Some((url.to_string(), token.clone()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == url).count()
    }
}

#[async_trait]
impl PageSource for ScriptedPages {
    async fn fetch(&self, url: &str, _strategy: &RenderingStrategy, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.requests.lock().unwrap().push(url.to_string());

        let reply = {
            let mut script = self.script.lock().unwrap();
            match script.get_mut(url) {
                Some(replies) if replies.len() > 1 => replies.pop_front(),
                Some(replies) => replies.front().cloned(),
                None => None,
            }
        };

        let answer = match reply {
            Some(Reply::Page(body)) => Ok(body),
            Some(Reply::Status(status)) => Err(Error::status(url, status)),
            Some(Reply::Hang) => {
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
            None => Err(Error::status(url, 404)),
        };

        if let Some((trip_url, token)) = self.trip.lock().unwrap().as_ref() {
            if trip_url == url {
                token.cancel();
            }
        }
        answer
    }
}

/// Storage that remembers each batch together with how many page requests
/// had been made when it arrived.
pub struct RecordingStorage {
    pages: Arc<ScriptedPages>,
    fail: bool,
    batches: Mutex<Vec<(usize, Vec<String>)>>,
}

impl RecordingStorage {
    pub fn new(pages: Arc<ScriptedPages>) -> Self {
        Self {
            pages,
            fail: false,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(pages: Arc<ScriptedPages>) -> Self {
        Self {
            fail: true,
            ..Self::new(pages)
        }
    }

    pub fn batches(&self) -> Vec<(usize, Vec<String>)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArticleStorage for RecordingStorage {
    async fn insert_many(&self, articles: &[Article]) -> Result<InsertSummary> {
        let urls = articles.iter().map(|a| a.url.clone()).collect();
        self.batches
            .lock()
            .unwrap()
            .push((self.pages.requests().len(), urls));
        if self.fail {
            return Err(Error::Storage("disk full".into()));
        }
        Ok(InsertSummary {
            inserted: articles.len(),
            ..InsertSummary::default()
        })
    }

    async fn get_by_url(&self, _url: &str) -> Result<Option<Article>> {
        Ok(None)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.batches().iter().map(|(_, urls)| urls.len()).sum())
    }
}

#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Routes this thread's events into the buffer until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lines().into_iter().filter(|l| l.contains(" WARN ")).collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
