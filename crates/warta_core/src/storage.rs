use async_trait::async_trait;
use serde::Serialize;

use crate::types::Article;
use crate::Result;

/// Outcome of a best-effort bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertSummary {
    pub inserted: usize,
    /// Records skipped because an article with the same URL is already stored.
    pub duplicates: usize,
    pub failed: usize,
}

impl InsertSummary {
    pub fn merge(&mut self, other: InsertSummary) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }
}

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert every article it can. A duplicate URL or a failing row never
    /// aborts the rest of the batch.
    async fn insert_many(&self, articles: &[Article]) -> Result<InsertSummary>;

    /// Look up a stored article by URL
    async fn get_by_url(&self, url: &str) -> Result<Option<Article>>;

    /// Number of stored articles
    async fn count(&self) -> Result<usize>;
}
