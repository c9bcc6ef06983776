use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;
use warta_core::{Article, ArticleStorage, InsertSummary, Result};

#[derive(Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    urls: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_many(&mut self, articles: &[Article]) -> InsertSummary {
        let mut summary = InsertSummary::default();
        for article in articles {
            if article.url.trim().is_empty() {
                warn!(title = %article.title, "Refusing to store article without URL");
                summary.failed += 1;
                continue;
            }
            if !self.urls.insert(article.url.clone()) {
                summary.duplicates += 1;
                continue;
            }
            self.articles.push(article.clone());
            summary.inserted += 1;
        }
        summary
    }

    pub fn get_by_url(&self, url: &str) -> Option<Article> {
        self.articles.iter().find(|a| a.url == url).cloned()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Process-local store, the default backend. Contents are lost on exit.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn insert_many(&self, articles: &[Article]) -> Result<InsertSummary> {
        let mut store = self.store.write().await;
        Ok(store.insert_many(articles))
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.get_by_url(url))
    }

    async fn count(&self) -> Result<usize> {
        let store = self.store.read().await;
        Ok(store.len())
    }
}
