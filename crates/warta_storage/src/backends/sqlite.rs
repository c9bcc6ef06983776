use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{info, warn};
use warta_core::{Article, ArticleStorage, Error, InsertSummary, Result};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        url TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        summary TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        published_at TEXT NOT NULL
    )
    "#,
];

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("Failed to open {}: {}", db_path.display(), e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        info!(path = %db_path.display(), "🗄️ SQLite storage ready");
        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let published_at: String = row.get("published_at");
    let date = DateTime::parse_from_rfc3339(&published_at)
        .map_err(|e| Error::Storage(format!("Failed to parse date '{}': {}", published_at, e)))?
        .with_timezone(&Utc);

    Ok(Article {
        url: row.get("url"),
        title: row.get("title"),
        summary: row.get("summary"),
        content: row.get("content"),
        date,
    })
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn insert_many(&self, articles: &[Article]) -> Result<InsertSummary> {
        let mut summary = InsertSummary::default();

        for article in articles {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO articles (url, title, summary, content, published_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&article.url)
            .bind(&article.title)
            .bind(&article.summary)
            .bind(&article.content)
            .bind(article.date.to_rfc3339())
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 0 => summary.duplicates += 1,
                Ok(_) => summary.inserted += 1,
                Err(e) => {
                    warn!(url = %article.url, error = %e, "Failed to store article");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to load article: {}", e)))?;

        row.as_ref().map(row_to_article).transpose()
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to count articles: {}", e)))?;
        Ok(count as usize)
    }
}
