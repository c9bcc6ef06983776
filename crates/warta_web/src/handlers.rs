use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use warta_core::{parse_day, Article, SearchQuery};
use warta_scrapers::{ExtractionRequest, SourceEntry, WindowMode, WindowStatus};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScrapeRequest {
    pub source: String,
    pub query: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`, inclusive
    pub end_date: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub message: String,
    pub found: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub articles: Vec<Article>,
}

/// Checks the request in a fixed order: source, dates, query, range.
fn validate(state: &AppState, request: ScrapeRequest) -> Result<ExtractionRequest, ApiError> {
    let registry = state.registry();
    if !registry.contains(&request.source) {
        let known: Vec<String> = registry.sources().into_iter().map(|s| s.id).collect();
        return Err(ApiError::InvalidRequest(format!(
            "Invalid source '{}'. Must be one of: {}",
            request.source,
            known.join(", ")
        )));
    }

    let from = parse_day(&request.start_date)
        .map_err(|_| ApiError::InvalidRequest("Invalid start_date format. Use YYYY-MM-DD".into()))?;
    let to = parse_day(&request.end_date)
        .map_err(|_| ApiError::InvalidRequest("Invalid end_date format. Use YYYY-MM-DD".into()))?;

    if request.query.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Query is required".into()));
    }

    let query = SearchQuery::new(request.query, from, to);
    query.validate()?;

    Ok(ExtractionRequest::new(request.source, query, WindowMode::Whole))
}

pub async fn scrape(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let Json(payload) =
        payload.map_err(|e| ApiError::InvalidRequest(format!("Invalid request body: {}", e.body_text())))?;
    let request = validate(&state, payload)?;

    info!(
        source = %request.source,
        query = %request.query.text,
        from = %request.query.from,
        to = %request.query.to,
        "🚀 Scrape requested"
    );

    // the guard also cancels when the client goes away and the handler is dropped
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let timer = tokio::spawn({
        let cancel = cancel.clone();
        let budget = state.request_budget;
        async move {
            tokio::time::sleep(budget).await;
            cancel.cancel();
        }
    });
    let result = state.orchestrator.execute_report(&cancel, &request).await;
    timer.abort();
    let report = result?;

    if report.completed() == 0 {
        let reason = report
            .failed_windows()
            .find_map(|w| match &w.status {
                WindowStatus::Failed { error, .. } => Some(error.clone()),
                _ => None,
            })
            .unwrap_or_else(|| "request budget exceeded".to_string());
        error!(source = %request.source, %reason, "❌ Scraping failed");
        return Err(ApiError::Internal(format!("Scraping failed: {}", reason)));
    }

    let found = report.articles.len();
    if found == 0 {
        info!(query = %request.query.text, "No articles found");
        return Ok(Json(ScrapeResponse {
            message: "Scraping successful, 0 articles found.".to_string(),
            found: 0,
            saved: 0,
            duplicates: 0,
            articles: Vec::new(),
        }));
    }

    let summary = state.storage.insert_many(&report.articles).await.map_err(|e| {
        error!(error = %e, "❌ Failed to save articles");
        ApiError::Internal("Failed to save articles".into())
    })?;
    info!(
        found,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        failed = summary.failed,
        "💾 Articles saved"
    );

    Ok(Json(ScrapeResponse {
        message: format!("Scraping successful, {} articles saved.", summary.inserted),
        found,
        saved: summary.inserted,
        duplicates: summary.duplicates,
        articles: report.articles,
    }))
}

pub async fn list_sources(State(state): State<Arc<AppState>>) -> Json<Vec<SourceEntry>> {
    Json(state.registry().sources())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
