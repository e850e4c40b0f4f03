use crate::scheduler::Scheduler;
use crate::types::{Article, DayGroup};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Articles shown on the admin listing.
const ADMIN_RECENT_LIMIT: usize = 50;

pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

/// JSON routes for the presentation and admin layers.
///
/// Authentication for `/admin/*` is expected to sit in front of this router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/articles", get(list_articles))
        .route("/api/articles/today", get(list_today))
        .route("/admin/articles", get(admin_articles))
        .route("/admin/fetch", get(manual_fetch).post(manual_fetch))
        .with_state(Arc::new(state))
}

// Read failures degrade to an empty page; error details stay in the logs.

async fn list_articles(State(state): State<Arc<AppState>>) -> Json<Vec<DayGroup>> {
    match state.scheduler.aggregator().store().list_grouped_by_day().await {
        Ok(groups) => Json(groups),
        Err(e) => {
            error!("Failed to list articles: {}", e);
            Json(Vec::new())
        }
    }
}

async fn list_today(State(state): State<Arc<AppState>>) -> Json<Vec<Article>> {
    match state.scheduler.aggregator().store().list_today().await {
        Ok(articles) => Json(articles),
        Err(e) => {
            error!("Failed to list today's articles: {}", e);
            Json(Vec::new())
        }
    }
}

async fn admin_articles(State(state): State<Arc<AppState>>) -> Json<Vec<Article>> {
    match state.scheduler.aggregator().store().recent(ADMIN_RECENT_LIMIT).await {
        Ok(articles) => Json(articles),
        Err(e) => {
            error!("Failed to list recent articles: {}", e);
            Json(Vec::new())
        }
    }
}

async fn manual_fetch(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.scheduler.trigger().await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "status": "completed",
                "added": report.committed,
                "entries_seen": report.entries_seen,
                "finished_at": report.finished_at,
            })),
        ),
        Err(e) => {
            error!("Manual ingestion failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "failed" })),
            )
        }
    }
}
