//! Content catalog endpoint.
//!
//! GET /api/posts

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::state::AppState;

/// GET /api/posts - every catalog record, unmodified.
pub async fn list_posts(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(state.catalog.as_ref().clone())
}
