use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::{ApiError, AppState};

/// `GET /health`
///
/// Readiness probe: answers 200 while the backing store is reachable, 500
/// once it is not.
pub async fn get_health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.shared.store.ping().await?;
    Ok(Json(json!({ "status": "ok" })))
}
