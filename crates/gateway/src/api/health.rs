use axum::response::{IntoResponse, Json};

/// GET /health: liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "message": "slxx RequestHandler Agent is up and running",
    }))
}
