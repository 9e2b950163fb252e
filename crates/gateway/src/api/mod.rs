pub mod health;
pub mod ws;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the API router. Both routes are public: callers authenticate
/// per message inside the envelope.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(ws::request_ws))
}
