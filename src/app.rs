use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/session", post(handlers::create_session))
        .route("/api/tracker", get(handlers::get_tracker))
        .route("/api/toggle", post(handlers::toggle))
        .route("/api/moods", get(handlers::get_moods))
        .route("/manifest.webmanifest", get(handlers::manifest))
        .with_state(state)
}
