mod groups;
mod health;
mod study_activities;
mod study_sessions;
mod words;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    // Two path styles coexist on purpose: the create/review routes kept their
    // original un-prefixed form, the read side lives under /api.
    let mut app = Router::new()
        .route(
            "/study_sessions",
            post(study_sessions::create).fallback(fallback_handler),
        )
        .route(
            "/study_sessions/:id/review",
            post(study_sessions::log_review).fallback(fallback_handler),
        )
        .route(
            "/api/study-sessions",
            get(study_sessions::list).fallback(fallback_handler),
        )
        .route(
            "/api/study-sessions/:id",
            get(study_sessions::get_one).fallback(fallback_handler),
        )
        .route(
            "/api/words",
            get(words::list_words).fallback(fallback_handler),
        )
        .route(
            "/api/words/:id",
            get(words::get_word).fallback(fallback_handler),
        )
        .route(
            "/api/groups",
            get(groups::list_groups).fallback(fallback_handler),
        )
        .route(
            "/api/groups/:id",
            get(groups::get_group).fallback(fallback_handler),
        )
        .route(
            "/api/study-activities",
            get(study_activities::list_activities).fallback(fallback_handler),
        );

    // Destructive and irreversible; only reachable when explicitly enabled.
    if state.config().enable_history_reset {
        app = app.route(
            "/api/study-sessions/reset",
            post(study_sessions::reset_history).fallback(fallback_handler),
        );
    }

    app = app.nest("/health", health::router());

    app.fallback(fallback_handler).with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "Route not found").into_response()
}
