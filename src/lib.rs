pub mod config;
pub mod db;
pub mod logging;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod seed;
pub mod state;

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderValue;
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::AppState;

/// Connects to the database described by `config` and builds the full router.
pub async fn create_app_with_config(config: Config) -> Result<axum::Router, db::DbInitError> {
    let pool = db::connect(&config.database_url).await?;

    if config.seed_demo_data {
        seed::seed_demo_data(&pool).await;
    }

    Ok(app_with_pool(config, pool))
}

pub async fn create_app() -> Result<axum::Router, db::DbInitError> {
    create_app_with_config(Config::from_env()).await
}

/// Router over an already-initialized pool; the integration tests use this
/// to share the pool between fixtures and the app.
pub fn app_with_pool(config: Config, pool: SqlitePool) -> axum::Router {
    let cors = cors_layer(&config);
    let state = AppState::new(pool, Arc::new(config));

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        // Matches the source's wildcard fallback when no allow-list is set.
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
