//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api/v1`:
//! - Catalog browsing (topics, lessons, videos, tests, practices)
//! - Users and contacts
//! - Tariffs and payments
//! - Progression (completions, test grading, progress reports)
//! - Health

pub mod catalog;
pub mod health;
pub mod middleware;
pub mod progress;
pub mod tariffs;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the API router (without the `/api/v1` prefix)
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .merge(users::router())
        .merge(tariffs::router())
        .merge(progress::router())
        .merge(health::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) if cors_origin != "*" => cors.allow_origin(origin),
        Ok(_) => cors.allow_origin(Any),
        Err(e) => {
            tracing::warn!("Invalid CORS origin '{}': {}; allowing any origin", cors_origin, e);
            cors.allow_origin(Any)
        }
    };

    Router::new()
        .nest("/api/v1", build_api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

/// Router over the seeded test course, with default configuration.
#[cfg(test)]
pub(crate) async fn test_server() -> (
    axum_test::TestServer,
    crate::services::test_support::SeededCourse,
) {
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, Config};

    let course = crate::services::test_support::seed_course().await;
    let state = AppState::new(
        course.pool.clone(),
        create_cache(&CacheConfig::default()),
        &Config::default(),
    );
    let server = axum_test::TestServer::new(build_router(state, "http://localhost:3000"))
        .expect("Failed to start test server");
    (server, course)
}
