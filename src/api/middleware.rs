//! API middleware and shared handler types
//!
//! Contains:
//! - Request statistics (lock-free counters)
//! - Application state handed to every handler
//! - The JSON error envelope and its mapping from service errors

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxCatalogRepository, SqlxPaymentRepository, SqlxProgressRepository, SqlxQuizRepository,
    SqlxTariffRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    CatalogService, CatalogServiceError, ProgressionService, ProgressionServiceError, TariffService,
    TariffServiceError, UserService, UserServiceError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Sum of response times in microseconds
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application state
// ============================================================================

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub catalog_service: Arc<CatalogService>,
    pub user_service: Arc<UserService>,
    pub tariff_service: Arc<TariffService>,
    pub progression_service: Arc<ProgressionService>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire repositories and services over one pool and cache.
    pub fn new(pool: DynDatabasePool, cache: Arc<Cache>, config: &Config) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let tariffs = SqlxTariffRepository::boxed(pool.clone());
        let payments = SqlxPaymentRepository::boxed(pool.clone());

        let catalog_service = Arc::new(CatalogService::new(
            SqlxCatalogRepository::boxed(pool.clone()),
            SqlxQuizRepository::boxed(pool.clone()),
            cache,
            config.media.clone(),
        ));
        let progression_service = Arc::new(ProgressionService::new(
            users.clone(),
            tariffs.clone(),
            SqlxProgressRepository::boxed(pool.clone()),
            catalog_service.clone(),
            config.progression.test_pass_percent,
        ));
        let tariff_service = Arc::new(TariffService::new(
            tariffs,
            payments.clone(),
            users.clone(),
            progression_service.clone(),
            config.progression.access_days,
        ));
        let user_service = Arc::new(UserService::new(users, payments));

        Self {
            pool,
            catalog_service,
            user_service,
            tariff_service,
            progression_service,
            request_stats: Arc::new(RequestStats::new()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// Logs the cause; clients only see a generic message.
    pub fn internal_error(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "Request failed");
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<CatalogServiceError> for ApiError {
    fn from(err: CatalogServiceError) -> Self {
        match err {
            CatalogServiceError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            CatalogServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            UserServiceError::ValidationError(msg) => Self::validation_error(msg),
            UserServiceError::Conflict(msg) => Self::conflict(msg),
            UserServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

impl From<TariffServiceError> for ApiError {
    fn from(err: TariffServiceError) -> Self {
        match err {
            TariffServiceError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            TariffServiceError::ValidationError(msg) => Self::validation_error(msg),
            TariffServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

impl From<ProgressionServiceError> for ApiError {
    fn from(err: ProgressionServiceError) -> Self {
        match err {
            ProgressionServiceError::NotFound(what) => {
                Self::not_found(format!("{} not found", what))
            }
            ProgressionServiceError::ValidationError(msg) => Self::validation_error(msg),
            ProgressionServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Records request count and response time.
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state
        .request_stats
        .record(start.elapsed().as_micros() as u64);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_stats() {
        let stats = RequestStats::new();
        assert_eq!(stats.avg_response_time_us(), 0.0);

        stats.record(100);
        stats.record(300);
        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.avg_response_time_us(), 200.0);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (ApiError::new("SOMETHING_ELSE", "x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_service_errors_map_to_codes() {
        let err: ApiError = UserServiceError::Conflict("taken".to_string()).into();
        assert_eq!(err.error.code, "CONFLICT");

        let err: ApiError = ProgressionServiceError::NotFound("User 1".to_string()).into();
        assert_eq!(err.error.code, "NOT_FOUND");
        assert_eq!(err.error.message, "User 1 not found");

        let err: ApiError = TariffServiceError::InternalError(anyhow::anyhow!("db down")).into();
        assert_eq!(err.error.code, "INTERNAL_ERROR");
        assert_eq!(err.error.message, "Internal server error");
    }

    #[test]
    fn test_details_are_serialized_only_when_present() {
        let plain = serde_json::to_value(ApiError::not_found("gone")).unwrap();
        assert!(plain["error"].get("details").is_none());

        let detailed = serde_json::to_value(ApiError::with_details(
            "VALIDATION_ERROR",
            "bad selection",
            serde_json::json!({"field": "answers"}),
        ))
        .unwrap();
        assert_eq!(detailed["error"]["details"]["field"], "answers");
    }
}
