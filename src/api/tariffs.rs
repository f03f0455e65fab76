//! Tariff and payment API endpoints
//!
//! - GET /api/v1/tariffs - Tariffs on sale (404 when there are none)
//! - GET /api/v1/tariffs/{title}
//! - POST /api/v1/payments - Record a payment made through the bot
//! - POST /api/v1/tariffs/activate - Record a payment and open starter content

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreatePaymentInput, Payment, Tariff, TariffActivation};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tariffs", get(list_tariffs))
        .route("/tariffs/activate", post(activate_tariff))
        .route("/tariffs/{title}", get(get_tariff))
        .route("/payments", post(add_payment))
}

#[derive(Debug, Deserialize)]
pub struct ActivateTariffRequest {
    pub user_id: i64,
    pub tariff: String,
    pub amount: i64,
    /// First day of access; defaults to today (UTC)
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

async fn list_tariffs(State(state): State<AppState>) -> Result<Json<Vec<Tariff>>, ApiError> {
    Ok(Json(state.tariff_service.list().await?))
}

async fn get_tariff(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Tariff>, ApiError> {
    Ok(Json(state.tariff_service.get_by_title(&title).await?))
}

async fn add_payment(
    State(state): State<AppState>,
    Json(input): Json<CreatePaymentInput>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let payment = state.tariff_service.add_payment(input).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn activate_tariff(
    State(state): State<AppState>,
    Json(request): Json<ActivateTariffRequest>,
) -> Result<(StatusCode, Json<TariffActivation>), ApiError> {
    let today = request.start_date.unwrap_or_else(|| Utc::now().date_naive());
    let activation = state
        .tariff_service
        .activate_tariff(request.user_id, &request.tariff, request.amount, today)
        .await?;
    Ok((StatusCode::CREATED, Json(activation)))
}
