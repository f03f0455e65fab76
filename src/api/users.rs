//! User API endpoints
//!
//! - POST /api/v1/users - Register a Telegram user
//! - GET /api/v1/users/{telegram_id} - Profile with contact and payments
//! - POST /api/v1/contacts - Save contact details
//! - GET /api/v1/admin - The admin who reviews practices

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{ContactInput, CreateUserInput, TelegramUser, UserContact, UserProfile};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/{telegram_id}", get(get_profile))
        .route("/contacts", post(save_contact))
        .route("/admin", get(get_admin))
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<TelegramUser>), ApiError> {
    let user = state.user_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.user_service.profile(telegram_id).await?))
}

async fn save_contact(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> Result<(StatusCode, Json<UserContact>), ApiError> {
    let contact = state.user_service.save_contact(input).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn get_admin(State(state): State<AppState>) -> Result<Json<TelegramUser>, ApiError> {
    Ok(Json(state.user_service.first_admin().await?))
}
