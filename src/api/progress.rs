//! Progression API endpoints
//!
//! - POST /api/v1/progress/start_content - Open a tariff's starter content
//! - POST /api/v1/progress/video - Mark a video watched
//! - POST /api/v1/progress/video/answer - Answer a video's control question
//! - POST /api/v1/progress/test - Mark a test passed
//! - POST /api/v1/progress/test/submit - Grade a test attempt
//! - POST /api/v1/progress/practice - Approve a practice (by Telegram id)
//! - GET /api/v1/progress/{telegram_id} - Progress report
//! - GET /api/v1/progress/{telegram_id}/available - Everything the learner may open

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    AvailableContent, ContentKind, ContentSet, NextStepParams, ProgressReport, TestGrade,
    UnlockOutcome,
};
use crate::services::{parse_selection, QuizError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/progress/start_content", post(start_content))
        .route("/progress/video", post(complete_video))
        .route("/progress/video/answer", post(answer_video))
        .route("/progress/test", post(complete_test))
        .route("/progress/test/submit", post(submit_test))
        .route("/progress/practice", post(complete_practice))
        .route("/progress/{telegram_id}", get(report))
        .route("/progress/{telegram_id}/available", get(available))
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartContentRequest {
    pub user_id: i64,
    pub tariff: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteVideoRequest {
    pub user_id: i64,
    pub video_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompleteTestRequest {
    pub user_id: i64,
    pub test_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompletePracticeRequest {
    pub telegram_id: i64,
    pub practice_id: i64,
}

/// One entry per question, e.g. `"1"` or `"2,3"`
#[derive(Debug, Deserialize)]
pub struct SubmitTestRequest {
    pub user_id: i64,
    pub test_id: i64,
    pub answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoAnswerRequest {
    pub user_id: i64,
    pub video_id: i64,
    pub answer: i32,
}

/// Titles of the items this completion unlocked, in course order.
///
/// Only newly unlocked items are listed, not every successor of the completed
/// unit: successors the user already had are left out, so a repeated
/// completion yields empty lists. `next_step` still points at the first
/// successor not yet done. The field names are kept as the bot reads them.
#[derive(Debug, Serialize)]
pub struct NextContentNames {
    pub next_topics_name: Vec<String>,
    pub next_lessons_name: Vec<String>,
    pub next_videos_name: Vec<String>,
    pub next_tests_name: Vec<String>,
    pub next_practices_name: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub unlocked: ContentSet,
    pub completed: ContentSet,
    pub next_content: NextContentNames,
    /// Kind of the screen to open next; null when the path is finished
    pub next_step: Option<ContentKind>,
    pub next_step_id: Option<i64>,
    pub next_step_params: NextStepParams,
}

#[derive(Debug, Serialize)]
pub struct SubmitTestResponse {
    pub grade: TestGrade,
    pub unlock: Option<UnlockResponse>,
}

#[derive(Debug, Serialize)]
pub struct VideoAnswerResponse {
    pub correct: bool,
    pub unlock: Option<UnlockResponse>,
}

/// Build the response for an applied completion; `next_content` names only
/// `outcome.unlocked`.
async fn unlock_response(
    state: &AppState,
    outcome: UnlockOutcome,
) -> Result<UnlockResponse, ApiError> {
    let outline = state.catalog_service.outline().await?;
    let names = outline.names(&outcome.unlocked);
    let (next_step, next_step_id, next_step_params) = match outcome.next_step {
        Some(step) => (Some(step.target.kind), Some(step.target.id), step.params),
        None => (None, None, NextStepParams::default()),
    };

    Ok(UnlockResponse {
        unlocked: outcome.unlocked,
        completed: outcome.completed,
        next_content: NextContentNames {
            next_topics_name: names.topics,
            next_lessons_name: names.lessons,
            next_videos_name: names.videos,
            next_tests_name: names.tests,
            next_practices_name: names.practices,
        },
        next_step,
        next_step_id,
        next_step_params,
    })
}

// ============================================================================
// Handlers
// ============================================================================

async fn start_content(
    State(state): State<AppState>,
    Json(request): Json<StartContentRequest>,
) -> Result<Json<ContentSet>, ApiError> {
    let granted = state
        .progression_service
        .grant_start_content(request.user_id, &request.tariff)
        .await?;
    Ok(Json(granted))
}

async fn complete_video(
    State(state): State<AppState>,
    Json(request): Json<CompleteVideoRequest>,
) -> Result<Json<UnlockResponse>, ApiError> {
    let outcome = state
        .progression_service
        .complete_video(request.user_id, request.video_id)
        .await?;
    Ok(Json(unlock_response(&state, outcome).await?))
}

async fn complete_test(
    State(state): State<AppState>,
    Json(request): Json<CompleteTestRequest>,
) -> Result<Json<UnlockResponse>, ApiError> {
    let outcome = state
        .progression_service
        .complete_test(request.user_id, request.test_id)
        .await?;
    Ok(Json(unlock_response(&state, outcome).await?))
}

async fn complete_practice(
    State(state): State<AppState>,
    Json(request): Json<CompletePracticeRequest>,
) -> Result<Json<UnlockResponse>, ApiError> {
    let outcome = state
        .progression_service
        .complete_practice(request.telegram_id, request.practice_id)
        .await?;
    Ok(Json(unlock_response(&state, outcome).await?))
}

async fn submit_test(
    State(state): State<AppState>,
    Json(request): Json<SubmitTestRequest>,
) -> Result<Json<SubmitTestResponse>, ApiError> {
    let selections = request
        .answers
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            parse_selection(raw).map_err(|err: QuizError| {
                ApiError::with_details(
                    "VALIDATION_ERROR",
                    err.to_string(),
                    serde_json::json!({ "question": index + 1 }),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let submission = state
        .progression_service
        .submit_test(request.user_id, request.test_id, &selections)
        .await?;
    let unlock = match submission.outcome {
        Some(outcome) => Some(unlock_response(&state, outcome).await?),
        None => None,
    };

    Ok(Json(SubmitTestResponse {
        grade: submission.grade,
        unlock,
    }))
}

async fn answer_video(
    State(state): State<AppState>,
    Json(request): Json<VideoAnswerRequest>,
) -> Result<Json<VideoAnswerResponse>, ApiError> {
    let answer = state
        .progression_service
        .answer_video_question(request.user_id, request.video_id, request.answer)
        .await?;
    let unlock = match answer.outcome {
        Some(outcome) => Some(unlock_response(&state, outcome).await?),
        None => None,
    };

    Ok(Json(VideoAnswerResponse {
        correct: answer.correct,
        unlock,
    }))
}

async fn report(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> Result<Json<ProgressReport>, ApiError> {
    Ok(Json(state.progression_service.progress_report(telegram_id).await?))
}

async fn available(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> Result<Json<AvailableContent>, ApiError> {
    Ok(Json(state.progression_service.available_content(telegram_id).await?))
}
