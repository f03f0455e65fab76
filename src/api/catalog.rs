//! Catalog API endpoints
//!
//! Read-only views of the course catalog:
//! - GET /api/v1/topics, /topics/{title}
//! - GET /api/v1/topics/{topic}/lessons, /topics/{topic}/lessons/{lesson}
//! - GET /api/v1/topics/{topic}/lessons/{lesson}/{videos|tests|practices}
//! - GET /api/v1/lessons, /lessons/{lesson}/videos/{video}, /lessons/{lesson}/practices/{practice}
//! - GET /api/v1/videos, /videos/{id}/question
//! - GET /api/v1/tests, /tests/{title}
//! - GET /api/v1/practices

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    Lesson, Practice, QuestionWithAnswers, Test, TestDetail, Topic, Video, VideoDetail,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/topics", get(list_topics))
        .route("/topics/{title}", get(get_topic))
        .route("/topics/{topic}/lessons", get(topic_lessons))
        .route("/topics/{topic}/lessons/{lesson}", get(get_lesson))
        .route("/topics/{topic}/lessons/{lesson}/videos", get(lesson_videos))
        .route("/topics/{topic}/lessons/{lesson}/tests", get(lesson_tests))
        .route("/topics/{topic}/lessons/{lesson}/practices", get(lesson_practices))
        .route("/lessons", get(list_lessons))
        .route("/lessons/{lesson}/videos/{video}", get(get_video))
        .route("/lessons/{lesson}/practices/{practice}", get(get_practice))
        .route("/videos", get(list_videos))
        .route("/videos/{video_id}/question", get(video_question))
        .route("/tests", get(list_tests))
        .route("/tests/{title}", get(get_test))
        .route("/practices", get(list_practices))
}

async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, ApiError> {
    Ok(Json(state.catalog_service.topics().await?))
}

async fn get_topic(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Topic>, ApiError> {
    Ok(Json(state.catalog_service.topic(&title).await?))
}

async fn topic_lessons(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> Result<Json<Vec<Lesson>>, ApiError> {
    Ok(Json(state.catalog_service.topic_lessons(&topic).await?))
}

async fn get_lesson(
    State(state): State<AppState>,
    Path((topic, lesson)): Path<(String, String)>,
) -> Result<Json<Lesson>, ApiError> {
    Ok(Json(state.catalog_service.lesson(&topic, &lesson).await?))
}

async fn lesson_videos(
    State(state): State<AppState>,
    Path((topic, lesson)): Path<(String, String)>,
) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.catalog_service.lesson_videos(&topic, &lesson).await?))
}

async fn lesson_tests(
    State(state): State<AppState>,
    Path((topic, lesson)): Path<(String, String)>,
) -> Result<Json<Vec<Test>>, ApiError> {
    Ok(Json(state.catalog_service.lesson_tests(&topic, &lesson).await?))
}

async fn lesson_practices(
    State(state): State<AppState>,
    Path((topic, lesson)): Path<(String, String)>,
) -> Result<Json<Vec<Practice>>, ApiError> {
    Ok(Json(state.catalog_service.lesson_practices(&topic, &lesson).await?))
}

async fn list_lessons(State(state): State<AppState>) -> Result<Json<Vec<Lesson>>, ApiError> {
    Ok(Json(state.catalog_service.lessons().await?))
}

async fn get_video(
    State(state): State<AppState>,
    Path((lesson, video)): Path<(String, String)>,
) -> Result<Json<VideoDetail>, ApiError> {
    Ok(Json(state.catalog_service.video(&lesson, &video).await?))
}

async fn get_practice(
    State(state): State<AppState>,
    Path((lesson, practice)): Path<(String, String)>,
) -> Result<Json<Practice>, ApiError> {
    Ok(Json(state.catalog_service.practice(&lesson, &practice).await?))
}

async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.catalog_service.videos().await?))
}

async fn video_question(
    State(state): State<AppState>,
    Path(video_id): Path<i64>,
) -> Result<Json<QuestionWithAnswers>, ApiError> {
    Ok(Json(state.catalog_service.video_question(video_id).await?))
}

async fn list_tests(State(state): State<AppState>) -> Result<Json<Vec<Test>>, ApiError> {
    Ok(Json(state.catalog_service.tests().await?))
}

async fn get_test(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<TestDetail>, ApiError> {
    Ok(Json(state.catalog_service.test(&title).await?))
}

async fn list_practices(State(state): State<AppState>) -> Result<Json<Vec<Practice>>, ApiError> {
    Ok(Json(state.catalog_service.practices().await?))
}
