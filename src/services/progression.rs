//! Progression service
//!
//! Connects the unlock engine to storage. Each completion reads the learner's
//! state and the cached outline, runs the engine and stores what it unlocked
//! and completed. Stores only grow, so replaying a completion is harmless.

use crate::db::repositories::{ProgressRepository, TariffRepository, UserRepository};
use crate::models::{
    AvailableContent, ContentRef, ContentSet, PerKind, ProgressReport, TelegramUser, TestSubmission,
    UnlockOutcome, VideoAnswer,
};
use crate::services::catalog::{CatalogService, CatalogServiceError};
use crate::services::quiz::{check_video_answer, grade_test, QuizError};
use crate::services::unlock::{grant, unlock_after, UnlockError};
use anyhow::Context;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ProgressionServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<CatalogServiceError> for ProgressionServiceError {
    fn from(err: CatalogServiceError) -> Self {
        match err {
            CatalogServiceError::NotFound(what) => Self::NotFound(what),
            CatalogServiceError::InternalError(e) => Self::InternalError(e),
        }
    }
}

impl From<UnlockError> for ProgressionServiceError {
    fn from(err: UnlockError) -> Self {
        match err {
            UnlockError::UnknownUnit(_) => Self::NotFound(err.to_string()),
            UnlockError::NotCompletable(_) => Self::ValidationError(err.to_string()),
        }
    }
}

impl From<QuizError> for ProgressionServiceError {
    fn from(err: QuizError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

pub struct ProgressionService {
    users: Arc<dyn UserRepository>,
    tariffs: Arc<dyn TariffRepository>,
    progress: Arc<dyn ProgressRepository>,
    catalog: Arc<CatalogService>,
    test_pass_percent: u8,
}

impl ProgressionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tariffs: Arc<dyn TariffRepository>,
        progress: Arc<dyn ProgressRepository>,
        catalog: Arc<CatalogService>,
        test_pass_percent: u8,
    ) -> Self {
        Self {
            users,
            tariffs,
            progress,
            catalog,
            test_pass_percent,
        }
    }

    async fn user(&self, user_id: i64) -> Result<TelegramUser, ProgressionServiceError> {
        self.users
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| ProgressionServiceError::NotFound(format!("User {}", user_id)))
    }

    async fn user_by_tg_id(&self, tg_id: i64) -> Result<TelegramUser, ProgressionServiceError> {
        self.users
            .get_by_tg_id(tg_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| {
                ProgressionServiceError::NotFound(format!("User with Telegram id {}", tg_id))
            })
    }

    /// Open a tariff's starter content to a user.
    ///
    /// Returns only the items the user did not have yet.
    ///
    /// # Errors
    /// - `NotFound` for an unknown user or tariff, or a tariff without
    ///   starter content
    pub async fn grant_start_content(
        &self,
        user_id: i64,
        tariff_title: &str,
    ) -> Result<ContentSet, ProgressionServiceError> {
        let user = self.user(user_id).await?;
        let tariff = self
            .tariffs
            .get_by_title(tariff_title)
            .await
            .context("Failed to get tariff")?
            .ok_or_else(|| {
                ProgressionServiceError::NotFound(format!("Tariff '{}'", tariff_title))
            })?;

        let start = self
            .tariffs
            .start_content(tariff.tariff_id)
            .await
            .context("Failed to load starter content")?;
        if start.is_empty() {
            return Err(ProgressionServiceError::NotFound(format!(
                "Starter content of tariff '{}'",
                tariff_title
            )));
        }

        let available = self
            .progress
            .available(user.user_id)
            .await
            .context("Failed to load available content")?;
        let newly = grant(&start, &available);
        self.progress
            .grant(user.user_id, &newly)
            .await
            .context("Failed to grant starter content")?;

        tracing::info!(
            user_id = user.user_id,
            tariff = %tariff.title,
            granted = newly.len(),
            "Starter content granted"
        );
        Ok(newly)
    }

    /// Record that a user finished `unit` and store what it unlocks.
    pub async fn complete(
        &self,
        user_id: i64,
        unit: ContentRef,
    ) -> Result<UnlockOutcome, ProgressionServiceError> {
        let user = self.user(user_id).await?;
        let outline = self.catalog.outline().await?;
        let state = self
            .progress
            .state(user.user_id)
            .await
            .context("Failed to load progress")?;

        let outcome = unlock_after(&outline, unit, &state)?;

        self.progress
            .grant(user.user_id, &outcome.unlocked)
            .await
            .context("Failed to store unlocked content")?;
        self.progress
            .mark_done(user.user_id, &outcome.completed)
            .await
            .context("Failed to store completed content")?;

        tracing::info!(
            user_id = user.user_id,
            unit = %unit,
            unlocked = outcome.unlocked.len(),
            completed = outcome.completed.len(),
            next = ?outcome.next_step.as_ref().map(|step| step.target),
            "Unit completed"
        );
        Ok(outcome)
    }

    pub async fn complete_video(
        &self,
        user_id: i64,
        video_id: i64,
    ) -> Result<UnlockOutcome, ProgressionServiceError> {
        self.complete(user_id, ContentRef::video(video_id)).await
    }

    pub async fn complete_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<UnlockOutcome, ProgressionServiceError> {
        self.complete(user_id, ContentRef::test(test_id)).await
    }

    /// Practices are approved by an admin, who knows the learner by their
    /// Telegram id.
    pub async fn complete_practice(
        &self,
        telegram_id: i64,
        practice_id: i64,
    ) -> Result<UnlockOutcome, ProgressionServiceError> {
        let user = self.user_by_tg_id(telegram_id).await?;
        self.complete(user.user_id, ContentRef::practice(practice_id)).await
    }

    /// Grade a test attempt and complete the test if it passed.
    pub async fn submit_test(
        &self,
        user_id: i64,
        test_id: i64,
        selections: &[BTreeSet<i32>],
    ) -> Result<TestSubmission, ProgressionServiceError> {
        let user = self.user(user_id).await?;
        let test = self.catalog.test_detail(test_id).await?;
        let grade = grade_test(&test, selections, self.test_pass_percent)?;

        tracing::info!(
            user_id = user.user_id,
            test_id,
            percent = grade.percent,
            passed = grade.passed,
            "Test graded"
        );

        let outcome = if grade.passed {
            Some(self.complete_test(user.user_id, test_id).await?)
        } else {
            None
        };
        Ok(TestSubmission { grade, outcome })
    }

    /// Check the answer to a video's control question and complete the
    /// video if it is right.
    pub async fn answer_video_question(
        &self,
        user_id: i64,
        video_id: i64,
        chosen: i32,
    ) -> Result<VideoAnswer, ProgressionServiceError> {
        let user = self.user(user_id).await?;
        let question = self.catalog.video_question(video_id).await?;
        let correct = check_video_answer(&question, chosen);

        let outcome = if correct {
            Some(self.complete_video(user.user_id, video_id).await?)
        } else {
            tracing::debug!(user_id = user.user_id, video_id, chosen, "Wrong control answer");
            None
        };
        Ok(VideoAnswer { correct, outcome })
    }

    /// What a learner has finished, per kind, against the whole catalog.
    pub async fn progress_report(
        &self,
        telegram_id: i64,
    ) -> Result<ProgressReport, ProgressionServiceError> {
        let user = self.user_by_tg_id(telegram_id).await?;
        let outline = self.catalog.outline().await?;
        let done = self.progress.done(user.user_id).await.context("Failed to load progress")?;
        let last_updated = self
            .progress
            .last_done_at(user.user_id)
            .await
            .context("Failed to load last completion")?;

        let names_done = outline.names(&done);
        let quantity_done = names_done.map(|_, names| names.len());
        let quantity_all = outline.totals();
        let percent_done =
            PerKind::from_fn(|kind| percent(*quantity_done.get(kind), *quantity_all.get(kind)));

        Ok(ProgressReport {
            names_done,
            quantity_done,
            quantity_all,
            percent_done,
            last_updated,
        })
    }

    pub async fn available_content(
        &self,
        telegram_id: i64,
    ) -> Result<AvailableContent, ProgressionServiceError> {
        let user = self.user_by_tg_id(telegram_id).await?;
        let available = self
            .progress
            .available(user.user_id)
            .await
            .context("Failed to load available content")?;
        Ok(self.catalog.available_content(&available).await?)
    }
}

/// Whole-number share, rounded down; 0 of nothing is 0.
fn percent(done: usize, all: usize) -> u8 {
    if all == 0 {
        0
    } else {
        (done.min(all) * 100 / all) as u8
    }
}
