//! Tariff service
//!
//! Tariffs on sale, payments for them and tariff activation. Payment
//! collection itself happens in the bot; this service only records the
//! result.

use crate::db::repositories::{PaymentRepository, TariffRepository, UserRepository};
use crate::models::{CreatePaymentInput, Payment, Tariff, TariffActivation, UserRole};
use crate::services::progression::{ProgressionService, ProgressionServiceError};
use anyhow::Context;
use chrono::{Days, NaiveDate, Utc};
use std::sync::Arc;

/// Status stored on payments recorded by [`TariffService::activate_tariff`]
pub const PAYMENT_STATUS_COMPLETED: &str = "completed";

#[derive(Debug, thiserror::Error)]
pub enum TariffServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ProgressionServiceError> for TariffServiceError {
    fn from(err: ProgressionServiceError) -> Self {
        match err {
            ProgressionServiceError::NotFound(what) => Self::NotFound(what),
            ProgressionServiceError::ValidationError(msg) => Self::ValidationError(msg),
            ProgressionServiceError::InternalError(e) => Self::InternalError(e),
        }
    }
}

pub struct TariffService {
    tariffs: Arc<dyn TariffRepository>,
    payments: Arc<dyn PaymentRepository>,
    users: Arc<dyn UserRepository>,
    progression: Arc<ProgressionService>,
    access_days: u64,
}

impl TariffService {
    pub fn new(
        tariffs: Arc<dyn TariffRepository>,
        payments: Arc<dyn PaymentRepository>,
        users: Arc<dyn UserRepository>,
        progression: Arc<ProgressionService>,
        access_days: i64,
    ) -> Self {
        Self {
            tariffs,
            payments,
            users,
            progression,
            access_days: access_days.max(0) as u64,
        }
    }

    /// All tariffs. An empty list is reported as `NotFound`, which the bot
    /// shows as "nothing on sale".
    pub async fn list(&self) -> Result<Vec<Tariff>, TariffServiceError> {
        let tariffs = self.tariffs.list().await.context("Failed to list tariffs")?;
        if tariffs.is_empty() {
            return Err(TariffServiceError::NotFound("No tariffs available".to_string()));
        }
        Ok(tariffs)
    }

    pub async fn get_by_title(&self, title: &str) -> Result<Tariff, TariffServiceError> {
        self.tariffs
            .get_by_title(title)
            .await
            .context("Failed to get tariff")?
            .ok_or_else(|| TariffServiceError::NotFound(format!("Tariff '{}'", title)))
    }

    /// Record a payment for a tariff.
    ///
    /// A paying user becomes a client; admins keep their role.
    ///
    /// # Errors
    /// - `NotFound` for an unknown tariff or user
    /// - `ValidationError` for a negative amount or an inverted access window
    pub async fn add_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<Payment, TariffServiceError> {
        if input.amount < 0 {
            return Err(TariffServiceError::ValidationError(
                "amount cannot be negative".to_string(),
            ));
        }
        if input.access_date_finish < input.access_date_start {
            return Err(TariffServiceError::ValidationError(
                "access_date_finish is before access_date_start".to_string(),
            ));
        }

        let tariff = self.get_by_title(&input.tariff).await?;
        let user = self
            .users
            .get_by_id(input.user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| TariffServiceError::NotFound(format!("User {}", input.user_id)))?;

        let payment = Payment {
            payment_id: 0,
            payment_date: Utc::now(),
            amount: input.amount,
            user_id: user.user_id,
            access_date_start: input.access_date_start,
            access_date_finish: input.access_date_finish,
            tariff_id: Some(tariff.tariff_id),
            status: input.status,
            service_description: input.service_description,
        };
        let payment = self.payments.create(&payment).await.context("Failed to record payment")?;

        if user.role != UserRole::Admin && user.role != UserRole::Client {
            self.users
                .set_role(user.user_id, UserRole::Client)
                .await
                .context("Failed to promote user")?;
        }

        tracing::info!(
            user_id = user.user_id,
            tariff = %tariff.title,
            amount = payment.amount,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Record a completed payment starting `today` and open the tariff's
    /// starter content.
    ///
    /// Nothing is written when the tariff has no starter content, so a
    /// failed activation can be retried without paying twice.
    pub async fn activate_tariff(
        &self,
        user_id: i64,
        tariff_title: &str,
        amount: i64,
        today: NaiveDate,
    ) -> Result<TariffActivation, TariffServiceError> {
        let finish = today
            .checked_add_days(Days::new(self.access_days))
            .ok_or_else(|| {
                TariffServiceError::ValidationError("access window out of range".to_string())
            })?;

        let tariff = self.get_by_title(tariff_title).await?;
        let start = self
            .tariffs
            .start_content(tariff.tariff_id)
            .await
            .context("Failed to load starter content")?;
        if start.is_empty() {
            return Err(TariffServiceError::NotFound(format!(
                "Starter content of tariff '{}'",
                tariff_title
            )));
        }

        let payment = self
            .add_payment(CreatePaymentInput {
                user_id,
                tariff: tariff_title.to_string(),
                amount,
                access_date_start: today,
                access_date_finish: finish,
                status: Some(PAYMENT_STATUS_COMPLETED.to_string()),
                service_description: None,
            })
            .await?;
        let granted = self.progression.grant_start_content(user_id, tariff_title).await?;

        Ok(TariffActivation { payment, granted })
    }
}
